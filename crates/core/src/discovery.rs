use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

const NPM_REGISTRY: &str = "https://registry.npmjs.org";
const DOCKER_HUB: &str = "https://hub.docker.com/v2/repositories";

/// Best-effort lookup of an MCP server that is not in the ToolHive
/// registry: probe npm (as-is and `mcp-` prefixed) and Docker Hub, and
/// turn hits into runnable suggestions. Probe failures are skipped; the
/// result is always a well-formed payload.
pub fn search_for_server(server_name: &str) -> Value {
    let client = match Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            return json!({
                "server_name": server_name,
                "web_search_performed": false,
                "error": format!("web search unavailable: {e}"),
                "fallback_suggestions": fallback_suggestions(server_name),
            });
        }
    };

    let mut alternatives = Vec::new();

    for package in [server_name.to_string(), format!("mcp-{server_name}")] {
        let url = format!("{NPM_REGISTRY}/{}", urlencoding::encode(&package));
        if let Some(body) = fetch_json(&client, &url) {
            if let Some(alt) = npm_alternative(&body) {
                alternatives.push(alt);
            }
        }
    }

    let docker_url = format!("{DOCKER_HUB}/mcp/{}/", urlencoding::encode(server_name));
    if fetch_json(&client, &docker_url).is_some() {
        alternatives.push(json!({
            "type": "docker",
            "name": format!("mcp/{server_name}"),
            "description": format!("Docker image for {server_name} MCP server"),
            "suggested_command": format!("mcp/{server_name}:latest"),
            "installation": format!("docker pull mcp/{server_name}"),
        }));
    }

    let suggestions = if alternatives.is_empty() {
        fallback_suggestions(server_name)
    } else {
        vec![
            "Found potential matches above. Try the suggested commands.".to_string(),
            format!(
                "If none work, check the official {server_name} documentation for MCP server setup instructions."
            ),
            "You can also try manual installation and then use the server with ToolHive."
                .to_string(),
        ]
    };

    json!({
        "server_name": server_name,
        "found_alternatives": alternatives,
        "installation_suggestions": suggestions,
        "web_search_performed": true,
    })
}

fn fetch_json(client: &Client, url: &str) -> Option<Value> {
    let response = client.get(url).send().ok()?;
    if !response.status().is_success() {
        debug!(url, status = %response.status(), "discovery probe missed");
        return None;
    }
    response.json().ok()
}

fn npm_alternative(package: &Value) -> Option<Value> {
    let name = package.get("name")?.as_str()?;
    let description = package
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("");
    let version = package
        .pointer("/dist-tags/latest")
        .and_then(Value::as_str)
        .unwrap_or("latest");

    Some(json!({
        "type": "npm",
        "name": name,
        "description": description,
        "version": version,
        "suggested_command": format!("npx://{name}"),
        "installation": format!("npm install -g {name}"),
    }))
}

fn fallback_suggestions(server_name: &str) -> Vec<String> {
    vec![
        format!("Try searching npm: npm search mcp {server_name}"),
        format!("Check GitHub: https://github.com/search?q=mcp+{server_name}"),
        format!("Look for Docker images: docker search mcp-{server_name}"),
        format!("Try with npx: npx://mcp-{server_name}"),
        format!("Check if it's a Docker image: mcp/{server_name}:latest"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npm_hit_becomes_runnable_suggestion() {
        let package = json!({
            "name": "mcp-weather",
            "description": "Weather MCP server",
            "dist-tags": { "latest": "1.2.0" }
        });

        let alt = npm_alternative(&package).unwrap();
        assert_eq!(alt["type"], "npm");
        assert_eq!(alt["suggested_command"], "npx://mcp-weather");
        assert_eq!(alt["version"], "1.2.0");
        assert_eq!(alt["installation"], "npm install -g mcp-weather");
    }

    #[test]
    fn npm_body_without_name_is_skipped() {
        assert!(npm_alternative(&json!({"error": "Not found"})).is_none());
    }

    #[test]
    fn fallback_suggestions_mention_the_server() {
        let suggestions = fallback_suggestions("custom-db");
        assert!(!suggestions.is_empty());
        assert!(suggestions.iter().all(|s| s.contains("custom-db")));
    }

    #[test]
    #[ignore] // Requires network
    fn live_search_always_returns_payload() {
        let result = search_for_server("filesystem");
        assert_eq!(result["web_search_performed"], true);
        assert!(result["installation_suggestions"].is_array());
    }
}
