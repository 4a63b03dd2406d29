use serde::Deserialize;
use serde_json::{json, Value};
use toolhive_core::{discovery, launcher, Toolhive};

use super::{text, timestamp, ToolDefinition};

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_toolhive_status".to_string(),
            description: "Get ToolHive system status".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_toolhive_version".to_string(),
            description: "Get ToolHive version information".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_client_discovery".to_string(),
            description: "Get discovery information about MCP clients compatible with ToolHive"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_openapi_spec".to_string(),
            description: "Get the OpenAPI specification for ToolHive API".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "search_internet_for_mcp_server".to_string(),
            description: "Search the internet for MCP server information when not found in registry"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": {
                        "type": "string",
                        "description": "Name of the MCP server to search for on the internet"
                    }
                },
                "required": ["server_name"]
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct ServerNameArgs {
    server_name: String,
}

pub fn call(toolhive: &Toolhive, name: &str, arguments: Value) -> Result<Value, String> {
    match name {
        "get_toolhive_status" => Ok(text(status(toolhive))),
        "get_toolhive_version" => {
            let payload = match toolhive.api.version() {
                Ok(version) => version,
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "get_client_discovery" => {
            let payload = match toolhive.api.client_discovery() {
                Ok(clients) => clients,
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "get_openapi_spec" => {
            let payload = match toolhive.api.openapi() {
                Ok(spec) => spec,
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "search_internet_for_mcp_server" => {
            let args: ServerNameArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;

            let result = discovery::search_for_server(&args.server_name);
            let mut payload = json!({
                "search_summary": format!(
                    "Internet search results for MCP server '{}'",
                    args.server_name
                ),
                "server_name": args.server_name,
                "found_alternatives": result.get("found_alternatives").cloned().unwrap_or(json!([])),
                "installation_suggestions": result.get("installation_suggestions").cloned().unwrap_or(json!([])),
                "web_search_performed": result.get("web_search_performed").cloned().unwrap_or(json!(false)),
                "timestamp": timestamp()
            });
            if let Some(error) = result.get("error") {
                payload["error"] = error.clone();
                payload["fallback_suggestions"] =
                    result.get("fallback_suggestions").cloned().unwrap_or(json!([]));
            }
            Ok(text(payload))
        }
        _ => Err(format!("unknown system tool: {}", name)),
    }
}

/// Health and version merged into one snapshot. The health probe alone
/// decides `api_healthy`; a failing version probe degrades to "unknown".
pub(crate) fn status(toolhive: &Toolhive) -> Value {
    let healthy = match toolhive.api.health() {
        Ok(healthy) => healthy,
        Err(e) => {
            let mut payload = json!({
                "api_healthy": false,
                "error": e.to_string(),
                "api_base_url": toolhive.api.base_url(),
                "auto_start_enabled": toolhive.config.auto_start_api,
                "api_server_auto_started": toolhive.api_autostarted,
                "timestamp": timestamp()
            });
            add_daemon_fields(toolhive, &mut payload);
            return payload;
        }
    };

    let version = toolhive
        .api
        .version()
        .ok()
        .and_then(|v| v.get("version").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    let mut payload = json!({
        "api_healthy": healthy,
        "api_base_url": toolhive.api.base_url(),
        "version": version,
        "auto_start_enabled": toolhive.config.auto_start_api,
        "api_server_auto_started": toolhive.api_autostarted,
        "timestamp": timestamp()
    });

    if healthy {
        if let Ok(servers) = toolhive.api.servers() {
            let running = servers
                .iter()
                .filter(|s| s.get("State").and_then(Value::as_str) == Some("running"))
                .count();
            payload["total_servers"] = json!(servers.len());
            payload["running_servers"] = json!(running);
        }
    }

    add_daemon_fields(toolhive, &mut payload);
    payload
}

/// Pid and liveness of the daemon this process spawned; absent when the
/// API was already running or auto-start is off.
fn add_daemon_fields(toolhive: &Toolhive, payload: &mut Value) {
    if let Some(pid) = toolhive.api_daemon_pid {
        payload["api_server_pid"] = json!(pid);
        payload["api_server_running"] = json!(launcher::pid_alive(pid));
    }
}
