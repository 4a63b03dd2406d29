use serde::Deserialize;
use serde_json::{json, Value};
use toolhive_core::{discovery, Error, Toolhive};

use super::{text, timestamp, ToolDefinition};

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_registry_servers".to_string(),
            description: "List available MCP servers from the ToolHive registry".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "search_registry_servers".to_string(),
            description:
                "Search for MCP servers in the ToolHive registry by name, description, or tags"
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query to find servers (searches name, description, and tags). Required - cannot be empty."
                    },
                    "format": {
                        "type": "string",
                        "enum": ["json", "text"],
                        "description": "Output format (default: json)"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "get_server_requirements".to_string(),
            description:
                "Get setup requirements and information for an MCP server before running it"
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": {
                        "type": "string",
                        "description": "Server name from registry to check requirements for"
                    }
                },
                "required": ["server_name"]
            }),
        },
        ToolDefinition {
            name: "list_registries".to_string(),
            description: "List all available registries".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_registry_details".to_string(),
            description: "Get detailed information about a specific registry".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "registry_name": {
                        "type": "string",
                        "description": "Name of the registry to get details for"
                    }
                },
                "required": ["registry_name"]
            }),
        },
        ToolDefinition {
            name: "add_registry".to_string(),
            description: "Add a new registry to ToolHive".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the registry"
                    },
                    "url": {
                        "type": "string",
                        "description": "URL of the registry"
                    },
                    "type": {
                        "type": "string",
                        "description": "Type of registry (e.g., 'git', 'http')"
                    }
                },
                "required": ["name", "url"]
            }),
        },
        ToolDefinition {
            name: "remove_registry".to_string(),
            description: "Remove a registry from ToolHive".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "registry_name": {
                        "type": "string",
                        "description": "Name of the registry to remove"
                    }
                },
                "required": ["registry_name"]
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    format: Option<SearchFormat>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SearchFormat {
    Json,
    Text,
}

impl SearchFormat {
    fn as_str(self) -> &'static str {
        match self {
            SearchFormat::Json => "json",
            SearchFormat::Text => "text",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServerNameArgs {
    server_name: String,
}

#[derive(Debug, Deserialize)]
struct RegistryNameArgs {
    registry_name: String,
}

#[derive(Debug, Deserialize)]
struct AddRegistryArgs {
    name: String,
    url: String,
    #[serde(rename = "type")]
    registry_type: Option<String>,
}

pub fn call(toolhive: &Toolhive, name: &str, arguments: Value) -> Result<Value, String> {
    match name {
        "list_registry_servers" => {
            let payload = match toolhive.cli.registry_list() {
                Ok(servers) => json!({
                    "registry_servers": servers,
                    "timestamp": timestamp()
                }),
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "search_registry_servers" => {
            let args: SearchArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;
            Ok(text(search_registry(toolhive, &args)))
        }
        "get_server_requirements" => {
            let args: ServerNameArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;
            Ok(text(validate_requirements(toolhive, &args.server_name, &[])))
        }
        "list_registries" => {
            let payload = match toolhive.api.registries() {
                Ok(registries) => registries,
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "get_registry_details" => {
            let args: RegistryNameArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;

            let payload = match toolhive.api.registry(&args.registry_name) {
                Ok(registry) => registry,
                Err(e) if e.is_not_found() => {
                    json!({ "error": format!("Registry '{}' not found", args.registry_name) })
                }
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "add_registry" => {
            let args: AddRegistryArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;

            let registry = json!({
                "name": args.name,
                "url": args.url,
                "type": args.registry_type.unwrap_or_else(|| "git".to_string())
            });

            let payload = match toolhive.api.add_registry(&registry) {
                Ok(()) => json!({ "success": true, "message": "Registry added successfully" }),
                Err(Error::Status { status: 501, .. }) => {
                    json!({ "error": "Adding registries is not yet implemented" })
                }
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "remove_registry" => {
            let args: RegistryNameArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;

            let payload = match toolhive.api.remove_registry(&args.registry_name) {
                Ok(()) => json!({
                    "success": true,
                    "message": format!("Registry '{}' removed successfully", args.registry_name)
                }),
                Err(e) if e.is_not_found() => {
                    json!({ "error": format!("Registry '{}' not found", args.registry_name) })
                }
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        _ => Err(format!("unknown registry tool: {}", name)),
    }
}

fn search_registry(toolhive: &Toolhive, args: &SearchArgs) -> Value {
    if args.query.trim().is_empty() {
        return json!({
            "success": false,
            "error": "Search query is required. Use 'list_registry_servers' to see all available servers.",
            "suggestion": "Provide a search term like 'github', 'memory', 'api', etc."
        });
    }

    let format = args.format.unwrap_or(SearchFormat::Json);
    let output = match toolhive.cli.search(&args.query, format.as_str()) {
        Ok(output) => output,
        Err(e) => return json!({ "success": false, "error": e.to_string() }),
    };

    let mut payload = json!({
        "success": output.success(),
        "exit_code": output.exit_code,
        "command": output.command,
        "query": args.query
    });

    if !output.success() {
        payload["error"] = if output.stderr.is_empty() {
            json!("Search failed")
        } else {
            json!(output.stderr)
        };
        payload["stderr"] = json!(output.stderr);
        return payload;
    }

    match format {
        SearchFormat::Json => match serde_json::from_str::<Value>(&output.stdout) {
            Ok(results) => {
                payload["count"] =
                    json!(results.as_array().map(Vec::len).unwrap_or(0));
                payload["results"] = results;
            }
            Err(_) => {
                payload["success"] = json!(false);
                payload["error"] = json!("Failed to parse JSON response");
                payload["raw_output"] = json!(output.stdout);
            }
        },
        SearchFormat::Text => {
            payload["results"] = json!(output.stdout);
            payload["format"] = json!("text");
        }
    }
    payload
}

/// Check a server's registry entry against the env vars the caller is
/// providing. A server missing from the registry triggers the web search
/// probes instead of a flat refusal.
pub(crate) fn validate_requirements(
    toolhive: &Toolhive,
    server_name: &str,
    provided_env_vars: &[String],
) -> Value {
    let info = match toolhive.cli.registry_info(server_name) {
        Ok(info) => info,
        Err(_) => {
            let web_search = discovery::search_for_server(server_name);
            let mut suggestions = vec![
                json!(format!(
                    "Server '{}' was not found in the ToolHive registry.",
                    server_name
                )),
                json!("I searched the internet for possible alternatives:"),
            ];
            if let Some(found) = web_search
                .get("installation_suggestions")
                .and_then(Value::as_array)
            {
                suggestions.extend(found.iter().cloned());
            }

            return json!({
                "valid": false,
                "info": format!("Server '{}' not found in ToolHive registry", server_name),
                "web_search_results": web_search,
                "suggestions": suggestions,
                "found_alternatives": web_search.get("found_alternatives").cloned().unwrap_or(json!([])),
                "recommended_action": "Try one of the suggested commands above, or verify the server name is correct."
            });
        }
    };

    let provided_names: Vec<&str> = provided_env_vars
        .iter()
        .map(|pair| pair.split('=').next().unwrap_or(pair.as_str()))
        .collect();

    let env_vars = info
        .get("env_vars")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let missing: Vec<Value> = env_vars
        .iter()
        .filter(|var| var.get("required").and_then(Value::as_bool) == Some(true))
        .filter(|var| {
            var.get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| !provided_names.contains(&name))
        })
        .map(|var| {
            json!({
                "name": var.get("name").cloned().unwrap_or(Value::Null),
                "description": var.get("description").and_then(Value::as_str)
                    .unwrap_or("No description available")
            })
        })
        .collect();

    let mut suggestions: Vec<String> = Vec::new();
    if !missing.is_empty() {
        suggestions.push(format!(
            "To run {}, you need to provide the following environment variables:",
            server_name
        ));
        for var in &missing {
            suggestions.push(format!(
                "  - {}: {}",
                var["name"].as_str().unwrap_or("?"),
                var["description"].as_str().unwrap_or("")
            ));
        }
        if let Some(first) = missing.first().and_then(|v| v["name"].as_str()) {
            suggestions.push(format!(
                "Example: 'Run {} with environment variable {}=your_value_here'",
                server_name, first
            ));
        }
    }

    let optional: Vec<&Value> = env_vars
        .iter()
        .filter(|var| var.get("required").and_then(Value::as_bool) != Some(true))
        .collect();
    if !optional.is_empty() {
        suggestions.push("Optional environment variables:".to_string());
        for var in optional {
            suggestions.push(format!(
                "  - {}: {}",
                var.get("name").and_then(Value::as_str).unwrap_or("?"),
                var.get("description").and_then(Value::as_str).unwrap_or("No description")
            ));
        }
    }

    json!({
        "valid": missing.is_empty(),
        "server_info": info,
        "missing_required_env_vars": missing,
        "suggestions": suggestions,
        "warnings": []
    })
}
