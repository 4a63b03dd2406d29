use serde::Deserialize;
use serde_json::{json, Value};
use toolhive_core::{RunOptions, Toolhive};

use super::{registry, text, timestamp, ToolDefinition};

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_running_servers".to_string(),
            description: "List all currently running MCP servers".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "run_mcp_server".to_string(),
            description: "Start an MCP server from registry, container image, or protocol scheme"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": {
                        "type": "string",
                        "description": "Server name from registry, container image, or protocol scheme (e.g., 'github', 'mcp/github:latest', 'npx://package-name')"
                    },
                    "name": {
                        "type": "string",
                        "description": "Custom name for the server instance (optional)"
                    },
                    "transport": {
                        "type": "string",
                        "enum": ["stdio", "sse"],
                        "description": "Transport mode (default: stdio)"
                    },
                    "port": {
                        "type": "integer",
                        "description": "Port for the HTTP proxy to listen on (host port)"
                    },
                    "host": {
                        "type": "string",
                        "description": "Host for the HTTP proxy to listen on (default: 127.0.0.1)"
                    },
                    "target_port": {
                        "type": "integer",
                        "description": "Port for the container to expose (SSE transport only)"
                    },
                    "target_host": {
                        "type": "string",
                        "description": "Host to forward traffic to (SSE transport only, default: 127.0.0.1)"
                    },
                    "permission_profile": {
                        "type": "string",
                        "description": "Permission profile (none, network, or path to JSON file, default: network)"
                    },
                    "env_vars": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Environment variables (format: KEY=VALUE)"
                    },
                    "volumes": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Volume mounts (format: host-path:container-path[:ro])"
                    },
                    "secrets": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Secrets (format: NAME,target=TARGET)"
                    },
                    "foreground": {
                        "type": "boolean",
                        "description": "Run in foreground mode (block until container exits)"
                    },
                    "detach": {
                        "type": "boolean",
                        "description": "Run in detached mode (background)"
                    },
                    "args": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Additional arguments to pass to the server"
                    }
                },
                "required": ["server_name"]
            }),
        },
        ToolDefinition {
            name: "stop_mcp_server".to_string(),
            description: "Stop a running MCP server".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": {
                        "type": "string",
                        "description": "Name of the server to stop"
                    }
                },
                "required": ["server_name"]
            }),
        },
        ToolDefinition {
            name: "restart_mcp_server".to_string(),
            description: "Restart an MCP server".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": {
                        "type": "string",
                        "description": "Name of the server to restart"
                    }
                },
                "required": ["server_name"]
            }),
        },
        ToolDefinition {
            name: "remove_mcp_server".to_string(),
            description: "Remove an MCP server managed by ToolHive".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": {
                        "type": "string",
                        "description": "Name of the server to remove"
                    },
                    "force": {
                        "type": "boolean",
                        "description": "Force removal of a running container (default: false)"
                    }
                },
                "required": ["server_name"]
            }),
        },
        ToolDefinition {
            name: "get_server_logs".to_string(),
            description: "Get logs from an MCP server".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "server_name": {
                        "type": "string",
                        "description": "Name of the server to get logs from"
                    },
                    "lines": {
                        "type": "integer",
                        "description": "Number of log lines to retrieve (default: 100)",
                        "minimum": 1,
                        "maximum": 10000
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

#[derive(Debug, Deserialize)]
struct RemoveArgs {
    server_name: String,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct LogsArgs {
    server_name: String,
    lines: Option<u32>,
}

pub fn call(toolhive: &Toolhive, name: &str, arguments: Value) -> Result<Value, String> {
    match name {
        "list_running_servers" => {
            let payload = match toolhive.api.servers() {
                Ok(servers) => {
                    let running: Vec<Value> = servers
                        .into_iter()
                        .filter(|s| s.get("State").and_then(Value::as_str) == Some("running"))
                        .collect();
                    json!({
                        "running_servers": running,
                        "count": running.len(),
                        "timestamp": timestamp()
                    })
                }
                Err(e) => json!({ "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "run_mcp_server" => {
            let options: RunOptions = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;
            Ok(text(run_server(toolhive, &options)))
        }
        "stop_mcp_server" => {
            let args: ServerNameArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;

            let payload = match toolhive.api.stop_server(&args.server_name) {
                Ok(()) => json!({
                    "success": true,
                    "message": format!("Server '{}' stopped successfully", args.server_name)
                }),
                Err(e) if e.is_not_found() => json!({
                    "success": false,
                    "error": format!("Server '{}' not found or already stopped", args.server_name)
                }),
                Err(e) => json!({ "success": false, "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "restart_mcp_server" => {
            let args: ServerNameArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;
            Ok(text(restart_server(toolhive, &args.server_name)))
        }
        "remove_mcp_server" => {
            let args: RemoveArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;

            let payload = match toolhive.cli.remove_server(&args.server_name, args.force) {
                Ok(output) => {
                    let verdict = if output.success() {
                        "removed successfully"
                    } else {
                        "removal failed"
                    };
                    json!({
                        "success": output.success(),
                        "exit_code": output.exit_code,
                        "stdout": output.stdout,
                        "stderr": output.stderr,
                        "command": output.command,
                        "message": format!("Server '{}' {}", args.server_name, verdict)
                    })
                }
                Err(e) => json!({ "success": false, "error": e.to_string() }),
            };
            Ok(text(payload))
        }
        "get_server_logs" => {
            let args: LogsArgs = serde_json::from_value(arguments)
                .map_err(|e| format!("invalid arguments: {}", e))?;
            let lines = args.lines.unwrap_or(100).clamp(1, 10_000);

            let payload = match toolhive.cli.server_logs(&args.server_name, lines) {
                Ok(output) if output.success() => json!({
                    "success": true,
                    "logs": output.stdout,
                    "stderr": output.stderr,
                    "lines_requested": lines,
                    "server_name": args.server_name
                }),
                Ok(output) => json!({
                    "success": false,
                    "error": format!("Failed to get logs: {}", output.stderr),
                    "lines_requested": lines,
                    "server_name": args.server_name
                }),
                Err(e) => json!({
                    "success": false,
                    "error": e.to_string(),
                    "lines_requested": lines,
                    "server_name": args.server_name
                }),
            };
            Ok(text(payload))
        }
        _ => Err(format!("unknown server tool: {}", name)),
    }
}

/// Validate registry requirements first; only a valid invocation reaches
/// `thv run`.
fn run_server(toolhive: &Toolhive, options: &RunOptions) -> Value {
    let validation = registry::validate_requirements(toolhive, &options.server_name, &options.env_vars);

    if validation.get("valid").and_then(Value::as_bool) != Some(true) {
        return json!({
            "success": false,
            "validation_failed": true,
            "missing_requirements": validation.get("missing_required_env_vars").cloned().unwrap_or(json!([])),
            "suggestions": validation.get("suggestions").cloned().unwrap_or(json!([])),
            "server_info": validation.get("server_info").cloned().unwrap_or(json!({})),
            "web_search_results": validation.get("web_search_results").cloned().unwrap_or(Value::Null),
            "message": format!(
                "Cannot start {} - missing required parameters. See suggestions below.",
                options.server_name
            )
        });
    }

    match toolhive.cli.run_server(options) {
        Ok(output) => {
            let mut payload = json!({
                "success": output.success(),
                "exit_code": output.exit_code,
                "stdout": output.stdout,
                "stderr": output.stderr,
                "command": output.command
            });
            if let Some(suggestions) = validation.get("suggestions") {
                if suggestions.as_array().is_some_and(|s| !s.is_empty()) {
                    payload["setup_info"] = json!({
                        "server_info": validation.get("server_info").cloned().unwrap_or(json!({})),
                        "suggestions": suggestions
                    });
                }
            }
            payload
        }
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    }
}

/// Stop the old instance; the original run flags are not recoverable from
/// upstream, so starting again is left to the caller.
fn restart_server(toolhive: &Toolhive, server_name: &str) -> Value {
    let output = match toolhive.cli.remove_server(server_name, true) {
        Ok(output) => output,
        Err(e) => {
            return json!({
                "success": false,
                "error": format!("Failed to stop server for restart: {}", e)
            })
        }
    };

    if !output.success() {
        return json!({
            "success": false,
            "error": format!("Failed to stop server for restart: {}", output.stderr)
        });
    }

    json!({
        "success": false,
        "message": "Restart requires manual intervention. Please stop the server and run it again with the same parameters.",
        "instructions": [
            format!("1. Server '{}' has been stopped", server_name),
            "2. Use 'run_mcp_server' tool to start it again with your desired configuration"
        ]
    })
}
