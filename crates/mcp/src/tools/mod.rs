mod registry;
mod servers;
mod system;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use toolhive_core::Toolhive;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn list_tools() -> Vec<ToolDefinition> {
    let mut tools = Vec::new();
    tools.extend(servers::definitions());
    tools.extend(registry::definitions());
    tools.extend(system::definitions());
    tools
}

pub fn call_tool(toolhive: &Toolhive, name: &str, arguments: Value) -> Result<Value, String> {
    match name {
        "list_running_servers" | "run_mcp_server" | "stop_mcp_server" | "restart_mcp_server"
        | "remove_mcp_server" | "get_server_logs" => servers::call(toolhive, name, arguments),
        "list_registry_servers" | "search_registry_servers" | "get_server_requirements"
        | "list_registries" | "get_registry_details" | "add_registry" | "remove_registry" => {
            registry::call(toolhive, name, arguments)
        }
        "get_toolhive_status" | "get_toolhive_version" | "get_client_discovery"
        | "get_openapi_spec" | "search_internet_for_mcp_server" => {
            system::call(toolhive, name, arguments)
        }
        _ => Err(format!("unknown tool: {}", name)),
    }
}

/// Shared by the status tool and the `toolhive://status` resource.
pub(crate) fn status_snapshot(toolhive: &Toolhive) -> Value {
    system::status(toolhive)
}

/// Wrap a JSON payload as MCP text content.
pub(crate) fn text(payload: Value) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": serde_json::to_string_pretty(&payload).unwrap_or_default()
        }]
    })
}

pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
