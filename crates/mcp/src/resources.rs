use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use toolhive_core::Toolhive;

use crate::tools::{self, timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

fn resource(uri: &str, name: &str, description: &str) -> ResourceDefinition {
    ResourceDefinition {
        uri: uri.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        mime_type: "application/json".to_string(),
    }
}

pub fn list_resources() -> Vec<ResourceDefinition> {
    vec![
        resource(
            "toolhive://status",
            "ToolHive Status",
            "Current ToolHive system status and health information",
        ),
        resource(
            "toolhive://version",
            "ToolHive Version",
            "ToolHive version and build information",
        ),
        resource(
            "toolhive://openapi",
            "OpenAPI Specification",
            "Complete OpenAPI specification for ToolHive API",
        ),
        resource(
            "toolhive://servers",
            "All Servers",
            "List of all MCP servers managed by ToolHive with detailed status",
        ),
        resource(
            "toolhive://servers/running",
            "Running Servers",
            "List of currently running MCP servers only",
        ),
        resource(
            "toolhive://registry",
            "Registry Servers",
            "List of available MCP servers from all ToolHive registries",
        ),
        resource(
            "toolhive://registries",
            "All Registries",
            "List of all configured registries in ToolHive",
        ),
        resource(
            "toolhive://search",
            "Search Registry",
            "Search interface for finding MCP servers in registries",
        ),
        resource(
            "toolhive://clients",
            "Client Discovery",
            "Information about MCP clients compatible with ToolHive",
        ),
        resource(
            "toolhive://help",
            "Help and Usage",
            "Comprehensive help and usage information for ToolHive MCP server",
        ),
    ]
}

pub fn read_resource(toolhive: &Toolhive, uri: &str) -> Result<Value, String> {
    let payload = match uri {
        "toolhive://status" => tools::status_snapshot(toolhive),
        "toolhive://version" => toolhive
            .api
            .version()
            .unwrap_or_else(|e| json!({ "error": e.to_string() })),
        "toolhive://openapi" => toolhive
            .api
            .openapi()
            .unwrap_or_else(|e| json!({ "error": e.to_string() })),
        "toolhive://servers" => match toolhive.api.servers() {
            Ok(servers) => {
                let running = servers
                    .iter()
                    .filter(|s| s.get("State").and_then(Value::as_str) == Some("running"))
                    .count();
                json!({
                    "servers": servers,
                    "count": servers.len(),
                    "running_count": running,
                    "timestamp": timestamp()
                })
            }
            Err(e) => json!({ "error": e.to_string() }),
        },
        "toolhive://servers/running" => match toolhive.api.servers() {
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
        },
        "toolhive://registry" => match toolhive.cli.registry_list() {
            Ok(servers) => json!({
                "registry_servers": servers,
                "timestamp": timestamp()
            }),
            Err(e) => json!({ "error": e.to_string() }),
        },
        "toolhive://registries" => toolhive
            .api
            .registries()
            .unwrap_or_else(|e| json!({ "error": e.to_string() })),
        "toolhive://search" => search_help(),
        "toolhive://clients" => toolhive
            .api
            .client_discovery()
            .unwrap_or_else(|e| json!({ "error": e.to_string() })),
        "toolhive://help" => help(),
        _ => return Err(format!("unknown resource: {}", uri)),
    };

    Ok(payload)
}

fn search_help() -> Value {
    json!({
        "description": "Search for MCP servers in the ToolHive registry",
        "usage": "Use the 'search_registry_servers' tool with a query parameter",
        "examples": [
            { "query": "github", "description": "Find GitHub-related servers" },
            { "query": "api", "description": "Find API-related servers" },
            { "query": "memory", "description": "Find memory/storage servers" },
            { "query": "database", "description": "Find database servers" },
            { "query": "file", "description": "Find file system servers" },
            { "query": "web", "description": "Find web scraping servers" }
        ],
        "note": "Search queries match against server names, descriptions, and tags",
        "timestamp": timestamp()
    })
}

fn help() -> Value {
    json!({
        "description": "ToolHive MCP Server - Control ToolHive through natural language",
        "version": env!("CARGO_PKG_VERSION"),
        "tools_count": tools::list_tools().len(),
        "resources_count": list_resources().len(),
        "categories": {
            "server_management": [
                "list_running_servers",
                "run_mcp_server",
                "stop_mcp_server",
                "restart_mcp_server",
                "remove_mcp_server",
                "get_server_logs"
            ],
            "registry_management": [
                "list_registry_servers",
                "search_registry_servers",
                "get_server_requirements",
                "list_registries",
                "get_registry_details",
                "add_registry",
                "remove_registry"
            ],
            "system_information": [
                "get_toolhive_status",
                "get_toolhive_version",
                "get_client_discovery",
                "get_openapi_spec",
                "search_internet_for_mcp_server"
            ]
        },
        "example_usage": [
            "Run a GitHub server: 'run github server with environment variable GITHUB_TOKEN=your_token'",
            "List running servers: 'show me all running servers'",
            "Search for database servers: 'search for database servers in the registry'",
            "Get server logs: 'show me the logs for github-server'",
            "Check system status: 'what is the current status of ToolHive?'",
            "Find unknown server: 'search the internet for custom-server MCP server'"
        ],
        "documentation": {
            "api_reference": "See toolhive://openapi for complete API specification",
            "registry_search": "Use toolhive://search for search examples",
            "system_status": "Use toolhive://status for current system health"
        },
        "timestamp": timestamp()
    })
}
