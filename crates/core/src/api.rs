use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Blocking client for the ToolHive REST API. Every method is a single
/// request with a bounded timeout; failures carry the upstream body verbatim.
pub struct ApiClient {
    base: String,
    client: Client,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("toolhive-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base: config.api_base.clone(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder, url: &str) -> Result<Response> {
        request.send().map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })
    }

    fn json_or_status(&self, response: Response, context: &'static str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response, context));
        }
        let body = response.text().map_err(|source| Error::Http {
            url: self.base.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `GET /health`: true iff the daemon answered 204. Transport-level
    /// failures (connection refused, timeout) are errors, not "unhealthy".
    pub fn health(&self) -> Result<bool> {
        let url = self.url("/health");
        let response = self.send(self.client.get(&url).timeout(HEALTH_TIMEOUT), &url)?;
        debug!(status = %response.status(), "health probe");
        Ok(response.status() == StatusCode::NO_CONTENT)
    }

    /// `GET /api/v1beta/version`
    pub fn version(&self) -> Result<Value> {
        let url = self.url("/api/v1beta/version");
        let response = self.send(self.client.get(&url), &url)?;
        self.json_or_status(response, "get version")
    }

    /// `GET /api/v1beta/servers`: the `servers` array, empty if absent.
    pub fn servers(&self) -> Result<Vec<Value>> {
        let url = self.url("/api/v1beta/servers");
        let response = self.send(self.client.get(&url), &url)?;
        let body = self.json_or_status(response, "list servers")?;
        Ok(body
            .get("servers")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// `POST /api/v1beta/servers/{name}/stop`: 204 on success, a
    /// not-found error when the server does not exist upstream.
    pub fn stop_server(&self, name: &str) -> Result<()> {
        let url = self.url(&format!(
            "/api/v1beta/servers/{}/stop",
            urlencoding::encode(name)
        ));
        let response = self.send(self.client.post(&url), &url)?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::NotFound {
                name: name.to_string(),
            }),
            _ => Err(status_error(response, "stop server")),
        }
    }

    /// `GET /api/v1beta/registry`
    pub fn registries(&self) -> Result<Value> {
        let url = self.url("/api/v1beta/registry");
        let response = self.send(self.client.get(&url), &url)?;
        self.json_or_status(response, "list registries")
    }

    /// `GET /api/v1beta/registry/{name}`
    pub fn registry(&self, name: &str) -> Result<Value> {
        let url = self.url(&format!(
            "/api/v1beta/registry/{}",
            urlencoding::encode(name)
        ));
        let response = self.send(self.client.get(&url), &url)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        }
        self.json_or_status(response, "get registry")
    }

    /// `POST /api/v1beta/registry`: 201 on success; ToolHive answers 501
    /// while the endpoint is unimplemented.
    pub fn add_registry(&self, registry: &Value) -> Result<()> {
        let url = self.url("/api/v1beta/registry");
        let response = self.send(self.client.post(&url).json(registry), &url)?;

        match response.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::NOT_IMPLEMENTED => Err(Error::Status {
                context: "add registry",
                status: 501,
                body: "adding registries is not yet implemented".to_string(),
            }),
            _ => Err(status_error(response, "add registry")),
        }
    }

    /// `DELETE /api/v1beta/registry/{name}`: 204 on success.
    pub fn remove_registry(&self, name: &str) -> Result<()> {
        let url = self.url(&format!(
            "/api/v1beta/registry/{}",
            urlencoding::encode(name)
        ));
        let response = self.send(self.client.delete(&url), &url)?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::NotFound {
                name: name.to_string(),
            }),
            _ => Err(status_error(response, "remove registry")),
        }
    }

    /// `GET /api/v1beta/discovery/clients`
    pub fn client_discovery(&self) -> Result<Value> {
        let url = self.url("/api/v1beta/discovery/clients");
        let response = self.send(self.client.get(&url), &url)?;
        self.json_or_status(response, "client discovery")
    }

    /// `GET /api/openapi.json`
    pub fn openapi(&self) -> Result<Value> {
        let url = self.url("/api/openapi.json");
        let response = self.send(self.client.get(&url), &url)?;
        self.json_or_status(response, "get OpenAPI spec")
    }
}

fn status_error(response: Response, context: &'static str) -> Error {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    Error::Status {
        context,
        status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base: &str) -> ApiClient {
        let config = Config {
            api_base: base.to_string(),
            http_timeout: Duration::from_secs(1),
            ..Config::default()
        };
        ApiClient::new(&config)
    }

    #[test]
    fn urls_are_joined_without_double_slash() {
        let client = client_for("http://localhost:8080");
        assert_eq!(client.url("/health"), "http://localhost:8080/health");
        assert_eq!(
            client.url("/api/v1beta/version"),
            "http://localhost:8080/api/v1beta/version"
        );
    }

    #[test]
    fn server_names_are_percent_encoded() {
        // Encoded form shows up in the error text for an unreachable host.
        let client = client_for("http://127.0.0.1:1");
        let err = client.stop_server("my server/x").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("my%20server%2Fx"), "got: {msg}");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        // Port 1 refuses connections; must not be reported as "unhealthy".
        let client = client_for("http://127.0.0.1:1");
        assert!(matches!(client.health(), Err(Error::Http { .. })));
    }

    #[test]
    #[ignore] // Requires a running ToolHive API
    fn health_against_local_daemon() {
        let client = client_for("http://localhost:8080");
        assert!(client.health().unwrap());
    }
}
