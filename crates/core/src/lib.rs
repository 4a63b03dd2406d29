pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod launcher;

pub use api::ApiClient;
pub use cli::{CliRunner, RunOptions, Transport};
pub use config::Config;
pub use error::{Error, Result};
pub use launcher::ApiDaemon;

/// Everything a tool or resource handler needs to talk to ToolHive,
/// built once at startup and passed down explicitly.
pub struct Toolhive {
    pub config: Config,
    pub api: ApiClient,
    pub cli: CliRunner,
    /// True when this process spawned the API daemon itself.
    pub api_autostarted: bool,
    /// Pid of the spawned daemon, set only alongside `api_autostarted`.
    pub api_daemon_pid: Option<u32>,
}

impl Toolhive {
    pub fn new(config: Config) -> Self {
        let api = ApiClient::new(&config);
        let cli = CliRunner::new(&config);
        Self {
            config,
            api,
            cli,
            api_autostarted: false,
            api_daemon_pid: None,
        }
    }
}
