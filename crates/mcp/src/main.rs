use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use toolhive_core::{bootstrap, launcher, ApiDaemon, Config, Toolhive};
use toolhive_mcp::server::McpServer;
use toolhive_mcp::tools;

fn main() -> Result<()> {
    let config = Config::from_env();
    init_logging(&config.log_level);

    let setup_only = std::env::args().any(|arg| arg == "--setup-only");

    let mut toolhive = Toolhive::new(config);
    debug!(api_base = %toolhive.api.base_url(), "configuration loaded");

    let configured_cli = toolhive.config.cli_path.to_string_lossy().to_string();
    match bootstrap::probe_executables(&[configured_cli.as_str(), "thv"], &["--version"]) {
        Some(cli) => info!(%cli, "ToolHive CLI available"),
        None => warn!("ToolHive CLI not found - CLI-backed tools will fail"),
    }

    // Keep the daemon handle alive for the life of the process; Drop stops
    // it on the way out.
    let daemon = ApiDaemon::start(&toolhive.config, &toolhive.api);
    toolhive.api_autostarted = daemon.is_some();
    toolhive.api_daemon_pid = daemon.as_ref().map(ApiDaemon::pid);
    launcher::install_signal_handlers();

    if setup_only {
        report_setup(&toolhive);
        return Ok(());
    }

    info!(
        tools = tools::list_tools().len(),
        "ToolHive MCP server ready on stdio"
    );

    let mut server = McpServer::new(toolhive);

    // stdout carries protocol traffic only; all logging goes to stderr.
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = server.handle_request(&line);
        if let Some(resp) = response {
            writeln!(stdout, "{}", resp)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn report_setup(toolhive: &Toolhive) {
    let healthy = matches!(toolhive.api.health(), Ok(true));
    eprintln!("api_base: {}", toolhive.api.base_url());
    eprintln!("api_healthy: {}", healthy);
    eprintln!("api_autostarted: {}", toolhive.api_autostarted);
    eprintln!("cli_path: {}", toolhive.config.cli_path.display());
}
