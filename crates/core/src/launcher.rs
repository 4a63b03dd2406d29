use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::bootstrap::{self, Attempt, SetupReport, SetupStrategy};
use crate::config::Config;

const API_LOG: &str = "toolhive-api.log";
const API_ERROR_LOG: &str = "toolhive-api-error.log";
const STOP_GRACE: Duration = Duration::from_secs(10);

/// Fallback CLI candidates probed when the configured path cannot start
/// the daemon.
const CLI_CANDIDATES: &[&str] = &["thv", "toolhive"];

/// PID of the daemon child, visible to the signal handlers. Zero when no
/// child is ours to manage.
static DAEMON_PID: AtomicI32 = AtomicI32::new(0);

/// A `thv serve` child this process spawned and owns. Dropping it stops
/// the daemon.
pub struct ApiDaemon {
    child: Child,
}

impl ApiDaemon {
    /// Bring the API up if configured to, trying each strategy in order:
    /// probe for an already-running daemon, spawn with the configured CLI,
    /// spawn with a CLI probed from the usual candidates. Returns `None`
    /// when the API was already running, auto-start is disabled, or every
    /// strategy failed (a warning, never a halt).
    pub fn start(config: &Config, api: &ApiClient) -> Option<Self> {
        if !config.auto_start_api {
            info!("auto-start disabled via TOOLHIVE_AUTO_START_API=false");
            return None;
        }

        let configured = config.cli_path.to_string_lossy().to_string();
        let probed = bootstrap::probe_executables(CLI_CANDIDATES, &["--version"])
            .filter(|found| *found != configured);

        let mut strategies: Vec<Box<dyn SetupStrategy<Output = Option<Child>> + '_>> = vec![
            Box::new(ProbeHealth { api }),
            Box::new(SpawnServe {
                name: "spawn configured CLI",
                cli: configured,
                config,
                api,
            }),
        ];
        if let Some(cli) = probed {
            strategies.push(Box::new(SpawnServe {
                name: "spawn probed CLI",
                cli,
                config,
                api,
            }));
        }

        match bootstrap::run_strategies(&mut strategies) {
            SetupReport::Satisfied {
                strategy,
                already,
                value,
            } => {
                if already {
                    info!(strategy, "ToolHive API already running");
                } else {
                    info!(strategy, "ToolHive API started");
                }
                value.map(|child| {
                    DAEMON_PID.store(child.id() as i32, Ordering::SeqCst);
                    Self { child }
                })
            }
            SetupReport::Exhausted { failures } => {
                for failure in &failures {
                    error!(strategy = failure.strategy, reason = %failure.reason, "API bring-up failed");
                }
                warn!("ToolHive API not available - some features may be limited");
                None
            }
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// SIGTERM the daemon's process group, give it up to ten seconds,
    /// then SIGKILL. Safe to call more than once.
    pub fn stop(&mut self) {
        if !self.is_running() {
            DAEMON_PID.store(0, Ordering::SeqCst);
            return;
        }

        info!(pid = self.child.id(), "stopping ToolHive API server");
        DAEMON_PID.store(0, Ordering::SeqCst);

        if stop_child_group(&mut self.child, STOP_GRACE) {
            info!("ToolHive API server stopped gracefully");
        } else {
            warn!("ToolHive API server did not stop gracefully, force killing");
            kill_group(self.child.id(), ForceKill::Yes);
            let _ = self.child.wait();
        }
    }
}

impl Drop for ApiDaemon {
    fn drop(&mut self) {
        self.stop();
    }
}

struct ProbeHealth<'a> {
    api: &'a ApiClient,
}

impl SetupStrategy for ProbeHealth<'_> {
    type Output = Option<Child>;

    fn name(&self) -> &'static str {
        "probe existing API"
    }

    fn attempt(&mut self) -> Result<Attempt<Option<Child>>, String> {
        match self.api.health() {
            Ok(true) => Ok(Attempt::AlreadySatisfied(None)),
            Ok(false) => Err("health endpoint did not return 204".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

struct SpawnServe<'a> {
    name: &'static str,
    cli: String,
    config: &'a Config,
    api: &'a ApiClient,
}

impl SetupStrategy for SpawnServe<'_> {
    type Output = Option<Child>;

    fn name(&self) -> &'static str {
        self.name
    }

    fn attempt(&mut self) -> Result<Attempt<Option<Child>>, String> {
        let (host, port) = self.config.host_port();

        let mut command = Command::new(&self.cli);
        command
            .arg("serve")
            .args(["--port", &port.to_string()])
            .args(["--host", &host])
            .args(&self.config.api_args)
            .stdin(Stdio::null());

        attach_logs(&mut command, &self.config.log_dir);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        info!(cli = %self.cli, host, port, "starting ToolHive API server");
        let mut child = command
            .spawn()
            .map_err(|e| format!("could not spawn `{} serve`: {e}", self.cli))?;

        // Progressive health polling across the startup budget.
        let retries = self.config.startup_retries.max(1);
        let pause = self.config.startup_timeout / retries;
        for _ in 0..retries {
            std::thread::sleep(pause);
            if let Ok(true) = self.api.health() {
                return Ok(Attempt::Ready(Some(child)));
            }
            if let Ok(Some(status)) = child.try_wait() {
                return Err(spawn_failure(&self.config.log_dir, status.code()));
            }
        }

        // Never healthy within the budget; do not leave the child behind.
        kill_group(child.id(), ForceKill::Yes);
        let _ = child.wait();
        Err(format!(
            "API server not healthy within {:?}",
            self.config.startup_timeout
        ))
    }
}

fn attach_logs(command: &mut Command, log_dir: &Path) {
    if !bootstrap::ensure_log_dir(log_dir) {
        command.stdout(Stdio::null()).stderr(Stdio::null());
        return;
    }

    match (
        File::create(log_dir.join(API_LOG)),
        File::create(log_dir.join(API_ERROR_LOG)),
    ) {
        (Ok(out), Ok(err)) => {
            command.stdout(out).stderr(err);
        }
        _ => {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }
}

fn spawn_failure(log_dir: &Path, code: Option<i32>) -> String {
    let mut message = match code {
        Some(code) => format!("API server process exited with code {code}"),
        None => "API server process was killed before becoming healthy".to_string(),
    };

    if let Ok(log) = std::fs::read_to_string(log_dir.join(API_ERROR_LOG)) {
        let tail: String = log.trim().chars().rev().take(500).collect::<Vec<_>>()
            .into_iter().rev().collect();
        if !tail.is_empty() {
            message.push_str(": ");
            message.push_str(&tail);
        }
    }
    message
}

enum ForceKill {
    No,
    Yes,
}

/// Signal the child's whole process group so the daemon's own children go
/// with it.
#[cfg(unix)]
fn kill_group(pid: u32, force: ForceKill) {
    let signal = match force {
        ForceKill::No => libc::SIGTERM,
        ForceKill::Yes => libc::SIGKILL,
    };
    unsafe {
        libc::kill(-(pid as i32), signal);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32, _force: ForceKill) {}

/// SIGTERM the group and wait out the grace period. True when the child
/// exited within it.
fn stop_child_group(child: &mut Child, grace: Duration) -> bool {
    kill_group(child.id(), ForceKill::No);
    #[cfg(not(unix))]
    let _ = child.kill();

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if let Ok(Some(_)) = child.try_wait() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Signal-0 probe: true while the pid still exists.
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
pub fn pid_alive(_pid: u32) -> bool {
    false
}

/// Install SIGINT/SIGTERM handlers that forward the signal to the daemon's
/// process group and wait for it before the parent exits, so the managed
/// process is never orphaned. Exits with the conventional 128+signo.
#[cfg(unix)]
pub fn install_signal_handlers() {
    let handler = forward_signal as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn install_signal_handlers() {}

// Only async-signal-safe calls in here: kill, waitpid, _exit.
#[cfg(unix)]
extern "C" fn forward_signal(signo: libc::c_int) {
    let pid = DAEMON_PID.swap(0, Ordering::SeqCst);
    if pid > 0 {
        unsafe {
            libc::kill(-pid, libc::SIGTERM);
            let mut status: libc::c_int = 0;
            libc::waitpid(pid, &mut status, 0);
        }
    }
    unsafe { libc::_exit(128 + signo) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn spawn_sleeper() -> Child {
        use std::os::unix::process::CommandExt;
        Command::new("sleep")
            .arg("30")
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn sigterm_to_group_stops_the_child() {
        let mut child = spawn_sleeper();
        assert!(stop_child_group(&mut child, Duration::from_secs(5)));
        assert!(matches!(child.try_wait(), Ok(Some(_))));
    }

    #[cfg(unix)]
    #[test]
    fn stop_is_idempotent_on_dead_child() {
        let mut daemon = ApiDaemon {
            child: spawn_sleeper(),
        };
        daemon.stop();
        daemon.stop();
        assert!(!daemon.is_running());
    }

    #[cfg(unix)]
    #[test]
    fn pid_alive_tracks_process_lifetime() {
        assert!(pid_alive(std::process::id()));

        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(!pid_alive(pid));
    }

    #[test]
    fn disabled_auto_start_spawns_nothing() {
        let config = Config {
            auto_start_api: false,
            ..Config::default()
        };
        let api = ApiClient::new(&config);
        assert!(ApiDaemon::start(&config, &api).is_none());
    }

    #[test]
    fn failure_diagnostics_include_error_log_tail() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(API_ERROR_LOG), "bind: address in use\n").unwrap();

        let message = spawn_failure(dir.path(), Some(1));
        assert!(message.contains("exited with code 1"));
        assert!(message.contains("address in use"));
    }
}
