use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

const RUN_TIMEOUT: Duration = Duration::from_secs(60);
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured outcome of one CLI invocation. Non-zero exit is data here, not
/// an error; the caller decides how to surface it.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Sse,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Sse => "sse",
        }
    }
}

/// Arguments for `thv run`, mirroring the CLI flag surface.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOptions {
    pub server_name: String,
    pub name: Option<String>,
    pub transport: Option<Transport>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub target_port: Option<u16>,
    pub target_host: Option<String>,
    pub permission_profile: Option<String>,
    #[serde(default)]
    pub foreground: bool,
    #[serde(default)]
    pub detach: bool,
    #[serde(default)]
    pub env_vars: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl RunOptions {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string()];

        if let Some(name) = &self.name {
            args.extend(["--name".to_string(), name.clone()]);
        }
        if let Some(transport) = &self.transport {
            args.extend(["--transport".to_string(), transport.as_str().to_string()]);
        }
        if let Some(port) = self.port {
            args.extend(["--port".to_string(), port.to_string()]);
        }
        if let Some(host) = &self.host {
            args.extend(["--host".to_string(), host.clone()]);
        }
        if let Some(port) = self.target_port {
            args.extend(["--target-port".to_string(), port.to_string()]);
        }
        if let Some(host) = &self.target_host {
            args.extend(["--target-host".to_string(), host.clone()]);
        }
        if let Some(profile) = &self.permission_profile {
            args.extend(["--permission-profile".to_string(), profile.clone()]);
        }
        if self.foreground {
            args.push("--foreground".to_string());
        }
        if self.detach {
            args.push("--detach".to_string());
        }
        for env_var in &self.env_vars {
            args.extend(["-e".to_string(), env_var.clone()]);
        }
        for volume in &self.volumes {
            args.extend(["-v".to_string(), volume.clone()]);
        }
        for secret in &self.secrets {
            args.extend(["--secret".to_string(), secret.clone()]);
        }

        args.push(self.server_name.clone());

        if !self.args.is_empty() {
            args.push("--".to_string());
            args.extend(self.args.iter().cloned());
        }

        args
    }
}

/// Runner for `thv` subcommands (and `docker logs`), with a hard deadline
/// per invocation.
pub struct CliRunner {
    path: PathBuf,
}

impl CliRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.cli_path.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `thv run ...`, starts a container-backed server in ToolHive.
    pub fn run_server(&self, options: &RunOptions) -> Result<CmdOutput> {
        self.run(&self.path, &options.to_args(), RUN_TIMEOUT)
    }

    /// `thv rm <name> [--force]`
    pub fn remove_server(&self, name: &str, force: bool) -> Result<CmdOutput> {
        let mut args = vec!["rm".to_string(), name.to_string()];
        if force {
            args.push("--force".to_string());
        }
        self.run(&self.path, &args, RUN_TIMEOUT)
    }

    /// `thv registry list --format json`, parsed; non-JSON stdout degrades
    /// to a raw-text envelope.
    pub fn registry_list(&self) -> Result<Value> {
        let args: Vec<String> = ["registry", "list", "--format", "json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = self.run(&self.path, &args, QUERY_TIMEOUT)?;

        if !output.success() {
            return Err(failed(&output));
        }

        Ok(serde_json::from_str(&output.stdout).unwrap_or_else(|_| {
            json!({ "raw_output": output.stdout, "format": "text" })
        }))
    }

    /// `thv registry info <name> --format json`
    pub fn registry_info(&self, name: &str) -> Result<Value> {
        let args = vec![
            "registry".to_string(),
            "info".to_string(),
            name.to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        let output = self.run(&self.path, &args, QUERY_TIMEOUT)?;

        if !output.success() {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        }
        Ok(serde_json::from_str(&output.stdout)?)
    }

    /// `thv search <query> --format <fmt>`
    pub fn search(&self, query: &str, format: &str) -> Result<CmdOutput> {
        let args = vec![
            "search".to_string(),
            query.to_string(),
            "--format".to_string(),
            format.to_string(),
        ];
        self.run(&self.path, &args, QUERY_TIMEOUT)
    }

    /// `docker logs --tail <lines> <name>`. ToolHive exposes no log
    /// endpoint, so this goes straight to the container runtime.
    pub fn server_logs(&self, name: &str, lines: u32) -> Result<CmdOutput> {
        let args = vec![
            "logs".to_string(),
            "--tail".to_string(),
            lines.to_string(),
            name.to_string(),
        ];
        self.run(Path::new("docker"), &args, QUERY_TIMEOUT)
    }

    fn run(&self, program: &Path, args: &[String], timeout: Duration) -> Result<CmdOutput> {
        let command_line = format!("{} {}", program.display(), args.join(" "));
        debug!(command = %command_line, "running CLI command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::CliNotFound(program.to_path_buf())
                } else {
                    Error::Io(e)
                }
            })?;

        wait_with_deadline(child, command_line, timeout)
    }
}

fn failed(output: &CmdOutput) -> Error {
    Error::CliFailed {
        command: output.command.clone(),
        code: output.exit_code,
        stderr: output.stderr.clone(),
    }
}

fn wait_with_deadline(mut child: Child, command: String, timeout: Duration) -> Result<CmdOutput> {
    // Drain pipes on threads so a chatty child cannot deadlock the wait.
    let stdout = reader_thread(child.stdout.take());
    let stderr = reader_thread(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::CliTimeout { command, timeout });
        }
        std::thread::sleep(Duration::from_millis(25));
    };

    Ok(CmdOutput {
        command,
        exit_code: status.code().unwrap_or(-1),
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

fn reader_thread(
    pipe: Option<impl Read + Send + 'static>,
) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(path: &str) -> CliRunner {
        let config = Config {
            cli_path: PathBuf::from(path),
            ..Config::default()
        };
        CliRunner::new(&config)
    }

    #[test]
    fn run_args_minimal() {
        let options = RunOptions {
            server_name: "github".to_string(),
            ..RunOptions::default()
        };
        assert_eq!(options.to_args(), vec!["run", "github"]);
    }

    #[test]
    fn run_args_full_flag_surface() {
        let options = RunOptions {
            server_name: "fetch".to_string(),
            name: Some("my-fetch".to_string()),
            transport: Some(Transport::Sse),
            port: Some(8123),
            host: Some("127.0.0.1".to_string()),
            target_port: Some(9000),
            target_host: Some("0.0.0.0".to_string()),
            permission_profile: Some("network".to_string()),
            foreground: false,
            detach: true,
            env_vars: vec!["A=1".to_string(), "B=2".to_string()],
            volumes: vec!["/data:/data:ro".to_string()],
            secrets: vec!["tok,target=GITHUB_TOKEN".to_string()],
            args: vec!["--verbose".to_string()],
        };

        assert_eq!(
            options.to_args(),
            vec![
                "run",
                "--name", "my-fetch",
                "--transport", "sse",
                "--port", "8123",
                "--host", "127.0.0.1",
                "--target-port", "9000",
                "--target-host", "0.0.0.0",
                "--permission-profile", "network",
                "--detach",
                "-e", "A=1",
                "-e", "B=2",
                "-v", "/data:/data:ro",
                "--secret", "tok,target=GITHUB_TOKEN",
                "fetch",
                "--", "--verbose",
            ]
        );
    }

    #[test]
    fn transport_deserializes_lowercase_only() {
        assert_eq!(
            serde_json::from_str::<Transport>("\"stdio\"").unwrap(),
            Transport::Stdio
        );
        assert_eq!(
            serde_json::from_str::<Transport>("\"sse\"").unwrap(),
            Transport::Sse
        );
        assert!(serde_json::from_str::<Transport>("\"http\"").is_err());
    }

    #[test]
    fn missing_binary_maps_to_cli_not_found() {
        let runner = runner("/nonexistent/path/to/thv");
        let err = runner.registry_list().unwrap_err();
        assert!(matches!(err, Error::CliNotFound(_)), "got: {err}");
    }

    #[test]
    fn missing_executable_error_names_the_program() {
        // Holds for docker just as for thv; nothing CLI-specific leaks in.
        let err = Error::CliNotFound(PathBuf::from("docker"));
        assert_eq!(err.to_string(), "command not found: docker");
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_streams() {
        let runner = runner("thv");
        let output = runner
            .run(
                Path::new("sh"),
                &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()],
                Duration::from_secs(5),
            )
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn deadline_kills_the_child() {
        let runner = runner("thv");
        let err = runner
            .run(
                Path::new("sleep"),
                &["30".to_string()],
                Duration::from_millis(200),
            )
            .unwrap_err();
        assert!(matches!(err, Error::CliTimeout { .. }), "got: {err}");
    }
}
