use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_FILE: &str = "toolhive.env";

const DEFAULT_API_BASE: &str = "http://localhost:8080";
const DEFAULT_CLI_PATH: &str = "thv";

/// Process-wide configuration, read once at startup. Environment variables
/// win over entries in `toolhive.env`; nothing re-reads the environment
/// after construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub cli_path: PathBuf,
    pub auto_start_api: bool,
    pub log_level: String,
    /// Default deadline for API requests that have no tighter bound.
    pub http_timeout: Duration,
    /// Total time budget for the spawned API daemon to become healthy.
    pub startup_timeout: Duration,
    pub startup_retries: u32,
    /// Extra arguments appended to `thv serve`.
    pub api_args: Vec<String>,
    /// Where the spawned daemon's stdout/stderr land.
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            cli_path: PathBuf::from(DEFAULT_CLI_PATH),
            auto_start_api: true,
            log_level: "error".to_string(),
            http_timeout: Duration::from_secs(30),
            startup_timeout: Duration::from_secs(10),
            startup_retries: 5,
            api_args: Vec::new(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let file = load_env_file(Path::new(ENV_FILE));
        Self::from_lookup(|key| env::var(key).ok().or_else(|| file.get(key).cloned()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            api_base: lookup("TOOLHIVE_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            cli_path: lookup("TOOLHIVE_CLI_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cli_path),
            auto_start_api: lookup("TOOLHIVE_AUTO_START_API")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.auto_start_api),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            http_timeout: secs("TOOLHIVE_TIMEOUT", defaults.http_timeout),
            startup_timeout: secs("TOOLHIVE_API_STARTUP_TIMEOUT", defaults.startup_timeout),
            startup_retries: lookup("TOOLHIVE_API_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.startup_retries),
            api_args: lookup("TOOLHIVE_API_CONFIG")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            log_dir: defaults.log_dir,
        }
    }

    /// Host and port of the API base, for `thv serve --host H --port P`.
    pub fn host_port(&self) -> (String, u16) {
        match reqwest::Url::parse(&self.api_base) {
            Ok(url) => (
                url.host_str().unwrap_or("127.0.0.1").to_string(),
                url.port_or_known_default().unwrap_or(8080),
            ),
            Err(_) => ("127.0.0.1".to_string(), 8080),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Minimal KEY=VALUE parser for `toolhive.env`. Lines starting with `#`
/// and lines without `=` are skipped. A missing file is an empty map.
fn load_env_file(path: &Path) -> HashMap<String, String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.api_base, "http://localhost:8080");
        assert_eq!(config.cli_path, PathBuf::from("thv"));
        assert!(config.auto_start_api);
        assert_eq!(config.log_level, "error");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.startup_retries, 5);
        assert!(config.api_args.is_empty());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("TOOLHIVE_API_BASE", "http://10.0.0.5:9090/"),
            ("TOOLHIVE_CLI_PATH", "/usr/local/bin/thv"),
            ("TOOLHIVE_AUTO_START_API", "FALSE"),
            ("LOG_LEVEL", "debug"),
            ("TOOLHIVE_TIMEOUT", "5"),
            ("TOOLHIVE_API_CONFIG", "--debug --secret-store none"),
        ]));

        assert_eq!(config.api_base, "http://10.0.0.5:9090");
        assert_eq!(config.cli_path, PathBuf::from("/usr/local/bin/thv"));
        assert!(!config.auto_start_api);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(
            config.api_args,
            vec!["--debug", "--secret-store", "none"]
        );
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("TOOLHIVE_TIMEOUT", "soon"),
            ("TOOLHIVE_API_RETRIES", "-1"),
        ]));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.startup_retries, 5);
    }

    #[test]
    fn host_port_from_base_url() {
        let mut config = Config::default();
        assert_eq!(config.host_port(), ("localhost".to_string(), 8080));

        config.api_base = "http://192.168.1.4:9001".to_string();
        assert_eq!(config.host_port(), ("192.168.1.4".to_string(), 9001));

        config.api_base = "http://example.test".to_string();
        assert_eq!(config.host_port(), ("example.test".to_string(), 80));

        config.api_base = "not a url".to_string();
        assert_eq!(config.host_port(), ("127.0.0.1".to_string(), 8080));
    }

    #[test]
    fn env_file_parsing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("toolhive.env");
        fs::write(
            &path,
            "# ToolHive MCP Server Configuration\n\
             TOOLHIVE_API_BASE=http://localhost:8080\n\
             TOOLHIVE_CLI_PATH = thv\n\
             \n\
             garbage line\n\
             LOG_LEVEL=warn\n",
        )
        .unwrap();

        let map = load_env_file(&path);
        assert_eq!(map.len(), 3);
        assert_eq!(map["TOOLHIVE_API_BASE"], "http://localhost:8080");
        assert_eq!(map["TOOLHIVE_CLI_PATH"], "thv");
        assert_eq!(map["LOG_LEVEL"], "warn");
    }

    #[test]
    fn env_file_missing_is_empty() {
        let map = load_env_file(Path::new("/definitely/not/here/toolhive.env"));
        assert!(map.is_empty());
    }

    #[test]
    fn bool_parsing_is_case_insensitive() {
        assert!(parse_bool("true"));
        assert!(parse_bool("True"));
        assert!(parse_bool(" TRUE "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("1"));
        assert!(!parse_bool("yes"));
    }
}
