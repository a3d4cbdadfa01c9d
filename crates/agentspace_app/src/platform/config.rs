use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agentspace_engine::{BackendSettings, EngineSettings, StreamSettings};
use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;

/// Looked up in the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "agentspace.ron";

const STREAM_PATH: &str = "agent-space/agent_space_chat_stream";

#[derive(Debug, Parser)]
#[command(name = "agentspace")]
#[command(about = "Terminal client for an agent-space chat backend")]
#[command(version)]
pub struct Cli {
    /// RON config file (defaults to ./agentspace.ron when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Resume an existing conversation
    #[arg(long, conflicts_with = "resume")]
    pub thread: Option<String>,

    /// Resume the conversation used last time
    #[arg(long)]
    pub resume: bool,

    /// Sign in as this user
    #[arg(long)]
    pub user: Option<String>,

    /// Address submissions to this agent
    #[arg(long)]
    pub agent: Option<String>,

    /// Organization of the agent
    #[arg(long, requires = "agent")]
    pub org: Option<String>,

    /// Backend base URL, e.g. http://127.0.0.1:5001
    #[arg(long, env = "AGENTSPACE_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Chat stream WebSocket URL (derived from the backend URL by default)
    #[arg(long, env = "AGENTSPACE_WS_URL")]
    pub ws_url: Option<String>,

    /// Where downloaded files are written
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// trace, debug, info, warn, error or off
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid backend url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub ws_url: Option<String>,
    pub download_dir: PathBuf,
    pub state_dir: PathBuf,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_download_bytes: u64,
    pub log_level: String,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5001".to_string(),
            ws_url: None,
            download_dir: PathBuf::from("downloads"),
            state_dir: PathBuf::from("."),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            max_download_bytes: 20 * 1024 * 1024,
            log_level: "info".to_string(),
            log_destination: LogDestination::File,
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file, then environment and flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.backend_url {
            self.backend_url = url.clone();
        }
        if let Some(url) = &cli.ws_url {
            self.ws_url = Some(url.clone());
        }
        if let Some(dir) = &cli.download_dir {
            self.download_dir = dir.clone();
        }
        if let Some(level) = &cli.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    /// The explicit stream URL, or the backend URL with `ws`/`wss` scheme and the stream path.
    pub fn stream_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = self.ws_url.as_deref().filter(|url| !url.is_empty()) {
            return Ok(url.to_string());
        }

        let invalid = |message: &str| ConfigError::InvalidUrl {
            url: self.backend_url.clone(),
            message: message.to_string(),
        };
        let (scheme, rest) = self
            .backend_url
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" => "ws",
            "https" => "wss",
            _ => return Err(invalid("scheme must be http or https")),
        };
        if rest.is_empty() {
            return Err(invalid("missing host"));
        }
        Ok(format!(
            "{ws_scheme}://{}/{STREAM_PATH}",
            rest.trim_end_matches('/')
        ))
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        let connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        Ok(EngineSettings {
            backend: BackendSettings {
                base_url: self.backend_url.clone(),
                connect_timeout,
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                max_download_bytes: self.max_download_bytes,
            },
            stream: StreamSettings {
                url: self.stream_url()?,
                connect_timeout,
            },
            download_dir: self.download_dir.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["agentspace"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid args")
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("agentspace.ron");
        fs::write(
            &path,
            r#"(backend_url: "https://agents.example.com", log_destination: Both)"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.backend_url, "https://agents.example.com");
        assert_eq!(config.log_destination, LogDestination::Both);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.ron");
        let cli = cli(&["--config", missing.to_str().unwrap()]);

        assert!(matches!(
            AppConfig::load(&cli),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.ron");
        fs::write(&path, "(backend_url: 42").unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn flags_override_file_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("agentspace.ron");
        fs::write(&path, r#"(backend_url: "http://file:1", log_level: "warn")"#).unwrap();
        let cli = cli(&[
            "--config",
            path.to_str().unwrap(),
            "--backend-url",
            "http://flag:2",
            "--log-level",
            "debug",
        ]);

        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.backend_url, "http://flag:2");
        assert_eq!(config.log_level().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn stream_url_is_derived_from_backend_url() {
        let config = AppConfig::default();
        assert_eq!(
            config.stream_url().unwrap(),
            "ws://127.0.0.1:5001/agent-space/agent_space_chat_stream"
        );

        let secure = AppConfig {
            backend_url: "https://agents.example.com/".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(
            secure.stream_url().unwrap(),
            "wss://agents.example.com/agent-space/agent_space_chat_stream"
        );
    }

    #[test]
    fn explicit_stream_url_wins() {
        let config = AppConfig {
            ws_url: Some("ws://elsewhere:9/socket".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.stream_url().unwrap(), "ws://elsewhere:9/socket");
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let config = AppConfig {
            backend_url: "ftp://host".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.stream_url(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn invalid_log_level_is_reported() {
        let config = AppConfig {
            log_level: "chatty".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.log_level(),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn org_requires_agent() {
        assert!(Cli::try_parse_from(["agentspace", "--org", "acme"]).is_err());
        assert!(Cli::try_parse_from(["agentspace", "--thread", "t", "--resume"]).is_err());
    }
}
