/// Configuration system for samplr
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, SamplrError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// How git is invoked
    #[serde(default)]
    pub git: GitConfig,

    /// Which repositories are watched and how often
    #[serde(default)]
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Git invocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Path or name of the git executable
    #[serde(default = "default_git_binary")]
    pub binary: String,

    /// Shell used to run the history pipeline
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Remote pulled from on every update
    #[serde(default = "default_remote_name")]
    pub remote_name: String,
}

/// Corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Seconds to wait after a successful update before polling again
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Directory holding one clone per tracked repository
    #[serde(default = "default_clone_root")]
    pub clone_root: PathBuf,

    /// JSON list of repositories to track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repos_file: Option<PathBuf>,

    /// Branch to follow when a repository does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log at debug level instead of info
    #[serde(default)]
    pub verbose: bool,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_remote_name() -> String {
    crate::git::REMOTE_ORIGIN_NAME.to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_clone_root() -> PathBuf {
    crate::paths::PlatformPaths::default_clone_root()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
            shell: default_shell(),
            remote_name: default_remote_name(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            clone_root: default_clone_root(),
            repos_file: None,
            default_branch: None,
        }
    }
}

impl CorpusConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, SamplrError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, SamplrError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), SamplrError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), SamplrError> {
        for (key, value) in [
            ("git.binary", &self.git.binary),
            ("git.shell", &self.git.shell),
            ("git.remote_name", &self.git.remote_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must not be empty".to_string(),
                }
                .into());
            }
        }

        if self.corpus.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "corpus.poll_interval_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.corpus.clone_root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "corpus.clone_root".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if let Some(branch) = &self.corpus.default_branch
            && (branch.is_empty() || branch.starts_with("refs/"))
        {
            return Err(ConfigError::InvalidValue {
                key: "corpus.default_branch".to_string(),
                reason: format!("must be a short branch name, got '{}'", branch),
            }
            .into());
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(binary) = std::env::var("SAMPLR_GIT_BINARY") {
            self.git.binary = binary;
        }

        if let Ok(shell) = std::env::var("SAMPLR_SHELL") {
            self.git.shell = shell;
        }

        if let Ok(remote) = std::env::var("SAMPLR_REMOTE_NAME") {
            self.git.remote_name = remote;
        }

        if let Ok(root) = std::env::var("SAMPLR_CLONE_ROOT") {
            self.corpus.clone_root = PathBuf::from(root);
        }

        if let Ok(file) = std::env::var("SAMPLR_REPOS_FILE") {
            self.corpus.repos_file = Some(PathBuf::from(file));
        }

        if let Ok(branch) = std::env::var("SAMPLR_DEFAULT_BRANCH") {
            self.corpus.default_branch = Some(branch);
        }

        if let Ok(interval) = std::env::var("SAMPLR_POLL_INTERVAL_SECS")
            && let Ok(secs) = interval.parse()
        {
            self.corpus.poll_interval_secs = secs;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, SamplrError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
