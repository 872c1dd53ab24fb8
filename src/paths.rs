/// Platform-specific locations for samplr's config and clones
///
/// Follows the XDG Base Directory specification on Unix-like systems and the
/// usual per-user directories elsewhere.
use std::path::PathBuf;

const PROJECT_DIR: &str = "samplr";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Directory for large per-user data
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_DATA_HOME or ~/.local/share
    pub fn data_dir() -> PathBuf {
        if cfg!(unix) && !cfg!(target_os = "macos") {
            if let Some(dir) = std::env::var_os("XDG_DATA_HOME").filter(|d| !d.is_empty()) {
                return PathBuf::from(dir);
            }
        }
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Directory for per-user configuration
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        if cfg!(unix) && !cfg!(target_os = "macos") {
            if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
                return PathBuf::from(dir);
            }
        }
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {data_dir}/samplr
    pub fn project_data_dir() -> PathBuf {
        Self::data_dir().join(PROJECT_DIR)
    }

    /// Returns: {config_dir}/samplr
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(PROJECT_DIR)
    }

    /// Where tracked repositories are cloned, one directory per repository
    ///
    /// Returns: {data_dir}/samplr/repos
    pub fn default_clone_root() -> PathBuf {
        Self::project_data_dir().join("repos")
    }

    /// Returns: {config_dir}/samplr/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}
