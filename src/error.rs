/// Centralized error types for samplr using thiserror
///
/// Git plumbing, snippet extraction, configuration and corpus orchestration each
/// get their own enum; `SamplrError` ties them together for callers that do not
/// care which layer failed.
use thiserror::Error;

/// Main error type for samplr
#[derive(Error, Debug)]
pub enum SamplrError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while shelling out to git or reading the work tree
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with status {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("'{0}' was cancelled")]
    Cancelled(String),

    #[error("Repository does not exist: {0}")]
    RepositoryNotExists(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Background git task failed: {0}")]
    Join(String),
}

/// Errors raised while pulling region tags out of a single file
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Malformed sample-metadata block: {0}")]
    Metadata(#[from] serde_yaml::Error),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to the corpus of watched repositories
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("multiple calls to initialize")]
    AlreadyInitialized,

    #[error("can't sync while already syncing")]
    AlreadySyncing,

    #[error("Not a GitHub repository URL: {0}")]
    InvalidRepositoryUrl(String),

    #[error("Failed to load repository list '{path}': {reason}")]
    RepoListFailed { path: String, reason: String },
}

impl From<anyhow::Error> for SamplrError {
    fn from(err: anyhow::Error) -> Self {
        SamplrError::Other(format!("{:#}", err))
    }
}

impl SamplrError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        SamplrError::Other(msg.into())
    }

    /// Whether the error came from a cancelled operation rather than a real failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SamplrError::Git(GitError::Cancelled(_)))
    }
}

pub type Result<T, E = SamplrError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = GitError::CommandFailed {
            command: "git fetch".to_string(),
            code: Some(128),
            stderr: "fatal: not a git repository".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'git fetch' exited with status Some(128): fatal: not a git repository"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SamplrError = io_err.into();
        assert!(matches!(err, SamplrError::Io(_)));
    }

    #[test]
    fn test_error_chain() {
        let err: SamplrError = GitError::RepositoryNotExists("/tmp/nope".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Git error: Repository does not exist: /tmp/nope"
        );
    }

    #[test]
    fn test_is_cancelled() {
        let err: SamplrError = GitError::Cancelled("git pull".to_string()).into();
        assert!(err.is_cancelled());
        assert!(!SamplrError::other("boom").is_cancelled());
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: SamplrError = anyhow::anyhow!("test error").into();
        assert!(matches!(err, SamplrError::Other(_)));
    }

    #[test]
    fn test_corpus_error_display() {
        assert_eq!(
            CorpusError::AlreadyInitialized.to_string(),
            "multiple calls to initialize"
        );
    }
}
