//! # samplr - versioned region-tagged code samples from git history
//!
//! samplr clones the repositories it is asked to watch, walks the full commit
//! history of each one's tracked branch and derives a catalog of *snippets*:
//! regions of source files delimited by `[START tag]` / `[END tag]` markers,
//! together with every distinct version each region went through.
//!
//! ## Architecture
//!
//! ```text
//! Corpus ──► WatchedRepository::update ──► Repository::branches / log
//!                     │                               │
//!                     │                     git executable (ProcessRunner)
//!                     ▼
//!          calculate_snippets(commits) ──► Snippet / GitCommit collections
//! ```
//!
//! ## Modules
//!
//! - [`git`]: plumbing over the `git` executable (refs, remotes, fetch, pull, history)
//! - [`snippet`]: region extraction, language detection and the versioning walk
//! - [`corpus`]: watched repositories and the polling registry
//! - [`repos`]: tracked repository descriptions and routing names
//! - [`config`]: configuration management with environment variable support
//! - [`error`]: error types and result aliases
//! - [`paths`]: platform-specific default locations
//!
//! ## Usage Example
//!
//! ```no_run
//! use samplr::corpus::Corpus;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let corpus = Corpus::new("/var/lib/samplr/repos");
//!     let cancel = CancellationToken::new();
//!
//!     corpus
//!         .track_git("https://github.com/GoogleCloudPlatform/golang-samples", &cancel)
//!         .await?;
//!     corpus.initialize(&cancel).await?;
//!     corpus.sync(&cancel).await?;
//!     Ok(())
//! }
//! ```

/// Configuration management with environment variable overrides
pub mod config;

/// Watched repositories and the registry that keeps them in sync
pub mod corpus;

/// Error types and utilities
pub mod error;

/// Git plumbing built on the git executable
pub mod git;

/// Platform-specific default paths
pub mod paths;

/// Tracked repository descriptions and per-repository service names
pub mod repos;

/// Snippet model, extraction and versioning
pub mod snippet;
