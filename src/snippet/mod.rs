//! Snippet model: region-tagged code samples and their version history
//!
//! A [`Snippet`] is the cross-commit identity of one region tag in one
//! language. Its [`SnippetVersion`]s are appended as the tagged region changes,
//! moves or disappears while walking a branch's history.

pub mod extractor;
pub mod language;
pub mod metadata;
pub mod versioning;

pub use extractor::{detect_region_tags, extract_snippet_versions, is_valid_file};
pub use language::{clean_language, detect_language};
pub use metadata::{SampleMeta, SampleMetadata, SnippetMetaRef, parse_sample_metadata};
pub use versioning::calculate_snippets;

use crate::git::Commit;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// `owners/<owner>/repositories/<repo>/snippets/<tag>/languages/<LANG>`
pub fn snippet_name(owner: &str, repo: &str, tag: &str, language: &str) -> String {
    format!("owners/{owner}/repositories/{repo}/snippets/{tag}/languages/{language}")
}

/// `owners/<owner>/repositories/<repo>/gitCommits/<sha>`
pub fn git_commit_name(owner: &str, repo: &str, sha: &str) -> String {
    format!("owners/{owner}/repositories/{repo}/gitCommits/{sha}")
}

/// Flattened view of a commit, shared by every snippet version it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitCommit {
    /// Full message including the subject line
    pub body: String,
    pub subject: String,
    pub author_email: String,
    pub authored_time: DateTime<Utc>,
    pub committer_email: String,
    pub committed_time: DateTime<Utc>,
    pub hash: String,
    /// Fully qualified name, see [`git_commit_name`]
    pub name: String,
}

impl GitCommit {
    pub fn from_commit(owner: &str, repo: &str, commit: &Commit) -> Self {
        let hash = commit.hash.to_string();
        Self {
            body: commit.message.clone(),
            subject: commit.subject().to_string(),
            author_email: commit.author.email.clone(),
            authored_time: commit.author.when,
            committer_email: commit.committer.email.clone(),
            committed_time: commit.committer.when,
            name: git_commit_name(owner, repo, &hash),
            hash,
        }
    }
}

/// The file a snippet version was read from, as of one commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetFile {
    pub file_path: String,
    pub git_commit: Arc<GitCommit>,
    pub size: u64,
}

/// Documentation attached through a `sample-metadata:` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnippetVersionMeta {
    pub title: String,
    pub description: String,
    pub usage: String,
    pub api_version: String,
}

/// The content of a snippet at one point in history.
///
/// A tombstone has empty `lines` and `content` and a `file` pointing at the
/// commit that removed the region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnippetVersion {
    /// `<snippet-name>/<index>` once appended to a snippet
    pub name: String,
    pub file: Option<SnippetFile>,
    /// `L<start>-L<end>` for every region, in file order
    pub lines: Vec<String>,
    pub content: String,
    pub meta: SnippetVersionMeta,
}

impl SnippetVersion {
    /// Same content, same file path and same line ranges.
    ///
    /// Two versions without a file are equivalent when their content matches.
    pub fn equivalent(&self, other: &SnippetVersion) -> bool {
        if self.content != other.content {
            return false;
        }
        match (&self.file, &other.file) {
            (None, None) => true,
            (Some(a), Some(b)) => a.file_path == b.file_path && self.lines == other.lines,
            _ => false,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.content.is_empty() && self.lines.is_empty()
    }
}

/// A region tag tracked across history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    /// See [`snippet_name`]
    pub name: String,
    pub language: String,
    /// Append-only, oldest first
    pub versions: Vec<SnippetVersion>,
}

impl Snippet {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            versions: Vec::new(),
        }
    }

    /// The most recently accepted version
    pub fn primary(&self) -> Option<&SnippetVersion> {
        self.versions.last()
    }

    /// Whether the region exists at the tip of the history walked
    pub fn is_live(&self) -> bool {
        self.primary().is_some_and(|v| !v.is_tombstone())
    }
}
