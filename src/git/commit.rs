use super::hash::Hash;
use super::iter::Series;
use chrono::{DateTime, Utc};

/// Iterator over commits, oldest first
pub type CommitIter = Series<Commit>;

/// Iterator over the files touched by a commit
pub type FileIter = Series<File>;

/// Who created a commit and when
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub name: String,
    /// Not guaranteed to be well-formed
    pub email: String,
    pub when: DateTime<Utc>,
}

/// Full content of a path as of a commit.
///
/// A deletion is a file with empty contents and size 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct File {
    /// Path relative to the repository root
    pub name: String,
    pub size: u64,
    contents: String,
}

impl File {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        let contents = contents.into();
        Self {
            name: name.into(),
            size: contents.len() as u64,
            contents,
        }
    }

    pub(crate) fn with_size(name: impl Into<String>, size: u64, contents: String) -> Self {
        Self {
            name: name.into(),
            size,
            contents,
        }
    }

    /// Tombstone for a path that no longer exists
    pub fn deleted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            contents: String::new(),
        }
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn is_deleted(&self) -> bool {
        self.size == 0 && self.contents.is_empty()
    }
}

/// A commit with an independent snapshot of every file it touched
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Commit {
    pub hash: Hash,
    pub author: Signature,
    /// May differ from the author
    pub committer: Signature,
    pub message: String,
    files: Vec<File>,
}

impl Commit {
    pub fn new(
        hash: Hash,
        author: Signature,
        committer: Signature,
        message: impl Into<String>,
        files: Vec<File>,
    ) -> Self {
        Self {
            hash,
            author,
            committer,
            message: message.into(),
            files,
        }
    }

    pub fn files(&self) -> FileIter {
        Series::new(self.files.clone())
    }

    pub fn file_list(&self) -> &[File] {
        &self.files
    }

    /// First line of the message
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}
