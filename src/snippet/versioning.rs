//! Turns a commit stream into per-snippet version histories
//!
//! Every commit goes through three passes, in order:
//!
//! 1. deleted files tombstone every snippet last seen in them
//! 2. touched files tombstone every snippet last seen in them that is gone
//! 3. every extracted version is appended unless equivalent to the primary
//!
//! `seen[path][snippet]` records whether a snippet's primary currently lives
//! in `path`. Files that a commit does not touch keep their snippets as-is.

use super::extractor::{extract_snippet_versions, is_valid_file};
use super::language::{clean_language, detect_language};
use super::{GitCommit, Snippet, SnippetFile, SnippetVersion, snippet_name};
use crate::error::ExtractionError;
use crate::git::{Commit, CommitIter};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::sync::Arc;

/// Walk `commits` in order and return every snippet with at least one
/// version, sorted by name.
pub fn calculate_snippets(
    owner: &str,
    repo: &str,
    mut commits: CommitIter,
) -> Result<Vec<Snippet>, ExtractionError> {
    tracing::debug!("Calculating snippets for: {}/{}", owner, repo);

    let mut catalog = SnippetCatalog::new(owner, repo);
    commits.visit(|commit| -> Result<_, ExtractionError> {
        catalog.apply_commit(commit)?;
        Ok(ControlFlow::Continue(()))
    })?;

    let snippets = catalog.into_snippets();
    tracing::debug!(
        "For repository: {}/{}, returning {} snippets",
        owner,
        repo,
        snippets.len()
    );
    Ok(snippets)
}

/// One whitelisted, non-deleted file of a commit and the versions found in it
#[derive(Debug)]
struct FileRecord {
    file: SnippetFile,
    language: String,
    /// Keyed by snippet name
    versions: BTreeMap<String, SnippetVersion>,
}

/// Running state of the walk
#[derive(Debug, Default)]
pub(crate) struct SnippetCatalog {
    owner: String,
    repo: String,
    snippets: BTreeMap<String, Snippet>,
    seen: BTreeMap<String, BTreeMap<String, bool>>,
}

impl SnippetCatalog {
    pub(crate) fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn apply_commit(&mut self, commit: &Commit) -> Result<(), ExtractionError> {
        let cmt = Arc::new(GitCommit::from_commit(&self.owner, &self.repo, commit));

        let mut records = Vec::new();
        let mut deleted = BTreeSet::new();

        for file in commit.file_list() {
            tracing::trace!("Processing commit: {}, file: {}", cmt.hash, file.name);
            if !is_valid_file(&file.name) {
                continue;
            }
            if file.is_deleted() {
                tracing::debug!("Processing commit: {} file deleted: {}", cmt.hash, file.name);
                deleted.insert(file.name.clone());
                continue;
            }

            let language = clean_language(
                &detect_language(&file.name, file.contents()).unwrap_or_default(),
            );
            let versions = extract_snippet_versions(file.contents(), |tag| {
                snippet_name(&self.owner, &self.repo, tag, &language)
            })?
            .into_values()
            .map(|v| (v.name.clone(), v))
            .collect();

            records.push(FileRecord {
                file: SnippetFile {
                    file_path: file.name.clone(),
                    git_commit: Arc::clone(&cmt),
                    size: file.size,
                },
                language,
                versions,
            });
        }

        // Snippets that live on in some file of this commit are moving, not dying
        let produced: BTreeSet<String> = records
            .iter()
            .flat_map(|r| r.versions.keys().cloned())
            .collect();

        self.process_deleted_files(&cmt, &deleted, &produced);
        self.process_previously_seen(&cmt, &records, &produced);
        self.process_versions_in_commit(records);
        Ok(())
    }

    fn process_deleted_files(
        &mut self,
        cmt: &Arc<GitCommit>,
        deleted: &BTreeSet<String>,
        produced: &BTreeSet<String>,
    ) {
        for path in deleted {
            let Some(seen_here) = self.seen.get_mut(path) else {
                continue;
            };
            for (name, seen) in seen_here.iter_mut().filter(|(_, seen)| **seen) {
                let Some(snippet) = self.snippets.get_mut(name) else {
                    tracing::warn!(
                        "Processing commit: {} snippet {} was seen, but is not in the catalog",
                        cmt.hash,
                        name
                    );
                    continue;
                };
                *seen = false;
                if produced.contains(name) {
                    continue;
                }

                tracing::debug!(
                    "Processing commit: {} file {} was deleted, adding a delete record for {}",
                    cmt.hash,
                    path,
                    name
                );
                push_tombstone(snippet, path, 0, cmt);
            }
        }
    }

    fn process_previously_seen(
        &mut self,
        cmt: &Arc<GitCommit>,
        records: &[FileRecord],
        produced: &BTreeSet<String>,
    ) {
        for (path, seen_here) in self.seen.iter_mut() {
            let touched: Vec<&FileRecord> =
                records.iter().filter(|r| &r.file.file_path == path).collect();
            // untouched files keep their snippets
            let Some(first) = touched.first() else {
                continue;
            };

            for (name, seen) in seen_here.iter_mut().filter(|(_, seen)| **seen) {
                if touched.iter().any(|r| r.versions.contains_key(name)) {
                    continue;
                }
                let Some(snippet) = self.snippets.get_mut(name) else {
                    continue;
                };
                *seen = false;
                if produced.contains(name) {
                    continue;
                }

                tracing::debug!(
                    "Processing commit: {} snippet {} is gone from {}, adding a delete record",
                    cmt.hash,
                    name,
                    path
                );
                push_tombstone(snippet, path, first.file.size, cmt);
            }
        }
    }

    fn process_versions_in_commit(&mut self, records: Vec<FileRecord>) {
        for record in records {
            let seen_here = self.seen.entry(record.file.file_path.clone()).or_default();

            for (name, mut version) in record.versions {
                let snippet = self
                    .snippets
                    .entry(name.clone())
                    .or_insert_with(|| Snippet::new(name.clone(), record.language.clone()));

                version.file = Some(record.file.clone());
                version.name = format!("{}/{}", name, snippet.versions.len());

                if snippet.primary().is_some_and(|p| p.equivalent(&version)) {
                    continue;
                }

                tracing::debug!(
                    "Processing commit: {} adding snippet version {}",
                    record.file.git_commit.hash,
                    version.name
                );
                snippet.versions.push(version);
                seen_here.insert(name, true);
            }
        }
    }

    pub(crate) fn into_snippets(self) -> Vec<Snippet> {
        self.snippets
            .into_values()
            .filter(|s| !s.versions.is_empty())
            .collect()
    }
}

fn push_tombstone(snippet: &mut Snippet, path: &str, size: u64, cmt: &Arc<GitCommit>) {
    let name = format!("{}/{}", snippet.name, snippet.versions.len());
    snippet.versions.push(SnippetVersion {
        name,
        file: Some(SnippetFile {
            file_path: path.to_string(),
            git_commit: Arc::clone(cmt),
            size,
        }),
        lines: Vec::new(),
        content: String::new(),
        meta: Default::default(),
    });
}
