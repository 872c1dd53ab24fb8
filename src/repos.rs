//! Repositories the service is asked to track

use crate::error::CorpusError;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};
use std::fmt;
use std::path::PathBuf;
use std::sync::{LazyLock, RwLock};

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([\w.-]+)/([\w.-]+?)(?:\.git)?/?$")
        .expect("valid GitHub URL regex")
});

/// A GitHub repository and what is tracked for it
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedRepository {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub is_tracking_issues: bool,
    #[serde(default)]
    pub is_tracking_snippets: bool,
    /// Branch to follow; empty means `master`, then `main`
    #[serde(default)]
    pub default_branch: String,
}

impl TrackedRepository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse `https://github.com/<owner>/<name>`, with or without `.git`
    pub fn from_github_url(url: &str) -> Result<Self, CorpusError> {
        let caps = GITHUB_URL
            .captures(url)
            .ok_or_else(|| CorpusError::InvalidRepositoryUrl(url.to_string()))?;
        Ok(Self::new(&caps[1], &caps[2]))
    }

    /// Lowercase hex SHA-224 of `owner/name`
    pub fn repo_sha(&self) -> String {
        let mut hasher = Sha224::new();
        hasher.update(self.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn github_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for TrackedRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Host name of the issue tracker service for `t`
pub fn service_name(t: &TrackedRepository) -> String {
    format!("mtr-s-{}", t.repo_sha()).to_lowercase()
}

pub fn deployment_name(t: &TrackedRepository) -> String {
    format!("mtr-d-{}", t.repo_sha()).to_lowercase()
}

/// Host name of the snippet service for `t`
pub fn snippet_service_name(t: &TrackedRepository) -> String {
    format!("smp-s-{}", t.repo_sha()).to_lowercase()
}

pub fn snippet_deployment_name(t: &TrackedRepository) -> String {
    format!("smp-d-{}", t.repo_sha()).to_lowercase()
}

/// A source of tracked repositories that can change over time
#[async_trait]
pub trait RepoList: Send + Sync {
    /// Reload the list; `true` when it changed
    async fn update_tracked_repos(&self) -> Result<bool, CorpusError>;

    fn tracked_repos(&self) -> Vec<TrackedRepository>;
}

#[derive(Debug, Deserialize)]
struct RepoFile {
    #[serde(default)]
    repos: Vec<RepoEntry>,
}

#[derive(Debug, Deserialize)]
struct RepoEntry {
    repo: String,
    #[serde(default)]
    default_branch: String,
    #[serde(default)]
    is_tracking_issues: bool,
    #[serde(default)]
    is_tracking_snippets: bool,
}

/// Reads `{"repos": [{"repo": "owner/name", ...}]}` from a local JSON file
#[derive(Debug)]
pub struct FileRepoList {
    path: PathBuf,
    repos: RwLock<Vec<TrackedRepository>>,
}

impl FileRepoList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            repos: RwLock::new(Vec::new()),
        }
    }

    fn load_failed(&self, reason: impl ToString) -> CorpusError {
        CorpusError::RepoListFailed {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parse the repository list; malformed `repo` entries are logged and skipped
pub fn parse_repo_list(json: &str) -> Result<Vec<TrackedRepository>, serde_json::Error> {
    let file: RepoFile = serde_json::from_str(json)?;
    let repos = file
        .repos
        .into_iter()
        .filter_map(|entry| {
            let Some((owner, name)) = entry.repo.split_once('/') else {
                tracing::warn!("Bad format for repo {:?}", entry.repo);
                return None;
            };
            if owner.is_empty() || name.is_empty() || name.contains('/') {
                tracing::warn!("Bad format for repo {:?}", entry.repo);
                return None;
            }
            Some(TrackedRepository {
                owner: owner.to_string(),
                name: name.to_string(),
                is_tracking_issues: entry.is_tracking_issues,
                is_tracking_snippets: entry.is_tracking_snippets,
                default_branch: entry.default_branch,
            })
        })
        .collect();
    Ok(repos)
}

#[async_trait]
impl RepoList for FileRepoList {
    async fn update_tracked_repos(&self) -> Result<bool, CorpusError> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.load_failed(e))?;
        let fresh = parse_repo_list(&json).map_err(|e| self.load_failed(e))?;

        let mut repos = self
            .repos
            .write()
            .map_err(|_| self.load_failed("repository list lock poisoned"))?;
        if *repos == fresh {
            return Ok(false);
        }
        tracing::info!("Tracking {} repositories from {}", fresh.len(), self.path.display());
        *repos = fresh;
        Ok(true)
    }

    fn tracked_repos(&self) -> Vec<TrackedRepository> {
        self.repos.read().map(|r| r.clone()).unwrap_or_default()
    }
}
