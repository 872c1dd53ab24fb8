//! One cloned repository and the snippets derived from it

use crate::error::{GitError, SamplrError};
use crate::git::{LogOptions, PullOptions, REMOTE_ORIGIN_NAME, ReferenceName, Repository};
use crate::repos::TrackedRepository;
use crate::snippet::{GitCommit, Snippet, calculate_snippets};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

/// Callback for the `for_each_*` queries; `Break` stops the walk early
pub type Visit<'a, T> = dyn FnMut(&T) -> Result<ControlFlow<()>, SamplrError> + Send + 'a;

/// Filter for the `for_each_*` queries
pub type Filter<'a, T> = dyn Fn(&T) -> bool + Send + Sync + 'a;

/// A repository the corpus keeps up to date
#[async_trait]
pub trait WatchedRepo: Send + Sync {
    /// URL the repository was cloned from
    fn id(&self) -> &str;

    fn owner(&self) -> &str;

    fn repository_name(&self) -> &str;

    /// Fetch, pull and recompute snippets and commits for the tracked branch
    async fn update(&self, cancel: &CancellationToken) -> Result<(), SamplrError>;

    async fn for_each_snippet(
        &self,
        filter: &Filter<'_, Snippet>,
        f: &mut Visit<'_, Snippet>,
    ) -> Result<(), SamplrError>;

    async fn for_each_git_commit(
        &self,
        filter: &Filter<'_, GitCommit>,
        f: &mut Visit<'_, GitCommit>,
    ) -> Result<(), SamplrError>;

    /// Snapshot of every snippet on every branch
    async fn snippets(&self) -> Vec<Arc<Snippet>>;

    /// Snapshot of every commit on every branch
    async fn git_commits(&self) -> Vec<Arc<GitCommit>>;
}

#[derive(Debug, Default)]
struct WatchedState {
    /// Keyed by full branch reference name
    snippets: BTreeMap<String, Vec<Arc<Snippet>>>,
    commits: BTreeMap<String, Vec<Arc<GitCommit>>>,
}

/// In-memory projection of one clone: snippets and commits per branch
pub struct WatchedRepository {
    tracked: TrackedRepository,
    repository: Arc<Repository>,
    remote_name: String,
    state: Arc<RwLock<WatchedState>>,
    span: Span,
}

impl std::fmt::Debug for WatchedRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchedRepository")
            .field("tracked", &self.tracked)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl WatchedRepository {
    pub fn new(repository: Repository, tracked: TrackedRepository) -> Self {
        let span = tracing::info_span!("watched", repo = %tracked);
        Self {
            tracked,
            repository: Arc::new(repository),
            remote_name: REMOTE_ORIGIN_NAME.to_string(),
            state: Arc::new(RwLock::new(WatchedState::default())),
            span,
        }
    }

    /// Owner and name come from the repository's GitHub URL
    pub fn from_github(repository: Repository) -> Result<Self, SamplrError> {
        let tracked = TrackedRepository::from_github_url(repository.url())?;
        Ok(Self::new(repository, tracked))
    }

    pub fn with_remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = remote_name.into();
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn tracked(&self) -> &TrackedRepository {
        &self.tracked
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Snippets computed for one branch, e.g. `refs/heads/main`
    pub async fn snippets_for_branch(&self, branch: &str) -> Vec<Arc<Snippet>> {
        self.state
            .read()
            .await
            .snippets
            .get(branch)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn git_commits_for_branch(&self, branch: &str) -> Vec<Arc<GitCommit>> {
        self.state
            .read()
            .await
            .commits
            .get(branch)
            .cloned()
            .unwrap_or_default()
    }

    /// The configured default branch, else `master`, else `main`
    async fn tracked_branch(&self, cancel: &CancellationToken) -> Result<ReferenceName, GitError> {
        if !self.tracked.default_branch.is_empty() {
            return Ok(ReferenceName::branch(&self.tracked.default_branch));
        }
        Ok(self
            .repository
            .default_branch(cancel)
            .await?
            .unwrap_or_else(ReferenceName::master))
    }

    async fn run_update(&self, cancel: &CancellationToken) -> Result<(), SamplrError> {
        let fetched = self.repository.fetch(cancel).await.inspect_err(|e| {
            tracing::error!("got error fetching repository: {}", e);
        })?;
        if fetched.is_up_to_date() && !self.state.read().await.snippets.is_empty() {
            tracing::trace!("already up to date, and we have snippets, skipping update");
            return Ok(());
        }

        let branch = self.tracked_branch(cancel).await?;
        self.repository
            .pull(
                &PullOptions {
                    remote_name: Some(self.remote_name.clone()),
                    reference_name: Some(branch.clone()),
                },
                cancel,
            )
            .await
            .inspect_err(|e| tracing::error!("got error pulling commits: {}", e))?;

        let refs: Vec<_> = self
            .repository
            .branches(cancel)
            .await?
            .filter(|r| r.name() == &branch)
            .collect();

        let group = cancel.child_token();
        let mut tasks = JoinSet::new();
        for reference in refs {
            let name = reference.name().to_string();
            let hash = reference.hash();
            tracing::debug!("Repo {}... working on reference: {}, {}", self.id(), name, hash);

            let repository = Arc::clone(&self.repository);
            let state = Arc::clone(&self.state);
            let owner = self.tracked.owner.clone();
            let repo_name = self.tracked.name.clone();
            let group = group.clone();
            tasks.spawn(
                async move {
                    let commits = repository.log(&LogOptions { from: hash }, &group).await?;
                    let git_commits: Vec<Arc<GitCommit>> = commits
                        .as_slice()
                        .iter()
                        .map(|c| Arc::new(GitCommit::from_commit(&owner, &repo_name, c)))
                        .collect();

                    let snippets = tokio::task::spawn_blocking(move || {
                        calculate_snippets(&owner, &repo_name, commits)
                    })
                    .await
                    .map_err(|e| GitError::Join(e.to_string()))??;

                    let snippets = snippets.into_iter().map(Arc::new).collect();
                    state.write().await.snippets.insert(name.clone(), snippets);
                    Ok::<_, SamplrError>((name, git_commits))
                }
                .instrument(self.span.clone()),
            );
        }

        // First failure cancels the rest; branches already written stay written
        let mut first_error = None;
        let mut branch_commits = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(GitError::Join(e.to_string()).into()));
            match result {
                Ok(done) => branch_commits.push(done),
                Err(e) => {
                    tracing::error!("Error calculating snippets for {}: {}", self.id(), e);
                    group.cancel();
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let mut state = self.state.write().await;
        for (name, commits) in branch_commits {
            tracing::info!(
                "Repo {}... {} commits found for reference {}",
                self.id(),
                commits.len(),
                name
            );
            state.commits.insert(name, commits);
        }
        Ok(())
    }
}

#[async_trait]
impl WatchedRepo for WatchedRepository {
    fn id(&self) -> &str {
        self.repository.url()
    }

    fn owner(&self) -> &str {
        &self.tracked.owner
    }

    fn repository_name(&self) -> &str {
        &self.tracked.name
    }

    async fn update(&self, cancel: &CancellationToken) -> Result<(), SamplrError> {
        self.run_update(cancel).instrument(self.span.clone()).await
    }

    async fn for_each_snippet(
        &self,
        filter: &Filter<'_, Snippet>,
        f: &mut Visit<'_, Snippet>,
    ) -> Result<(), SamplrError> {
        let state = self.state.read().await;
        for snippet in state.snippets.values().flatten().map(Arc::as_ref) {
            if filter(snippet) && f(snippet)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    async fn for_each_git_commit(
        &self,
        filter: &Filter<'_, GitCommit>,
        f: &mut Visit<'_, GitCommit>,
    ) -> Result<(), SamplrError> {
        let state = self.state.read().await;
        for commit in state.commits.values().flatten().map(Arc::as_ref) {
            if filter(commit) && f(commit)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    async fn snippets(&self) -> Vec<Arc<Snippet>> {
        self.state
            .read()
            .await
            .snippets
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    async fn git_commits(&self) -> Vec<Arc<GitCommit>> {
        self.state
            .read()
            .await
            .commits
            .values()
            .flatten()
            .cloned()
            .collect()
    }
}
