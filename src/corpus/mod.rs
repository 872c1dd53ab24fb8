//! Registry of watched repositories kept in sync by periodic polling
//!
//! A [`Corpus`] clones each tracked repository under its clone root, runs one
//! initial update per repository and then one poll loop per repository until
//! the first unrecovered error or cancellation. Repositories tracked while a
//! sync is running join it.

pub mod watched;

pub use watched::{Filter, Visit, WatchedRepo, WatchedRepository};

use crate::config::Config;
use crate::error::{CorpusError, SamplrError};
use crate::git::{CloneOptions, GitOptions, ProcessRunner, REMOTE_ORIGIN_NAME, Repository, SystemRunner};
use crate::repos::TrackedRepository;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

/// Time between two successful updates of the same repository
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

type RepoHandle = Arc<dyn WatchedRepo>;

#[derive(Default)]
struct SyncState {
    did_init: bool,
    syncing: bool,
    /// Set while a sync runs; newly tracked repositories are handed over here
    to_add: Option<mpsc::UnboundedSender<RepoHandle>>,
}

/// The set of repositories this process watches
pub struct Corpus {
    clone_root: PathBuf,
    poll_interval: Duration,
    git: GitOptions,
    remote_name: String,
    default_branch: Option<String>,
    runner: Arc<dyn ProcessRunner>,
    repos: RwLock<Vec<RepoHandle>>,
    state: Mutex<SyncState>,
    span: Span,
}

impl std::fmt::Debug for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Corpus")
            .field("clone_root", &self.clone_root)
            .field("poll_interval", &self.poll_interval)
            .field("git", &self.git)
            .field("remote_name", &self.remote_name)
            .finish_non_exhaustive()
    }
}

impl Corpus {
    /// Empty corpus cloning under `clone_root` with the system git
    pub fn new(clone_root: impl Into<PathBuf>) -> Self {
        let clone_root = clone_root.into();
        let span = tracing::info_span!("corpus", root = %clone_root.display());
        Self {
            clone_root,
            poll_interval: DEFAULT_POLL_INTERVAL,
            git: GitOptions::default(),
            remote_name: REMOTE_ORIGIN_NAME.to_string(),
            default_branch: None,
            runner: Arc::new(SystemRunner),
            repos: RwLock::new(Vec::new()),
            state: Mutex::new(SyncState::default()),
            span,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.corpus.clone_root)
            .with_poll_interval(config.corpus.poll_interval())
            .with_git_options(GitOptions {
                binary: config.git.binary.clone(),
                shell: config.git.shell.clone(),
            })
            .with_remote_name(&config.git.remote_name)
            .with_default_branch(config.corpus.default_branch.clone())
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_git_options(mut self, git: GitOptions) -> Self {
        self.git = git;
        self
    }

    pub fn with_remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = remote_name.into();
        self
    }

    /// Branch followed by repositories that do not name one themselves
    pub fn with_default_branch(mut self, branch: Option<String>) -> Self {
        self.default_branch = branch.filter(|b| !b.is_empty());
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn clone_root(&self) -> &Path {
        &self.clone_root
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Clone and watch `https://github.com/<owner>/<name>`
    pub async fn track_git(&self, url: &str, cancel: &CancellationToken) -> Result<(), SamplrError> {
        let tracked = TrackedRepository::from_github_url(url)?;
        self.track_repository(tracked, url, cancel).await
    }

    /// Clone and watch `tracked` if it asks for snippet tracking.
    ///
    /// Returns whether the repository was added.
    pub async fn track(
        &self,
        tracked: &TrackedRepository,
        cancel: &CancellationToken,
    ) -> Result<bool, SamplrError> {
        if !tracked.is_tracking_snippets {
            tracing::debug!(parent: &self.span, "Not tracking snippets for {}, skipping", tracked);
            return Ok(false);
        }
        self.track_repository(tracked.clone(), &tracked.github_url(), cancel)
            .await?;
        Ok(true)
    }

    /// Clone `url` into `<clone_root>/<repo_sha>`, replacing whatever is there
    pub async fn track_repository(
        &self,
        mut tracked: TrackedRepository,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), SamplrError> {
        async {
            if tracked.default_branch.is_empty() {
                if let Some(branch) = &self.default_branch {
                    tracked.default_branch = branch.clone();
                }
            }

            let dir = self.clone_root.join(tracked.repo_sha());
            if tokio::fs::try_exists(&dir).await? {
                tracing::debug!("Removing stale clone at {}", dir.display());
                tokio::fs::remove_dir_all(&dir).await?;
            }

            let opts = CloneOptions {
                url: url.to_string(),
                git: self.git.clone(),
            };
            let repository = Repository::plain_clone(&dir, &opts, Arc::clone(&self.runner), cancel)
                .await
                .inspect_err(|e| tracing::error!("Error cloning: {}\n{}", url, e))?;

            let watched = WatchedRepository::new(repository, tracked)
                .with_remote_name(&self.remote_name);
            tracing::info!("Tracking {}", watched.tracked());
            self.add_repo(Arc::new(watched)).await;
            Ok::<_, SamplrError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Register an already prepared repository
    pub async fn add_repo(&self, repo: RepoHandle) {
        // the state lock orders this against a sync starting up
        let state = self.state.lock().await;
        self.repos.write().await.push(Arc::clone(&repo));
        if let Some(to_add) = &state.to_add {
            if to_add.send(repo).is_err() {
                tracing::debug!(parent: &self.span, "Sync finished before the repository joined");
            }
        }
    }

    /// Run the first update of every repository; failures are logged, not returned
    pub async fn initialize(&self, cancel: &CancellationToken) -> Result<(), SamplrError> {
        {
            let mut state = self.state.lock().await;
            if state.did_init {
                return Err(CorpusError::AlreadyInitialized.into());
            }
            state.did_init = true;
        }

        async {
            tracing::info!("Corpus Initializing");
            for repo in self.repos().await {
                if cancel.is_cancelled() {
                    break;
                }
                tracing::debug!("Starting initial update of repo {}", repo.id());
                if let Err(e) = repo.update(cancel).await {
                    tracing::error!("Initial update of {} failed: {}", repo.id(), e);
                    continue;
                }
                tracing::debug!("Finished initial update of repo {}", repo.id());
            }
            tracing::info!("Corpus finished Initializing");
            Ok::<_, SamplrError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Poll every repository until the first error or cancellation.
    ///
    /// Returns the first error any poll loop ended with.
    pub async fn sync(&self, cancel: &CancellationToken) -> Result<(), SamplrError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let initial = {
            let mut state = self.state.lock().await;
            if state.syncing {
                return Err(CorpusError::AlreadySyncing.into());
            }
            state.syncing = true;
            state.to_add = Some(tx);
            self.repos.read().await.clone()
        };

        let result = self
            .run_sync(initial, &mut rx, cancel)
            .instrument(self.span.clone())
            .await;

        let mut state = self.state.lock().await;
        state.syncing = false;
        state.to_add = None;
        result
    }

    pub async fn is_syncing(&self) -> bool {
        self.state.lock().await.syncing
    }

    async fn run_sync(
        &self,
        initial: Vec<RepoHandle>,
        to_add: &mut mpsc::UnboundedReceiver<RepoHandle>,
        cancel: &CancellationToken,
    ) -> Result<(), SamplrError> {
        let group = cancel.child_token();
        let mut tasks = JoinSet::new();
        for repo in initial {
            tasks.spawn(poll_repo(repo, self.poll_interval, group.clone()).instrument(Span::current()));
        }

        let mut first_error = None;
        while !tasks.is_empty() {
            tokio::select! {
                Some(repo) = to_add.recv() => {
                    if group.is_cancelled() {
                        continue;
                    }
                    tasks.spawn(poll_repo(repo, self.poll_interval, group.clone()).instrument(Span::current()));
                }
                Some(joined) = tasks.join_next() => {
                    let result = joined.unwrap_or_else(|e| Err(SamplrError::other(format!("poll task failed: {e}"))));
                    if let Err(e) = result {
                        group.cancel();
                        first_error.get_or_insert(e);
                    }
                }
                else => break,
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Call `f` on every repository matching `filter` until it breaks or fails
    pub async fn for_each_repo<P, F>(&self, filter: P, mut f: F) -> Result<(), SamplrError>
    where
        P: Fn(&dyn WatchedRepo) -> bool,
        F: FnMut(&RepoHandle) -> Result<ControlFlow<()>, SamplrError>,
    {
        for repo in self.repos().await {
            if filter(repo.as_ref()) && f(&repo)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Snapshot of the registered repositories
    pub async fn repos(&self) -> Vec<RepoHandle> {
        self.repos.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.repos.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.repos.read().await.is_empty()
    }
}

/// Update `repo` every `interval` until an error or cancellation
async fn poll_repo(
    repo: RepoHandle,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<(), SamplrError> {
    tracing::info!("Beginning sync loop for {}...", repo.id());
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        tracing::info!("polling {} ...", repo.id());
        match repo.update(&cancel).await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {
                tracing::info!("git sync cancelled for {}", repo.id());
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("git sync ending for {}: {}", repo.id(), e);
                return Err(e);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
