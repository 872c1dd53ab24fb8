use anyhow::{Context, Result, bail};
use clap::Parser;
use samplr::config::{Config, LoggingConfig};
use samplr::corpus::Corpus;
use samplr::repos::{FileRepoList, RepoList, TrackedRepository};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "samplrd",
    version = VERSION,
    about = "Track region-tagged code samples across the history of git repositories"
)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "SAMPLR_CONFIG")]
    config: Option<PathBuf>,

    /// GitHub owner of a single repository to track
    #[arg(long, requires = "repo")]
    owner: Option<String>,

    /// GitHub name of a single repository to track
    #[arg(long, requires = "owner")]
    repo: Option<String>,

    /// JSON file listing repositories to track
    #[arg(long)]
    repos_file: Option<PathBuf>,

    /// Directory to clone repositories into
    #[arg(long)]
    clone_root: Option<PathBuf>,

    /// Seconds between polls of each repository
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Log JSON lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::load_or_default()?,
        };
        config.apply_env_overrides();

        if let Some(root) = &self.clone_root {
            config.corpus.clone_root = root.clone();
        }
        if let Some(file) = &self.repos_file {
            config.corpus.repos_file = Some(file.clone());
        }
        if let Some(secs) = self.poll_interval {
            config.corpus.poll_interval_secs = secs;
        }
        config.logging.verbose |= self.verbose;
        config.logging.json |= self.json;

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let default_level = if logging.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Track every snippet repository in `list` not already in `known`
async fn track_new(
    corpus: &Corpus,
    list: &dyn RepoList,
    known: &mut BTreeSet<String>,
    cancel: &CancellationToken,
) {
    for tracked in list.tracked_repos() {
        let key = tracked.to_string();
        if known.contains(&key) {
            continue;
        }
        match corpus.track(&tracked, cancel).await {
            Ok(true) => {
                known.insert(key);
            }
            Ok(false) => {}
            Err(e) => tracing::error!("Could not track {}: {}", key, e),
        }
    }
}

/// Reload the repository list every `interval` and track newcomers
async fn watch_repo_list(
    corpus: Arc<Corpus>,
    list: Arc<FileRepoList>,
    mut known: BTreeSet<String>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        match list.update_tracked_repos().await {
            Ok(true) => track_new(&corpus, list.as_ref(), &mut known, &cancel).await,
            Ok(false) => {}
            Err(e) => tracing::warn!("Could not refresh repository list: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_logging(&config.logging);

    tracing::info!("samplrd {}", VERSION);
    let corpus = Arc::new(Corpus::from_config(&config));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down");
            }
            cancel.cancel();
        });
    }

    let mut known = BTreeSet::new();
    if let (Some(owner), Some(repo)) = (&cli.owner, &cli.repo) {
        let mut tracked = TrackedRepository::new(owner, repo);
        tracked.is_tracking_snippets = true;
        corpus
            .track(&tracked, &cancel)
            .await
            .with_context(|| format!("Failed to track {}", tracked))?;
        known.insert(tracked.to_string());
    }

    if let Some(path) = &config.corpus.repos_file {
        let list = Arc::new(FileRepoList::new(path));
        list.update_tracked_repos().await?;
        track_new(&corpus, list.as_ref(), &mut known, &cancel).await;
        tokio::spawn(watch_repo_list(
            Arc::clone(&corpus),
            list,
            known,
            config.corpus.poll_interval(),
            cancel.clone(),
        ));
    }

    if corpus.is_empty().await {
        bail!("No repositories to track; pass --owner and --repo or --repos-file");
    }

    corpus.initialize(&cancel).await?;
    for repo in corpus.repos().await {
        tracing::info!(
            "{} has {} snippets across {} commits",
            repo.id(),
            repo.snippets().await.len(),
            repo.git_commits().await.len()
        );
    }

    corpus.sync(&cancel).await?;
    Ok(())
}
