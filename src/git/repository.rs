use super::commit::{Commit, CommitIter, File, Signature};
use super::hash::Hash;
use super::iter::Series;
use super::reference::{ReferenceIter, ReferenceName, parse_show_ref};
use super::remote::{REMOTE_ORIGIN_NAME, RemoteIter, parse_remotes};
use super::runner::{ProcessOutput, ProcessRunner, display_command};
use super::status::FileStatus;
use super::GIT_DIR_NAME;
use crate::error::GitError;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

static COMMIT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)Commit: ([0-9a-f]{40})\n",
        r"Author: (.*)\n",
        r"Author Email: (.*)\n",
        r"Author Date: (.*)\n",
        r"Committer: (.*)\n",
        r"Committer Email: (.*)\n",
        r"Committer Date: (.*)\n",
        r"Subject: (.*)\n",
        r"Body:(.*)\n",
        r"Files:\n\n?",
        r"((?:^[A-Z]\d*\t[^\n]*\n)*)",
    ))
    .expect("valid commit block regex")
});

const LOG_FORMAT: &str = "Commit: %H%nAuthor: %an%nAuthor Email: %ae%nAuthor Date: %at%nCommitter: %cn%nCommitter Email: %ce%nCommitter Date: %ct%nSubject: %s";

const PULL_UP_TO_DATE: &str = "Already up to date.\n";

/// Result of a fetch or pull that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New objects were transferred
    Updated,
    /// Nothing to do; the local copy already matches the remote
    AlreadyUpToDate,
}

impl SyncOutcome {
    pub fn is_up_to_date(self) -> bool {
        self == SyncOutcome::AlreadyUpToDate
    }
}

/// Which binaries the plumbing layer invokes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOptions {
    /// Path or name of the git executable
    pub binary: String,
    /// Shell used to run the history pipeline
    pub shell: String,
}

impl Default for GitOptions {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            shell: "bash".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub url: String,
    pub git: GitOptions,
}

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Defaults to `origin`
    pub remote_name: Option<String>,
    /// Defaults to `master`
    pub reference_name: Option<ReferenceName>,
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Walk every commit reachable from this one
    pub from: Hash,
}

/// The checked-out working directory.
///
/// Only one holder may run `checkout` and read files at a time, so every
/// operation that touches it goes through the repository's mutex.
#[derive(Debug)]
struct WorkTree {
    head: Option<Hash>,
}

/// A local clone driven entirely through the `git` executable
pub struct Repository {
    url: String,
    dir: PathBuf,
    git: GitOptions,
    runner: Arc<dyn ProcessRunner>,
    worktree: Mutex<WorkTree>,
    span: Span,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("url", &self.url)
            .field("dir", &self.dir)
            .field("git", &self.git)
            .finish_non_exhaustive()
    }
}

impl Repository {
    fn new(url: String, dir: PathBuf, git: GitOptions, runner: Arc<dyn ProcessRunner>) -> Self {
        let span = tracing::info_span!("repository", url = %url, dir = %dir.display());
        Self {
            url,
            dir,
            git,
            runner,
            worktree: Mutex::new(WorkTree { head: None }),
            span,
        }
    }

    /// Clone `opts.url` into `dir` with `git clone --single-branch`
    pub async fn plain_clone(
        dir: impl Into<PathBuf>,
        opts: &CloneOptions,
        runner: Arc<dyn ProcessRunner>,
        cancel: &CancellationToken,
    ) -> Result<Self, GitError> {
        let dir = dir.into();
        let parent = dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|source| GitError::Io {
                path: parent.display().to_string(),
                source,
            })?;

        // git runs in the parent directory, so it only needs the final component
        let target = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        let repo = Self::new(opts.url.clone(), dir, opts.git.clone(), runner);
        let args = vec![
            "clone".to_string(),
            "--single-branch".to_string(),
            opts.url.clone(),
            target,
        ];
        async {
            tracing::info!("Cloning {}", repo.url);
            repo.run_checked(&repo.git.binary, &args, &parent, cancel)
                .await
        }
        .instrument(repo.span.clone())
        .await?;

        Ok(repo)
    }

    /// Open an existing clone at `dir`
    pub async fn open(
        dir: impl Into<PathBuf>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self, GitError> {
        let dir = dir.into();
        tokio::fs::metadata(&dir)
            .await
            .map_err(|source| GitError::Io {
                path: dir.display().to_string(),
                source,
            })?;

        let git_dir = dir.join(GIT_DIR_NAME);
        match tokio::fs::metadata(&git_dir).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GitError::RepositoryNotExists(dir.display().to_string()));
            }
            Err(source) => {
                return Err(GitError::Io {
                    path: git_dir.display().to_string(),
                    source,
                });
            }
        }

        Ok(Self::new(String::new(), dir, GitOptions::default(), runner))
    }

    pub fn with_git_options(mut self, git: GitOptions) -> Self {
        self.git = git;
        self
    }

    /// Record the URL an opened clone came from
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Log under `span` instead of the default `repository` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Remotes from `git remote -v`, ordered by name
    pub async fn remotes(&self, cancel: &CancellationToken) -> Result<RemoteIter, GitError> {
        async {
            tracing::debug!("Getting remotes for {}", self.dir.display());
            let output = self.git(&["remote", "-v"], cancel).await?;
            Ok::<_, GitError>(Series::new(parse_remotes(&output.stdout)))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Every hash reference from `git show-ref`
    pub async fn branches(&self, cancel: &CancellationToken) -> Result<ReferenceIter, GitError> {
        async {
            tracing::debug!("Getting branches for {}", self.dir.display());
            let output = self.git(&["show-ref"], cancel).await?;
            Ok::<_, GitError>(Series::new(parse_show_ref(&output.stdout)))
        }
        .instrument(self.span.clone())
        .await
    }

    /// The local `master` branch, or `main` when there is no `master`
    pub async fn default_branch(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<ReferenceName>, GitError> {
        let branches = self.branches(cancel).await?.into_vec();
        let has = |name: &ReferenceName| branches.iter().any(|r| r.name() == name);
        Ok([ReferenceName::master(), ReferenceName::main()]
            .into_iter()
            .find(|name| has(name)))
    }

    /// `git fetch`; silence on both streams means nothing was fetched
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<SyncOutcome, GitError> {
        async {
            let _tree = self.worktree.lock().await;
            let output = self.git(&["fetch"], cancel).await.inspect_err(|e| {
                tracing::error!("Error fetching {}: {}", self.url, e);
            })?;

            if output.combined().is_empty() {
                return Ok(SyncOutcome::AlreadyUpToDate);
            }
            Ok::<_, GitError>(SyncOutcome::Updated)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Check out the branch and `git pull <remote> <branch>` into it
    pub async fn pull(
        &self,
        opts: &PullOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, GitError> {
        async {
            let remote = opts.remote_name.as_deref().unwrap_or(REMOTE_ORIGIN_NAME);
            let reference = opts
                .reference_name
                .clone()
                .unwrap_or_else(ReferenceName::master);

            let mut tree = self.worktree.lock().await;
            self.git(&["checkout", reference.short(), "--force"], cancel)
                .await?;
            tree.head = None;

            let output = self
                .git(&["pull", remote, reference.as_str()], cancel)
                .await
                .inspect_err(|e| {
                    tracing::error!("Error pulling {} {}: {}", remote, reference, e);
                })?;

            if output.stdout.ends_with(PULL_UP_TO_DATE) {
                return Ok(SyncOutcome::AlreadyUpToDate);
            }
            Ok::<_, GitError>(SyncOutcome::Updated)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Materialize every commit reachable from `opts.from`, oldest first.
    ///
    /// Each commit carries the full contents of every path it touched, read
    /// from the work tree after checking that commit out. The work tree is
    /// held for the whole walk.
    pub async fn log(
        &self,
        opts: &LogOptions,
        cancel: &CancellationToken,
    ) -> Result<CommitIter, GitError> {
        async {
            let mut tree = self.worktree.lock().await;
            tracing::debug!("Calling log on {} from {}", self.dir.display(), opts.from);

            self.checkout(&mut tree, opts.from, cancel).await?;
            let commits = self.get_commits(&mut tree, opts.from, cancel).await?;

            tracing::debug!("Returning {} commits for {}", commits.len(), self.url);
            Ok::<_, GitError>(Series::new(commits))
        }
        .instrument(self.span.clone())
        .await
    }

    async fn checkout(
        &self,
        tree: &mut WorkTree,
        hash: Hash,
        cancel: &CancellationToken,
    ) -> Result<(), GitError> {
        if tree.head == Some(hash) {
            return Ok(());
        }
        let hex = hash.to_string();
        self.git(&["checkout", &hex, "--force"], cancel)
            .await
            .inspect_err(|e| tracing::error!("Could not checkout {}: {}", hex, e))?;
        tree.head = Some(hash);
        Ok(())
    }

    async fn get_commits(
        &self,
        tree: &mut WorkTree,
        from: Hash,
        cancel: &CancellationToken,
    ) -> Result<Vec<Commit>, GitError> {
        let script = log_script(&self.git.binary, from);
        let args = vec!["-c".to_string(), script];
        let output = self
            .run_checked(&self.git.shell, &args, &self.dir, cancel)
            .await?;

        let blocks = parse_log(&output.stdout);
        let mut commits = Vec::with_capacity(blocks.len());

        for block in &blocks {
            let Some(author_when) = parse_unix_time(block.author_date) else {
                tracing::warn!("commit: {} bad author time: {}", block.sha, block.author_date);
                continue;
            };
            let Some(committer_when) = parse_unix_time(block.committer_date) else {
                tracing::warn!(
                    "commit: {} bad commit time: {}",
                    block.sha,
                    block.committer_date
                );
                continue;
            };
            let hash = Hash::from_hex(block.sha)?;

            let mut files = Vec::new();
            if !block.status_lines.is_empty() {
                self.checkout(tree, hash, cancel).await?;
            }
            for line in &block.status_lines {
                self.collect_files(block.sha, line, &mut files).await?;
            }

            commits.push(Commit::new(
                hash,
                Signature {
                    name: block.author.to_string(),
                    email: block.author_email.to_string(),
                    when: author_when,
                },
                Signature {
                    name: block.committer.to_string(),
                    email: block.committer_email.to_string(),
                    when: committer_when,
                },
                format!("{}\n{}", block.subject, block.body.trim()),
                files,
            ));
        }

        if commits.len() != blocks.len() {
            tracing::warn!(
                "Found {} commits, but only {} could be materialized",
                blocks.len(),
                commits.len()
            );
        }
        Ok(commits)
    }

    /// Turn one name-status line into file snapshots read from the work tree
    async fn collect_files(
        &self,
        sha: &str,
        line: &str,
        files: &mut Vec<File>,
    ) -> Result<(), GitError> {
        match FileStatus::parse(line) {
            Some(FileStatus::Deleted(path)) => {
                tracing::debug!("commit: {} file was deleted {}", sha, path);
                files.push(File::deleted(path));
            }
            Some(FileStatus::Added(path)) => {
                tracing::debug!("commit: {} file is new {}", sha, path);
                files.extend(read_work_tree_file(&self.dir, &path).await?);
            }
            Some(FileStatus::Copied { from, to }) => {
                tracing::debug!("commit: {} file is copied from {} to {}", sha, from, to);
                for path in [&from, &to] {
                    match read_work_tree_file(&self.dir, path).await {
                        Ok(file) => files.extend(file),
                        Err(GitError::ReadFile { source, .. })
                            if source.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(e),
                    }
                }
            }
            Some(FileStatus::Modified(path)) => {
                tracing::debug!("commit: {} file is modified {}", sha, path);
                files.extend(read_work_tree_file(&self.dir, &path).await?);
            }
            Some(FileStatus::Renamed { from, to }) => {
                tracing::debug!("commit: {} file was renamed from {} to {}", sha, from, to);
                files.push(File::deleted(from));
                files.extend(read_work_tree_file(&self.dir, &to).await?);
            }
            None => {
                tracing::warn!("commit: {} unrecognized file state: {}", sha, line);
            }
        }
        Ok(())
    }

    async fn git(
        &self,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, GitError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.run_checked(&self.git.binary, &args, &self.dir, cancel)
            .await
    }

    /// Run a command and turn a non-zero exit into [`GitError::CommandFailed`]
    async fn run_checked(
        &self,
        program: &str,
        args: &[String],
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, GitError> {
        let output = self.runner.run(program, args, dir, cancel).await?;
        if !output.success() {
            return Err(GitError::CommandFailed {
                command: display_command(program, args),
                code: output.code,
                stderr: output.stderr.trim_end().to_string(),
            });
        }
        Ok(output)
    }
}

/// Read a file at its checked-out state; symlinks and directories yield `None`
async fn read_work_tree_file(dir: &Path, name: &str) -> Result<Option<File>, GitError> {
    let full_path = dir.join(name);
    let read_err = |source| GitError::ReadFile {
        path: name.to_string(),
        source,
    };

    let meta = tokio::fs::symlink_metadata(&full_path)
        .await
        .map_err(read_err)?;
    if meta.file_type().is_symlink() || meta.is_dir() {
        return Ok(None);
    }

    // Invalid UTF-8 is replaced; `size` stays the byte count on disk
    let bytes = tokio::fs::read(&full_path).await.map_err(read_err)?;
    Ok(Some(File::with_size(
        name,
        meta.len(),
        String::from_utf8_lossy(&bytes).into_owned(),
    )))
}

fn log_script(git: &str, from: Hash) -> String {
    let git = shell_quote(git);
    format!(
        "{git} rev-list {from} --reverse | while read sha1; do \
         {git} show -s --format=\"{LOG_FORMAT}\" $sha1; \
         {git} show -s --format=\"Body: %B\" $sha1 | tr \"\\n\" \" \" | tr \"\\r\" \" \"; echo; \
         echo \"Files:\"; \
         {git} show --format='' --name-status $sha1; echo; \
         echo; \
         done"
    )
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn parse_unix_time(s: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = s.trim().parse().ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// One commit's worth of raw fields from the history pipeline
#[derive(Debug, PartialEq, Eq)]
struct LogBlock<'a> {
    sha: &'a str,
    author: &'a str,
    author_email: &'a str,
    author_date: &'a str,
    committer: &'a str,
    committer_email: &'a str,
    committer_date: &'a str,
    subject: &'a str,
    body: &'a str,
    status_lines: Vec<&'a str>,
}

fn parse_log(output: &str) -> Vec<LogBlock<'_>> {
    COMMIT_BLOCK
        .captures_iter(output)
        .map(|caps| {
            let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
            LogBlock {
                sha: field(1),
                author: field(2),
                author_email: field(3),
                author_date: field(4),
                committer: field(5),
                committer_email: field(6),
                committer_date: field(7),
                subject: field(8),
                body: field(9),
                status_lines: field(10)
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::scripted::ScriptedRunner;

    const SHA1: &str = "1111111111111111111111111111111111111111";
    const SHA2: &str = "2222222222222222222222222222222222222222";

    fn block(sha: &str, date: &str, subject: &str, files: &str) -> String {
        format!(
            "Commit: {sha}\nAuthor: Ada\nAuthor Email: ada@example.com\nAuthor Date: {date}\n\
             Committer: Bob\nCommitter Email: bob@example.com\nCommitter Date: {date}\n\
             Subject: {subject}\nBody: {subject}  more words  \nFiles:\n\n{files}\n\n"
        )
    }

    async fn open_scripted(
        dir: &Path,
        runner: ScriptedRunner,
    ) -> (Repository, Arc<ScriptedRunner>) {
        std::fs::create_dir_all(dir.join(GIT_DIR_NAME)).unwrap();
        let runner = Arc::new(runner);
        let repo = Repository::open(dir, runner.clone()).await.unwrap();
        (repo, runner)
    }

    #[test]
    fn test_parse_log_blocks() {
        let output = format!(
            "{}{}",
            block(SHA1, "1700000000", "Add f", "A\tf.py\n"),
            block(SHA2, "1700000100", "Move f", "R100\tf.py\tg.py\nM\tREADME.md\n")
        );
        let blocks = parse_log(&output);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].sha, SHA1);
        assert_eq!(blocks[0].author, "Ada");
        assert_eq!(blocks[0].committer_email, "bob@example.com");
        assert_eq!(blocks[0].status_lines, vec!["A\tf.py"]);
        assert_eq!(blocks[1].subject, "Move f");
        assert_eq!(
            blocks[1].status_lines,
            vec!["R100\tf.py\tg.py", "M\tREADME.md"]
        );
    }

    #[test]
    fn test_parse_log_commit_without_files() {
        let output = block(SHA1, "1700000000", "Merge", "");
        let blocks = parse_log(&output);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].status_lines.is_empty());
    }

    #[test]
    fn test_log_script_uses_binary() {
        let script = log_script("/usr/bin/git", Hash::new(SHA1));
        assert!(script.starts_with(&format!("'/usr/bin/git' rev-list {SHA1} --reverse")));
        assert!(script.contains("--name-status $sha1"));
    }

    #[test]
    fn test_parse_unix_time() {
        assert_eq!(
            parse_unix_time("1700000000").map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
        assert_eq!(parse_unix_time("yesterday"), None);
    }

    #[tokio::test]
    async fn test_open_requires_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = Repository::open(dir.path(), Arc::new(ScriptedRunner::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::RepositoryNotExists(_)));

        let missing = dir.path().join("nope");
        let err = Repository::open(&missing, Arc::new(ScriptedRunner::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::Io { .. }));
    }

    #[tokio::test]
    async fn test_log_reads_files_and_skips_bad_commits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("g.py"), "# [START demo]\nprint(2)\n# [END demo]\n")
            .unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();

        let output = format!(
            "{}{}{}",
            block(SHA1, "not-a-number", "Broken", "A\tg.py\n"),
            block(
                SHA2,
                "1700000100",
                "Move f",
                "R100\tf.py\tg.py\nA\tpkg\nT\tlink.py\nC100\tgone.py\tg.py\n"
            ),
            ""
        );
        let runner = ScriptedRunner::new().on("-c", &output);
        let (repo, runner) = open_scripted(dir.path(), runner).await;

        let commits = repo
            .log(
                &LogOptions {
                    from: Hash::new(SHA2),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .into_vec();

        assert_eq!(commits.len(), 1);
        let commit = &commits[0];
        assert_eq!(commit.hash.to_string(), SHA2);
        assert_eq!(commit.message, "Move f\nMove f  more words");
        assert_eq!(commit.author.when.timestamp(), 1_700_000_100);

        let names: Vec<_> = commit.file_list().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["f.py", "g.py", "g.py"]);
        assert!(commit.file_list()[0].is_deleted());
        assert!(commit.file_list()[1].contents().contains("print(2)"));

        // one checkout for `from`; the commit itself is already checked out
        let checkouts = runner
            .calls()
            .iter()
            .filter(|c| c.starts_with("git checkout"))
            .count();
        assert_eq!(checkouts, 1);
    }

    #[tokio::test]
    async fn test_read_work_tree_file_keeps_disk_size() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"# [START a]\n\xff\n# [END a]\n";
        std::fs::write(dir.path().join("latin.py"), bytes).unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();

        let file = read_work_tree_file(dir.path(), "latin.py")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.size, bytes.len() as u64);
        assert!(file.contents().contains('\u{FFFD}'));
        assert_ne!(file.contents().len() as u64, file.size);

        assert!(read_work_tree_file(dir.path(), "pkg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_log_missing_added_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = block(SHA1, "1700000000", "Add", "A\tmissing.py\n");
        let (repo, _) = open_scripted(dir.path(), ScriptedRunner::new().on("-c", &output)).await;

        let err = repo
            .log(
                &LogOptions {
                    from: Hash::new(SHA1),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::ReadFile { .. }));
    }

    #[tokio::test]
    async fn test_fetch_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let (repo, _) = open_scripted(dir.path(), ScriptedRunner::new()).await;
        let outcome = repo.fetch(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, SyncOutcome::AlreadyUpToDate);

        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new().on("fetch", "From github.com:foo/bar\n");
        let (repo, _) = open_scripted(dir.path(), runner).await;
        let outcome = repo.fetch(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Updated);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new().fail("fetch", "fatal: could not read from remote");
        let (repo, _) = open_scripted(dir.path(), runner).await;
        let err = repo.fetch(&CancellationToken::new()).await.unwrap_err();
        match err {
            GitError::CommandFailed { stderr, code, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "fatal: could not read from remote");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_pull_checks_out_branch_first() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new().on("pull", "Updating 111..222\nAlready up to date.\n");
        let (repo, runner) = open_scripted(dir.path(), runner).await;

        let outcome = repo
            .pull(
                &PullOptions {
                    remote_name: None,
                    reference_name: Some(ReferenceName::main()),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome::AlreadyUpToDate);
        assert_eq!(
            runner.calls(),
            vec![
                "git checkout main --force".to_string(),
                "git pull origin refs/heads/main".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_branches_and_default_branch() {
        let dir = tempfile::tempdir().unwrap();
        let show_ref = format!("{SHA1} refs/heads/main\n{SHA2} refs/remotes/origin/main\n");
        let (repo, _) = open_scripted(dir.path(), ScriptedRunner::new().on("show-ref", &show_ref))
            .await;

        let cancel = CancellationToken::new();
        let branches = repo.branches(&cancel).await.unwrap().into_vec();
        assert_eq!(branches.len(), 2);
        assert_eq!(
            repo.default_branch(&cancel).await.unwrap(),
            Some(ReferenceName::main())
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let (repo, _) = open_scripted(dir.path(), ScriptedRunner::new()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = repo.remotes(&cancel).await.unwrap_err();
        assert!(matches!(err, GitError::Cancelled(_)));
    }
}
