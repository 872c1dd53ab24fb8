//! Watched repositories updated from a real upstream clone

mod common;

use common::{DEMO_NAME, DEMO_V1, DEMO_V2, TestRepo, tools_available};
use samplr::corpus::{WatchedRepo, WatchedRepository};
use samplr::git::{CloneOptions, GitOptions, Repository, SystemRunner};
use samplr::repos::TrackedRepository;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn clone_of(upstream: &TestRepo, root: &std::path::Path) -> WatchedRepository {
    let opts = CloneOptions {
        url: upstream.url(),
        git: GitOptions::default(),
    };
    let repository = Repository::plain_clone(
        root.join("clone"),
        &opts,
        Arc::new(SystemRunner),
        &CancellationToken::new(),
    )
    .await
    .expect("clone upstream");
    WatchedRepository::new(repository, TrackedRepository::new("foo", "bar"))
}

#[tokio::test]
async fn test_update_follows_upstream() {
    if !tools_available() {
        eprintln!("git or bash not available, skipping");
        return;
    }
    let upstream = TestRepo::new();
    upstream.write("f.py", DEMO_V1);
    upstream.commit("Add demo");

    let root = tempfile::tempdir().unwrap();
    let watched = clone_of(&upstream, root.path()).await;
    let cancel = CancellationToken::new();

    watched.update(&cancel).await.unwrap();
    let snippets = watched.snippets_for_branch("refs/heads/main").await;
    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].name, DEMO_NAME);
    assert_eq!(snippets[0].versions.len(), 1);
    assert_eq!(watched.git_commits().await.len(), 1);

    // nothing new upstream: the previous results stay
    watched.update(&cancel).await.unwrap();
    assert_eq!(watched.snippets().await.len(), 1);

    upstream.write("f.py", DEMO_V2);
    let tip = upstream.commit("Print two");

    watched.update(&cancel).await.unwrap();
    let snippets = watched.snippets().await;
    assert_eq!(snippets[0].versions.len(), 2);
    assert_eq!(snippets[0].versions[1].content, DEMO_V2.trim());

    let commits = watched.git_commits().await;
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[1].hash, tip);
    assert_eq!(
        commits[1].name,
        format!("owners/foo/repositories/bar/gitCommits/{tip}")
    );
}

#[tokio::test]
async fn test_update_honours_cancellation() {
    if !tools_available() {
        eprintln!("git or bash not available, skipping");
        return;
    }
    let upstream = TestRepo::new();
    upstream.write("f.py", DEMO_V1);
    upstream.commit("Add demo");

    let root = tempfile::tempdir().unwrap();
    let watched = clone_of(&upstream, root.path()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = watched.update(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(watched.snippets().await.is_empty());
}
