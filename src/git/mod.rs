//! Minimal git plumbing built on the `git` executable
//!
//! Lists remotes and branches, clones, fetches and pulls, and materializes the
//! history of a branch as a sequence of commits that each carry the full
//! contents of every file they touched.

pub mod commit;
pub mod hash;
pub mod iter;
pub mod reference;
pub mod remote;
pub mod repository;
pub mod runner;
pub mod status;

pub use commit::{Commit, CommitIter, File, FileIter, Signature};
pub use hash::{Hash, ZERO_HASH};
pub use iter::Series;
pub use reference::{Reference, ReferenceIter, ReferenceName, ReferenceType};
pub use remote::{REMOTE_ORIGIN_NAME, Remote, RemoteConfig, RemoteIter};
pub use repository::{
    CloneOptions, GitOptions, LogOptions, PullOptions, Repository, SyncOutcome,
};
pub use runner::{ProcessOutput, ProcessRunner, SystemRunner};
pub use status::FileStatus;

/// Name of the directory holding git's own data inside a work tree
pub const GIT_DIR_NAME: &str = ".git";
