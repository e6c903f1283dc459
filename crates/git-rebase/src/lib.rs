//! Rebase engine: replays commits reachable from a branch tip but not from
//! an upstream tip onto a new base, one at a time, as a crash-resumable
//! state machine persisted under the repository directory.
//!
//! The state machine is driven from outside this crate: [`init()`] starts a
//! rebase, [`next()`] stages each pick in turn, [`commit()`] finalizes a
//! staged pick once conflicts (if any) are resolved, and either
//! [`finish()`] or [`abort()`] tears the state down. Only the merge flavor
//! is implemented; interactive and apply-style (mailbox patch) rebases are
//! detected on disk and rejected.

mod checkout;
mod commit;
mod finish;
mod init;
mod notes;
mod options;
mod state;
mod step;

pub use commit::commit;
pub use finish::{abort, finish};
pub use init::init;
pub use options::{FinishOptions, InitOptions};
pub use state::{CommitTip, Flavor, RebaseState};
pub use step::{next, CheckoutOptions, StepResult};

use bstr::BString;
use git_hash::ObjectId;

/// Errors produced by the rebase engine.
#[derive(Debug, thiserror::Error)]
pub enum RebaseError {
    #[error("no rebase in progress")]
    NotFound,

    #[error("a rebase is already in progress")]
    InProgress,

    #[error("cannot rebase in a bare repository")]
    Bare,

    #[error("cannot rebase: you have unstaged or staged changes")]
    Dirty,

    #[error("unsupported rebase flavor: {0}")]
    Unsupported(&'static str),

    #[error("corrupt rebase state: {0}")]
    Corrupt(String),

    #[error("unresolved conflicts in {0} path(s); fix them and run commit again")]
    MergeConflict(usize),

    #[error("merge of {pick} onto {onto} failed")]
    MergeFailed { pick: ObjectId, onto: ObjectId },

    #[error("no changes to commit; the pick is already applied")]
    AlreadyApplied,

    #[error("no pick staged; call next before commit")]
    InvalidState,

    #[error("ref update for {name} was concurrently modified")]
    RefUpdateConflict { name: BString },

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] git_ref::RefError),

    #[error(transparent)]
    Index(#[from] git_index::IndexError),

    #[error(transparent)]
    Diff(#[from] git_diff::DiffError),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Config(#[from] git_config::ConfigError),

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    Merge(#[from] git_merge::MergeError),

    #[error(transparent)]
    RevWalk(#[from] git_revwalk::RevWalkError),

    #[error(transparent)]
    Os(#[from] std::io::Error),
}
