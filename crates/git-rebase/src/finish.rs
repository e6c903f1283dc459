//! Finalizer and aborter: tear down an in-progress rebase, either landing
//! the rewritten branch or restoring the repository to its pre-rebase state.

use bstr::BString;
use git_ref::reflog::{append_reflog_entry, ReflogEntry};
use git_ref::{RefName, RefTransaction};
use git_repository::Repository;
use git_utils::date::Signature;

use crate::checkout;
use crate::notes;
use crate::options::FinishOptions;
use crate::state::{self, orig_head_ref_name};
use crate::step::read_commit;
use crate::RebaseError;

/// Abandon the in-progress rebase, restoring HEAD, the index, and the
/// working tree to what they were before [`crate::init`] ran.
pub fn abort(repo: &mut Repository, signature: &Signature) -> Result<(), RebaseError> {
    let state = state::load(repo)?;

    let orig_tree = read_commit(repo.odb(), &state.orig_head_id)?.tree;
    let old_head = repo.head_oid()?.unwrap_or(state.orig_head_id);

    let head_ref = RefName::new(BString::from("HEAD"))?;
    if state.head_detached {
        repo.refs().write_ref(&head_ref, &state.orig_head_id)?;
    } else {
        let branch = orig_head_ref_name(&state)?
            .ok_or_else(|| RebaseError::Corrupt("missing orig head branch name".into()))?;
        repo.refs().write_ref(&branch, &state.orig_head_id)?;
        repo.refs().write_symbolic_ref(&head_ref, &branch)?;
    }
    append_reflog_entry(
        repo.git_dir(),
        &head_ref,
        &ReflogEntry {
            old_oid: old_head,
            new_oid: state.orig_head_id,
            identity: signature.clone(),
            message: BString::from("rebase: aborting"),
        },
    )?;

    checkout::hard_reset_to_tree(repo, &orig_tree)?;
    state::remove(&state.state_path)?;
    Ok(())
}

/// Complete the rebase: land the rewritten history on the original branch
/// (or leave HEAD detached, if it started detached) and discard state.
pub fn finish(
    repo: &mut Repository,
    signature: &Signature,
    opts: FinishOptions,
) -> Result<(), RebaseError> {
    opts.validate()?;
    let state = state::load(repo)?;

    if state.step < state.end {
        return Err(RebaseError::Corrupt(
            "rebase finished before all picks were replayed".into(),
        ));
    }

    let new_head_oid = repo
        .head_oid()?
        .ok_or_else(|| RebaseError::Corrupt("HEAD does not resolve to a commit".into()))?;

    if !state.head_detached {
        let branch = orig_head_ref_name(&state)?
            .ok_or_else(|| RebaseError::Corrupt("missing orig head branch name".into()))?;

        let mut txn = RefTransaction::new();
        txn.update(
            branch.clone(),
            state.orig_head_id,
            new_head_oid,
            format!("rebase finished: {} onto {}", branch.as_str(), state.onto_id),
        );
        repo.refs().commit_transaction(txn).map_err(|e| match e {
            git_ref::RefError::CasFailed { name, .. } => RebaseError::RefUpdateConflict {
                name: BString::from(name),
            },
            other => RebaseError::Ref(other),
        })?;

        let head_ref = RefName::new(BString::from("HEAD"))?;
        repo.refs().write_symbolic_ref(&head_ref, &branch)?;
        append_reflog_entry(
            repo.git_dir(),
            &head_ref,
            &ReflogEntry {
                old_oid: state.orig_head_id,
                new_oid: new_head_oid,
                identity: signature.clone(),
                message: BString::from(format!("rebase finished: returning to {}", branch.as_str())),
            },
        )?;
    }

    let rewrites = state::read_rewritten(&state.state_path)?;
    if let Some(notes_ref) = opts.resolve(repo.config())? {
        notes::copy_notes(repo, &notes_ref, &rewrites, signature)?;
    }

    state::remove(&state.state_path)?;
    Ok(())
}
