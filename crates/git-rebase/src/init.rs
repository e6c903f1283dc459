//! Initiator: validate preconditions, enumerate the commits to replay,
//! persist them to the state directory, and move HEAD onto the new base.

use bstr::BString;
use git_diff::DiffOptions;
use git_hash::ObjectId;
use git_object::Object;
use git_ref::reflog::{append_reflog_entry, ReflogEntry};
use git_ref::RefName;
use git_repository::Repository;
use git_revwalk::{RevWalk, SortOrder};
use git_utils::date::Signature;

use crate::checkout;
use crate::options::InitOptions;
use crate::state::{self, CommitTip};
use crate::RebaseError;

/// Start a rebase: replay commits reachable from `branch` but not from
/// `upstream` onto `onto` (or onto `upstream` if `onto` is absent).
pub fn init(
    repo: &mut Repository,
    branch: &CommitTip,
    upstream: Option<&CommitTip>,
    onto: Option<&CommitTip>,
    signature: &Signature,
    opts: InitOptions,
) -> Result<(), RebaseError> {
    opts.validate()?;

    if repo.is_bare() {
        return Err(RebaseError::Bare);
    }
    if state::in_progress(repo) {
        return Err(RebaseError::InProgress);
    }
    ensure_clean(repo)?;

    let onto = onto.cloned().or_else(|| upstream.cloned());
    let onto = onto.ok_or(RebaseError::Corrupt("no onto or upstream given".into()))?;
    let upstream = upstream.cloned().unwrap_or_else(|| onto.clone());

    let picks = enumerate_picks(repo, branch, &upstream)?;

    let dir = state::merge_dir(repo);
    if let Err(e) = persist(repo, &dir, branch, &onto, opts.quiet, &picks) {
        let _ = state::remove(&dir);
        return Err(e);
    }

    if let Err(e) = move_head_to_onto(repo, &onto, signature) {
        let _ = state::remove(&dir);
        return Err(e);
    }

    Ok(())
}

fn ensure_clean(repo: &mut Repository) -> Result<(), RebaseError> {
    let opts = DiffOptions::default();
    let head_vs_index = git_diff::worktree::diff_head_to_index(repo, &opts)?;
    if !head_vs_index.is_empty() {
        return Err(RebaseError::Dirty);
    }
    let index_vs_worktree = git_diff::worktree::diff_index_to_worktree(repo, &opts)?;
    if !index_vs_worktree.is_empty() {
        return Err(RebaseError::Dirty);
    }
    Ok(())
}

/// Walk `branch.oid` hiding everything reachable from `upstream.oid`,
/// oldest-first, dropping merge commits.
fn enumerate_picks(
    repo: &Repository,
    branch: &CommitTip,
    upstream: &CommitTip,
) -> Result<Vec<ObjectId>, RebaseError> {
    let mut walk = RevWalk::new(repo)?;
    walk.push(branch.oid)?;
    walk.hide(upstream.oid)?;
    walk.set_sort(SortOrder::Reverse);

    let mut picks = Vec::new();
    for oid in walk {
        let oid = oid?;
        let obj = repo
            .odb()
            .read(&oid)?
            .ok_or_else(|| RebaseError::Corrupt(format!("missing commit {oid}")))?;
        let commit = match obj {
            Object::Commit(c) => c,
            _ => return Err(RebaseError::Corrupt(format!("{oid} is not a commit"))),
        };
        if commit.is_merge() {
            continue;
        }
        picks.push(oid);
    }
    Ok(picks)
}

fn persist(
    repo: &Repository,
    dir: &std::path::Path,
    branch: &CommitTip,
    onto: &CommitTip,
    quiet: bool,
    picks: &[ObjectId],
) -> Result<(), RebaseError> {
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o777))?;
    }

    let orig_head_ref = RefName::new(BString::from("ORIG_HEAD"))?;
    repo.refs().write_ref(&orig_head_ref, &branch.oid)?;

    let head_name_value = match &branch.ref_name {
        Some(name) => name.as_str().to_string(),
        None => "detached HEAD".to_string(),
    };
    state::write_head_name(dir, &head_name_value)?;
    state::write_onto(dir, &onto.oid)?;
    state::write_orig_head(dir, &branch.oid)?;
    state::write_quiet(dir, quiet)?;

    for (i, oid) in picks.iter().enumerate() {
        state::write_cmt(dir, (i + 1) as u32, oid)?;
    }
    state::write_end(dir, picks.len() as u32)?;
    state::write_onto_name(dir, &onto_display_name(onto))?;

    Ok(())
}

fn onto_display_name(onto: &CommitTip) -> String {
    match &onto.ref_name {
        Some(name) => name
            .as_str()
            .strip_prefix("refs/heads/")
            .map(str::to_string)
            .unwrap_or_else(|| name.as_str().to_string()),
        None => onto.oid_str.clone(),
    }
}

fn move_head_to_onto(
    repo: &mut Repository,
    onto: &CommitTip,
    signature: &Signature,
) -> Result<(), RebaseError> {
    let old_head = repo.head_oid()?.unwrap_or(ObjectId::NULL_SHA1);
    let head_ref = RefName::new(BString::from("HEAD"))?;
    repo.refs().write_ref(&head_ref, &onto.oid)?;

    let message = format!("rebase: checkout {}", onto_display_name(onto));
    append_reflog_entry(
        repo.git_dir(),
        &head_ref,
        &ReflogEntry {
            old_oid: old_head,
            new_oid: onto.oid,
            identity: signature.clone(),
            message: BString::from(message),
        },
    )?;

    checkout::hard_reset_to_tree(repo, &commit_tree(repo, &onto.oid)?)?;
    Ok(())
}

fn commit_tree(repo: &Repository, commit_oid: &ObjectId) -> Result<ObjectId, RebaseError> {
    let obj = repo
        .odb()
        .read(commit_oid)?
        .ok_or_else(|| RebaseError::Corrupt(format!("missing commit {commit_oid}")))?;
    match obj {
        Object::Commit(c) => Ok(c.tree),
        _ => Err(RebaseError::Corrupt(format!(
            "{commit_oid} is not a commit"
        ))),
    }
}
