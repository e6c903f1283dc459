//! Stepper: stage the next pick as a three-way merge and check it out.

use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;
use git_index::{Index, Stage};
use git_merge::conflict::write_conflict_markers;
use git_merge::content::{merge_content, MergeLabels};
use git_merge::{ContentMergeResult, MergeOptions};
use git_merge::{TreeMergeOutcome, merge_trees};
use git_object::{Commit, Object};
use git_odb::ObjectDatabase;
use git_repository::Repository;

use crate::checkout;
use crate::state;
use crate::RebaseError;

/// Result of staging the next pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// A pick was staged; the index (and working tree) reflect its merge.
    Staged(ObjectId),
    /// No picks remain.
    Exhausted,
}

/// Checkout strategy and conflict-marker labels used when staging a pick.
#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    pub ancestor_label: String,
    pub ours_label: String,
    pub theirs_label: String,
}

impl CheckoutOptions {
    fn normalize(self, onto_name: &str, pick: &Commit) -> Self {
        Self {
            ancestor_label: if self.ancestor_label.is_empty() {
                "ancestor".to_string()
            } else {
                self.ancestor_label
            },
            ours_label: if self.ours_label.is_empty() {
                onto_name.to_string()
            } else {
                self.ours_label
            },
            theirs_label: if self.theirs_label.is_empty() {
                pick.summary().to_str_lossy().to_string()
            } else {
                self.theirs_label
            },
        }
    }
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            ancestor_label: String::new(),
            ours_label: String::new(),
            theirs_label: String::new(),
        }
    }
}

/// Stage the next commit in the plan, or report that the plan is exhausted.
pub fn next(
    repo: &mut Repository,
    checkout_opts: Option<CheckoutOptions>,
) -> Result<StepResult, RebaseError> {
    let state = state::load(repo)?;
    if state.step >= state.end {
        return Ok(StepResult::Exhausted);
    }

    let new_step = state.step + 1;
    let pick_oid = state::read_cmt(&state.state_path, new_step)?;
    let pick = read_commit(repo.odb(), &pick_oid)?;
    if pick.is_merge() {
        return Err(RebaseError::Unsupported("merge commit in rebase plan"));
    }

    let head_oid = repo
        .head_oid()?
        .ok_or_else(|| RebaseError::Corrupt("HEAD does not resolve to a commit".into()))?;
    let head_commit = read_commit(repo.odb(), &head_oid)?;
    let head_tree = head_commit.tree;
    let current_tree = pick.tree;
    let parent_tree = match pick.first_parent() {
        Some(p) => Some(read_commit(repo.odb(), p)?.tree),
        None => None,
    };

    // Write-before-merge: reproduces the observed on-disk write order even
    // though the checkout below might still fail. A resumed `commit()` call
    // validates this `current` against the base it was staged against.
    state::write_msgnum(&state.state_path, new_step)?;
    state::write_current(&state.state_path, &pick_oid)?;

    let opts = checkout_opts
        .unwrap_or_default()
        .normalize(&state.onto_name, &pick);

    let outcome = merge_trees(
        repo.odb(),
        parent_tree.as_ref(),
        &head_tree,
        &current_tree,
        &MergeOptions::default(),
    )
    .map_err(|_| RebaseError::MergeFailed {
        pick: pick_oid,
        onto: head_oid,
    })?;

    match outcome {
        TreeMergeOutcome::Clean(tree_oid) => {
            let mut index = Index::new();
            checkout::build_index_from_tree(repo.odb(), &tree_oid, &BString::from(""), &mut index)?;
            if let Some(work_tree) = repo.work_tree().map(|p| p.to_path_buf()) {
                checkout::checkout_index_to_worktree(repo.odb(), &index, &work_tree)?;
            }
            repo.set_index(index);
            repo.write_index()?;
        }
        TreeMergeOutcome::Conflicted(conflicts) => {
            // The merge primitive discards the clean half of its result on
            // conflict; seed the index from HEAD's tree (the "ours" side,
            // unchanged for every path that didn't conflict) and overlay
            // the reported conflicts on top.
            let mut index = Index::new();
            checkout::build_index_from_tree(repo.odb(), &head_tree, &BString::from(""), &mut index)?;
            for entry in &conflicts {
                git_merge::conflict::record_conflict_in_index(&mut index, entry);
            }

            if let Some(work_tree) = repo.work_tree().map(|p| p.to_path_buf()) {
                for path in index.conflicts() {
                    write_conflicted_file(repo.odb(), &index, path, &work_tree, &opts)?;
                }
            }

            repo.set_index(index);
            repo.write_index()?;
        }
    }

    Ok(StepResult::Staged(pick_oid))
}

fn write_conflicted_file(
    odb: &ObjectDatabase,
    index: &Index,
    path: &BStr,
    work_tree: &std::path::Path,
    labels: &CheckoutOptions,
) -> Result<(), RebaseError> {
    let base = index
        .get(path, Stage::Base)
        .map(|e| read_blob(odb, &e.oid))
        .transpose()?
        .unwrap_or_default();
    let ours = index
        .get(path, Stage::Ours)
        .map(|e| read_blob(odb, &e.oid))
        .transpose()?
        .unwrap_or_default();
    let theirs = index
        .get(path, Stage::Theirs)
        .map(|e| read_blob(odb, &e.oid))
        .transpose()?
        .unwrap_or_default();

    let merge_labels = MergeLabels {
        base: labels.ancestor_label.as_str(),
        ours: labels.ours_label.as_str(),
        theirs: labels.theirs_label.as_str(),
    };
    let result = merge_content(&base, &ours, &theirs, &MergeOptions::default(), &merge_labels);
    let content = match result {
        ContentMergeResult::Clean(data) => data,
        ContentMergeResult::Conflict { content, .. } => content,
    };
    write_conflict_markers(work_tree, path, &content)?;
    Ok(())
}

fn read_blob(odb: &ObjectDatabase, oid: &ObjectId) -> Result<Vec<u8>, RebaseError> {
    match odb
        .read(oid)?
        .ok_or_else(|| RebaseError::Corrupt(format!("missing blob {oid}")))?
    {
        Object::Blob(b) => Ok(b.data),
        _ => Err(RebaseError::Corrupt(format!("{oid} is not a blob"))),
    }
}

pub(crate) fn read_commit(odb: &ObjectDatabase, oid: &ObjectId) -> Result<Commit, RebaseError> {
    match odb
        .read(oid)?
        .ok_or_else(|| RebaseError::Corrupt(format!("missing commit {oid}")))?
    {
        Object::Commit(c) => Ok(c),
        _ => Err(RebaseError::Corrupt(format!("{oid} is not a commit"))),
    }
}
