//! Minimal notes propagation: mirrors annotations from a rewritten commit
//! onto its replacement under a configured ref.
//!
//! Notes refs in this workspace follow the representation `git-cli`'s
//! `notes` command already uses: the ref points at a *commit*, not a tree
//! directly, and that commit's tree holds one entry per annotated OID named
//! by its hex string. Rewriting the tree means writing a new commit with
//! the previous notes commit (if any) as parent, the same way `update_note`
//! does it there.

use bstr::{BString, ByteSlice};
use git_hash::ObjectId;
use git_object::{Commit, FileMode, Object, Tree, TreeEntry};
use git_ref::reflog::{append_reflog_entry, ReflogEntry};
use git_ref::{RefName, RefStore};
use git_repository::Repository;
use git_utils::date::Signature;

use crate::RebaseError;

/// Resolve a notes ref to its tree, following the ref -> commit -> tree
/// chain. Returns `None` if the ref doesn't exist yet.
fn read_notes_tree(repo: &Repository, ref_name: &RefName) -> Result<Option<Tree>, RebaseError> {
    let commit_oid = match repo.refs().resolve_to_oid(ref_name)? {
        Some(oid) => oid,
        None => return Ok(None),
    };
    match repo
        .odb()
        .read(&commit_oid)?
        .ok_or_else(|| RebaseError::Corrupt(format!("missing notes commit {commit_oid}")))?
    {
        Object::Commit(c) => match repo
            .odb()
            .read(&c.tree)?
            .ok_or_else(|| RebaseError::Corrupt(format!("missing notes tree {}", c.tree)))?
        {
            Object::Tree(t) => Ok(Some(t)),
            _ => Err(RebaseError::Corrupt(format!("{} is not a tree", c.tree))),
        },
        _ => Err(RebaseError::Corrupt(format!(
            "{commit_oid} is not a commit"
        ))),
    }
}

/// For every `(old, new)` pair in `rewrites`, copy whatever note `old` has
/// under `notes_ref` onto `new`. Pairs with no existing note are skipped
/// silently, matching a swallowed "note not found" lookup.
pub(crate) fn copy_notes(
    repo: &mut Repository,
    notes_ref: &str,
    rewrites: &[(ObjectId, ObjectId)],
    committer: &Signature,
) -> Result<(), RebaseError> {
    if rewrites.is_empty() {
        return Ok(());
    }

    let ref_name = RefName::new(BString::from(notes_ref))?;
    let old_commit_oid = repo.refs().resolve_to_oid(&ref_name)?;
    let mut tree = read_notes_tree(repo, &ref_name)?.unwrap_or_else(Tree::new);

    let mut changed = false;
    for (old, new) in rewrites {
        let old_name = BString::from(old.to_hex());
        let note_oid = match tree.find(old_name.as_bstr()) {
            Some(entry) => entry.oid,
            None => continue,
        };
        let new_name = BString::from(new.to_hex());
        if tree.find(new_name.as_bstr()).is_some() {
            continue;
        }
        tree.entries.push(TreeEntry {
            mode: FileMode::Regular,
            name: new_name,
            oid: note_oid,
        });
        changed = true;
    }

    if !changed {
        return Ok(());
    }

    let new_tree_oid = repo.odb().write(&Object::Tree(tree))?;
    let notes_commit = Commit {
        tree: new_tree_oid,
        parents: old_commit_oid.into_iter().collect(),
        author: committer.clone(),
        committer: committer.clone(),
        encoding: None,
        gpgsig: None,
        extra_headers: Vec::new(),
        message: BString::from("Notes copied by rebase\n"),
    };
    let new_commit_oid = repo.odb().write(&Object::Commit(notes_commit))?;
    let old_for_reflog = old_commit_oid.unwrap_or(ObjectId::NULL_SHA1);
    repo.refs().write_ref(&ref_name, &new_commit_oid)?;
    append_reflog_entry(
        repo.git_dir(),
        &ref_name,
        &ReflogEntry {
            old_oid: old_for_reflog,
            new_oid: new_commit_oid,
            identity: committer.clone(),
            message: BString::from("rebase: copy notes"),
        },
    )?;

    Ok(())
}
