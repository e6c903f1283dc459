//! Committer: finalize a staged pick once any conflicts are resolved.

use bstr::BString;
use git_hash::ObjectId;
use git_object::{Commit, Object};
use git_ref::reflog::{append_reflog_entry, ReflogEntry};
use git_ref::RefName;
use git_utils::date::Signature;

use crate::checkout;
use crate::state;
use crate::step::read_commit;
use crate::RebaseError;

/// Finalize the pick staged by the most recent [`crate::next`] call.
///
/// `author` and `message` default to the staged pick's own author and
/// message when not supplied, reproducing a plain "replay" commit.
/// `committer` is always required: it identifies who is running the rebase.
pub fn commit(
    repo: &mut git_repository::Repository,
    author: Option<Signature>,
    committer: Signature,
    message: Option<BString>,
) -> Result<ObjectId, RebaseError> {
    let state = state::load(repo)?;

    let current = state.current.ok_or(RebaseError::InvalidState)?;
    if state.step == 0 {
        return Err(RebaseError::InvalidState);
    }
    let staged = state::read_cmt(&state.state_path, state.step)?;
    if staged != current {
        return Err(RebaseError::Corrupt(
            "current does not match the staged pick; state was modified out of band".into(),
        ));
    }

    let index_path = repo.git_dir().join("index");
    let index = git_index::Index::read_from(&index_path)?;
    if !index.conflicts().is_empty() {
        return Err(RebaseError::MergeConflict(index.conflicts().len()));
    }

    let head_oid = repo
        .head_oid()?
        .ok_or_else(|| RebaseError::Corrupt("HEAD does not resolve to a commit".into()))?;
    let head_commit = read_commit(repo.odb(), &head_oid)?;

    let tree_oid = index.write_tree(repo.odb())?;
    if tree_oid == head_commit.tree {
        return Err(RebaseError::AlreadyApplied);
    }

    let pick = read_commit(repo.odb(), &current)?;
    let author = author.unwrap_or_else(|| pick.author.clone());
    let message = message.unwrap_or_else(|| pick.message.clone());

    let commit = Commit {
        tree: tree_oid,
        parents: vec![head_oid],
        author,
        committer: committer.clone(),
        encoding: pick.encoding.clone(),
        gpgsig: None,
        extra_headers: Vec::new(),
        message,
    };
    let new_oid = repo.odb().write(&Object::Commit(commit.clone()))?;

    checkout::update_head(repo, &new_oid)?;
    let head_ref = RefName::new(BString::from("HEAD"))?;
    append_reflog_entry(
        repo.git_dir(),
        &head_ref,
        &ReflogEntry {
            old_oid: head_oid,
            new_oid,
            identity: committer,
            message: BString::from(format!(
                "rebase: {}",
                String::from_utf8_lossy(commit.summary())
            )),
        },
    )?;

    state::append_rewritten(&state.state_path, &current, &new_oid)?;

    Ok(new_oid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_odb::ObjectDatabase;
    use git_object::{Blob, FileMode, Tree, TreeEntry};
    use git_repository::Repository;
    use git_utils::date::GitDate;
    use tempfile::tempdir;

    fn sig(name: &str) -> Signature {
        Signature {
            name: BString::from(name),
            email: BString::from(format!("{name}@example.com")),
            date: GitDate::new(1234567890, 0),
        }
    }

    fn write_blob(odb: &ObjectDatabase, data: &[u8]) -> ObjectId {
        odb.write(&Object::Blob(Blob {
            data: data.to_vec(),
        }))
        .unwrap()
    }

    fn write_single_file_tree(odb: &ObjectDatabase, name: &str, data: &[u8]) -> ObjectId {
        let blob = write_blob(odb, data);
        odb.write(&Object::Tree(Tree {
            entries: vec![TreeEntry {
                mode: FileMode::Regular,
                name: BString::from(name),
                oid: blob,
            }],
        }))
        .unwrap()
    }

    #[test]
    fn commit_without_staged_pick_is_invalid_state() {
        let dir = tempdir().unwrap();
        let mut repo = Repository::init(dir.path()).unwrap();
        let tree = write_single_file_tree(repo.odb(), "a.txt", b"hi");
        let head_commit = Commit {
            tree,
            parents: vec![],
            author: sig("a"),
            committer: sig("a"),
            encoding: None,
            gpgsig: None,
            extra_headers: Vec::new(),
            message: BString::from("root"),
        };
        let head_oid = repo.odb().write(&Object::Commit(head_commit)).unwrap();
        checkout::update_head(&repo, &head_oid).unwrap();

        std::fs::create_dir_all(state::merge_dir(&repo)).unwrap();
        state::write_head_name(&state::merge_dir(&repo), "refs/heads/main").unwrap();
        state::write_orig_head(&state::merge_dir(&repo), &head_oid).unwrap();
        state::write_onto(&state::merge_dir(&repo), &head_oid).unwrap();
        state::write_onto_name(&state::merge_dir(&repo), "main").unwrap();
        state::write_end(&state::merge_dir(&repo), 1).unwrap();
        state::write_cmt(&state::merge_dir(&repo), 1, &head_oid).unwrap();

        let err = commit(&mut repo, None, sig("committer"), None).unwrap_err();
        assert!(matches!(err, RebaseError::InvalidState));
    }
}
