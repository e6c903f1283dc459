//! Narrow checkout/reset primitives the rebase engine needs: forcing HEAD
//! onto a tree at init time, and checking out a merged index or a commit's
//! tree onto the working directory. Adapted from the ad hoc tree-walk
//! checkout logic the reset command builds inline, since this workspace
//! has no standalone checkout crate.

use std::collections::HashSet;
use std::path::Path;

use bstr::{BString, ByteSlice, ByteVec};
use git_hash::ObjectId;
use git_index::{EntryFlags, Index, IndexEntry, Stage, StatData};
use git_object::{FileMode, Object};
use git_odb::ObjectDatabase;
use git_ref::{RefName, RefStore, Reference};
use git_repository::Repository;

use crate::RebaseError;

/// Point `HEAD` at `oid`, following one symbolic hop if HEAD is symbolic.
pub(crate) fn update_head(repo: &Repository, oid: &ObjectId) -> Result<(), RebaseError> {
    let head = RefName::new(BString::from("HEAD"))?;
    match repo.refs().resolve(&head)? {
        Some(Reference::Symbolic { target, .. }) => repo.refs().write_ref(&target, oid)?,
        _ => repo.refs().write_ref(&head, oid)?,
    }
    Ok(())
}

/// Recursively flatten a tree into index entries at stage `Normal`.
pub(crate) fn build_index_from_tree(
    odb: &ObjectDatabase,
    tree_oid: &ObjectId,
    prefix: &BString,
    index: &mut Index,
) -> Result<(), RebaseError> {
    let obj = odb
        .read(tree_oid)?
        .ok_or_else(|| RebaseError::Corrupt(format!("missing tree object {tree_oid}")))?;
    let tree = match obj {
        Object::Tree(t) => t,
        _ => return Err(RebaseError::Corrupt(format!("{tree_oid} is not a tree"))),
    };

    for entry in &tree.entries {
        let path = join_path(prefix, &entry.name);

        if entry.mode.is_tree() {
            build_index_from_tree(odb, &entry.oid, &path, index)?;
        } else {
            index.add(IndexEntry {
                path,
                oid: entry.oid,
                mode: entry.mode,
                stage: Stage::Normal,
                stat: StatData::default(),
                flags: EntryFlags::default(),
            });
        }
    }
    Ok(())
}

/// Force-write every blob reachable from `tree_oid` onto the working tree,
/// creating directories as needed.
pub(crate) fn checkout_tree_to_worktree(
    odb: &ObjectDatabase,
    tree_oid: &ObjectId,
    work_tree: &Path,
) -> Result<(), RebaseError> {
    checkout_recursive(odb, tree_oid, work_tree, &BString::from(""))
}

fn checkout_recursive(
    odb: &ObjectDatabase,
    tree_oid: &ObjectId,
    work_tree: &Path,
    prefix: &BString,
) -> Result<(), RebaseError> {
    let obj = odb
        .read(tree_oid)?
        .ok_or_else(|| RebaseError::Corrupt(format!("missing tree object {tree_oid}")))?;
    let tree = match obj {
        Object::Tree(t) => t,
        _ => return Err(RebaseError::Corrupt(format!("{tree_oid} is not a tree"))),
    };

    for entry in &tree.entries {
        let path = join_path(prefix, &entry.name);

        if entry.mode.is_tree() {
            let dir = work_tree.join(path.to_str_lossy().as_ref());
            std::fs::create_dir_all(&dir)?;
            checkout_recursive(odb, &entry.oid, work_tree, &path)?;
        } else {
            write_blob_entry(odb, work_tree, &path, &entry.oid, entry.mode)?;
        }
    }
    Ok(())
}

/// Check out exactly the stage-0 entries of `index` onto the working tree.
/// Used by the stepper after a merge has populated (possibly conflicted)
/// index entries — conflicted paths are left for the caller to resolve and
/// are not written here.
pub(crate) fn checkout_index_to_worktree(
    odb: &ObjectDatabase,
    index: &Index,
    work_tree: &Path,
) -> Result<(), RebaseError> {
    for entry in index.iter() {
        if entry.stage != Stage::Normal {
            continue;
        }
        write_blob_entry(odb, work_tree, &entry.path, &entry.oid, entry.mode)?;
    }
    Ok(())
}

fn write_blob_entry(
    odb: &ObjectDatabase,
    work_tree: &Path,
    path: &BString,
    oid: &ObjectId,
    mode: FileMode,
) -> Result<(), RebaseError> {
    let file_path = work_tree.join(path.to_str_lossy().as_ref());
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let blob = odb
        .read(oid)?
        .ok_or_else(|| RebaseError::Corrupt(format!("missing blob object {oid}")))?;
    let data = match blob {
        Object::Blob(b) => b.data,
        _ => return Err(RebaseError::Corrupt(format!("{oid} is not a blob"))),
    };
    std::fs::write(&file_path, &data)?;
    #[cfg(unix)]
    if mode == FileMode::Executable {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&file_path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

fn join_path(prefix: &BString, name: &BString) -> BString {
    if prefix.is_empty() {
        name.clone()
    } else {
        let mut p = prefix.clone();
        p.push_byte(b'/');
        p.extend_from_slice(name);
        p
    }
}

/// Remove working-tree files that are not stage-0 entries of `index`, and
/// any directory left empty once its stale children are gone. `.git` at
/// the root of `work_tree` is never touched.
fn prune_worktree_to_index(index: &Index, work_tree: &Path) -> Result<(), RebaseError> {
    let keep: HashSet<String> = index
        .iter()
        .filter(|e| e.stage == Stage::Normal)
        .map(|e| e.path.to_str_lossy().into_owned())
        .collect();
    remove_stale(work_tree, work_tree, &keep)
}

fn remove_stale(root: &Path, dir: &Path, keep: &HashSet<String>) -> Result<(), RebaseError> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(());
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if dir == root && entry.file_name() == std::ffi::OsStr::new(".git") {
            continue;
        }
        if entry.file_type()?.is_dir() {
            remove_stale(root, &path, keep)?;
            if std::fs::read_dir(&path)?.next().is_none() {
                std::fs::remove_dir(&path)?;
            }
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            if !keep.contains(rel.as_str()) {
                std::fs::remove_file(&path)?;
            }
        }
    }
    Ok(())
}

/// Hard-reset the index and working tree to the tree of `commit_oid`,
/// removing any working-tree file the new tree doesn't account for.
pub(crate) fn hard_reset_to_tree(
    repo: &mut Repository,
    tree_oid: &ObjectId,
) -> Result<(), RebaseError> {
    let mut new_index = Index::new();
    build_index_from_tree(repo.odb(), tree_oid, &BString::from(""), &mut new_index)?;

    if let Some(work_tree) = repo.work_tree().map(Path::to_path_buf) {
        prune_worktree_to_index(&new_index, &work_tree)?;
        checkout_tree_to_worktree(repo.odb(), tree_oid, &work_tree)?;
    }

    repo.set_index(new_index);
    repo.write_index()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_object::{Blob, Tree, TreeEntry};
    use tempfile::tempdir;

    fn write_blob(odb: &ObjectDatabase, data: &[u8]) -> ObjectId {
        odb.write(&Object::Blob(Blob {
            data: data.to_vec(),
        }))
        .unwrap()
    }

    #[test]
    fn build_index_from_tree_flattens_nested_directories() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let odb = repo.odb();

        let inner_blob = write_blob(odb, b"inner");
        let inner_tree = odb
            .write(&Object::Tree(Tree {
                entries: vec![TreeEntry {
                    mode: FileMode::Regular,
                    name: BString::from("b.txt"),
                    oid: inner_blob,
                }],
            }))
            .unwrap();
        let outer_blob = write_blob(odb, b"outer");
        let root_tree = odb
            .write(&Object::Tree(Tree {
                entries: vec![
                    TreeEntry {
                        mode: FileMode::Regular,
                        name: BString::from("a.txt"),
                        oid: outer_blob,
                    },
                    TreeEntry {
                        mode: FileMode::Tree,
                        name: BString::from("sub"),
                        oid: inner_tree,
                    },
                ],
            }))
            .unwrap();

        let mut index = Index::new();
        build_index_from_tree(odb, &root_tree, &BString::from(""), &mut index).unwrap();

        assert_eq!(index.len(), 2);
        assert!(index.get(b"a.txt".as_bstr(), Stage::Normal).is_some());
        assert!(index.get(b"sub/b.txt".as_bstr(), Stage::Normal).is_some());
    }

    #[test]
    fn checkout_tree_to_worktree_writes_nested_files() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let odb = repo.odb();

        let blob = write_blob(odb, b"hello\n");
        let inner_tree = odb
            .write(&Object::Tree(Tree {
                entries: vec![TreeEntry {
                    mode: FileMode::Regular,
                    name: BString::from("f.txt"),
                    oid: blob,
                }],
            }))
            .unwrap();
        let root_tree = odb
            .write(&Object::Tree(Tree {
                entries: vec![TreeEntry {
                    mode: FileMode::Tree,
                    name: BString::from("dir"),
                    oid: inner_tree,
                }],
            }))
            .unwrap();

        let work_tree = dir.path().join("wt");
        std::fs::create_dir_all(&work_tree).unwrap();
        checkout_tree_to_worktree(odb, &root_tree, &work_tree).unwrap();

        let content = std::fs::read(work_tree.join("dir").join("f.txt")).unwrap();
        assert_eq!(content, b"hello\n");
    }

    #[test]
    fn hard_reset_to_tree_removes_files_absent_from_target() {
        let dir = tempdir().unwrap();
        let mut repo = Repository::init(dir.path()).unwrap();
        let odb = repo.odb();

        let blob = write_blob(odb, b"a\n");
        let tree = odb
            .write(&Object::Tree(Tree {
                entries: vec![TreeEntry {
                    mode: FileMode::Regular,
                    name: BString::from("a.txt"),
                    oid: blob,
                }],
            }))
            .unwrap();

        let work_tree = repo.work_tree().unwrap().to_path_buf();
        std::fs::create_dir_all(work_tree.join("sub")).unwrap();
        std::fs::write(work_tree.join("a.txt"), b"stale\n").unwrap();
        std::fs::write(work_tree.join("stray.txt"), b"stale\n").unwrap();
        std::fs::write(work_tree.join("sub").join("leftover.txt"), b"stale\n").unwrap();

        hard_reset_to_tree(&mut repo, &tree).unwrap();

        assert_eq!(std::fs::read(work_tree.join("a.txt")).unwrap(), b"a\n");
        assert!(!work_tree.join("stray.txt").exists());
        assert!(!work_tree.join("sub").exists());
    }
}
