//! On-disk state directory for an in-progress rebase, and the typed model
//! loaded from it.
//!
//! Each file under the state directory holds exactly one value: a hex OID,
//! a decimal counter, or a display string. Writers truncate and write the
//! whole value followed by a single `\n`; the rewrite log is the one
//! exception, opened for append. This mirrors the way `git-ref`'s loose
//! ref files are read and written — one file, one value, trimmed on read —
//! rather than a generic structured record, so a crash between two writes
//! degrades to "missing optional file", not a torn record.

use std::fs;
use std::path::{Path, PathBuf};

use bstr::BString;
use git_hash::ObjectId;
use git_ref::RefName;
use git_repository::Repository;

use crate::RebaseError;

const MERGE_DIR: &str = "rebase-merge";
const APPLY_DIR: &str = "rebase-apply";

/// Which kind of rebase state is on disk, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// No rebase in progress.
    None,
    /// Patch-application ("am"-style) rebase. Detected, never executed.
    Apply,
    /// Interactive rebase (todo list). Detected, never executed.
    Interactive,
    /// The only flavor this engine actually replays.
    Merge,
}

/// A commit-tip descriptor supplied by the caller: an OID, its canonical
/// hex form, and the fully qualified ref that produced it, if any.
#[derive(Debug, Clone)]
pub struct CommitTip {
    pub oid: ObjectId,
    pub oid_str: String,
    pub ref_name: Option<RefName>,
}

impl CommitTip {
    pub fn new(oid: ObjectId, ref_name: Option<RefName>) -> Self {
        let oid_str = oid.to_hex();
        Self {
            oid,
            oid_str,
            ref_name,
        }
    }
}

/// The in-memory representation of an in-progress merge-flavor rebase.
#[derive(Debug, Clone)]
pub struct RebaseState {
    pub state_path: PathBuf,
    pub head_detached: bool,
    pub orig_head_name: Option<String>,
    pub orig_head_id: ObjectId,
    pub onto_id: ObjectId,
    pub step: u32,
    pub end: u32,
    pub onto_name: String,
    pub current: Option<ObjectId>,
}

/// Directory a merge-flavor rebase would live in (whether or not it exists).
pub(crate) fn merge_dir(repo: &Repository) -> PathBuf {
    repo.git_dir().join(MERGE_DIR)
}

/// Directory an apply-flavor rebase would live in.
pub(crate) fn apply_dir(repo: &Repository) -> PathBuf {
    repo.git_dir().join(APPLY_DIR)
}

/// Probe which flavor of rebase is in progress, if any.
pub(crate) fn probe_flavor(repo: &Repository) -> Flavor {
    if apply_dir(repo).is_dir() {
        Flavor::Apply
    } else if merge_dir(repo).is_dir() {
        if merge_dir(repo).join("interactive").is_file() {
            Flavor::Interactive
        } else {
            Flavor::Merge
        }
    } else {
        Flavor::None
    }
}

pub(crate) fn in_progress(repo: &Repository) -> bool {
    !matches!(probe_flavor(repo), Flavor::None)
}

fn read_optional(path: &Path) -> Result<Option<String>, RebaseError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.trim_end().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_mandatory(path: &Path, what: &str) -> Result<String, RebaseError> {
    read_optional(path)?.ok_or_else(|| RebaseError::Corrupt(format!("missing {what}")))
}

fn write_value(path: &Path, content: &str) -> Result<(), RebaseError> {
    fs::write(path, format!("{content}\n"))?;
    Ok(())
}

fn parse_oid(hex: &str, what: &str) -> Result<ObjectId, RebaseError> {
    ObjectId::from_hex(hex).map_err(|_| RebaseError::Corrupt(format!("invalid {what}: {hex}")))
}

fn parse_u32(value: &str, what: &str) -> Result<u32, RebaseError> {
    value
        .parse()
        .map_err(|_| RebaseError::Corrupt(format!("invalid {what}: {value}")))
}

pub(crate) fn write_head_name(dir: &Path, value: &str) -> Result<(), RebaseError> {
    write_value(&dir.join("head-name"), value)
}

pub(crate) fn write_orig_head(dir: &Path, oid: &ObjectId) -> Result<(), RebaseError> {
    write_value(&dir.join("orig-head"), &oid.to_hex())
}

pub(crate) fn write_onto(dir: &Path, oid: &ObjectId) -> Result<(), RebaseError> {
    write_value(&dir.join("onto"), &oid.to_hex())
}

pub(crate) fn write_onto_name(dir: &Path, name: &str) -> Result<(), RebaseError> {
    write_value(&dir.join("onto_name"), name)
}

pub(crate) fn write_quiet(dir: &Path, quiet: bool) -> Result<(), RebaseError> {
    write_value(&dir.join("quiet"), if quiet { "t" } else { "" })
}

pub(crate) fn write_msgnum(dir: &Path, step: u32) -> Result<(), RebaseError> {
    write_value(&dir.join("msgnum"), &step.to_string())
}

pub(crate) fn write_end(dir: &Path, end: u32) -> Result<(), RebaseError> {
    write_value(&dir.join("end"), &end.to_string())
}

pub(crate) fn write_cmt(dir: &Path, i: u32, oid: &ObjectId) -> Result<(), RebaseError> {
    write_value(&dir.join(format!("cmt.{i}")), &oid.to_hex())
}

pub(crate) fn write_current(dir: &Path, oid: &ObjectId) -> Result<(), RebaseError> {
    write_value(&dir.join("current"), &oid.to_hex())
}

pub(crate) fn append_rewritten(
    dir: &Path,
    old: &ObjectId,
    new: &ObjectId,
) -> Result<(), RebaseError> {
    use std::io::Write;
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("rewritten"))?;
    writeln!(f, "{} {}", old.to_hex(), new.to_hex())?;
    Ok(())
}

pub(crate) fn read_head_name(dir: &Path) -> Result<String, RebaseError> {
    read_mandatory(&dir.join("head-name"), "head-name")
}

pub(crate) fn read_orig_head(dir: &Path) -> Result<ObjectId, RebaseError> {
    let hex = match read_optional(&dir.join("orig-head"))? {
        Some(hex) => hex,
        None => read_mandatory(&dir.join("head"), "orig-head")?,
    };
    parse_oid(&hex, "orig-head")
}

pub(crate) fn read_onto(dir: &Path) -> Result<ObjectId, RebaseError> {
    let hex = read_mandatory(&dir.join("onto"), "onto")?;
    parse_oid(&hex, "onto")
}

pub(crate) fn read_onto_name(dir: &Path) -> Result<String, RebaseError> {
    read_mandatory(&dir.join("onto_name"), "onto_name")
}

pub(crate) fn read_end(dir: &Path) -> Result<u32, RebaseError> {
    let value = read_mandatory(&dir.join("end"), "end")?;
    parse_u32(&value, "end")
}

pub(crate) fn read_msgnum(dir: &Path) -> Result<u32, RebaseError> {
    match read_optional(&dir.join("msgnum"))? {
        Some(value) => parse_u32(&value, "msgnum"),
        None => Ok(0),
    }
}

pub(crate) fn read_current(dir: &Path) -> Result<Option<ObjectId>, RebaseError> {
    match read_optional(&dir.join("current"))? {
        Some(hex) => Ok(Some(parse_oid(&hex, "current")?)),
        None => Ok(None),
    }
}

pub(crate) fn read_cmt(dir: &Path, i: u32) -> Result<ObjectId, RebaseError> {
    let hex = read_mandatory(&dir.join(format!("cmt.{i}")), &format!("cmt.{i}"))?;
    parse_oid(&hex, &format!("cmt.{i}"))
}

/// Parse a fully written `rewritten` file into `(old, new)` pairs.
///
/// Mirrors `rebase_copy_notes`: each line is two `HEXSZ`-length hex
/// substrings separated by a single space.
pub(crate) fn read_rewritten(dir: &Path) -> Result<Vec<(ObjectId, ObjectId)>, RebaseError> {
    let path = dir.join("rewritten");
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut pairs = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;
        let (old_hex, new_hex) = line.split_once(' ').ok_or_else(|| {
            RebaseError::Corrupt(format!("invalid rewritten file at line {lineno}"))
        })?;
        let old = ObjectId::from_hex(old_hex).map_err(|_| {
            RebaseError::Corrupt(format!("invalid rewritten file at line {lineno}"))
        })?;
        let new = ObjectId::from_hex(new_hex).map_err(|_| {
            RebaseError::Corrupt(format!("invalid rewritten file at line {lineno}"))
        })?;
        pairs.push((old, new));
    }
    Ok(pairs)
}

/// Load the in-progress merge-flavor rebase state.
///
/// Fails with [`RebaseError::NotFound`] if no state directory exists, and
/// [`RebaseError::Unsupported`] if the on-disk state is an apply or
/// interactive rebase this engine does not replay.
pub fn load(repo: &Repository) -> Result<RebaseState, RebaseError> {
    match probe_flavor(repo) {
        Flavor::None => return Err(RebaseError::NotFound),
        Flavor::Apply => return Err(RebaseError::Unsupported("apply (am-style) rebase")),
        Flavor::Interactive => return Err(RebaseError::Unsupported("interactive rebase")),
        Flavor::Merge => {}
    }

    let dir = merge_dir(repo);

    let head_name_raw = read_head_name(&dir)?;
    let (head_detached, orig_head_name) = if head_name_raw == "detached HEAD" {
        (true, None)
    } else {
        (false, Some(head_name_raw))
    };

    let orig_head_id = read_orig_head(&dir)?;
    let onto_id = read_onto(&dir)?;
    let end = read_end(&dir)?;
    let onto_name = read_onto_name(&dir)?;
    let step = read_msgnum(&dir)?;
    let current = read_current(&dir)?;

    Ok(RebaseState {
        state_path: dir,
        head_detached,
        orig_head_name,
        orig_head_id,
        onto_id,
        step,
        end,
        onto_name,
        current,
    })
}

/// Remove the state directory, tearing down the in-progress rebase.
pub(crate) fn remove(state_path: &Path) -> Result<(), RebaseError> {
    if state_path.is_dir() {
        fs::remove_dir_all(state_path)?;
    }
    Ok(())
}

pub(crate) fn orig_head_ref_name(state: &RebaseState) -> Result<Option<RefName>, RebaseError> {
    match &state.orig_head_name {
        Some(name) => Ok(Some(RefName::new(BString::from(name.as_str()))?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn oid(hex: &str) -> ObjectId {
        ObjectId::from_hex(hex).unwrap()
    }

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn write_and_read_scalar_files_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path();

        write_head_name(path, "refs/heads/topic").unwrap();
        write_orig_head(path, &oid(A)).unwrap();
        write_onto(path, &oid(B)).unwrap();
        write_onto_name(path, "master").unwrap();
        write_end(path, 3).unwrap();
        write_msgnum(path, 1).unwrap();
        write_current(path, &oid(A)).unwrap();

        assert_eq!(read_head_name(path).unwrap(), "refs/heads/topic");
        assert_eq!(read_orig_head(path).unwrap(), oid(A));
        assert_eq!(read_onto(path).unwrap(), oid(B));
        assert_eq!(read_onto_name(path).unwrap(), "master");
        assert_eq!(read_end(path).unwrap(), 3);
        assert_eq!(read_msgnum(path).unwrap(), 1);
        assert_eq!(read_current(path).unwrap(), Some(oid(A)));
    }

    #[test]
    fn msgnum_and_current_default_when_absent() {
        let dir = tempdir().unwrap();
        assert_eq!(read_msgnum(dir.path()).unwrap(), 0);
        assert_eq!(read_current(dir.path()).unwrap(), None);
    }

    #[test]
    fn orig_head_falls_back_to_legacy_head_file() {
        let dir = tempdir().unwrap();
        write_value(&dir.path().join("head"), A).unwrap();
        assert_eq!(read_orig_head(dir.path()).unwrap(), oid(A));
    }

    #[test]
    fn orig_head_prefers_orig_head_over_legacy_head() {
        let dir = tempdir().unwrap();
        write_value(&dir.path().join("head"), A).unwrap();
        write_orig_head(dir.path(), &oid(B)).unwrap();
        assert_eq!(read_orig_head(dir.path()).unwrap(), oid(B));
    }

    #[test]
    fn rewritten_round_trips_multiple_lines() {
        let dir = tempdir().unwrap();
        append_rewritten(dir.path(), &oid(A), &oid(B)).unwrap();
        append_rewritten(dir.path(), &oid(B), &oid(A)).unwrap();
        let pairs = read_rewritten(dir.path()).unwrap();
        assert_eq!(pairs, vec![(oid(A), oid(B)), (oid(B), oid(A))]);
    }

    #[test]
    fn rewritten_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert_eq!(read_rewritten(dir.path()).unwrap(), Vec::new());
    }

    #[test]
    fn rewritten_malformed_line_is_corrupt() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("rewritten"), "not-a-valid-line\n").unwrap();
        let err = read_rewritten(dir.path()).unwrap_err();
        assert!(matches!(err, RebaseError::Corrupt(_)));
    }

    #[test]
    fn probe_flavor_reports_none_without_directories() {
        let dir = tempdir().unwrap();
        let repo = git_repository::Repository::init(dir.path()).unwrap();
        assert_eq!(probe_flavor(&repo), Flavor::None);
        assert!(!in_progress(&repo));
    }

    #[test]
    fn probe_flavor_detects_apply_before_merge() {
        let dir = tempdir().unwrap();
        let repo = git_repository::Repository::init(dir.path()).unwrap();
        fs::create_dir_all(apply_dir(&repo)).unwrap();
        fs::create_dir_all(merge_dir(&repo)).unwrap();
        assert_eq!(probe_flavor(&repo), Flavor::Apply);
    }

    #[test]
    fn probe_flavor_detects_interactive_marker() {
        let dir = tempdir().unwrap();
        let repo = git_repository::Repository::init(dir.path()).unwrap();
        let merge = merge_dir(&repo);
        fs::create_dir_all(&merge).unwrap();
        fs::write(merge.join("interactive"), "").unwrap();
        assert_eq!(probe_flavor(&repo), Flavor::Interactive);
    }
}
