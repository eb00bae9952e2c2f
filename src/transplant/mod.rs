//! File Transplanter
//!
//! Copies an exported `.ibd`/`.cfg` pair into the target table's directory,
//! overwriting the placeholder files the empty target table left behind.
//!
//! Two constraints carry the correctness here:
//! - the copy must be durable (fsynced) before the export lock on the
//!   source is released, otherwise the source may mutate the files
//!   mid-copy;
//! - ownership must match the identity the target server runs as before
//!   `IMPORT TABLESPACE` is issued, or the server rejects the tablespace
//!   with a permission error rather than a data error.
//!
//! Files land with mode 0660, matching what the server creates itself.

mod errors;

pub use errors::{CopyError, CopyResult};

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::export::TablespaceArtifact;

/// Numeric identity the target server process runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOwner {
    pub uid: u32,
    pub gid: u32,
}

/// Copy the artifact's `.ibd` and `.cfg` into `target_dir`.
///
/// Blocking I/O; callers on an async runtime should wrap this in
/// `spawn_blocking`. The `.ibd` is copied first so that a failure on the
/// small `.cfg` cannot leave a config file referencing absent data.
pub fn transplant(
    artifact: &TablespaceArtifact,
    target_dir: &Path,
    owner: Option<FileOwner>,
) -> CopyResult<()> {
    for src in [&artifact.ibd, &artifact.cfg] {
        if !src.is_file() {
            return Err(CopyError::MissingSource(src.clone()));
        }
        let file_name = src
            .file_name()
            .ok_or_else(|| CopyError::MissingSource(src.clone()))?;
        let dst = target_dir.join(file_name);

        copy_file_with_fsync(src, &dst)?;
        apply_file_identity(&dst, owner)?;
    }

    fsync_dir(target_dir)
}

/// Stream-copy `src` to `dst` and fsync the destination.
fn copy_file_with_fsync(src: &Path, dst: &Path) -> CopyResult<()> {
    let mut src_file = File::open(src).map_err(|e| CopyError::io_at(src, e))?;
    let mut dst_file = File::create(dst).map_err(|e| CopyError::io_at(dst, e))?;

    io::copy(&mut src_file, &mut dst_file).map_err(|e| CopyError::io_at(dst, e))?;
    dst_file.sync_all().map_err(|e| CopyError::io_at(dst, e))?;
    Ok(())
}

/// Set mode 0660 and, when configured, the target server's uid/gid.
fn apply_file_identity(path: &Path, owner: Option<FileOwner>) -> CopyResult<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o660))
        .map_err(|e| CopyError::io_at(path, e))?;

    if let Some(FileOwner { uid, gid }) = owner {
        std::os::unix::fs::chown(path, Some(uid), Some(gid)).map_err(|e| CopyError::Chown {
            path: path.to_path_buf(),
            uid,
            gid,
            source: e,
        })?;
    }
    Ok(())
}

/// fsync a directory so the new entries are durable.
fn fsync_dir(dir: &Path) -> CopyResult<()> {
    let d = OpenOptions::new()
        .read(true)
        .open(dir)
        .map_err(|e| CopyError::io_at(dir, e))?;
    d.sync_all().map_err(|e| CopyError::io_at(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    fn artifact_in(dir: &Path, table: &str) -> TablespaceArtifact {
        let ibd = dir.join(format!("{}.ibd", table));
        let cfg = dir.join(format!("{}.cfg", table));
        fs::write(&ibd, b"ibd pages").unwrap();
        fs::write(&cfg, b"cfg metadata").unwrap();
        TablespaceArtifact {
            table: table.to_string(),
            ibd,
            cfg,
        }
    }

    #[test]
    fn test_transplant_copies_both_files() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let artifact = artifact_in(source.path(), "employees");

        transplant(&artifact, target.path(), None).unwrap();

        assert_eq!(
            fs::read(target.path().join("employees.ibd")).unwrap(),
            b"ibd pages"
        );
        assert_eq!(
            fs::read(target.path().join("employees.cfg")).unwrap(),
            b"cfg metadata"
        );
    }

    #[test]
    fn test_transplant_overwrites_placeholder_files() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let artifact = artifact_in(source.path(), "salaries");

        fs::write(target.path().join("salaries.ibd"), b"placeholder").unwrap();

        transplant(&artifact, target.path(), None).unwrap();

        assert_eq!(
            fs::read(target.path().join("salaries.ibd")).unwrap(),
            b"ibd pages"
        );
    }

    #[test]
    fn test_transplant_sets_mode_0660() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let artifact = artifact_in(source.path(), "employees");

        transplant(&artifact, target.path(), None).unwrap();

        let mode = fs::metadata(target.path().join("employees.ibd"))
            .unwrap()
            .mode();
        assert_eq!(mode & 0o777, 0o660);
    }

    #[test]
    fn test_transplant_missing_ibd_fails_before_writing() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let cfg = source.path().join("employees.cfg");
        fs::write(&cfg, b"cfg").unwrap();
        let artifact = TablespaceArtifact {
            table: "employees".to_string(),
            ibd: source.path().join("employees.ibd"),
            cfg,
        };

        let err = transplant(&artifact, target.path(), None).unwrap_err();
        assert!(matches!(err, CopyError::MissingSource(_)));
        assert!(!target.path().join("employees.cfg").exists());
    }

    #[test]
    fn test_transplant_keeps_current_owner_when_unconfigured() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let artifact = artifact_in(source.path(), "employees");

        transplant(&artifact, target.path(), None).unwrap();

        let meta = fs::metadata(target.path().join("employees.ibd")).unwrap();
        let self_meta = fs::metadata(source.path()).unwrap();
        assert_eq!(meta.uid(), self_meta.uid());
    }
}
