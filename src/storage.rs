//! Writing fetched previews to disk.
//!
//! Layout under the output root:
//!
//! ```text
//! <root>/2024-01-01_12-00-00.jpg              rotation off
//! <root>/2024-01-01/2024-01-01_12-00-00.jpg   rotation on
//! <root>/2024-01-01/2024-01-01_12-00-00_1.jpg second save in the same second
//! ```
//!
//! Names come from the local wall-clock time of the poll.  Files are never
//! overwritten: a clashing name gets a `_N` counter instead.  Bytes go to a
//! hidden temporary file in the target directory first and are then linked
//! into place, so a half-written image is never visible under its final name.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tempfile::NamedTempFile;

use crate::error::StorageError;

/// `strftime` pattern of the per-day subdirectory.
const DATE_DIR_FORMAT: &str = "%Y-%m-%d";

/// `strftime` pattern of a saved file's stem.
const FILE_STEM_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Upper bound on `_N` suffixes tried before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Decides where previews go and writes them there.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    /// Group files into one subdirectory per calendar day.
    rotate: bool,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, rotate: bool) -> Self {
        Self {
            root: root.into(),
            rotate,
        }
    }

    /// Directory a file saved at `now` belongs in.
    pub fn target_dir(&self, now: &DateTime<Local>) -> PathBuf {
        if self.rotate {
            self.root.join(now.format(DATE_DIR_FORMAT).to_string())
        } else {
            self.root.clone()
        }
    }

    /// Write `bytes` as a new file and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the directory cannot be created, the
    /// bytes cannot be written, or every candidate name is taken.  Nothing is
    /// left behind under a final name in any of these cases.
    pub fn save(
        &self,
        bytes: &[u8],
        extension: &str,
        now: DateTime<Local>,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.target_dir(&now);
        ensure_dir(&dir)?;

        let write_err = |source| StorageError::Write {
            path: dir.clone(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".ttv-snap-")
            .suffix(".part")
            .tempfile_in(&dir)
            .map_err(write_err)?;
        tmp.write_all(bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        let stem = now.format(FILE_STEM_FORMAT).to_string();
        persist_unique(tmp, &dir, &stem, extension)
    }
}

/// Create `dir` and any missing parents.  Succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Move `tmp` to the first free name among `stem.ext`, `stem_1.ext`, ...
fn persist_unique(
    mut tmp: NamedTempFile,
    dir: &Path,
    stem: &str,
    extension: &str,
) -> Result<PathBuf, StorageError> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.{extension}")
        } else {
            format!("{stem}_{attempt}.{extension}")
        };
        let path = dir.join(name);

        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => {
                return Err(StorageError::Write {
                    path,
                    source: e.error,
                })
            }
        }
    }

    Err(StorageError::NameExhausted {
        stem: dir.join(stem),
        attempts: MAX_NAME_ATTEMPTS,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    /// Names of all entries in `dir`, sorted.
    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn saves_exact_bytes_under_root_without_rotation() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path(), false);

        let path = storage
            .save(b"B1", "jpg", at(2024, 1, 1, 12, 0, 0))
            .unwrap();

        assert_eq!(path, tmp.path().join("2024-01-01_12-00-00.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"B1");
        assert_eq!(entries(tmp.path()), vec!["2024-01-01_12-00-00.jpg"]);
    }

    #[test]
    fn rotation_puts_file_in_date_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path(), true);

        let path = storage
            .save(b"B1", "jpg", at(2024, 3, 9, 8, 7, 6))
            .unwrap();

        assert_eq!(
            path,
            tmp.path().join("2024-03-09").join("2024-03-09_08-07-06.jpg")
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"B1");
    }

    #[test]
    fn same_day_shares_directory_with_distinct_names() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path(), true);

        let first = storage.save(b"B1", "jpg", at(2024, 1, 1, 0, 0, 0)).unwrap();
        let third = storage.save(b"B2", "jpg", at(2024, 1, 1, 0, 10, 0)).unwrap();

        assert_eq!(first.parent(), third.parent());
        assert_ne!(first, third);
        assert_eq!(std::fs::read(&third).unwrap(), b"B2");
    }

    #[test]
    fn different_days_land_in_different_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path(), true);

        let a = storage.save(b"A", "jpg", at(2024, 1, 1, 23, 59, 0)).unwrap();
        let b = storage.save(b"B", "jpg", at(2024, 1, 2, 0, 1, 0)).unwrap();

        assert_ne!(a.parent(), b.parent());
        assert_eq!(entries(tmp.path()), vec!["2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn name_collision_gets_counter_and_keeps_original() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path(), false);
        let now = at(2024, 1, 1, 12, 0, 0);

        let first = storage.save(b"first", "jpg", now).unwrap();
        let second = storage.save(b"second", "jpg", now).unwrap();
        let third = storage.save(b"third", "jpg", now).unwrap();

        assert_eq!(second, tmp.path().join("2024-01-01_12-00-00_1.jpg"));
        assert_eq!(third, tmp.path().join("2024-01-01_12-00-00_2.jpg"));
        assert_eq!(std::fs::read(&first).unwrap(), b"first");
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
        assert_eq!(std::fs::read(&third).unwrap(), b"third");
    }

    #[test]
    fn no_temporary_files_remain_after_save() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path(), false);
        let now = at(2024, 1, 1, 12, 0, 0);

        storage.save(b"x", "jpg", now).unwrap();
        storage.save(b"y", "jpg", now).unwrap();

        assert!(entries(tmp.path()).iter().all(|n| !n.starts_with('.')));
    }

    #[test]
    fn ensure_dir_is_idempotent_and_preserves_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");

        ensure_dir(&dir).unwrap();
        std::fs::write(dir.join("keep.jpg"), b"keep").unwrap();
        ensure_dir(&dir).unwrap();

        assert_eq!(entries(&dir), vec!["keep.jpg"]);
        assert_eq!(std::fs::read(dir.join("keep.jpg")).unwrap(), b"keep");
    }

    #[test]
    fn root_that_is_a_file_is_a_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();
        let storage = Storage::new(&file, true);

        let err = storage
            .save(b"x", "jpg", at(2024, 1, 1, 0, 0, 0))
            .unwrap_err();
        assert!(matches!(err, StorageError::CreateDir { .. }), "got {err:?}");
    }
}
