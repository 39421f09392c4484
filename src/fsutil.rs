//! Small durable-file helpers shared by the metadata store and the disk
//! queues.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
};

use rand::Rng;

/// Reads the whole file; a missing file reads as `None`.
pub fn read_or_empty(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Creates or truncates `path` with mode 0600, writes `data` and fsyncs it.
pub fn write_sync_file(
    path: &Path,
    data: &[u8],
) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// `<path>.<random>.tmp`, next to `path` so the final rename stays on one
/// filesystem.
pub fn temp_path(path: &Path) -> PathBuf {
    let suffix: u32 = rand::thread_rng().gen();
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{suffix}.tmp"));
    PathBuf::from(name)
}

/// Replaces `path` with `data` atomically: readers see either the old or
/// the new content, never a partial write.
///
/// The temporary file is removed when writing or renaming fails.
pub fn atomic_write(
    path: &Path,
    data: &[u8],
) -> io::Result<()> {
    let tmp = temp_path(path);
    let result = write_sync_file(&tmp, data).and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn test_read_or_empty_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_or_empty(&dir.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.dat");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(read_or_empty(&path).unwrap().unwrap(), b"second");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    /// No temporary files are left behind after successful writes.
    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.dat");
        atomic_write(&path, b"x").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("state.dat")]);
    }

    /// A failed rename removes the temporary file.
    #[test]
    fn test_atomic_write_cleans_up_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        // Renaming a file over a non-empty directory fails.
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"k").unwrap();

        assert!(atomic_write(&target, b"data").is_err());

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let path = Path::new("/data/ferrumqd.dat");
        let tmp = temp_path(path);
        assert_eq!(tmp.parent(), path.parent());
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ferrumqd.dat."));
        assert!(name.ends_with(".tmp"));
    }
}
