//! Filesystem helpers

use std::fs;
use std::io::Write;
use std::path::Path;

use super::error::{Result, TrustError};

/// Check that `path` exists and is a regular file
pub fn check_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(TrustError::Config(format!(
            "File does not exist: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(TrustError::Config(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Read a whole file after checking it exists
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    check_file_exists(path)?;

    fs::read(path).map_err(TrustError::Io)
}

/// Whether the current process can open `path` for reading
///
/// Cheaper and quieter than letting the dynamic loader fail on a missing file.
pub fn is_readable(path: &Path) -> bool {
    path.is_file() && fs::File::open(path).is_ok()
}

/// Replace the contents of `path` without leaving a torn file behind
///
/// The data is written to a sibling temporary file which is then renamed over
/// the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    {
        let mut file = fs::File::create(tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        TrustError::Io(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_check_file_exists() {
        let path = PathBuf::from("Cargo.toml");
        assert!(check_file_exists(&path).is_ok(), "Cargo.toml should exist");

        let path = PathBuf::from("non_existent_file.txt");
        assert!(check_file_exists(&path).is_err());

        let path = PathBuf::from("src");
        assert!(check_file_exists(&path).is_err(), "a directory is not a file");
    }

    #[test]
    fn test_read_file() {
        let content = read_file(Path::new("Cargo.toml")).unwrap();
        assert!(!content.is_empty());

        assert!(read_file(Path::new("non_existent_file.txt")).is_err());
    }

    #[test]
    fn test_is_readable() {
        assert!(is_readable(Path::new("Cargo.toml")));
        assert!(!is_readable(Path::new("src")));
        assert!(!is_readable(Path::new("/definitely/not/here.so")));
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rules.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!dir.path().join("nested").join("rules.json.tmp").exists());
    }
}
