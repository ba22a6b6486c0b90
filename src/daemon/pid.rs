// PID file management for the daemon process

use crate::error::Result;
use std::cell::Cell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default PID file location
pub const DEFAULT_PID_FILE: &str = "./daemon.pid";

/// Record of the running daemon's process id.
///
/// Presence of a record is what blocks a second `start`; the backend decides
/// where that record lives. `PidFile` is the real one, `MemoryGuard` keeps
/// the record in memory so controller logic can be exercised without a
/// filesystem.
pub trait InstanceGuard {
    /// The recorded PID, or `None` if there is no usable record
    fn read(&self) -> Option<i32>;

    /// Create or overwrite the record
    fn write(&self, pid: i32) -> Result<()>;

    /// Delete the record; deleting a missing record is not an error
    fn remove(&self) -> Result<()>;

    /// Where the record lives, for messages and for the detacher
    fn path(&self) -> &Path;
}

/// Parse PID file content. Zero and negative values are rejected since
/// `kill` would treat them as process groups.
pub fn parse_pid(content: &str) -> Option<i32> {
    content.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}

/// File-backed instance guard
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Create a new PID file manager with default path
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PID_FILE),
        }
    }

    /// Create a new PID file manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Check if the PID file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl Default for PidFile {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceGuard for PidFile {
    fn read(&self) -> Option<i32> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Cannot read PID file {}: {}", self.path.display(), e);
                return None;
            }
        };

        let pid = parse_pid(&content);
        if pid.is_none() {
            tracing::warn!(
                "Ignoring PID file {} with invalid content {:?}",
                self.path.display(),
                content.trim()
            );
        }
        pid
    }

    fn write(&self, pid: i32) -> Result<()> {
        fs::write(&self.path, pid.to_string())?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// In-memory instance guard
#[derive(Debug)]
pub struct MemoryGuard {
    pid: Cell<Option<i32>>,
    path: PathBuf,
}

impl MemoryGuard {
    /// Empty guard, as if no daemon had ever run
    pub fn new() -> Self {
        Self {
            pid: Cell::new(None),
            path: PathBuf::from("<memory>"),
        }
    }

    /// Guard that already holds a record for `pid`
    pub fn holding(pid: i32) -> Self {
        let guard = Self::new();
        guard.pid.set(Some(pid));
        guard
    }
}

impl Default for MemoryGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceGuard for MemoryGuard {
    fn read(&self) -> Option<i32> {
        self.pid.get()
    }

    fn write(&self, pid: i32) -> Result<()> {
        self.pid.set(Some(pid));
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.pid.set(None);
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pid_file_in(dir: &TempDir) -> PidFile {
        PidFile::with_path(dir.path().join("daemon.pid"))
    }

    #[test]
    fn test_write_and_read_pid() {
        let dir = TempDir::new().unwrap();
        let pid_file = pid_file_in(&dir);

        pid_file.write(54321).unwrap();

        assert_eq!(pid_file.read(), Some(54321));
        assert_eq!(fs::read_to_string(pid_file.path()).unwrap(), "54321");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let pid_file = pid_file_in(&dir);

        assert!(!pid_file.exists());
        assert_eq!(pid_file.read(), None);
    }

    #[test]
    fn test_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let pid_file = pid_file_in(&dir);

        pid_file.write(111111).unwrap();
        pid_file.write(22).unwrap();

        assert_eq!(fs::read_to_string(pid_file.path()).unwrap(), "22");
    }

    #[test]
    fn test_read_tolerates_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let pid_file = pid_file_in(&dir);
        fs::write(pid_file.path(), "12345\n").unwrap();

        assert_eq!(pid_file.read(), Some(12345));
    }

    #[test]
    fn test_invalid_content_is_absent() {
        let dir = TempDir::new().unwrap();
        let pid_file = pid_file_in(&dir);

        for content in ["", "abc", "12a", "0", "-5", "99999999999"] {
            fs::write(pid_file.path(), content).unwrap();
            assert_eq!(pid_file.read(), None, "content {:?}", content);
            // The file itself is left alone
            assert!(pid_file.exists());
        }
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let pid_file = pid_file_in(&dir);

        pid_file.write(std::process::id() as i32).unwrap();
        pid_file.remove().unwrap();
        assert!(!pid_file.exists());

        pid_file.remove().unwrap();
    }

    #[test]
    fn test_remove_directory_in_the_way_fails() {
        let dir = TempDir::new().unwrap();
        let pid_file = PidFile::with_path(dir.path());

        assert!(pid_file.remove().is_err());
    }

    #[test]
    fn test_memory_guard() {
        let guard = MemoryGuard::new();
        assert_eq!(guard.read(), None);

        guard.write(7).unwrap();
        assert_eq!(guard.read(), Some(7));

        guard.remove().unwrap();
        guard.remove().unwrap();
        assert_eq!(guard.read(), None);

        assert_eq!(MemoryGuard::holding(9).read(), Some(9));
    }

    #[test]
    fn test_default_path() {
        assert_eq!(PidFile::default().path(), Path::new("./daemon.pid"));
    }
}
