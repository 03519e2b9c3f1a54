//! Logging setup
//!
//! `tracing` events go to a size-rotated log file (stdout is reserved for the
//! metrics table and alert output). The level comes from `RUST_LOG`,
//! defaulting to `info`. If the file cannot be opened, logs go to stderr.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Rotate once the log grows past this size
pub const MAX_LOG_BYTES: u64 = 1_000_000;
/// Rotated files kept (`hostpulse.log.1` .. `.3`)
pub const LOG_BACKUPS: usize = 3;

pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("hostpulse").join("hostpulse.log"))
}

/// Install the global subscriber
pub fn init(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("[hostpulse] cannot open log file {:?}, logging to stderr: {}", path, e);
            None
        }
    });

    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init(),
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate_if_needed(path, MAX_LOG_BYTES, LOG_BACKUPS)?;
    OpenOptions::new().create(true).append(true).open(path)
}

/// Shift `path` to `path.1` (and older backups up by one) when it exceeds
/// `max_bytes`. Returns whether a rotation happened.
pub fn rotate_if_needed(path: &Path, max_bytes: u64, backups: usize) -> io::Result<bool> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if size <= max_bytes || backups == 0 {
        return Ok(false);
    }

    for index in (1..backups).rev() {
        let from = backup_path(path, index);
        if from.exists() {
            fs::rename(&from, backup_path(path, index + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))?;
    Ok(true)
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_log_is_not_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostpulse.log");
        fs::write(&path, "short").unwrap();

        assert!(!rotate_if_needed(&path, 100, 3).unwrap());
        assert!(path.exists());
    }

    #[test]
    fn test_missing_log_is_not_rotated() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!rotate_if_needed(&dir.path().join("none.log"), 100, 3).unwrap());
    }

    #[test]
    fn test_rotation_shifts_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostpulse.log");
        fs::write(&path, "x".repeat(200)).unwrap();
        fs::write(backup_path(&path, 1), "one").unwrap();
        fs::write(backup_path(&path, 2), "two").unwrap();
        fs::write(backup_path(&path, 3), "three").unwrap();

        assert!(rotate_if_needed(&path, 100, 3).unwrap());

        assert!(!path.exists());
        assert_eq!(fs::read_to_string(backup_path(&path, 1)).unwrap(), "x".repeat(200));
        assert_eq!(fs::read_to_string(backup_path(&path, 2)).unwrap(), "one");
        assert_eq!(fs::read_to_string(backup_path(&path, 3)).unwrap(), "two");
        assert!(!backup_path(&path, 4).exists());
    }

    #[test]
    fn test_backup_path_naming() {
        let path = Path::new("/var/log/hostpulse.log");
        assert_eq!(backup_path(path, 2), PathBuf::from("/var/log/hostpulse.log.2"));
    }
}
