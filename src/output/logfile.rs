//! Persistent log file

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Opens `path` for appending log lines, creating it and its parent directories
///
/// Earlier runs' lines are kept so failures can be audited across runs.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_creates_parents_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("harvest.log");

        writeln!(open_log_file(&path).unwrap(), "first run").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second run").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "first run\nsecond run\n"
        );
    }

    #[test]
    fn test_directory_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(open_log_file(dir.path()).is_err());
    }
}
