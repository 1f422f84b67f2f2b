//! In-memory mock filesystem for testing collectors without a real `/sys`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files and directories in memory, allowing tests to simulate
/// various sysfs states without needing actual Linux access.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Reported sizes that differ from the content length (sysfs resource files).
    sizes: HashMap<PathBuf, u64>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Paths that exist but fail with `PermissionDenied`.
    denied: HashSet<PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty file that reports `size` bytes, like sysfs `resourceN`.
    pub fn add_sized_file(&mut self, path: impl AsRef<Path>, size: u64) {
        let path = path.as_ref().to_path_buf();
        self.add_file(&path, "");
        self.sizes.insert(path, size);
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Makes an existing path fail every access with `PermissionDenied`.
    pub fn deny(&mut self, path: impl AsRef<Path>) {
        self.denied.insert(path.as_ref().to_path_buf());
    }

    /// Removes a file, as if the device vanished or the kernel omits it.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.files.remove(path);
        self.sizes.remove(path);
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    fn check_access(&self, path: &Path) -> io::Result<()> {
        if self.denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        Ok(())
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.check_access(path)?;
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }
        self.check_access(path)?;

        let mut entries = HashSet::new();

        // Find all files and directories that are direct children
        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        self.check_access(path)?;
        if let Some(size) = self.sizes.get(path) {
            return Ok(*size);
        }
        if let Some(content) = self.files.get(path) {
            return Ok(content.len() as u64);
        }
        if self.directories.contains(path) {
            return Ok(0);
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("file not found: {:?}", path),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/bus/pci/devices/0000:00:02.0/vendor", "0x8086\n");

        let content = fs
            .read_to_string(Path::new("/sys/bus/pci/devices/0000:00:02.0/vendor"))
            .unwrap();
        assert_eq!(content, "0x8086\n");
        assert!(fs.read_dir(Path::new("/sys/bus/pci/devices")).is_ok());
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/bus/pci/devices/0000:00:02.0/vendor", "0x8086\n");
        fs.add_file("/sys/bus/pci/devices/0000:00:02.0/device", "0x9a49\n");
        fs.add_file("/sys/bus/pci/devices/0000:00:1f.0/vendor", "0x8086\n");

        let devices = fs.read_dir(Path::new("/sys/bus/pci/devices")).unwrap();
        assert_eq!(devices.len(), 2);

        let attrs = fs
            .read_dir(Path::new("/sys/bus/pci/devices/0000:00:02.0"))
            .unwrap();
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_mock_fs_sized_file() {
        let mut fs = MockFs::new();
        fs.add_sized_file("/dev0/resource0", 16 * 1024 * 1024);
        fs.add_file("/dev0/revision", "0x01\n");

        assert_eq!(
            fs.file_size(Path::new("/dev0/resource0")).unwrap(),
            16 * 1024 * 1024
        );
        assert_eq!(fs.file_size(Path::new("/dev0/revision")).unwrap(), 5);
    }

    #[test]
    fn test_mock_fs_denied() {
        let mut fs = MockFs::new();
        fs.add_file("/dev0/revision", "0x01\n");
        fs.deny("/dev0/revision");
        fs.deny("/dev0");

        let err = fs.read_to_string(Path::new("/dev0/revision")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = fs.read_dir(Path::new("/dev0")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_mock_fs_not_found() {
        let mut fs = MockFs::new();
        fs.add_file("/dev0/revision", "0x01\n");
        fs.remove_file("/dev0/revision");

        let result = fs.read_to_string(Path::new("/dev0/revision"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        let result = fs.file_size(Path::new("/nonexistent"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
