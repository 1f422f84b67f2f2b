//! Reads attribute files of a single PCI device.

use std::io;
use std::path::{Path, PathBuf};

use crate::collector::sysfs::parser::ParseError;
use crate::collector::sysfs::{DeviceId, SysfsLayout};
use crate::collector::traits::FileSystem;

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// The file or directory does not exist (optional attribute, vanished device).
    NotPresent(PathBuf),
    /// The path exists but could not be read or listed.
    Read { path: PathBuf, source: io::Error },
    /// The content is not in the expected shape.
    Parse { path: PathBuf, source: ParseError },
}

impl CollectError {
    /// Classifies an I/O error: `NotFound` becomes `NotPresent`.
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        if err.kind() == io::ErrorKind::NotFound {
            CollectError::NotPresent(path)
        } else {
            CollectError::Read { path, source: err }
        }
    }

    /// Short label used for logs and the error gauge.
    pub fn kind(&self) -> &'static str {
        match self {
            CollectError::NotPresent(_) => "not_present",
            CollectError::Read { .. } => "read",
            CollectError::Parse { .. } => "parse",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            CollectError::NotPresent(path)
            | CollectError::Read { path, .. }
            | CollectError::Parse { path, .. } => path.as_path(),
        }
    }
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::NotPresent(path) => write!(f, "{} not present", path.display()),
            CollectError::Read { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            CollectError::Parse { path, source } => {
                write!(f, "failed to parse {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::NotPresent(_) => None,
            CollectError::Read { source, .. } => Some(source),
            CollectError::Parse { source, .. } => Some(source),
        }
    }
}

/// Lists the entry names of a directory, sorted.
pub(crate) fn entry_names<F: FileSystem>(
    fs: &F,
    dir: &Path,
) -> Result<Vec<String>, CollectError> {
    let entries = fs.read_dir(dir).map_err(|e| CollectError::from_io(dir, e))?;
    let mut names: Vec<String> = entries
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

/// Reads attribute files below the device tree.
///
/// Nothing is cached: link speed and width change at runtime, so every call
/// goes back to the filesystem.
pub struct AttributeReader<F: FileSystem> {
    fs: F,
    layout: SysfsLayout,
}

impl<F: FileSystem> AttributeReader<F> {
    pub fn new(fs: F, layout: SysfsLayout) -> Self {
        Self { fs, layout }
    }

    pub fn layout(&self) -> &SysfsLayout {
        &self.layout
    }

    fn attribute_path(&self, device: &DeviceId, name: &str) -> PathBuf {
        self.layout.device_dir(device).join(name)
    }

    /// Reads one attribute file as text.
    pub fn read_attribute(&self, device: &DeviceId, name: &str) -> Result<String, CollectError> {
        let path = self.attribute_path(device, name);
        self.fs
            .read_to_string(&path)
            .map_err(|e| CollectError::from_io(path, e))
    }

    /// Reads one attribute file and runs `parse` over its content.
    pub fn parse_attribute<T>(
        &self,
        device: &DeviceId,
        name: &str,
        parse: impl FnOnce(&str) -> Result<T, ParseError>,
    ) -> Result<T, CollectError> {
        let content = self.read_attribute(device, name)?;
        parse(&content).map_err(|source| CollectError::Parse {
            path: self.attribute_path(device, name),
            source,
        })
    }

    /// Names of all entries in the device directory, sorted.
    pub fn list_entries(&self, device: &DeviceId) -> Result<Vec<String>, CollectError> {
        entry_names(&self.fs, &self.layout.device_dir(device))
    }

    /// Byte length of one entry of the device directory.
    pub fn entry_size(&self, device: &DeviceId, name: &str) -> Result<u64, CollectError> {
        let path = self.attribute_path(device, name);
        self.fs
            .file_size(&path)
            .map_err(|e| CollectError::from_io(path, e))
    }
}
