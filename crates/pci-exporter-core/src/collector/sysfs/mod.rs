//! Access to the PCI part of sysfs.
//!
//! The kernel exposes one directory per device under `/sys/bus/pci/devices`
//! and one directory per driver under `/sys/bus/pci/drivers`, the latter
//! holding a symlink for every device currently bound to that driver.

pub mod parser;
pub mod reader;

use std::fmt;
use std::path::{Path, PathBuf};

pub use parser::ParseError;
pub use reader::{AttributeReader, CollectError};

/// Default root of the PCI bus in sysfs.
pub const DEFAULT_PCI_PATH: &str = "/sys/bus/pci";

/// Prefix shared by device entries inside a driver directory (PCI domain 0).
///
/// Driver directories also hold `bind`, `unbind`, `new_id`, `module`, ...
pub const DEVICE_ADDRESS_PREFIX: &str = "0000";

/// Location of the device and driver trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsLayout {
    /// Directory with one subdirectory per device.
    pub devices: PathBuf,
    /// Directory with one subdirectory per driver.
    pub drivers: PathBuf,
}

impl SysfsLayout {
    /// Builds the layout below a PCI bus root such as `/sys/bus/pci`.
    pub fn from_pci_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            devices: root.join("devices"),
            drivers: root.join("drivers"),
        }
    }

    pub fn device_dir(&self, device: &DeviceId) -> PathBuf {
        self.devices.join(device.as_str())
    }

    pub fn driver_dir(&self, driver: &str) -> PathBuf {
        self.drivers.join(driver)
    }
}

impl Default for SysfsLayout {
    fn default() -> Self {
        Self::from_pci_root(DEFAULT_PCI_PATH)
    }
}

/// PCI address of a device, e.g. `0000:00:1f.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Driver names whose bound devices should be exported.
///
/// An empty filter selects every device on the bus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverFilter {
    drivers: Vec<String>,
}

impl DriverFilter {
    /// Parses a comma-separated driver list (`"nvme,mlx5_core"`).
    ///
    /// Blank items are dropped and repeated names are kept once, in the
    /// order they first appear.
    pub fn parse(list: &str) -> Self {
        Self::from_names(list.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut drivers: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !drivers.iter().any(|d| d == name) {
                drivers.push(name.to_string());
            }
        }
        Self { drivers }
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn drivers(&self) -> &[String] {
        &self.drivers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_pci_root() {
        let layout = SysfsLayout::from_pci_root("/tmp/pci");
        assert_eq!(layout.devices, PathBuf::from("/tmp/pci/devices"));
        assert_eq!(layout.drivers, PathBuf::from("/tmp/pci/drivers"));
        assert_eq!(
            layout.device_dir(&DeviceId::from("0000:00:01.0")),
            PathBuf::from("/tmp/pci/devices/0000:00:01.0")
        );
    }

    #[test]
    fn test_driver_filter_parse() {
        let filter = DriverFilter::parse("nvme, mlx5_core,,nvme ");
        assert_eq!(filter.drivers(), ["nvme", "mlx5_core"]);
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_driver_filter_empty() {
        assert!(DriverFilter::parse("").is_empty());
        assert!(DriverFilter::parse(" , ,").is_empty());
        assert!(DriverFilter::default().is_empty());
    }
}
