//! Enumerates the PCI devices to collect from.

use tracing::{debug, warn};

use crate::collector::sysfs::reader::entry_names;
use crate::collector::sysfs::{
    CollectError, DEVICE_ADDRESS_PREFIX, DeviceId, DriverFilter, SysfsLayout,
};
use crate::collector::traits::FileSystem;

/// Result of one enumeration pass.
///
/// `errors` holds one entry per directory that could not be listed; the
/// devices found in the other directories are still returned.
#[derive(Debug, Default)]
pub struct DeviceList {
    pub devices: Vec<DeviceId>,
    pub errors: Vec<CollectError>,
}

/// Lists devices from the device tree, or from the directories of the
/// filtered drivers.
pub struct DeviceEnumerator<F: FileSystem> {
    fs: F,
    layout: SysfsLayout,
    filter: DriverFilter,
}

impl<F: FileSystem> DeviceEnumerator<F> {
    pub fn new(fs: F, layout: SysfsLayout, filter: DriverFilter) -> Self {
        Self { fs, layout, filter }
    }

    pub fn filter(&self) -> &DriverFilter {
        &self.filter
    }

    /// Lists candidate devices.
    ///
    /// Without a filter every entry of the device tree is a device. With a
    /// filter, each driver directory is listed in filter order and only
    /// entries named like a PCI address are kept. A device bound to two
    /// listed drivers appears twice.
    pub fn list_devices(&self) -> DeviceList {
        let mut list = DeviceList::default();

        if self.filter.is_empty() {
            match entry_names(&self.fs, &self.layout.devices) {
                Ok(names) => list.devices.extend(names.into_iter().map(DeviceId::new)),
                Err(e) => record_failure(&mut list, e),
            }
            return list;
        }

        for driver in self.filter.drivers() {
            match entry_names(&self.fs, &self.layout.driver_dir(driver)) {
                Ok(names) => list.devices.extend(
                    names
                        .into_iter()
                        .filter(|name| name.starts_with(DEVICE_ADDRESS_PREFIX))
                        .map(DeviceId::new),
                ),
                Err(e) => record_failure(&mut list, e),
            }
        }

        list
    }
}

fn record_failure(list: &mut DeviceList, err: CollectError) {
    match &err {
        CollectError::NotPresent(path) => {
            debug!(path = %path.display(), "device directory not present")
        }
        _ => warn!(error = %err, "failed to list devices"),
    }
    list.errors.push(err);
}
