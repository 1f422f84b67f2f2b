//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/sys/bus/pci` states for testing
//! enumeration and collection.

use std::path::PathBuf;

use super::filesystem::MockFs;
use crate::collector::sysfs::DEFAULT_PCI_PATH;

const MIB: u64 = 1024 * 1024;

impl MockFs {
    fn device_dir(id: &str) -> PathBuf {
        PathBuf::from(DEFAULT_PCI_PATH).join("devices").join(id)
    }

    /// Adds a device directory with the given attribute files.
    pub fn add_pci_device(&mut self, id: &str, attrs: &[(&str, &str)]) {
        let dir = Self::device_dir(id);
        self.add_dir(&dir);
        for (name, content) in attrs {
            self.add_file(dir.join(name), *content);
        }
    }

    /// Adds a `resourceN` entry of `size` bytes to a device.
    pub fn add_region(&mut self, id: &str, region: &str, size: u64) {
        self.add_sized_file(Self::device_dir(id).join(region), size);
    }

    /// Binds a device to a driver, creating the driver directory if needed.
    ///
    /// The driver directory also gets the control files the kernel puts there.
    pub fn bind_driver(&mut self, driver: &str, id: &str) {
        let dir = PathBuf::from(DEFAULT_PCI_PATH).join("drivers").join(driver);
        for control in ["bind", "unbind", "new_id", "remove_id", "uevent"] {
            self.add_file(dir.join(control), "");
        }
        self.add_dir(dir.join("module"));
        self.add_dir(dir.join(id));
    }

    /// Creates a small workstation: host bridge, integrated GPU, onboard
    /// NIC, one NVMe drive and one 100G adapter.
    ///
    /// Only the NVMe drive and the adapter expose link attributes.
    pub fn typical_host() -> Self {
        let mut fs = Self::new();

        fs.add_pci_device(
            "0000:00:00.0",
            &[
                ("vendor", "0x8086\n"),
                ("device", "0x9b33\n"),
                ("revision", "0x05\n"),
                ("class", "0x060000\n"),
            ],
        );
        fs.add_region("0000:00:00.0", "resource", 0);

        fs.add_pci_device(
            "0000:00:02.0",
            &[
                ("vendor", "0x8086\n"),
                ("device", "0x9bc5\n"),
                ("revision", "0x05\n"),
                ("class", "0x030000\n"),
            ],
        );
        fs.add_region("0000:00:02.0", "resource", 0);
        fs.add_region("0000:00:02.0", "resource0", 16 * MIB);
        fs.add_region("0000:00:02.0", "resource2", 256 * MIB);
        fs.add_region("0000:00:02.0", "resource2_wc", 256 * MIB);
        fs.bind_driver("i915", "0000:00:02.0");

        fs.add_pci_device(
            "0000:00:1f.6",
            &[
                ("vendor", "0x8086\n"),
                ("device", "0x0d4c\n"),
                ("revision", "0x00\n"),
                ("class", "0x020000\n"),
            ],
        );
        fs.add_region("0000:00:1f.6", "resource", 0);
        fs.add_region("0000:00:1f.6", "resource0", 128 * 1024);
        fs.bind_driver("e1000e", "0000:00:1f.6");

        fs.add_pci_device(
            "0000:01:00.0",
            &[
                ("vendor", "0x144d\n"),
                ("device", "0xa808\n"),
                ("revision", "0x00\n"),
                ("class", "0x010802\n"),
                ("current_link_speed", "8.0 GT/s PCIe\n"),
                ("current_link_width", "4\n"),
                ("max_link_speed", "8.0 GT/s PCIe\n"),
                ("max_link_width", "4\n"),
            ],
        );
        fs.add_region("0000:01:00.0", "resource", 0);
        fs.add_region("0000:01:00.0", "resource0", 16 * 1024);
        fs.bind_driver("nvme", "0000:01:00.0");

        fs.add_pci_device(
            "0000:3b:00.0",
            &[
                ("vendor", "0x15b3\n"),
                ("device", "0x1017\n"),
                ("revision", "0x00\n"),
                ("class", "0x020000\n"),
                ("current_link_speed", "16.0 GT/s PCIe\n"),
                ("current_link_width", "16\n"),
                ("max_link_speed", "16.0 GT/s PCIe\n"),
                ("max_link_width", "16\n"),
            ],
        );
        fs.add_region("0000:3b:00.0", "resource", 0);
        fs.add_region("0000:3b:00.0", "resource0", 32 * MIB);
        fs.bind_driver("mlx5_core", "0000:3b:00.0");

        fs
    }
}
