//! Per-device metric kinds.
//!
//! Each kind knows which attribute files it reads, how it parses them and
//! which metric name and labels it emits. The set is closed: adding a kind
//! means adding a variant here.

use std::fmt;
use std::str::FromStr;

use crate::collector::sysfs::parser::{
    is_region_entry, parse_hex_attribute, parse_link_speed, parse_link_width,
};
use crate::collector::sysfs::{AttributeReader, CollectError, DeviceId};
use crate::collector::traits::FileSystem;

const LINK_SPEED_ATTR: &str = "current_link_speed";
const LINK_WIDTH_ATTR: &str = "current_link_width";
const REVISION_ATTR: &str = "revision";
const VENDOR_ATTR: &str = "vendor";
const PRODUCT_ATTR: &str = "device";

/// One kind of per-device gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    LinkSpeed,
    LinkWidth,
    Revision,
    RegionSize,
    DeviceInfo,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::LinkSpeed,
        MetricKind::LinkWidth,
        MetricKind::Revision,
        MetricKind::RegionSize,
        MetricKind::DeviceInfo,
    ];

    /// Short name used on the command line and in logs.
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::LinkSpeed => "link_speed",
            MetricKind::LinkWidth => "link_width",
            MetricKind::Revision => "revision",
            MetricKind::RegionSize => "region_size",
            MetricKind::DeviceInfo => "info",
        }
    }

    pub fn metric_name(self) -> &'static str {
        match self {
            MetricKind::LinkSpeed => "pci_device_link_speed_GTs",
            MetricKind::LinkWidth => "pci_device_link_width",
            MetricKind::Revision => "pci_device_revision",
            MetricKind::RegionSize => "pci_device_region_size_bytes",
            MetricKind::DeviceInfo => "pci_device_info",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricKind::LinkSpeed => "The link speed of the pci device",
            MetricKind::LinkWidth => "The link width of the pci device",
            MetricKind::Revision => "The revisions of the pci device",
            MetricKind::RegionSize => "The size of each memory region of the pci device",
            MetricKind::DeviceInfo => "Vendor and product ids of the pci device",
        }
    }

    /// Label names, always starting with `device`.
    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            MetricKind::LinkSpeed | MetricKind::LinkWidth => &["device"],
            MetricKind::Revision => &["device", "revision"],
            MetricKind::RegionSize => &["device", "region"],
            MetricKind::DeviceInfo => &["device", "vendor", "product"],
        }
    }

    /// Collects the samples of this kind for one device.
    ///
    /// Region size yields one sample per region file; every other kind yields
    /// exactly one sample or an error.
    pub fn collect<F: FileSystem>(
        self,
        reader: &AttributeReader<F>,
        device: &DeviceId,
    ) -> Result<Collected, CollectError> {
        let sample = match self {
            MetricKind::LinkSpeed => {
                let speed = reader.parse_attribute(device, LINK_SPEED_ATTR, parse_link_speed)?;
                Sample::new(self, device, [], speed)
            }
            MetricKind::LinkWidth => {
                let width = reader.parse_attribute(device, LINK_WIDTH_ATTR, parse_link_width)?;
                Sample::new(self, device, [], width)
            }
            MetricKind::Revision => {
                let revision = reader.parse_attribute(device, REVISION_ATTR, parse_hex_attribute)?;
                Sample::new(self, device, [revision], 1.0)
            }
            MetricKind::DeviceInfo => {
                let vendor = reader.parse_attribute(device, VENDOR_ATTR, parse_hex_attribute)?;
                let product = reader.parse_attribute(device, PRODUCT_ATTR, parse_hex_attribute)?;
                Sample::new(self, device, [vendor, product], 1.0)
            }
            MetricKind::RegionSize => return collect_regions(reader, device),
        };
        Ok(Collected {
            samples: vec![sample],
            skipped: Vec::new(),
        })
    }
}

/// Samples of one kind for one device.
///
/// `skipped` holds failures that dropped a single region while the other
/// regions of the device were still sized.
#[derive(Debug, Default)]
pub struct Collected {
    pub samples: Vec<Sample>,
    pub skipped: Vec<CollectError>,
}

/// One sample per `resourceN` entry, sized by the entry length.
fn collect_regions<F: FileSystem>(
    reader: &AttributeReader<F>,
    device: &DeviceId,
) -> Result<Collected, CollectError> {
    let mut collected = Collected::default();
    for region in reader
        .list_entries(device)?
        .into_iter()
        .filter(|name| is_region_entry(name))
    {
        match reader.entry_size(device, &region) {
            Ok(size) => collected.samples.push(Sample::new(
                MetricKind::RegionSize,
                device,
                [region],
                size as f64,
            )),
            Err(e) => collected.skipped.push(e),
        }
    }
    Ok(collected)
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = MetricKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown metric kind '{}' (expected one of {})", s, known.join(", "))
            })
    }
}

/// A single gauge value with its label values.
///
/// `labels` line up with [`MetricKind::label_names`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub kind: MetricKind,
    pub labels: Vec<String>,
    pub value: f64,
}

impl Sample {
    fn new<const N: usize>(
        kind: MetricKind,
        device: &DeviceId,
        extra: [String; N],
        value: f64,
    ) -> Self {
        let mut labels = Vec::with_capacity(N + 1);
        labels.push(device.to_string());
        labels.extend(extra);
        Self {
            kind,
            labels,
            value,
        }
    }

    pub fn device(&self) -> &str {
        &self.labels[0]
    }

    /// Value of a named label, if this kind has it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.kind
            .label_names()
            .iter()
            .position(|n| *n == name)
            .and_then(|idx| self.labels.get(idx))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::sysfs::SysfsLayout;

    const DEV: &str = "/sys/bus/pci/devices/0000:3b:00.0";

    fn device() -> DeviceId {
        DeviceId::from("0000:3b:00.0")
    }

    fn reader(fs: MockFs) -> AttributeReader<MockFs> {
        AttributeReader::new(fs, SysfsLayout::default())
    }

    #[test]
    fn test_link_speed_sample() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{DEV}/current_link_speed"), "8.0 GT/s PCIe\n");

        let samples = MetricKind::LinkSpeed
            .collect(&reader(fs), &device())
            .unwrap()
            .samples;
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].device(), "0000:3b:00.0");
        assert_eq!(samples[0].value, 8.0);
    }

    #[test]
    fn test_link_width_not_present() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{DEV}/vendor"), "0x8086\n");

        let err = MetricKind::LinkWidth
            .collect(&reader(fs), &device())
            .unwrap_err();
        assert!(matches!(err, CollectError::NotPresent(_)));
    }

    #[test]
    fn test_revision_sample() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{DEV}/revision"), "0x01\n");

        let samples = MetricKind::Revision
            .collect(&reader(fs), &device())
            .unwrap()
            .samples;
        assert_eq!(samples[0].label("revision"), Some("01"));
        assert_eq!(samples[0].value, 1.0);
    }

    #[test]
    fn test_device_info_sample() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{DEV}/vendor"), "0x15b3\n");
        fs.add_file(format!("{DEV}/device"), "0x1017\n");

        let samples = MetricKind::DeviceInfo
            .collect(&reader(fs), &device())
            .unwrap()
            .samples;
        assert_eq!(samples[0].label("vendor"), Some("15b3"));
        assert_eq!(samples[0].label("product"), Some("1017"));
        assert_eq!(samples[0].label("region"), None);
    }

    #[test]
    fn test_region_samples_exclude_aggregate() {
        let mut fs = MockFs::new();
        fs.add_sized_file(format!("{DEV}/resource0"), 4096);
        fs.add_sized_file(format!("{DEV}/resource1"), 8192);
        fs.add_sized_file(format!("{DEV}/resource"), 0);
        fs.add_file(format!("{DEV}/vendor"), "0x8086\n");

        let samples = MetricKind::RegionSize
            .collect(&reader(fs), &device())
            .unwrap()
            .samples;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label("region"), Some("resource0"));
        assert_eq!(samples[0].value, 4096.0);
        assert_eq!(samples[1].label("region"), Some("resource1"));
        assert_eq!(samples[1].value, 8192.0);
        assert!(samples.iter().all(|s| s.label("region") != Some("resource")));
    }

    #[test]
    fn test_region_unreadable_entry_skipped() {
        let mut fs = MockFs::new();
        fs.add_sized_file(format!("{DEV}/resource0"), 4096);
        fs.add_sized_file(format!("{DEV}/resource2"), 65536);
        fs.deny(format!("{DEV}/resource0"));

        let collected = MetricKind::RegionSize
            .collect(&reader(fs), &device())
            .unwrap();
        assert_eq!(collected.samples.len(), 1);
        assert_eq!(collected.samples[0].label("region"), Some("resource2"));
        assert_eq!(collected.skipped.len(), 1);
        assert_eq!(collected.skipped[0].kind(), "read");
        assert!(collected.skipped[0].path().ends_with("resource0"));
    }

    #[test]
    fn test_region_missing_device() {
        let err = MetricKind::RegionSize
            .collect(&reader(MockFs::new()), &device())
            .unwrap_err();
        assert!(matches!(err, CollectError::NotPresent(_)));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("link_speed".parse::<MetricKind>(), Ok(MetricKind::LinkSpeed));
        assert_eq!(" info".parse::<MetricKind>(), Ok(MetricKind::DeviceInfo));
        assert!("bandwidth".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_label_names_start_with_device() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.label_names()[0], "device");
        }
    }
}
