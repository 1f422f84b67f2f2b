//! PCI device metrics collector for Linux.
//!
//! This module provides infrastructure for collecting per-device metrics
//! from the Linux sysfs PCI tree, with support for mocking for testing on macOS.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        PciCollector                         │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  DeviceEnumerator   │   │  MetricKind × worker pool   │  │
//! │  │  - devices/*        │   │  - current_link_speed       │  │
//! │  │  - drivers/<name>/* │   │  - current_link_width       │  │
//! │  └──────────┬──────────┘   │  - revision, vendor, device │  │
//! │             │              │  - resourceN                │  │
//! │             │              └──────────────┬──────────────┘  │
//! │             │                ┌────────────▼────────────┐    │
//! │             │                │     AttributeReader     │    │
//! │             │                └────────────┬────────────┘    │
//! │             └──────────────┬──────────────┘                 │
//! │                     ┌──────▼──────┐                         │
//! │                     │  FileSystem │ (trait)                 │
//! │                     └──────┬──────┘                         │
//! └────────────────────────────┼────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              │               │               │
//!       ┌──────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use pci_exporter_core::collector::{CollectorConfig, PciCollector, RealFs};
//!
//! let collector = PciCollector::new(RealFs::new(), CollectorConfig::default()).unwrap();
//! let scrape = collector.scrape();
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use pci_exporter_core::collector::{CollectorConfig, MockFs, PciCollector};
//!
//! let fs = MockFs::typical_host();
//! let collector = PciCollector::new(fs, CollectorConfig::default()).unwrap();
//! let scrape = collector.scrape();
//! assert_eq!(scrape.devices, 5);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod enumerator;
pub mod metrics;
pub mod mock;
pub mod sysfs;
pub mod traits;

pub use collector::{
    CollectorConfig, DEFAULT_WORKERS, ErrorCounts, MAX_WORKERS, PciCollector, Scrape,
};
pub use enumerator::{DeviceEnumerator, DeviceList};
pub use metrics::{Collected, MetricKind, Sample};
pub use mock::MockFs;
pub use sysfs::{AttributeReader, CollectError, DeviceId, DriverFilter, SysfsLayout};
pub use traits::{FileSystem, RealFs};
