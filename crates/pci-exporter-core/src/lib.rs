//! pci-exporter-core - library behind the `pci-exporter` binary.
//!
//! Provides:
//! - `collector`: sysfs access, device enumeration and per-device metric kinds
//! - `exporter`: Prometheus registry and text exposition

pub mod collector;
pub mod exporter;

pub use exporter::{Exporter, RegistryError};

/// Version reported by the binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
