//! Prometheus registry holding the PCI collector and rendering the text format.

use prometheus::{Encoder, Registry, TEXT_FORMAT, TextEncoder};

use crate::collector::{FileSystem, PciCollector};

pub use prometheus::Error as RegistryError;

/// Renders the exposition document served on the metrics endpoint.
///
/// Cloning is cheap; clones share the registry.
#[derive(Clone)]
pub struct Exporter {
    registry: Registry,
}

impl Exporter {
    /// Registers `collector` in a fresh registry.
    pub fn new<F: FileSystem + 'static>(collector: PciCollector<F>) -> Result<Self, RegistryError> {
        let registry = Registry::new();
        registry.register(Box::new(collector))?;
        Ok(Self { registry })
    }

    /// Runs one collection round and encodes it.
    ///
    /// Families are sorted by name and series by label values, so an
    /// unchanged sysfs tree renders the same bytes every time.
    pub fn render(&self) -> Result<Vec<u8>, RegistryError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(buffer)
    }

    /// `Content-Type` of [`Exporter::render`] output.
    pub fn content_type(&self) -> &'static str {
        TEXT_FORMAT
    }
}
