//! Shared application state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::State;

use pci_exporter_core::Exporter;

#[derive(Clone)]
pub(crate) struct WebApp {
    pub(crate) exporter: Exporter,
    /// Deadline for one collection round.
    pub(crate) scrape_timeout: Duration,
    pub(crate) telemetry_path: Arc<str>,
    /// Set while a collection round runs on the blocking pool, including one
    /// that already overran its deadline.
    scrape_running: Arc<AtomicBool>,
}

impl WebApp {
    pub(crate) fn new(exporter: Exporter, scrape_timeout: Duration, telemetry_path: &str) -> Self {
        Self {
            exporter,
            scrape_timeout,
            telemetry_path: Arc::from(telemetry_path),
            scrape_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the single scrape slot; `None` while another round still runs.
    pub(crate) fn try_start_scrape(&self) -> Option<ScrapeSlot> {
        self.scrape_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScrapeSlot(self.scrape_running.clone()))
    }
}

/// Releases the scrape slot when dropped, also if the round panics.
pub(crate) struct ScrapeSlot(Arc<AtomicBool>);

impl Drop for ScrapeSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub(crate) type AppState = State<WebApp>;

#[cfg(test)]
mod tests {
    use super::*;
    use pci_exporter_core::collector::{CollectorConfig, MockFs, PciCollector};

    fn app() -> WebApp {
        let collector = PciCollector::new(MockFs::new(), CollectorConfig::default()).unwrap();
        WebApp::new(
            Exporter::new(collector).unwrap(),
            Duration::from_secs(1),
            "/metrics",
        )
    }

    #[test]
    fn test_scrape_slot_is_exclusive() {
        let app = app();
        let clone = app.clone();

        let slot = app.try_start_scrape().unwrap();
        assert!(clone.try_start_scrape().is_none());

        drop(slot);
        assert!(clone.try_start_scrape().is_some());
    }
}
