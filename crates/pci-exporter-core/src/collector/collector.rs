//! Main collector that combines device enumeration and the metric kinds.
//!
//! The `PciCollector` struct runs one collection round per scrape and
//! converts the samples into Prometheus metric families.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use prometheus::core::{Collector as PromCollector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts};
use tracing::{debug, error, warn};

use crate::collector::enumerator::DeviceEnumerator;
use crate::collector::metrics::{Collected, MetricKind, Sample};
use crate::collector::sysfs::{AttributeReader, CollectError, DeviceId, DriverFilter, SysfsLayout};
use crate::collector::traits::FileSystem;

/// Default number of worker threads per scrape.
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on worker threads per scrape.
pub const MAX_WORKERS: usize = 64;

const DEVICES_METRIC: &str = "pci_exporter_devices";
const DEVICES_HELP: &str = "Number of pci devices enumerated by the last scrape";
const ERRORS_METRIC: &str = "pci_exporter_collect_errors";
const ERRORS_HELP: &str = "Attributes skipped by the last scrape, by error kind";

/// Startup configuration of a [`PciCollector`].
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub layout: SysfsLayout,
    pub filter: DriverFilter,
    /// Metric kinds to collect, in description order.
    pub kinds: Vec<MetricKind>,
    /// Upper bound on worker threads, clamped to `1..=MAX_WORKERS`; 1 collects
    /// inline.
    pub workers: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            layout: SysfsLayout::default(),
            filter: DriverFilter::default(),
            kinds: MetricKind::ALL.to_vec(),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Per-scrape error counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    pub not_present: u64,
    pub read: u64,
    pub parse: u64,
    /// Driver or device directories that could not be listed.
    pub enumerate: u64,
}

impl ErrorCounts {
    fn record(&mut self, err: &CollectError) {
        match err {
            CollectError::NotPresent(_) => self.not_present += 1,
            CollectError::Read { .. } => self.read += 1,
            CollectError::Parse { .. } => self.parse += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.not_present + self.read + self.parse + self.enumerate
    }

    /// Counters paired with their gauge label.
    pub fn by_kind(&self) -> [(&'static str, u64); 4] {
        [
            ("not_present", self.not_present),
            ("read", self.read),
            ("parse", self.parse),
            ("enumerate", self.enumerate),
        ]
    }
}

/// Outcome of one collection round.
#[derive(Debug, Clone)]
pub struct Scrape {
    /// Devices enumerated, duplicates included.
    pub devices: usize,
    /// Samples sorted by kind and labels.
    pub samples: Vec<Sample>,
    pub errors: ErrorCounts,
    pub elapsed: Duration,
}

impl Scrape {
    pub fn samples_of(&self, kind: MetricKind) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(move |s| s.kind == kind)
    }
}

type JobResult<'a> = (&'a DeviceId, MetricKind, Result<Collected, CollectError>);

/// Collects PCI device metrics from sysfs.
///
/// Nothing is kept between scrapes except the configuration: every call to
/// [`PciCollector::scrape`] enumerates devices and reads attributes again.
pub struct PciCollector<F: FileSystem> {
    enumerator: DeviceEnumerator<F>,
    reader: AttributeReader<F>,
    kinds: Vec<MetricKind>,
    workers: usize,
    descs: Vec<Desc>,
}

impl<F: FileSystem + Clone> PciCollector<F> {
    /// Creates a new collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `config` - Sysfs layout, driver filter, metric kinds and worker bound
    pub fn new(fs: F, config: CollectorConfig) -> prometheus::Result<Self> {
        let CollectorConfig {
            layout,
            filter,
            mut kinds,
            workers,
        } = config;
        kinds.sort();
        kinds.dedup();

        let mut descs = Vec::with_capacity(kinds.len() + 2);
        for kind in &kinds {
            descs.push(Desc::new(
                kind.metric_name().to_string(),
                kind.help().to_string(),
                kind.label_names().iter().map(|l| l.to_string()).collect(),
                HashMap::new(),
            )?);
        }
        descs.push(Desc::new(
            DEVICES_METRIC.to_string(),
            DEVICES_HELP.to_string(),
            Vec::new(),
            HashMap::new(),
        )?);
        descs.push(Desc::new(
            ERRORS_METRIC.to_string(),
            ERRORS_HELP.to_string(),
            vec!["kind".to_string()],
            HashMap::new(),
        )?);

        Ok(Self {
            enumerator: DeviceEnumerator::new(fs.clone(), layout.clone(), filter),
            reader: AttributeReader::new(fs, layout),
            kinds,
            workers: workers.clamp(1, MAX_WORKERS),
            descs,
        })
    }
}

impl<F: FileSystem> PciCollector<F> {
    pub fn kinds(&self) -> &[MetricKind] {
        &self.kinds
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs one collection round over every (device, kind) pair.
    ///
    /// Failures are logged and counted per pair; they never abort the round.
    pub fn scrape(&self) -> Scrape {
        let start = Instant::now();

        let list = self.enumerator.list_devices();
        let mut errors = ErrorCounts {
            enumerate: list.errors.len() as u64,
            ..ErrorCounts::default()
        };

        let jobs: Vec<(&DeviceId, MetricKind)> = list
            .devices
            .iter()
            .flat_map(|device| self.kinds.iter().map(move |kind| (device, *kind)))
            .collect();

        let mut samples = Vec::new();
        let mut absorb = |(device, kind, result): JobResult<'_>| match result {
            Ok(collected) => {
                samples.extend(collected.samples);
                for e in &collected.skipped {
                    errors.record(e);
                    log_collect_error(device, kind, e);
                }
            }
            Err(e) => {
                errors.record(&e);
                log_collect_error(device, kind, &e);
            }
        };

        let workers = self.workers.min(jobs.len());
        if workers <= 1 {
            for (device, kind) in &jobs {
                absorb((*device, *kind, kind.collect(&self.reader, device)));
            }
        } else {
            let cursor = AtomicUsize::new(0);
            let (tx, rx) = mpsc::channel::<JobResult<'_>>();
            thread::scope(|scope| {
                for _ in 0..workers {
                    let tx = tx.clone();
                    let cursor = &cursor;
                    let jobs = &jobs;
                    let reader = &self.reader;
                    scope.spawn(move || {
                        while let Some(&(device, kind)) =
                            jobs.get(cursor.fetch_add(1, Ordering::Relaxed))
                        {
                            if tx.send((device, kind, kind.collect(reader, device))).is_err() {
                                break;
                            }
                        }
                    });
                }
                // Workers hold the remaining senders; the loop ends once all exit.
                drop(tx);
                for result in rx {
                    absorb(result);
                }
            });
        }

        samples.sort_by(|a, b| (a.kind, &a.labels).cmp(&(b.kind, &b.labels)));

        let scrape = Scrape {
            devices: list.devices.len(),
            samples,
            errors,
            elapsed: start.elapsed(),
        };

        debug!(
            devices = scrape.devices,
            samples = scrape.samples.len(),
            errors = scrape.errors.total(),
            workers,
            duration_ms = scrape.elapsed.as_millis() as u64,
            "scrape completed"
        );

        scrape
    }

    /// Builds one gauge family per kind plus the exporter's own gauges.
    ///
    /// Samples with identical labels (a device listed under two drivers)
    /// collapse into a single series.
    pub fn families(&self, scrape: &Scrape) -> prometheus::Result<Vec<MetricFamily>> {
        let mut families = Vec::new();

        for kind in &self.kinds {
            let gauges = GaugeVec::new(
                Opts::new(kind.metric_name(), kind.help()),
                kind.label_names(),
            )?;
            for sample in scrape.samples_of(*kind) {
                let values: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
                gauges.get_metric_with_label_values(&values)?.set(sample.value);
            }
            families.extend(gauges.collect());
        }

        let devices = Gauge::with_opts(Opts::new(DEVICES_METRIC, DEVICES_HELP))?;
        devices.set(scrape.devices as f64);
        families.extend(devices.collect());

        let errors = GaugeVec::new(Opts::new(ERRORS_METRIC, ERRORS_HELP), &["kind"])?;
        for (label, count) in scrape.errors.by_kind() {
            errors.get_metric_with_label_values(&[label])?.set(count as f64);
        }
        families.extend(errors.collect());

        Ok(families)
    }
}

fn log_collect_error(device: &DeviceId, kind: MetricKind, err: &CollectError) {
    match err {
        CollectError::NotPresent(path) => debug!(
            device = %device,
            kind = %kind,
            path = %path.display(),
            "attribute not present"
        ),
        // Bridges and idle links report `Unknown` on every scrape.
        CollectError::Parse { source, .. } if source.unknown => {
            debug!(device = %device, kind = %kind, error = %err, "attribute unknown")
        }
        _ => warn!(device = %device, kind = %kind, error = %err, "skipping metric"),
    }
}

impl<F: FileSystem> PromCollector for PciCollector<F> {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let scrape = self.scrape();
        match self.families(&scrape) {
            Ok(families) => families,
            Err(e) => {
                error!(error = %e, "failed to build metric families");
                Vec::new()
            }
        }
    }
}
