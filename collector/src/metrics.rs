//! # Metric set
//!
//! The gauges the exporter publishes, registered on a private [`Registry`]:
//!
//! - `tirex_queue_size`: total number of queued render requests
//! - `tirex_prio_queue_size{prio="<n>"}`: queued requests per priority
//! - `tirex_rendering`: number of currently rendering workers
//!
//! Every gauge is backed by an atomic, so a scrape running concurrently with a publish sees
//! either the old or the new value of each series, never a torn one. A scrape may still mix
//! values of two cycles across series.
//!
//! Priority series are never removed: a priority missing from a later report keeps its last
//! published value.

use crate::status::TirexStatus;
use prometheus::{
    proto::MetricFamily,
    Encoder,
    IntGauge,
    IntGaugeVec,
    Opts,
    Registry,
    TextEncoder,
};
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
};

pub const QUEUE_SIZE: &str = "tirex_queue_size";
pub const PRIO_QUEUE_SIZE: &str = "tirex_prio_queue_size";
pub const RENDERING: &str = "tirex_rendering";
pub const PRIO_LABEL: &str = "prio";

/// Unlabelled gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    QueueSize,
    Rendering,
}

/// Gauge vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Labeled {
    PrioQueueSize,
}

impl Scalar {
    pub fn name(&self) -> &'static str {
        match self {
            Scalar::QueueSize => QUEUE_SIZE,
            Scalar::Rendering => RENDERING,
        }
    }
}

impl Labeled {
    pub fn name(&self) -> &'static str {
        match self {
            Labeled::PrioQueueSize => PRIO_QUEUE_SIZE,
        }
    }
}

#[derive(Clone)]
pub struct MetricSet {
    registry: Registry,
    queue_size: IntGauge,
    prio_queue_size: IntGaugeVec,
    rendering: IntGauge,
    // Children handed out by `prio_queue_size`, so reads never create series.
    prio_children: Arc<Mutex<BTreeMap<String, IntGauge>>>,
}

impl std::fmt::Debug for MetricSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricSet")
            .field("queue_size", &self.queue_size.get())
            .field("rendering", &self.rendering.get())
            .field("prio_queue_size", &self.prio_queue_sizes())
            .finish()
    }
}

impl MetricSet {
    /// `Content-Type` of [`MetricSet::render`] output.
    pub const CONTENT_TYPE: &'static str = prometheus::TEXT_FORMAT;

    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let queue_size = IntGauge::new(QUEUE_SIZE, "Current tirex render queue size")?;
        let prio_queue_size = IntGaugeVec::new(
            Opts::new(PRIO_QUEUE_SIZE, "Current priority queue sizes"),
            &[PRIO_LABEL],
        )?;
        let rendering = IntGauge::new(RENDERING, "Number of currently rendering workers")?;

        registry.register(Box::new(queue_size.clone()))?;
        registry.register(Box::new(prio_queue_size.clone()))?;
        registry.register(Box::new(rendering.clone()))?;

        Ok(Self {
            registry,
            queue_size,
            prio_queue_size,
            rendering,
            prio_children: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    pub fn apply_scalar(&self, metric: Scalar, value: i64) {
        match metric {
            Scalar::QueueSize => self.queue_size.set(value),
            Scalar::Rendering => self.rendering.set(value),
        }
        tracing::trace!(metric = metric.name(), value, "gauge set");
    }

    /// Sets one labelled series, creating it on first use.
    pub fn apply_labeled(&self, metric: Labeled, label: &str, value: i64) {
        match metric {
            Labeled::PrioQueueSize => {
                let mut children = self.prio_children.lock().unwrap_or_else(PoisonError::into_inner);
                children
                    .entry(label.to_string())
                    .or_insert_with(|| self.prio_queue_size.with_label_values(&[label]))
                    .set(value);
            }
        }
        tracing::trace!(metric = metric.name(), label, value, "gauge set");
    }

    /// Publishes one decoded report: queue size, every priority queue, rendering workers.
    pub fn publish(&self, status: &TirexStatus) {
        self.apply_scalar(Scalar::QueueSize, status.queue_size());
        for queue in status.prio_queues() {
            self.apply_labeled(Labeled::PrioQueueSize, &queue.label(), queue.size);
        }
        self.apply_scalar(Scalar::Rendering, status.num_rendering());
    }

    pub fn queue_size(&self) -> i64 {
        self.queue_size.get()
    }

    pub fn rendering(&self) -> i64 {
        self.rendering.get()
    }

    /// Current value of a priority series, `None` if that priority was never published.
    pub fn prio_queue_size(&self, prio: &str) -> Option<i64> {
        self.prio_children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(prio)
            .map(IntGauge::get)
    }

    pub fn prio_queue_sizes(&self) -> BTreeMap<String, i64> {
        self.prio_children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(prio, gauge)| (prio.clone(), gauge.get()))
            .collect()
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

}
