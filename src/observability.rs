//! In-process counters for calculation usage and outcomes
//!
//! Counters are kept twice: in a Prometheus recorder owned by this handle,
//! rendered by `GET /metrics`, and as plain numbers for [`MetricsSnapshot`].

use metrics::{Key, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Label used when a calculation was started without a context.
pub const DEFAULT_CONTEXT_LABEL: &str = "default";

pub const CONTEXT_COUNTER: &str = "kalkulator_kontekst";
pub const MINIMUM_INCOME_COUNTER: &str = "kalkulator_minsteinntekt";

static METADATA: Metadata<'static> =
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Metrics handle for recording counters
pub struct Metrics {
    recorder: PrometheusRecorder,
    contexts: Mutex<BTreeMap<String, u64>>,
    minimum_income_met: AtomicU64,
    minimum_income_not_met: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            recorder: PrometheusBuilder::new().build_recorder(),
            contexts: Mutex::default(),
            minimum_income_met: AtomicU64::default(),
            minimum_income_not_met: AtomicU64::default(),
        }
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn increment(&self, name: &'static str, label: &'static str, value: String) {
        let key = Key::from_parts(name, vec![Label::new(label, value)]);
        self.recorder.register_counter(&key, &METADATA).increment(1);
    }

    /// Prometheus text exposition of every counter.
    pub fn render(&self) -> String {
        self.handle().render()
    }

    pub fn handle(&self) -> PrometheusHandle {
        self.recorder.handle()
    }

    /// `kalkulator_kontekst{kontekst}`
    pub fn context_used(&self, label: &str) {
        let label = if label.is_empty() {
            DEFAULT_CONTEXT_LABEL
        } else {
            label
        };

        let mut contexts = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
        *contexts.entry(label.to_string()).or_default() += 1;
        drop(contexts);

        self.increment(CONTEXT_COUNTER, "kontekst", label.to_string());
        tracing::debug!(counter = CONTEXT_COUNTER, kontekst = label, "Metric incremented");
    }

    /// `kalkulator_minsteinntekt{resultat}`
    pub fn minimum_income_decided(&self, meets_minimum_income: bool) {
        if meets_minimum_income {
            self.minimum_income_met.fetch_add(1, Ordering::Relaxed);
        } else {
            self.minimum_income_not_met.fetch_add(1, Ordering::Relaxed);
        }

        self.increment(
            MINIMUM_INCOME_COUNTER,
            "resultat",
            meets_minimum_income.to_string(),
        );
        tracing::debug!(
            counter = MINIMUM_INCOME_COUNTER,
            resultat = meets_minimum_income,
            "Metric incremented"
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let contexts = self
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        MetricsSnapshot {
            contexts,
            minimum_income_met: self.minimum_income_met.load(Ordering::Relaxed),
            minimum_income_not_met: self.minimum_income_not_met.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub contexts: BTreeMap<String, u64>,
    pub minimum_income_met: u64,
    pub minimum_income_not_met: u64,
}

impl MetricsSnapshot {
    pub fn context_count(&self, label: &str) -> u64 {
        self.contexts.get(label).copied().unwrap_or(0)
    }

    pub fn minimum_income_total(&self) -> u64 {
        self.minimum_income_met + self.minimum_income_not_met
    }
}
