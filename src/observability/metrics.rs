//! OpenTelemetry metrics implementation.
//!
//! Key metrics:
//! - chanhub_subscribe_total: Counter for registered subscriptions
//! - chanhub_unsubscribe_total: Counter for torn-down subscriptions
//! - chanhub_active_subscriptions: Up/down counter for live subscriptions
//! - chanhub_broadcast_total: Counter for broadcast calls
//! - chanhub_signals_delivered_total: Counter for signals placed in a mailbox
//! - chanhub_signals_coalesced_total: Counter for signals skipped on a full mailbox

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Meter, MeterProvider, UpDownCounter};
use opentelemetry_sdk::metrics::data::{self, Aggregation, ResourceMetrics, Temporality};
use opentelemetry_sdk::metrics::reader::{MetricReader, TemporalitySelector};
use opentelemetry_sdk::metrics::{InstrumentKind, ManualReader, Pipeline, SdkMeterProvider};
use opentelemetry_sdk::Resource;
use std::sync::{Arc, OnceLock, Weak};

/// Global metrics instance.
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Chanhub metrics registry.
#[derive(Debug)]
pub struct Metrics {
    /// Total number of subscriptions registered.
    pub subscribe_total: Counter<u64>,
    /// Total number of subscriptions torn down.
    pub unsubscribe_total: Counter<u64>,
    /// Number of currently registered subscriptions.
    pub active_subscriptions: UpDownCounter<i64>,
    /// Total number of broadcast calls.
    pub broadcast_total: Counter<u64>,
    /// Total number of signals delivered into an empty mailbox.
    pub signals_delivered: Counter<u64>,
    /// Total number of signals coalesced into an already-full mailbox.
    pub signals_coalesced: Counter<u64>,
    /// Reader the provider collects into, kept for [`snapshot`].
    reader: SharedReader,
}

/// A [`ManualReader`] shared between the meter provider and [`snapshot`].
#[derive(Debug, Clone)]
struct SharedReader(Arc<ManualReader>);

impl TemporalitySelector for SharedReader {
    fn temporality(&self, kind: InstrumentKind) -> Temporality {
        self.0.temporality(kind)
    }
}

impl MetricReader for SharedReader {
    fn register_pipeline(&self, pipeline: Weak<Pipeline>) {
        self.0.register_pipeline(pipeline);
    }

    fn collect(&self, rm: &mut ResourceMetrics) -> opentelemetry::metrics::Result<()> {
        self.0.collect(rm)
    }

    fn force_flush(&self) -> opentelemetry::metrics::Result<()> {
        self.0.force_flush()
    }

    fn shutdown(&self) -> opentelemetry::metrics::Result<()> {
        self.0.shutdown()
    }
}

/// Cumulative metric values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub subscribe_total: u64,
    pub unsubscribe_total: u64,
    pub active_subscriptions: i64,
    pub broadcast_total: u64,
    pub signals_delivered: u64,
    pub signals_coalesced: u64,
}

impl Metrics {
    /// Create a new metrics registry from a meter.
    fn new(meter: &Meter, reader: SharedReader) -> Self {
        Self {
            reader,
            subscribe_total: meter
                .u64_counter("chanhub_subscribe_total")
                .with_description("Total number of subscriptions registered")
                .with_unit("1")
                .init(),
            unsubscribe_total: meter
                .u64_counter("chanhub_unsubscribe_total")
                .with_description("Total number of subscriptions torn down")
                .with_unit("1")
                .init(),
            active_subscriptions: meter
                .i64_up_down_counter("chanhub_active_subscriptions")
                .with_description("Subscriptions currently registered")
                .with_unit("1")
                .init(),
            broadcast_total: meter
                .u64_counter("chanhub_broadcast_total")
                .with_description("Total number of broadcast calls")
                .with_unit("1")
                .init(),
            signals_delivered: meter
                .u64_counter("chanhub_signals_delivered_total")
                .with_description("Signals placed into an empty mailbox")
                .with_unit("1")
                .init(),
            signals_coalesced: meter
                .u64_counter("chanhub_signals_coalesced_total")
                .with_description("Signals skipped because the mailbox was full")
                .with_unit("1")
                .init(),
        }
    }
}

/// Initialize the metrics system.
///
/// Metrics are recorded into a manual reader and are not exported. This
/// should be called once at startup. Subsequent calls are ignored.
pub fn init_metrics() {
    METRICS.get_or_init(|| {
        let reader = SharedReader(Arc::new(ManualReader::builder().build()));
        let provider = SdkMeterProvider::builder()
            .with_reader(reader.clone())
            .build();
        global::set_meter_provider(provider.clone());

        let meter = provider.meter("chanhub");
        Metrics::new(&meter, reader)
    });
}

/// Get the global metrics instance, if initialized.
pub fn metrics() -> Option<&'static Metrics> {
    METRICS.get()
}

/// Collect the current cumulative values.
///
/// Returns `None` if metrics are not initialized or collection fails.
pub fn snapshot() -> Option<Snapshot> {
    let m = METRICS.get()?;
    let mut rm = ResourceMetrics {
        resource: Resource::empty(),
        scope_metrics: Vec::new(),
    };
    if let Err(e) = m.reader.collect(&mut rm) {
        tracing::warn!(error = %e, "Failed to collect metrics");
        return None;
    }

    let mut snap = Snapshot::default();
    for metric in rm.scope_metrics.iter().flat_map(|scope| &scope.metrics) {
        let agg = metric.data.as_ref();
        match metric.name.as_ref() {
            "chanhub_subscribe_total" => snap.subscribe_total = sum_of::<u64>(agg),
            "chanhub_unsubscribe_total" => snap.unsubscribe_total = sum_of::<u64>(agg),
            "chanhub_active_subscriptions" => snap.active_subscriptions = sum_of::<i64>(agg),
            "chanhub_broadcast_total" => snap.broadcast_total = sum_of::<u64>(agg),
            "chanhub_signals_delivered_total" => snap.signals_delivered = sum_of::<u64>(agg),
            "chanhub_signals_coalesced_total" => snap.signals_coalesced = sum_of::<u64>(agg),
            _ => {}
        }
    }
    Some(snap)
}

/// Total across all data points of a sum aggregation.
fn sum_of<T>(agg: &dyn Aggregation) -> T
where
    T: Copy + Default + std::iter::Sum<T> + std::fmt::Debug + Send + Sync + 'static,
{
    agg.as_any()
        .downcast_ref::<data::Sum<T>>()
        .map(|sum| sum.data_points.iter().map(|dp| dp.value).sum())
        .unwrap_or_default()
}

/// Record a new subscription.
pub fn record_subscribe() {
    if let Some(m) = METRICS.get() {
        m.subscribe_total.add(1, &[]);
        m.active_subscriptions.add(1, &[]);
    }
}

/// Record a subscription teardown.
pub fn record_unsubscribe() {
    if let Some(m) = METRICS.get() {
        m.unsubscribe_total.add(1, &[]);
        m.active_subscriptions.add(-1, &[]);
    }
}

/// Record one broadcast and its per-mailbox outcome.
pub fn record_broadcast(delivered: u64, coalesced: u64) {
    if let Some(m) = METRICS.get() {
        m.broadcast_total.add(1, &[]);
        m.signals_delivered.add(delivered, &[]);
        m.signals_coalesced.add(coalesced, &[]);
    }
}
