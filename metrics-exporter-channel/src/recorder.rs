use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::SystemTime,
};

use metrics::{
    Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit,
};
use tracing::debug;

use crate::{
    channel::MessageChannel,
    message::{OutboundMessage, Payload},
    metric::{Delta, MetricValue, Number},
    publisher::{MetricPublisher, PublishError},
};

/// Prefix of the headers carrying a metric's labels.
///
/// A metric with the label `region=us-east-1` is published with the header
/// `label.region: us-east-1`.
pub const LABEL_HEADER_PREFIX: &str = "label.";

struct Inner {
    publisher: MetricPublisher<Box<dyn MessageChannel>>,
    timestamps: bool,
    dropped: AtomicU64,
}

impl Inner {
    fn now(&self) -> Option<SystemTime> {
        self.timestamps.then(SystemTime::now)
    }

    fn push(&self, key: &Key, payload: Payload) {
        let message = OutboundMessage::for_metric(key.name(), payload);
        let message = key.labels().fold(message, |msg, label| {
            msg.with_header(format!("{}{}", LABEL_HEADER_PREFIX, label.key()), label.value())
        });

        if let Err(e) = self.publisher.send(message) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key.name(), error = %e, "dropped metric update");
        }
    }

    fn push_delta(&self, key: &Key, value: Number) {
        let mut delta = Delta::new(key.name(), value);
        if let Some(ts) = self.now() {
            delta = delta.with_timestamp(ts);
        }
        self.push(key, Payload::Delta(delta));
    }

    fn push_value(&self, key: &Key, value: Number) {
        let mut metric = MetricValue::new(key.name(), value);
        if let Some(ts) = self.now() {
            metric = metric.with_timestamp(ts);
        }
        self.push(key, Payload::Value(metric));
    }
}

struct ChannelHandle {
    key: Key,
    inner: Arc<Inner>,
}

impl CounterFn for ChannelHandle {
    fn increment(&self, value: u64) {
        self.inner.push_delta(&self.key, Number::from(value));
    }

    fn absolute(&self, value: u64) {
        self.inner.push_value(&self.key, Number::from(value));
    }
}

impl GaugeFn for ChannelHandle {
    fn increment(&self, value: f64) {
        self.inner.push_delta(&self.key, Number::from(value));
    }

    fn decrement(&self, value: f64) {
        self.inner.push_delta(&self.key, Number::from(-value));
    }

    fn set(&self, value: f64) {
        self.inner.push_value(&self.key, Number::from(value));
    }
}

impl HistogramFn for ChannelHandle {
    fn record(&self, value: f64) {
        self.inner.push_value(&self.key, Number::from(value));
    }
}

/// A recorder that publishes every metric update as a message on a [`MessageChannel`].
///
/// Counter increments and gauge increments/decrements are published as [`Delta`]s. Counter
/// absolute values, gauge sets and histogram samples are published as [`MetricValue`]s. Labels
/// are carried as `label.<key>` headers.
///
/// Handles cannot report errors back to the caller, so updates the channel refuses are dropped
/// and counted instead. See [`ChannelRecorder::dropped`].
#[derive(Clone)]
pub struct ChannelRecorder {
    inner: Arc<Inner>,
}

impl ChannelRecorder {
    pub(crate) fn new(channel: Box<dyn MessageChannel>, timestamps: bool) -> Self {
        ChannelRecorder {
            inner: Arc::new(Inner {
                publisher: MetricPublisher::new(channel),
                timestamps,
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Publishes a reset of the named metric.
    ///
    /// # Errors
    ///
    /// See [`MetricPublisher::reset`].
    pub fn reset(&self, metric_name: &str) -> Result<(), PublishError> {
        self.inner.publisher.reset(metric_name)
    }

    /// Number of metric updates dropped because they could not be published.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    fn handle(&self, key: &Key) -> Arc<ChannelHandle> {
        Arc::new(ChannelHandle {
            key: key.clone(),
            inner: Arc::clone(&self.inner),
        })
    }
}

impl fmt::Debug for ChannelRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRecorder")
            .field("timestamps", &self.inner.timestamps)
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}

impl Recorder for ChannelRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.handle(key))
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.handle(key))
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.handle(key))
    }
}
