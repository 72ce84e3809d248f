use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    channel::{MessageChannel, SendError},
    message::{OutboundMessage, Payload},
    metric::{Delta, MetricValue},
};

/// Errors that could occur while publishing a metric update.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The update was not valid and nothing was sent.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Details about what was invalid.
        reason: String,
    },

    /// The channel did not accept the message.
    #[error("failed to publish update for metric '{metric_name}'")]
    PublishFailure {
        /// Name of the metric being updated.
        metric_name: String,

        /// Error reported by the channel.
        #[source]
        source: SendError,
    },
}

/// Publishes metric updates as messages on a [`MessageChannel`].
///
/// Each operation builds one [`OutboundMessage`], tags it with the `metricName` header, and sends
/// it. Nothing is buffered, retried or deduplicated here: calling an operation twice sends two
/// messages, and a failed send is returned to the caller as-is.
#[derive(Debug)]
pub struct MetricPublisher<C> {
    channel: C,
}

impl<C> MetricPublisher<C>
where
    C: MessageChannel,
{
    /// Creates a new `MetricPublisher` that sends on `channel`.
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Publishes a relative change to a metric.
    ///
    /// # Errors
    ///
    /// If the delta has an empty metric name, [`PublishError::InvalidArgument`] is returned and
    /// nothing is sent. If the channel fails to accept the message, [`PublishError::PublishFailure`]
    /// is returned.
    pub fn increment(&self, delta: &Delta) -> Result<(), PublishError> {
        self.publish(delta.name(), Payload::Delta(delta.clone()))
    }

    /// Publishes an absolute value for a metric.
    ///
    /// # Errors
    ///
    /// If the value has an empty metric name, [`PublishError::InvalidArgument`] is returned and
    /// nothing is sent. If the channel fails to accept the message, [`PublishError::PublishFailure`]
    /// is returned.
    pub fn set(&self, value: &MetricValue) -> Result<(), PublishError> {
        self.publish(value.name(), Payload::Value(value.clone()))
    }

    /// Publishes a reset of the named metric.
    ///
    /// # Errors
    ///
    /// If `metric_name` is empty, [`PublishError::InvalidArgument`] is returned and nothing is
    /// sent. If the channel fails to accept the message, [`PublishError::PublishFailure`] is
    /// returned.
    pub fn reset(&self, metric_name: &str) -> Result<(), PublishError> {
        self.publish(metric_name, Payload::Reset)
    }

    /// Sends a pre-built message.
    ///
    /// Used when extra headers need to ride along with the update.
    pub(crate) fn send(&self, message: OutboundMessage) -> Result<(), PublishError> {
        let metric_name = message.metric_name();
        if metric_name.is_empty() {
            return Err(PublishError::InvalidArgument {
                reason: "metric name must not be empty".to_string(),
            });
        }

        let metric_name = metric_name.to_string();
        trace!(
            metric_name = %metric_name,
            payload = %message.payload(),
            "publishing metric update"
        );
        MessageChannel::send(&self.channel, message).map_err(|source| {
            debug!(metric_name = %metric_name, error = %source, "channel rejected metric update");
            PublishError::PublishFailure { metric_name, source }
        })
    }

    fn publish(&self, metric_name: &str, payload: Payload) -> Result<(), PublishError> {
        self.send(OutboundMessage::for_metric(metric_name, payload))
    }
}

impl<C> MetricPublisher<C> {
    /// Gets a reference to the underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Consumes the publisher, returning the underlying channel.
    pub fn into_inner(self) -> C {
        self.channel
    }
}
