//! A [`metrics`][metrics]-compatible exporter that publishes metric updates as messages on a
//! channel.
//!
//! Every update becomes one [`OutboundMessage`]: the update itself as the payload, plus a
//! `metricName` header naming the metric, so consumers can route or filter messages without
//! looking at the payload.
//!
//! # Publishing directly
//!
//! [`MetricPublisher`] turns three operations into messages on any [`MessageChannel`]:
//!
//! - [`MetricPublisher::increment`] publishes a [`Delta`], a relative change.
//! - [`MetricPublisher::set`] publishes a [`MetricValue`], an absolute value.
//! - [`MetricPublisher::reset`] publishes the `"delete"` marker for a metric name.
//!
//! ```
//! # use metrics_exporter_channel::{Delta, MetricPublisher, OutboundMessage};
//! let (tx, rx) = crossbeam_channel::unbounded::<OutboundMessage>();
//! let publisher = MetricPublisher::new(tx);
//!
//! publisher.increment(&Delta::new("requests.count", 1)).expect("failed to publish");
//!
//! let message = rx.recv().expect("channel closed");
//! assert_eq!(message.metric_name(), "requests.count");
//! ```
//!
//! Failures are never retried or hidden: a channel that refuses a message causes the operation to
//! return [`PublishError::PublishFailure`], carrying the channel's own error.
//!
//! # Usage with `metrics`
//!
//! The exporter can be constructed by creating a [`ChannelBuilder`], configuring it as needed, and
//! calling [`ChannelBuilder::install`] to install the recorder globally and get back the receiving
//! end of the channel.
//!
//! If necessary, the recorder itself can be returned so that it can be composed separately by
//! calling [`ChannelBuilder::build`].
//!
//! ```
//! # use metrics_exporter_channel::ChannelBuilder;
//! # fn direct() {
//! // Install the exporter directly:
//! let rx = ChannelBuilder::new().install().expect("failed to install channel exporter");
//!
//! // Or build the recorder and channel without installing:
//! let (recorder, rx) = ChannelBuilder::new().build().expect("failed to build channel exporter");
//! # }
//! ```
//!
//! # Backpressure
//! The exporter buffers up to 1024 messages by default. When the buffer is full, updates coming
//! through the `metrics` macros are dropped and counted (see [`ChannelRecorder::dropped`]), unless
//! a send timeout is configured with [`ChannelBuilder::with_send_timeout`].
//!
//! [metrics]: https://docs.rs/metrics
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, ChannelBuilder};

mod channel;
pub use self::channel::{MessageChannel, SendError, TimeoutSender};

pub mod debugging;

mod message;
pub use self::message::{Headers, OutboundMessage, Payload, METRIC_NAME_HEADER, RESET_PAYLOAD};

mod metric;
pub use self::metric::{Delta, MetricValue, Number};

mod publisher;
pub use self::publisher::{MetricPublisher, PublishError};

mod recorder;
pub use self::recorder::{ChannelRecorder, LABEL_HEADER_PREFIX};
