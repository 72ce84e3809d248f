use std::fmt;

use indexmap::IndexMap;

use crate::metric::{Delta, MetricValue};

/// Header carrying the name of the metric a message refers to.
pub const METRIC_NAME_HEADER: &str = "metricName";

/// Payload sent to signal that a metric should be reset.
pub const RESET_PAYLOAD: &str = "delete";

/// String-keyed message headers, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    inner: IndexMap<String, String>,
}

impl Headers {
    /// Creates an empty set of headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, returning the previous value if one was present.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.insert(key.into(), value.into())
    }

    /// Gets the value of a header.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over the headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The body of an [`OutboundMessage`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// A relative change.
    Delta(Delta),

    /// An absolute value.
    Value(MetricValue),

    /// The reset marker.
    ///
    /// Carries no data of its own: the metric to reset is named by the `metricName` header.
    Reset,
}

impl Payload {
    /// Name of the metric embedded in the payload, if any.
    ///
    /// [`Payload::Reset`] has no embedded name.
    pub fn metric_name(&self) -> Option<&str> {
        match self {
            Payload::Delta(delta) => Some(delta.name()),
            Payload::Value(value) => Some(value.name()),
            Payload::Reset => None,
        }
    }

    /// Returns the reset marker if this is a reset payload.
    pub fn as_reset_marker(&self) -> Option<&'static str> {
        match self {
            Payload::Reset => Some(RESET_PAYLOAD),
            _ => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Delta(delta) => write!(f, "{}{:+}", delta.name(), delta.value()),
            Payload::Value(value) => write!(f, "{}={}", value.name(), value.value()),
            Payload::Reset => f.write_str(RESET_PAYLOAD),
        }
    }
}

/// A payload plus the headers describing it: the unit sent over a [`MessageChannel`].
///
/// Every message carries exactly one `metricName` header.
///
/// [`MessageChannel`]: crate::MessageChannel
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundMessage {
    payload: Payload,
    headers: Headers,
}

impl OutboundMessage {
    /// Creates a message for the given metric.
    pub fn for_metric<N>(metric_name: N, payload: Payload) -> Self
    where
        N: Into<String>,
    {
        let mut headers = Headers::new();
        headers.insert(METRIC_NAME_HEADER, metric_name);
        Self { payload, headers }
    }

    /// Attaches an additional header.
    ///
    /// The `metricName` header is fixed at construction, so attempts to overwrite it are ignored.
    #[must_use]
    pub fn with_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        if key != METRIC_NAME_HEADER {
            self.headers.insert(key, value);
        }
        self
    }

    /// The message payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The message headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Value of the `metricName` header.
    pub fn metric_name(&self) -> &str {
        self.headers.get(METRIC_NAME_HEADER).unwrap_or_default()
    }

    /// Consumes the message, returning the payload and headers.
    pub fn into_parts(self) -> (Payload, Headers) {
        (self.payload, self.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::{Headers, OutboundMessage, Payload, METRIC_NAME_HEADER, RESET_PAYLOAD};
    use crate::metric::{Delta, MetricValue};

    #[test]
    fn headers_keep_insertion_order() {
        let mut headers = Headers::new();
        assert!(headers.is_empty());

        headers.insert("b", "2");
        headers.insert("a", "1");
        assert_eq!(headers.insert("b", "3"), Some("2".to_string()));

        let collected = headers.iter().collect::<Vec<_>>();
        assert_eq!(collected, vec![("b", "3"), ("a", "1")]);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn message_carries_metric_name_header() {
        let msg = OutboundMessage::for_metric("queue.depth", Payload::Reset);
        assert_eq!(msg.headers().get(METRIC_NAME_HEADER), Some("queue.depth"));
        assert_eq!(msg.metric_name(), "queue.depth");
        assert_eq!(msg.headers().len(), 1);
    }

    #[test]
    fn metric_name_header_cannot_be_overwritten() {
        let msg = OutboundMessage::for_metric("a", Payload::Reset)
            .with_header(METRIC_NAME_HEADER, "b")
            .with_header("label.region", "us-east-1");

        assert_eq!(msg.metric_name(), "a");
        assert_eq!(msg.headers().get("label.region"), Some("us-east-1"));
        assert_eq!(msg.headers().iter().filter(|(k, _)| *k == METRIC_NAME_HEADER).count(), 1);
    }

    #[test]
    fn payload_names_and_markers() {
        let delta = Payload::Delta(Delta::new("hits", 1));
        let value = Payload::Value(MetricValue::new("depth", 42));

        assert_eq!(delta.metric_name(), Some("hits"));
        assert_eq!(value.metric_name(), Some("depth"));
        assert_eq!(Payload::Reset.metric_name(), None);

        assert_eq!(Payload::Reset.as_reset_marker(), Some(RESET_PAYLOAD));
        assert_eq!(delta.as_reset_marker(), None);
    }

    #[test]
    fn payload_display() {
        assert_eq!(Payload::Delta(Delta::new("hits", 1)).to_string(), "hits+1");
        assert_eq!(Payload::Delta(Delta::new("hits", -2.5)).to_string(), "hits-2.5");
        assert_eq!(Payload::Value(MetricValue::new("depth", 42)).to_string(), "depth=42");
        assert_eq!(Payload::Reset.to_string(), "delete");
    }
}
