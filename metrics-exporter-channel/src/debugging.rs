//! Channels for testing code that publishes metrics.
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use crate::{
    channel::{MessageChannel, SendError},
    message::OutboundMessage,
};

/// A channel that captures every message sent to it.
///
/// Clones share the same captured messages, so one clone can be handed to a publisher while
/// another is kept around to inspect what was sent.
///
/// A `RecordingChannel` can also be made to fail every send, in which case nothing is captured
/// but the number of attempts is still tracked.
#[derive(Clone, Debug, Default)]
pub struct RecordingChannel {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
    attempts: Arc<AtomicUsize>,
    failure: Option<SendError>,
}

impl RecordingChannel {
    /// Creates a channel that accepts and captures every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel that rejects every message with the given error.
    pub fn failing(error: SendError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Returns a copy of the captured messages, in the order they were sent.
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().expect("messages lock poisoned").clone()
    }

    /// Removes and returns the captured messages.
    pub fn take(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.messages.lock().expect("messages lock poisoned"))
    }

    /// Number of send attempts seen, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }
}

impl MessageChannel for RecordingChannel {
    fn send(&self, message: OutboundMessage) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::AcqRel);

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        self.messages.lock().expect("messages lock poisoned").push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RecordingChannel;
    use crate::{
        channel::{MessageChannel, SendError},
        message::{OutboundMessage, Payload},
    };

    #[test]
    fn clones_share_captured_messages() {
        let channel = RecordingChannel::new();
        let handle = channel.clone();

        channel.send(OutboundMessage::for_metric("a", Payload::Reset)).unwrap();
        channel.send(OutboundMessage::for_metric("b", Payload::Reset)).unwrap();

        assert_eq!(handle.attempts(), 2);
        assert_eq!(handle.messages().len(), 2);

        let taken = handle.take();
        assert_eq!(taken[0].metric_name(), "a");
        assert_eq!(taken[1].metric_name(), "b");
        assert!(channel.messages().is_empty());
    }

    #[test]
    fn attempts_are_counted_across_threads() {
        let channel = RecordingChannel::new();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..50 {
                        channel.send(OutboundMessage::for_metric("a", Payload::Reset)).unwrap();
                    }
                });
            }
        });

        assert_eq!(channel.attempts(), 200);
        assert_eq!(channel.messages().len(), 200);
    }

    #[test]
    fn failing_channel_captures_nothing() {
        let channel = RecordingChannel::failing(SendError::Disconnected);

        let result = channel.send(OutboundMessage::for_metric("a", Payload::Reset));
        assert_eq!(result, Err(SendError::Disconnected));
        assert_eq!(channel.attempts(), 1);
        assert!(channel.messages().is_empty());
    }
}
