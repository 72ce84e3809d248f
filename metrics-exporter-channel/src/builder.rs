use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver};
use thiserror::Error;

use crate::{
    channel::{MessageChannel, TimeoutSender},
    message::OutboundMessage,
    recorder::ChannelRecorder,
};

const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Errors that could occur while building or installing a channel recorder.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The buffer size was set to zero.
    ///
    /// A zero-sized buffer can only hand off messages to a receiver that is already waiting, which
    /// means nearly every update would be dropped.
    #[error("buffer size must be greater than zero")]
    InvalidBufferSize,

    /// Failed to install the recorder due to an existing global recorder already being installed.
    #[error("failed to install exporter as global recorder")]
    FailedToInstall,
}

/// Builder for creating and installing a channel recorder.
///
/// By default, the builder creates a bounded [`crossbeam_channel`] channel holding up to 1024
/// messages. Updates published while the buffer is full are dropped.
#[derive(Debug)]
pub struct ChannelBuilder {
    buffer_size: Option<usize>,
    send_timeout: Option<Duration>,
    timestamps: bool,
}

impl ChannelBuilder {
    /// Creates a new `ChannelBuilder`.
    pub fn new() -> ChannelBuilder {
        ChannelBuilder::default()
    }

    /// Sets the buffer size of the channel.
    ///
    /// If `None`, the channel is unbounded, and will hold as many messages as are published until
    /// they are received, potentially up until the point of memory exhaustion.
    ///
    /// Defaults to 1024 messages.
    #[must_use]
    pub fn with_buffer_size(mut self, size: Option<usize>) -> ChannelBuilder {
        self.buffer_size = size;
        self
    }

    /// Sets how long a publish may wait for space in a full buffer.
    ///
    /// When unset, publishing never blocks, and updates are dropped as soon as the buffer is full.
    /// When set, publishing blocks the caller for up to `timeout` before dropping the update.
    ///
    /// Has no effect on an unbounded channel. Defaults to unset.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> ChannelBuilder {
        self.send_timeout = Some(timeout);
        self
    }

    /// Sets whether or not published deltas and values carry a timestamp.
    ///
    /// When enabled, each update is stamped with the wall-clock time it was published at.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn with_timestamps(mut self, timestamps: bool) -> ChannelBuilder {
        self.timestamps = timestamps;
        self
    }

    /// Builds the recorder along with the receiving end of its channel.
    ///
    /// # Errors
    ///
    /// If the buffer size is zero, an error will be returned.
    pub fn build(self) -> Result<(ChannelRecorder, Receiver<OutboundMessage>), BuildError> {
        let (tx, rx) = match self.buffer_size {
            Some(0) => return Err(BuildError::InvalidBufferSize),
            Some(size) => bounded(size),
            None => unbounded(),
        };

        let channel: Box<dyn MessageChannel> = match self.send_timeout {
            Some(timeout) => Box::new(TimeoutSender::new(tx, timeout)),
            None => Box::new(tx),
        };

        Ok((ChannelRecorder::new(channel, self.timestamps), rx))
    }

    /// Builds a recorder that publishes to an existing channel.
    ///
    /// The buffer size and send timeout settings are not used, as buffering is up to `channel`.
    pub fn build_with_channel<C>(self, channel: C) -> ChannelRecorder
    where
        C: MessageChannel + 'static,
    {
        ChannelRecorder::new(Box::new(channel), self.timestamps)
    }

    /// Builds and installs the recorder, returning the receiving end of its channel.
    ///
    /// # Errors
    ///
    /// If the buffer size is zero, or if a global recorder is already installed, an error will be
    /// returned.
    pub fn install(self) -> Result<Receiver<OutboundMessage>, BuildError> {
        let (recorder, rx) = self.build()?;
        metrics::set_global_recorder(recorder).map_err(|_| BuildError::FailedToInstall)?;
        Ok(rx)
    }
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        ChannelBuilder {
            buffer_size: Some(DEFAULT_BUFFER_SIZE),
            send_timeout: None,
            timestamps: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use metrics::{Key, Level, Metadata, Recorder};

    use super::{BuildError, ChannelBuilder};
    use crate::{debugging::RecordingChannel, message::Payload, metric::Delta};

    static METADATA: Metadata<'static> = Metadata::new(module_path!(), Level::INFO, None);

    #[test]
    fn debug_output_shows_configuration() {
        let builder = ChannelBuilder::new().with_send_timeout(Duration::from_millis(5));
        assert_eq!(
            format!("{:?}", builder),
            "ChannelBuilder { buffer_size: Some(1024), send_timeout: Some(5ms), timestamps: false }"
        );
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let result = ChannelBuilder::new().with_buffer_size(Some(0)).build();
        assert!(matches!(result, Err(BuildError::InvalidBufferSize)));
    }

    #[test]
    fn bounded_channel_drops_when_full() {
        let (recorder, rx) = ChannelBuilder::new().with_buffer_size(Some(2)).build().unwrap();
        let counter = recorder.register_counter(&Key::from_name("hits"), &METADATA);

        for _ in 0..3 {
            counter.increment(1);
        }

        assert_eq!(rx.try_iter().count(), 2);
        assert_eq!(recorder.dropped(), 1);
    }

    #[test]
    fn unbounded_channel_keeps_everything() {
        let (recorder, rx) = ChannelBuilder::new().with_buffer_size(None).build().unwrap();
        let counter = recorder.register_counter(&Key::from_name("hits"), &METADATA);

        for _ in 0..2048 {
            counter.increment(1);
        }

        assert_eq!(rx.try_iter().count(), 2048);
        assert_eq!(recorder.dropped(), 0);
    }

    #[test]
    fn send_timeout_gives_up_when_full() {
        let (recorder, rx) = ChannelBuilder::new()
            .with_buffer_size(Some(1))
            .with_send_timeout(Duration::from_millis(5))
            .build()
            .unwrap();

        recorder.reset("a").unwrap();
        assert!(recorder.reset("b").is_err());
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn disconnected_receiver_drops_updates() {
        let (recorder, rx) = ChannelBuilder::new().build().unwrap();
        drop(rx);

        recorder.register_gauge(&Key::from_name("depth"), &METADATA).set(1.0);
        assert_eq!(recorder.dropped(), 1);
    }

    #[test]
    fn build_with_existing_channel() {
        let channel = RecordingChannel::new();
        let recorder = ChannelBuilder::new().build_with_channel(channel.clone());

        recorder.register_counter(&Key::from_name("hits"), &METADATA).increment(5);

        let messages = channel.take();
        assert_eq!(messages[0].payload(), &Payload::Delta(Delta::new("hits", 5)));
    }
}
