use std::{sync::Arc, time::Duration};

use crossbeam_channel::{SendTimeoutError, Sender, TrySendError};
use thiserror::Error;

use crate::message::OutboundMessage;

/// Errors returned by a [`MessageChannel`] when a message could not be sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The channel buffer is full.
    #[error("channel is full")]
    Full,

    /// Every receiver of the channel has been dropped.
    #[error("channel is disconnected")]
    Disconnected,

    /// The message could not be sent before the send timeout elapsed.
    #[error("timed out sending message")]
    Timeout,

    /// The channel refused the message.
    #[error("message rejected: {reason}")]
    Rejected {
        /// Why the message was refused.
        reason: String,
    },
}

/// A transport that accepts outbound messages.
///
/// Implementations own all delivery concerns: buffering, backpressure, retries and routing to
/// consumers. A successful `send` only means the channel accepted the message.
///
/// Implementations must be safe to call concurrently.
pub trait MessageChannel: Send + Sync {
    /// Sends a message.
    ///
    /// # Errors
    ///
    /// If the channel could not accept the message, an error describing why is returned. The
    /// message is dropped in that case.
    fn send(&self, message: OutboundMessage) -> Result<(), SendError>;
}

macro_rules! impl_message_channel {
    ($inner_ty:ident, $ptr_ty:ty) => {
        impl<$inner_ty> $crate::MessageChannel for $ptr_ty
        where
            $inner_ty: $crate::MessageChannel + ?Sized,
        {
            fn send(
                &self,
                message: $crate::OutboundMessage,
            ) -> Result<(), $crate::SendError> {
                $crate::MessageChannel::send(std::ops::Deref::deref(self), message)
            }
        }
    };
}

impl_message_channel!(T, &T);
impl_message_channel!(T, Box<T>);
impl_message_channel!(T, Arc<T>);

impl MessageChannel for Sender<OutboundMessage> {
    fn send(&self, message: OutboundMessage) -> Result<(), SendError> {
        self.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Disconnected(_) => SendError::Disconnected,
        })
    }
}

/// A [`Sender`] that waits up to a timeout for buffer space instead of failing immediately.
#[derive(Clone, Debug)]
pub struct TimeoutSender {
    tx: Sender<OutboundMessage>,
    timeout: Duration,
}

impl TimeoutSender {
    /// Wraps `tx` so that sends block for at most `timeout`.
    pub fn new(tx: Sender<OutboundMessage>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    /// The configured send timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl MessageChannel for TimeoutSender {
    fn send(&self, message: OutboundMessage) -> Result<(), SendError> {
        self.tx.send_timeout(message, self.timeout).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => SendError::Timeout,
            SendTimeoutError::Disconnected(_) => SendError::Disconnected,
        })
    }
}
