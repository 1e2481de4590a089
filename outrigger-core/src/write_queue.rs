//! Outbound message queue.
//!
//! An ordered sequence of pending messages, each an ordered sequence of
//! not-yet-sent frames. The socket adapter sends one frame at a time and
//! commits progress only after the transport accepts the frame.

use crate::message::Message;
use bytes::Bytes;
use std::collections::VecDeque;

/// FIFO of pending multi-frame messages.
///
/// Invariants:
/// - A message is removed only after every one of its frames has been handed
///   to the transport
/// - Frames within a message are sent strictly in order
/// - Frames from two different messages are never interleaved
#[derive(Debug, Default)]
pub struct WriteQueue {
    messages: VecDeque<VecDeque<Bytes>>,
}

impl WriteQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message as a new pending entry.
    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message.into_frames().into());
    }

    /// True if no messages are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of pending messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Peek the next frame to send, with its continuation flag: true when the
    /// frame is not its message's last.
    #[must_use]
    pub fn front_frame(&self) -> Option<(&Bytes, bool)> {
        let message = self.messages.front()?;
        let frame = message.front()?;
        Some((frame, message.len() > 1))
    }

    /// Commit the frame returned by `front_frame` as sent. Returns true if
    /// that frame completed its message (which is then removed).
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn commit_front(&mut self) -> bool {
        let message = self
            .messages
            .front_mut()
            .expect("commit_front on an empty write queue");
        message.pop_front().expect("pending message with no frames");
        if message.is_empty() {
            self.messages.pop_front();
            return true;
        }
        false
    }
}
