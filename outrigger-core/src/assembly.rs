//! Inbound frame assembly.
//!
//! Collects frames until the transport's continuation flag clears, then holds
//! the completed message until the owner consumes it.

use crate::message::Message;
use bytes::Bytes;
use smallvec::SmallVec;

/// Accumulates frames for the message currently being received.
///
/// Invariants:
/// - Frames are appended in-order, only while the completion flag is false
/// - The buffer is cleared and the flag reset exactly when the completed
///   message is taken
///
/// This type is not thread-safe by design. It is owned by a single socket
/// adapter.
#[derive(Debug, Default)]
pub struct InboundAssembly {
    frames: SmallVec<[Bytes; 4]>,
    complete: bool,
}

impl InboundAssembly {
    /// Create an empty assembly buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received frame. `more` is the transport's continuation flag
    /// for this frame; when it is false the message is complete.
    ///
    /// Returns true if this frame completed the message.
    ///
    /// # Panics
    ///
    /// Panics if called while a completed message is still pending.
    pub fn push(&mut self, frame: Bytes, more: bool) -> bool {
        assert!(
            !self.complete,
            "frame appended before the completed message was consumed"
        );
        self.frames.push(frame);
        if !more {
            self.complete = true;
        }
        self.complete
    }

    /// True if a fully assembled message is waiting to be consumed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of frames accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if no frames have been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Take the completed message, clearing the buffer and resetting the
    /// completion flag. Returns `None` while the message is still partial.
    pub fn take(&mut self) -> Option<Message> {
        if !self.complete {
            return None;
        }
        let frames = std::mem::take(&mut self.frames);
        self.complete = false;
        Some(Message::from_frames(frames.into_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_is_not_exposed() {
        let mut asm = InboundAssembly::new();
        assert!(!asm.push(Bytes::from_static(b"a"), true));
        assert!(!asm.is_complete());
        assert!(asm.take().is_none());
        assert_eq!(asm.len(), 1);
    }

    #[test]
    fn test_complete_and_take() {
        let mut asm = InboundAssembly::new();
        asm.push(Bytes::from_static(b"a"), true);
        assert!(asm.push(Bytes::from_static(b"b"), false));
        assert!(asm.is_complete());

        let msg = asm.take().unwrap();
        assert_eq!(msg.frames(), &[Bytes::from_static(b"a"), Bytes::from_static(b"b")]);

        // Reset for the next message
        assert!(!asm.is_complete());
        assert!(asm.is_empty());
        assert!(asm.take().is_none());
    }

    #[test]
    fn test_single_frame_message() {
        let mut asm = InboundAssembly::new();
        assert!(asm.push(Bytes::from_static(b"solo"), false));
        assert_eq!(asm.take().unwrap().len(), 1);
    }

    #[test]
    #[should_panic(expected = "completed message")]
    fn test_push_while_complete_panics() {
        let mut asm = InboundAssembly::new();
        asm.push(Bytes::from_static(b"done"), false);
        asm.push(Bytes::from_static(b"late"), false);
    }
}
