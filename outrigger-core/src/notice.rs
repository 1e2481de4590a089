//! Owner notifications.
//!
//! The adapter reports progress to its owner through an explicit channel
//! rather than an implicit broadcast mechanism. Notices are only emitted once
//! the drain loop has reached a fixed point, so an owner reacting to one never
//! observes the adapter mid-iteration.

use std::fmt;

/// A notification raised by a socket adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketNotice {
    /// A complete inbound message is ready to be read.
    ReadyRead,

    /// N queued messages were fully handed to the transport during one
    /// processing pass.
    MessagesWritten(usize),
}

impl fmt::Display for SocketNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadyRead => write!(f, "ready to read"),
            Self::MessagesWritten(n) => write!(f, "{n} messages written"),
        }
    }
}

/// Sender half of a notice channel, held by the adapter.
pub type NoticeSender = flume::Sender<SocketNotice>;

/// Receiver half of a notice channel, held by the owner.
pub type SocketNotices = flume::Receiver<SocketNotice>;

/// Create a notice channel pair.
#[must_use]
pub fn notice_channel() -> (NoticeSender, SocketNotices) {
    flume::unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display() {
        assert_eq!(SocketNotice::ReadyRead.to_string(), "ready to read");
        assert_eq!(
            SocketNotice::MessagesWritten(3).to_string(),
            "3 messages written"
        );
    }

    #[test]
    fn test_channel_round_trip() {
        let (tx, rx) = notice_channel();
        tx.send(SocketNotice::MessagesWritten(1)).unwrap();
        assert_eq!(rx.recv().unwrap(), SocketNotice::MessagesWritten(1));
    }
}
