//! Socket pattern kinds.

use std::fmt;

/// The communication pattern a socket participates in.
///
/// Pattern routing semantics (request/reply matching, fair queuing, and so on)
/// belong to the underlying transport; the adapter only carries the kind
/// through to socket creation and, for `Sub`, subscription pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// Exclusive bidirectional link between two peers
    Pair,
    /// Asynchronous request-reply client
    Dealer,
    /// Routes messages by peer identity
    Router,
    /// Synchronous request-reply client
    Req,
    /// Synchronous request-reply server
    Rep,
    /// One-way pipeline sender
    Push,
    /// One-way pipeline receiver
    Pull,
    /// Publisher with fan-out delivery
    Pub,
    /// Subscriber with prefix filtering
    Sub,
}

impl SocketKind {
    /// Socket kind as an uppercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Dealer => "DEALER",
            Self::Router => "ROUTER",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::Push => "PUSH",
            Self::Pull => "PULL",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
        }
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
