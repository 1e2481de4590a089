//! The consumed transport interface.
//!
//! The adapter engine is written against these traits; the underlying
//! message transport (socket creation, raw frame send/receive, option
//! primitives, readiness query) is an external collaborator. The bundled
//! [`crate::mem`] transport implements them for in-process use.

use bytes::Bytes;
use outrigger_core::endpoint::Endpoint;
use outrigger_core::socket_kind::SocketKind;
use std::io;

/// Outcome of a non-blocking frame send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The transport accepted the frame.
    Sent,
    /// The send would block; nothing was consumed.
    WouldBlock,
}

/// Outcome of a non-blocking frame receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvStatus {
    /// One frame was received.
    Frame(Bytes),
    /// No frame is available right now.
    WouldBlock,
}

/// Names for the transport's untyped option primitives.
///
/// Scalar options are encoded as little-endian `i32` by the facade in
/// [`crate::sockopt`]; byte options (identity, subscription prefixes) pass
/// through unencoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    /// Socket identity bytes (get/set).
    Identity,
    /// Outbound high-water mark, in frames (get/set).
    SendHwm,
    /// Inbound high-water mark, in frames (get/set).
    ReceiveHwm,
    /// Add a subscription prefix (set only).
    Subscribe,
    /// Remove a subscription prefix (set only).
    Unsubscribe,
    /// Shutdown-wait in milliseconds, -1 for the transport default (set only).
    Linger,
    /// Current readiness bitmask (get only); see [`Readiness`].
    Events,
    /// Whether the last received frame had the continuation flag (get only).
    ReceiveMore,
}

/// Decoded readiness flags, from the `Events` option bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// A non-blocking receive may succeed.
    pub readable: bool,
    /// A non-blocking send may succeed.
    pub writable: bool,
}

impl Readiness {
    /// Bit reported for readable sockets.
    pub const READABLE: i32 = 1;
    /// Bit reported for writable sockets.
    pub const WRITABLE: i32 = 2;

    /// Decode from the `Events` option bitmask.
    #[must_use]
    pub const fn from_bits(bits: i32) -> Self {
        Self {
            readable: bits & Self::READABLE != 0,
            writable: bits & Self::WRITABLE != 0,
        }
    }

    /// Encode to the `Events` option bitmask.
    #[must_use]
    pub const fn to_bits(self) -> i32 {
        (if self.readable { Self::READABLE } else { 0 })
            | (if self.writable { Self::WRITABLE } else { 0 })
    }
}

/// A transport context: the factory for socket handles.
///
/// Contexts may be shared by many adapters; socket handles never are.
pub trait RawContext: Send + Sync {
    /// Create a socket handle of the given pattern kind, bound to this
    /// context.
    fn open(&self, kind: SocketKind) -> Box<dyn RawSocket>;
}

/// One transport socket handle.
///
/// Exclusively owned by a single adapter and never used concurrently. All I/O
/// primitives are non-blocking: a blocking outcome is expressed as
/// [`SendStatus::WouldBlock`] / [`RecvStatus::WouldBlock`], never by waiting.
pub trait RawSocket {
    /// Connect to a peer endpoint.
    fn connect(&mut self, endpoint: &Endpoint) -> io::Result<()>;

    /// Bind to an endpoint. Address-in-use is an expected, recoverable
    /// failure.
    fn bind(&mut self, endpoint: &Endpoint) -> io::Result<()>;

    /// Attempt to send one frame. `more` marks a frame that is not its
    /// message's last.
    fn send_frame(&mut self, frame: Bytes, more: bool) -> io::Result<SendStatus>;

    /// Attempt to receive one frame.
    fn recv_frame(&mut self) -> io::Result<RecvStatus>;

    /// Set an option from its raw encoding.
    fn set_option(&mut self, name: OptionName, value: &[u8]) -> io::Result<()>;

    /// Read an option into `buf`, returning the encoded length.
    fn get_option(&self, name: OptionName, buf: &mut [u8]) -> io::Result<usize>;

    /// The handle's readiness-notification channel: a signal arrives whenever
    /// socket state may have changed. Edge-like; the receiver must re-query
    /// the `Events` option rather than trust the signal.
    fn notifier(&self) -> flume::Receiver<()>;

    /// Close the handle, honoring the previously configured linger option.
    fn close(&mut self);
}
