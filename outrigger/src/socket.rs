//! The socket adapter engine.
//!
//! Adapts one non-blocking, frame-oriented transport handle to a
//! readiness-driven event loop: messages are queued with [`Socket::write`],
//! completed inbound messages are consumed with [`Socket::read`], and the
//! owner is told about progress through the notice channel.
//!
//! # Drain loop
//!
//! A readiness signal from the transport is edge-like: one signal can stand
//! for any number of deliverable frames, and the flags it implies go stale
//! after a single I/O attempt. `process_events` therefore re-queries the
//! readiness flags, attempts one write step and one read step, and repeats
//! until neither direction makes progress.
//!
//! # Deferred wakes
//!
//! `write` and `read` never drain synchronously. When they want I/O they arm
//! a deferred wake for the next loop turn, gated by `pending_update`, so
//! queue and buffer state is never mutated from inside a dispatch that is
//! still iterating it. Notices are emitted only once a drain has reached a
//! fixed point.

use crate::context::Context;
use crate::reactor::{DeferredHandle, EventLoop, Token};
use crate::sockopt;
use crate::transport::{RawSocket, RecvStatus, SendStatus};
use bytes::Bytes;
use outrigger_core::assembly::InboundAssembly;
use outrigger_core::endpoint::Endpoint;
use outrigger_core::message::Message;
use outrigger_core::notice::{notice_channel, NoticeSender, SocketNotice, SocketNotices};
use outrigger_core::socket_kind::SocketKind;
use outrigger_core::write_queue::WriteQueue;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// A message socket adapted to a cooperative event loop.
///
/// Owns its transport handle exclusively. All methods are non-blocking; the
/// owner learns about completed work through [`Socket::notices`].
///
/// # Examples
///
/// ```no_run
/// use outrigger::reactor::{EventLoop, Token, Wake};
/// use outrigger::socket::Socket;
/// use outrigger_core::prelude::*;
///
/// let mut lp = EventLoop::new();
/// let mut sock = Socket::new(SocketKind::Pair, &mut lp, Token(0));
/// sock.connect(&"inproc://peer".parse().unwrap());
/// sock.write(Message::new().push_str("hello"));
///
/// lp.run_until_idle(|wake| match wake {
///     Wake::Readiness(Token(0)) => sock.handle_readable(),
///     Wake::Deferred(Token(0)) => sock.handle_deferred(),
///     _ => unreachable!(),
/// });
/// ```
pub struct Socket {
    raw: Box<dyn RawSocket>,
    kind: SocketKind,
    // Keeps a shared context alive for as long as this adapter exists.
    _context: Context,

    write_queue: WriteQueue,
    inbound: InboundAssembly,
    can_read: bool,
    can_write: bool,

    pending_update: bool,
    update: DeferredHandle,

    shutdown_wait: Option<Duration>,
    write_queue_enabled: bool,

    notice_tx: NoticeSender,
    notice_rx: SocketNotices,
}

impl Socket {
    /// Create a socket on the process-wide shared context and register it
    /// with `lp` under `token`.
    #[must_use]
    pub fn new(kind: SocketKind, lp: &mut EventLoop, token: Token) -> Self {
        Self::with_context(kind, Context::shared(), lp, token)
    }

    /// Create a socket on an explicit context.
    #[must_use]
    pub fn with_context(
        kind: SocketKind,
        context: Context,
        lp: &mut EventLoop,
        token: Token,
    ) -> Self {
        let raw = context.open(kind);
        Self::from_parts(raw, kind, context, lp, token)
    }

    pub(crate) fn from_parts(
        raw: Box<dyn RawSocket>,
        kind: SocketKind,
        context: Context,
        lp: &mut EventLoop,
        token: Token,
    ) -> Self {
        lp.register_notifier(token, raw.notifier());
        let update = lp.deferred_handle(token);
        let (notice_tx, notice_rx) = notice_channel();
        debug!(%kind, token = token.0, "socket created");
        Self {
            raw,
            kind,
            _context: context,
            write_queue: WriteQueue::new(),
            inbound: InboundAssembly::new(),
            can_read: false,
            can_write: false,
            pending_update: false,
            update,
            shutdown_wait: None,
            write_queue_enabled: true,
            notice_tx,
            notice_rx,
        }
    }

    /// The channel on which [`SocketNotice`]s are delivered.
    #[must_use]
    pub fn notices(&self) -> SocketNotices {
        self.notice_rx.clone()
    }

    /// The socket's pattern kind.
    #[must_use]
    pub const fn kind(&self) -> SocketKind {
        self.kind
    }

    /// Connect to a peer endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the transport rejects the connect; with a parsed
    /// [`Endpoint`] that indicates a broken transport setup, not bad input.
    pub fn connect(&mut self, endpoint: &Endpoint) {
        debug!(%endpoint, "connect");
        self.raw
            .connect(endpoint)
            .unwrap_or_else(|e| panic!("transport rejected connect to {endpoint}: {e}"));
    }

    /// Bind to an endpoint. Returns false if the transport refused, most
    /// commonly because the address is in use.
    pub fn bind(&mut self, endpoint: &Endpoint) -> bool {
        match self.raw.bind(endpoint) {
            Ok(()) => {
                debug!(%endpoint, "bound");
                true
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "bind failed");
                false
            }
        }
    }

    /// Queue a message for sending.
    ///
    /// With the write queue enabled (the default), the message is appended to
    /// the outbound queue and drained as the transport allows; a
    /// `MessagesWritten` notice reports completion. See
    /// [`Socket::set_write_queue_enabled`] for the non-queued mode.
    ///
    /// # Panics
    ///
    /// Panics if `message` is empty.
    pub fn write(&mut self, message: Message) {
        assert!(!message.is_empty(), "write of an empty message");

        if self.write_queue_enabled {
            self.write_queue.push(message);
            if self.can_write && !self.pending_update {
                self.pending_update = true;
                self.update.arm();
            }
            return;
        }

        // Best-effort immediate mode: each frame is offered once, and the
        // rest of the message is abandoned on the first would-block. Frames
        // already sent are not retracted.
        let frames = message.into_frames();
        let last = frames.len() - 1;
        for (i, frame) in frames.into_iter().enumerate() {
            match self.raw.send_frame(frame, i < last) {
                Ok(SendStatus::Sent) => {}
                Ok(SendStatus::WouldBlock) => {
                    debug!(
                        frames_dropped = last + 1 - i,
                        "non-queued write truncated by would-block"
                    );
                    return;
                }
                Err(e) => panic!("transport send failed unexpectedly: {e}"),
            }
        }
    }

    /// Take the completed inbound message, if there is one.
    ///
    /// Returns `None` while the current message is still partial; that is the
    /// normal no-data case, not an error.
    pub fn read(&mut self) -> Option<Message> {
        let message = self.inbound.take()?;

        // More data may already be buffered in the transport.
        if self.can_read && !self.pending_update {
            self.pending_update = true;
            self.update.arm();
        }

        Some(message)
    }

    /// True if a completed inbound message is waiting.
    #[must_use]
    pub const fn can_read(&self) -> bool {
        self.inbound.is_complete()
    }

    /// True if the last known readiness allowed sending. Advisory only: a
    /// send attempt is still the only authority.
    #[must_use]
    pub const fn can_write_immediately(&self) -> bool {
        self.can_write
    }

    /// Current socket identity.
    #[must_use]
    pub fn identity(&self) -> Bytes {
        sockopt::identity(self.raw.as_ref())
    }

    /// Set the socket identity.
    pub fn set_identity(&mut self, id: &[u8]) {
        sockopt::set_identity(self.raw.as_mut(), id);
    }

    /// Combined high-water mark (reads the send side).
    #[must_use]
    pub fn hwm(&self) -> i32 {
        sockopt::hwm(self.raw.as_ref())
    }

    /// Set both high-water marks.
    pub fn set_hwm(&mut self, value: i32) {
        sockopt::set_hwm(self.raw.as_mut(), value);
    }

    /// Outbound high-water mark.
    #[must_use]
    pub fn send_hwm(&self) -> i32 {
        sockopt::send_hwm(self.raw.as_ref())
    }

    /// Set the outbound high-water mark.
    pub fn set_send_hwm(&mut self, value: i32) {
        sockopt::set_send_hwm(self.raw.as_mut(), value);
    }

    /// Inbound high-water mark.
    #[must_use]
    pub fn receive_hwm(&self) -> i32 {
        sockopt::receive_hwm(self.raw.as_ref())
    }

    /// Set the inbound high-water mark.
    pub fn set_receive_hwm(&mut self, value: i32) {
        sockopt::set_receive_hwm(self.raw.as_mut(), value);
    }

    /// Add a subscription prefix (SUB sockets).
    pub fn subscribe(&mut self, filter: &[u8]) {
        sockopt::subscribe(self.raw.as_mut(), filter);
    }

    /// Remove a subscription prefix. Removing an unknown filter is harmless.
    pub fn unsubscribe(&mut self, filter: &[u8]) {
        sockopt::unsubscribe(self.raw.as_mut(), filter);
    }

    /// How long the closing socket may spend flushing unsent transport
    /// buffers. `None` (the default) leaves the transport's own default in
    /// place; `Some(Duration::ZERO)` discards immediately.
    pub fn set_shutdown_wait(&mut self, wait: Option<Duration>) {
        self.shutdown_wait = wait;
    }

    /// Enable or disable the outbound write queue.
    ///
    /// Disabled mode is best-effort and non-atomic: frames are offered to the
    /// transport once, in order, and the remainder of a message is silently
    /// abandoned at the first would-block. No error is reported and no
    /// retraction happens. Callers that need all-or-nothing delivery must
    /// keep the queue enabled.
    pub fn set_write_queue_enabled(&mut self, enabled: bool) {
        self.write_queue_enabled = enabled;
    }

    /// Readiness-notifier callback: drain and notify.
    pub fn handle_readable(&mut self) {
        let mut ready_read = false;
        let mut written = 0;

        self.process_events(&mut ready_read, &mut written);
        self.emit(ready_read, written);
    }

    /// Deferred-wake callback: retry one step in each direction the last
    /// known readiness allows, drain to a fixed point, notify.
    pub fn handle_deferred(&mut self) {
        self.pending_update = false;

        let mut ready_read = false;
        let mut written = 0;

        if self.can_write && self.try_write(&mut written) {
            self.process_events(&mut ready_read, &mut written);
        }

        if self.can_read && self.try_read(&mut ready_read) {
            self.process_events(&mut ready_read, &mut written);
        }

        self.emit(ready_read, written);
    }

    /// Drain as much I/O as is possible right now without blocking.
    ///
    /// Loops because progress in either direction can change the readiness
    /// flags; stops once a full pass makes no progress.
    fn process_events(&mut self, ready_read: &mut bool, written: &mut usize) {
        loop {
            let mut again = false;

            let flags = sockopt::events(self.raw.as_ref());

            if flags.writable {
                self.can_write = true;
                again |= self.try_write(written);
            } else {
                self.can_write = false;
            }

            if flags.readable {
                self.can_read = true;
                again |= self.try_read(ready_read);
            }

            if !again {
                return;
            }
        }
    }

    /// One write step. Returns whether progress was made.
    fn try_write(&mut self, written: &mut usize) -> bool {
        let Some((frame, more)) = self.write_queue.front_frame() else {
            return false;
        };
        let frame = frame.clone();

        // Whether this send succeeds or not, assume we can't write afterwards.
        self.can_write = false;

        match self.raw.send_frame(frame, more) {
            Ok(SendStatus::Sent) => {
                if self.write_queue.commit_front() {
                    *written += 1;
                }
                trace!(pending = self.write_queue.len(), "frame sent");
                true
            }
            // A refused send changes no state.
            Ok(SendStatus::WouldBlock) => false,
            Err(e) => panic!("transport send failed unexpectedly: {e}"),
        }
    }

    /// One read step. Returns whether a frame was received.
    fn try_read(&mut self, ready_read: &mut bool) -> bool {
        if self.inbound.is_complete() {
            return false;
        }

        let frame = match self.raw.recv_frame() {
            Ok(RecvStatus::Frame(frame)) => frame,
            // Readiness was just confirmed; a refusal here is a broken
            // transport contract.
            Ok(RecvStatus::WouldBlock) => {
                panic!("transport receive refused despite reported readiness")
            }
            Err(e) => panic!("transport receive failed unexpectedly: {e}"),
        };

        self.can_read = false;

        let more = sockopt::receive_more(self.raw.as_ref());
        if self.inbound.push(frame, more) {
            *ready_read = true;
            trace!(frames = self.inbound.len(), "inbound message complete");
        }

        true
    }

    fn emit(&self, ready_read: bool, written: usize) {
        // A dropped notice receiver just means nobody is listening.
        if ready_read {
            let _ = self.notice_tx.send(SocketNotice::ReadyRead);
        }
        if written > 0 {
            let _ = self.notice_tx.send(SocketNotice::MessagesWritten(written));
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        // Linger must be configured before close so the transport honors the
        // requested flush policy for buffered-but-unsent frames.
        sockopt::set_linger(self.raw.as_mut(), self.shutdown_wait);
        self.raw.close();
        debug!(kind = %self.kind, "socket closed");
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("kind", &self.kind)
            .field("pending_writes", &self.write_queue.len())
            .field("read_complete", &self.inbound.is_complete())
            .field("can_write", &self.can_write)
            .field("pending_update", &self.pending_update)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemContext;
    use crate::reactor::Wake;
    use crate::transport::OptionName;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;
    use std::sync::Arc;

    /// Scripted transport handle: `credits` sends succeed before would-block,
    /// frames queued in `inbox` are readable one at a time.
    #[derive(Default)]
    struct FakeState {
        credits: usize,
        sent: Vec<(Bytes, bool)>,
        inbox: VecDeque<(Bytes, bool)>,
        last_more: bool,
        linger: Option<i32>,
        closed: bool,
    }

    struct FakeSocket {
        state: Rc<RefCell<FakeState>>,
        notifier: (flume::Sender<()>, flume::Receiver<()>),
    }

    impl FakeSocket {
        fn with_state(state: Rc<RefCell<FakeState>>) -> Self {
            Self {
                state,
                notifier: flume::unbounded(),
            }
        }
    }

    impl RawSocket for FakeSocket {
        fn connect(&mut self, _: &Endpoint) -> io::Result<()> {
            Ok(())
        }
        fn bind(&mut self, _: &Endpoint) -> io::Result<()> {
            Ok(())
        }
        fn send_frame(&mut self, frame: Bytes, more: bool) -> io::Result<SendStatus> {
            let mut st = self.state.borrow_mut();
            if st.credits == 0 {
                return Ok(SendStatus::WouldBlock);
            }
            st.credits -= 1;
            st.sent.push((frame, more));
            Ok(SendStatus::Sent)
        }
        fn recv_frame(&mut self) -> io::Result<RecvStatus> {
            let mut st = self.state.borrow_mut();
            match st.inbox.pop_front() {
                Some((frame, more)) => {
                    st.last_more = more;
                    Ok(RecvStatus::Frame(frame))
                }
                None => Ok(RecvStatus::WouldBlock),
            }
        }
        fn set_option(&mut self, name: OptionName, value: &[u8]) -> io::Result<()> {
            if name == OptionName::Linger {
                self.state.borrow_mut().linger =
                    Some(i32::from_le_bytes(value.try_into().unwrap()));
            }
            Ok(())
        }
        fn get_option(&self, name: OptionName, buf: &mut [u8]) -> io::Result<usize> {
            let st = self.state.borrow();
            let value = match name {
                OptionName::Events => {
                    let mut bits = 0;
                    if !st.inbox.is_empty() {
                        bits |= 1;
                    }
                    if st.credits > 0 {
                        bits |= 2;
                    }
                    bits
                }
                OptionName::ReceiveMore => i32::from(st.last_more),
                _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "unscripted")),
            };
            buf[..4].copy_from_slice(&value.to_le_bytes());
            Ok(4)
        }
        fn notifier(&self) -> flume::Receiver<()> {
            self.notifier.1.clone()
        }
        fn close(&mut self) {
            self.state.borrow_mut().closed = true;
        }
    }

    fn scripted(lp: &mut EventLoop) -> (Socket, Rc<RefCell<FakeState>>) {
        let state = Rc::new(RefCell::new(FakeState::default()));
        let raw = Box::new(FakeSocket::with_state(Rc::clone(&state)));
        let ctx = Context::external(Arc::new(MemContext::new()));
        let sock = Socket::from_parts(raw, SocketKind::Pair, ctx, lp, Token(0));
        (sock, state)
    }

    fn drive(lp: &EventLoop, sock: &mut Socket) {
        lp.run_until_idle(|wake| match wake {
            Wake::Readiness(_) => sock.handle_readable(),
            Wake::Deferred(_) => sock.handle_deferred(),
        });
    }

    fn msg(frames: &[&'static [u8]]) -> Message {
        Message::from_frames(frames.iter().map(|f| Bytes::from_static(f)).collect())
    }

    #[test]
    fn test_queued_writes_preserve_order_and_markers() {
        let mut lp = EventLoop::new();
        let (mut sock, state) = scripted(&mut lp);
        state.borrow_mut().credits = 10;

        sock.write(msg(&[b"m1f1", b"m1f2"]));
        sock.write(msg(&[b"m2f1"]));
        sock.handle_readable();

        assert_eq!(
            state.borrow().sent,
            vec![
                (Bytes::from_static(b"m1f1"), true),
                (Bytes::from_static(b"m1f2"), false),
                (Bytes::from_static(b"m2f1"), false),
            ]
        );
        assert_eq!(
            sock.notices().try_recv().unwrap(),
            SocketNotice::MessagesWritten(2)
        );
    }

    #[test]
    fn test_drain_stops_at_would_block_and_resumes() {
        let mut lp = EventLoop::new();
        let (mut sock, state) = scripted(&mut lp);
        state.borrow_mut().credits = 1;

        sock.write(msg(&[b"a", b"b"]));
        sock.handle_readable();

        // First frame accepted, second refused; message still pending.
        assert_eq!(state.borrow().sent.len(), 1);
        assert!(sock.notices().try_recv().is_err());
        assert!(!sock.can_write_immediately());

        // Transport frees space and signals; the drain finishes the message.
        state.borrow_mut().credits = 5;
        sock.handle_readable();
        assert_eq!(state.borrow().sent.len(), 2);
        assert_eq!(
            sock.notices().try_recv().unwrap(),
            SocketNotice::MessagesWritten(1)
        );
    }

    #[test]
    fn test_write_arms_deferred_wake_when_writable() {
        let mut lp = EventLoop::new();
        let (mut sock, state) = scripted(&mut lp);
        state.borrow_mut().credits = 10;

        // Learn that the transport is writable.
        sock.handle_readable();
        assert!(sock.can_write_immediately());

        sock.write(msg(&[b"x"]));
        assert!(state.borrow().sent.is_empty()); // nothing sent synchronously

        drive(&lp, &mut sock);
        assert_eq!(state.borrow().sent.len(), 1);
        assert_eq!(
            sock.notices().try_recv().unwrap(),
            SocketNotice::MessagesWritten(1)
        );
    }

    #[test]
    fn test_read_completion_semantics() {
        let mut lp = EventLoop::new();
        let (mut sock, state) = scripted(&mut lp);
        {
            let mut st = state.borrow_mut();
            st.inbox.push_back((Bytes::from_static(b"f1"), true));
            st.inbox.push_back((Bytes::from_static(b"f2"), false));
            st.inbox.push_back((Bytes::from_static(b"next"), false));
        }

        sock.handle_readable();

        // Exactly one ReadyRead even though a further message is buffered.
        let notices = sock.notices();
        assert_eq!(notices.try_recv().unwrap(), SocketNotice::ReadyRead);
        assert!(notices.try_recv().is_err());

        let first = sock.read().unwrap();
        assert_eq!(first.frames(), &[Bytes::from_static(b"f1"), Bytes::from_static(b"f2")]);
        assert!(sock.read().is_none());

        // Consuming the message armed a deferred wake for the buffered data.
        drive(&lp, &mut sock);
        assert_eq!(notices.try_recv().unwrap(), SocketNotice::ReadyRead);
        let second = sock.read().unwrap();
        assert_eq!(second.frames(), &[Bytes::from_static(b"next")]);
        assert!(sock.read().is_none());
    }

    #[test]
    fn test_spurious_wake_is_idempotent() {
        let mut lp = EventLoop::new();
        let (mut sock, state) = scripted(&mut lp);
        state.borrow_mut().credits = 10;
        sock.write(msg(&[b"once"]));
        sock.handle_readable();
        let _ = sock.notices().try_recv();

        // Re-trigger with no new readiness: no notices, no new sends.
        sock.handle_readable();
        sock.handle_deferred();
        assert_eq!(state.borrow().sent.len(), 1);
        assert!(sock.notices().try_recv().is_err());
    }

    #[test]
    fn test_non_queued_partial_send_is_silent() {
        let mut lp = EventLoop::new();
        let (mut sock, state) = scripted(&mut lp);
        state.borrow_mut().credits = 1;

        sock.set_write_queue_enabled(false);
        sock.write(msg(&[b"A", b"B"]));

        // Frame A delivered with the continuation marker, frame B abandoned.
        assert_eq!(state.borrow().sent, vec![(Bytes::from_static(b"A"), true)]);
        assert!(sock.notices().try_recv().is_err());

        // B is never retried, even once the transport frees up.
        state.borrow_mut().credits = 5;
        sock.handle_readable();
        assert_eq!(state.borrow().sent.len(), 1);
    }

    #[test]
    #[should_panic(expected = "empty message")]
    fn test_empty_write_is_a_contract_violation() {
        let mut lp = EventLoop::new();
        let (mut sock, _state) = scripted(&mut lp);
        sock.write(Message::new());
    }

    #[test]
    fn test_drop_applies_linger_before_close() {
        let mut lp = EventLoop::new();
        let (mut sock, state) = scripted(&mut lp);

        // Undeliverable queued frames plus linger 0: discard on teardown.
        sock.write(msg(&[b"stuck"]));
        sock.set_shutdown_wait(Some(Duration::ZERO));
        drop(sock);

        let st = state.borrow();
        assert_eq!(st.linger, Some(0));
        assert!(st.closed);
        assert!(st.sent.is_empty());
    }

    #[test]
    fn test_default_shutdown_wait_is_transport_default() {
        let mut lp = EventLoop::new();
        let (sock, state) = scripted(&mut lp);
        drop(sock);
        assert_eq!(state.borrow().linger, Some(-1));
    }
}
