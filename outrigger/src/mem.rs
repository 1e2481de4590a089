//! In-process transport.
//!
//! Implements the [`crate::transport`] interface over in-process queues so
//! sockets in the same process can talk without network overhead: an
//! `inproc://name` endpoint registry per context, per-socket inboxes bounded
//! by the high-water marks, and edge-like readiness signals.
//!
//! Delivery is frame-synchronous: an accepted frame lands directly in the
//! peer's inbox, so the "unsent transport buffer" the linger option governs
//! is always empty here. The option is accepted and stored for contract
//! compatibility.

use crate::transport::{OptionName, RawContext, RawSocket, Readiness, RecvStatus, SendStatus};
use bytes::Bytes;
use dashmap::DashMap;
use outrigger_core::endpoint::Endpoint;
use outrigger_core::socket_kind::SocketKind;
use outrigger_core::subscription::FilterSet;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Default high-water mark per direction, in frames.
const DEFAULT_HWM: i32 = 1000;

/// Longest accepted identity.
const IDENTITY_MAX: usize = 255;

type Registry = Arc<DashMap<String, Arc<Shared>>>;

/// An in-process transport context.
///
/// Holds the endpoint registry its sockets bind into. Contexts are isolated:
/// a socket can only connect to names bound within the same context.
#[derive(Default)]
pub struct MemContext {
    registry: Registry,
}

impl MemContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RawContext for MemContext {
    fn open(&self, kind: SocketKind) -> Box<dyn RawSocket> {
        Box::new(MemSocket::new(kind, Arc::clone(&self.registry)))
    }
}

struct Options {
    identity: Bytes,
    send_hwm: i32,
    recv_hwm: i32,
    linger: i32,
    filters: FilterSet,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            identity: Bytes::new(),
            send_hwm: DEFAULT_HWM,
            recv_hwm: DEFAULT_HWM,
            linger: -1,
            filters: FilterSet::new(),
        }
    }
}

/// Per-peer delivery state. Message-granular decisions (admission, filter
/// drops) are made at the first frame and held until the message ends.
struct PeerLink {
    peer: Weak<Shared>,
    at_start: bool,
    dropping: bool,
}

impl PeerLink {
    fn new(peer: &Arc<Shared>) -> Self {
        Self {
            peer: Arc::downgrade(peer),
            at_start: true,
            dropping: false,
        }
    }
}

/// The half of a socket that peers interact with.
struct Shared {
    kind: SocketKind,
    opts: Mutex<Options>,
    inbox: Mutex<VecDeque<(Bytes, bool)>>,
    peers: Mutex<Vec<PeerLink>>,
    signal_tx: flume::Sender<()>,
    signal_rx: flume::Receiver<()>,
}

impl Shared {
    fn new(kind: SocketKind) -> Self {
        let (signal_tx, signal_rx) = flume::unbounded();
        Self {
            kind,
            opts: Mutex::new(Options::default()),
            inbox: Mutex::new(VecDeque::new()),
            peers: Mutex::new(Vec::new()),
            signal_tx,
            signal_rx,
        }
    }

    /// Edge-like state-change signal; receivers re-query readiness.
    fn signal(&self) {
        let _ = self.signal_tx.send(());
    }

    /// Inbox capacity toward `sender`: the two directions' marks pool, the
    /// way paired transport pipes share their high-water marks.
    fn capacity_from(&self, sender: &Shared) -> usize {
        let theirs = self.opts.lock().recv_hwm.max(0) as usize;
        let ours = sender.opts.lock().send_hwm.max(0) as usize;
        (theirs + ours).max(1)
    }

    /// A subscriber only accepts messages whose first frame matches a filter.
    fn accepts_topic(&self, topic: &[u8]) -> bool {
        self.kind != SocketKind::Sub || self.opts.lock().filters.matches(topic)
    }
}

/// One in-process socket handle.
pub struct MemSocket {
    shared: Arc<Shared>,
    registry: Registry,
    bound_as: Option<String>,
    last_more: bool,
    closed: bool,
}

impl MemSocket {
    fn new(kind: SocketKind, registry: Registry) -> Self {
        Self {
            shared: Arc::new(Shared::new(kind)),
            registry,
            bound_as: None,
            last_more: false,
            closed: false,
        }
    }

    fn inproc_name<'a>(endpoint: &'a Endpoint) -> io::Result<&'a str> {
        match endpoint {
            Endpoint::Inproc(name) => Ok(name),
            other => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("mem transport only supports inproc endpoints, got {other}"),
            )),
        }
    }

    /// Deliver one frame toward the peer behind `link`, honoring per-message
    /// admission. Returns `WouldBlock` only for non-fan-out sockets.
    fn offer(
        kind: SocketKind,
        shared: &Shared,
        link: &mut PeerLink,
        frame: &Bytes,
        more: bool,
    ) -> SendStatus {
        let Some(peer) = link.peer.upgrade() else {
            return SendStatus::Sent; // dead peer, nothing to do
        };

        let fan_out = kind == SocketKind::Pub;

        if link.at_start {
            link.dropping = !peer.accepts_topic(frame);
            if !link.dropping && fan_out && peer.inbox.lock().len() >= peer.capacity_from(shared) {
                // A full subscriber loses the whole message, never a prefix.
                link.dropping = true;
                trace!("fan-out message dropped at full subscriber");
            }
        }

        if !link.dropping && !fan_out && peer.inbox.lock().len() >= peer.capacity_from(shared) {
            return SendStatus::WouldBlock;
        }

        if !link.dropping {
            peer.inbox.lock().push_back((frame.clone(), more));
            peer.signal();
        }

        link.at_start = !more;
        if link.at_start {
            link.dropping = false;
        }
        SendStatus::Sent
    }
}

impl RawSocket for MemSocket {
    fn connect(&mut self, endpoint: &Endpoint) -> io::Result<()> {
        let name = Self::inproc_name(endpoint)?;
        let bound = self.registry.get(name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no socket bound at {endpoint}"),
            )
        })?;
        let bound = Arc::clone(bound.value());

        self.shared.peers.lock().push(PeerLink::new(&bound));
        bound.peers.lock().push(PeerLink::new(&self.shared));

        // Both ends may have become writable.
        self.shared.signal();
        bound.signal();
        debug!(%endpoint, kind = %self.shared.kind, "connected");
        Ok(())
    }

    fn bind(&mut self, endpoint: &Endpoint) -> io::Result<()> {
        let name = Self::inproc_name(endpoint)?;
        if self.bound_as.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "mem socket is already bound",
            ));
        }

        let entry = self.registry.entry(name.to_string());
        match entry {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("{endpoint} is already bound"),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&self.shared));
                self.bound_as = Some(name.to_string());
                debug!(%endpoint, kind = %self.shared.kind, "bound");
                Ok(())
            }
        }
    }

    fn send_frame(&mut self, frame: Bytes, more: bool) -> io::Result<SendStatus> {
        let mut peers = self.shared.peers.lock();
        peers.retain(|link| link.peer.strong_count() > 0);
        let kind = self.shared.kind;

        if kind == SocketKind::Pub {
            // Fan-out: every subscriber gets its own admission decision.
            for link in peers.iter_mut() {
                Self::offer(kind, &self.shared, link, &frame, more);
            }
            return Ok(SendStatus::Sent);
        }

        match peers.first_mut() {
            Some(link) => Ok(Self::offer(kind, &self.shared, link, &frame, more)),
            None => Ok(SendStatus::WouldBlock),
        }
    }

    fn recv_frame(&mut self) -> io::Result<RecvStatus> {
        let popped = self.shared.inbox.lock().pop_front();
        match popped {
            Some((frame, more)) => {
                self.last_more = more;
                // Space freed: senders toward us may be writable again.
                let peers = self.shared.peers.lock();
                for link in peers.iter() {
                    if let Some(peer) = link.peer.upgrade() {
                        peer.signal();
                    }
                }
                Ok(RecvStatus::Frame(frame))
            }
            None => Ok(RecvStatus::WouldBlock),
        }
    }

    fn set_option(&mut self, name: OptionName, value: &[u8]) -> io::Result<()> {
        let scalar = || -> io::Result<i32> {
            value
                .try_into()
                .map(i32::from_le_bytes)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "expected i32 option"))
        };

        let mut opts = self.shared.opts.lock();
        match name {
            OptionName::Identity => {
                if value.len() > IDENTITY_MAX {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "identity longer than 255 bytes",
                    ));
                }
                opts.identity = Bytes::copy_from_slice(value);
            }
            OptionName::SendHwm => opts.send_hwm = scalar()?,
            OptionName::ReceiveHwm => opts.recv_hwm = scalar()?,
            OptionName::Linger => opts.linger = scalar()?,
            OptionName::Subscribe => opts.filters.add(Bytes::copy_from_slice(value)),
            OptionName::Unsubscribe => opts.filters.remove(value),
            OptionName::Events | OptionName::ReceiveMore => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "option is read-only",
                ));
            }
        }
        Ok(())
    }

    fn get_option(&self, name: OptionName, buf: &mut [u8]) -> io::Result<usize> {
        let put_scalar = |buf: &mut [u8], value: i32| -> io::Result<usize> {
            let bytes = value.to_le_bytes();
            if buf.len() < bytes.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "option buffer too small",
                ));
            }
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(bytes.len())
        };

        match name {
            OptionName::Identity => {
                let opts = self.shared.opts.lock();
                if buf.len() < opts.identity.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "option buffer too small",
                    ));
                }
                buf[..opts.identity.len()].copy_from_slice(&opts.identity);
                Ok(opts.identity.len())
            }
            OptionName::SendHwm => put_scalar(buf, self.shared.opts.lock().send_hwm),
            OptionName::ReceiveHwm => put_scalar(buf, self.shared.opts.lock().recv_hwm),
            OptionName::Events => {
                let readable = !self.shared.inbox.lock().is_empty();
                let writable = if self.shared.kind == SocketKind::Pub {
                    true
                } else {
                    let peers = self.shared.peers.lock();
                    peers.iter().any(|link| {
                        link.peer.upgrade().is_some_and(|peer| {
                            peer.inbox.lock().len() < peer.capacity_from(&self.shared)
                        })
                    })
                };
                put_scalar(buf, Readiness { readable, writable }.to_bits())
            }
            OptionName::ReceiveMore => put_scalar(buf, i32::from(self.last_more)),
            OptionName::Subscribe | OptionName::Unsubscribe | OptionName::Linger => Err(
                io::Error::new(io::ErrorKind::InvalidInput, "option is write-only"),
            ),
        }
    }

    fn notifier(&self) -> flume::Receiver<()> {
        self.shared.signal_rx.clone()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(name) = self.bound_as.take() {
            self.registry.remove(&name);
        }

        // Collect live peers first; never hold our own peer lock while
        // taking a peer's.
        let live: Vec<Arc<Shared>> = {
            let mut peers = self.shared.peers.lock();
            let live = peers
                .iter()
                .filter_map(|link| link.peer.upgrade())
                .collect();
            peers.clear();
            live
        };

        for peer in live {
            peer.peers
                .lock()
                .retain(|link| !link.peer.ptr_eq(&Arc::downgrade(&self.shared)));
            peer.signal();
        }
        debug!(kind = %self.shared.kind, "mem socket closed");
    }
}

impl Drop for MemSocket {
    fn drop(&mut self) {
        self.close();
    }
}
