//! Outrigger
//!
//! A readiness-driven event-loop adapter for non-blocking, message-oriented
//! sockets: queue a message with [`socket::Socket::write`], consume completed
//! inbound messages with [`socket::Socket::read`], and learn about progress
//! through the notice channel — partial sends, partial receives, edge-like
//! readiness re-checking, and re-entrancy safety are handled internally.
//!
//! Crate layout:
//! - `transport` — the consumed transport interface (traits the engine is
//!   written against)
//! - `sockopt` — option facade over the transport's untyped option primitives
//! - `context` — shared/private/external transport context lifecycle
//! - `socket` — the adapter engine (drain loop, queues, deferred wakes)
//! - `reactor` — the cooperative event loop
//! - `mem` — bundled in-process transport

#![cfg_attr(not(test), deny(unsafe_code))]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod mem;
pub mod reactor;
pub mod socket;
pub mod sockopt;
pub mod transport;

pub use context::Context;
pub use reactor::{DeferredHandle, EventLoop, Token, Wake};
pub use socket::Socket;

// Re-export the building blocks so downstream users need only one crate.
pub use outrigger_core::prelude::{
    Endpoint, EndpointError, Message, SocketKind, SocketNotice, SocketNotices,
};
