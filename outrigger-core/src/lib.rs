//! Outrigger Core
//!
//! Runtime-agnostic building blocks for the outrigger socket adapter:
//! - Multipart message type (`message`)
//! - Inbound frame assembly (`assembly`)
//! - Outbound message queue (`write_queue`)
//! - Endpoint addressing (`endpoint`)
//! - Subscription prefix filters (`subscription`)
//! - Owner notifications (`notice`)

#![cfg_attr(not(test), deny(unsafe_code))]
#![allow(clippy::module_name_repetitions)]

pub mod assembly;
pub mod endpoint;
pub mod message;
pub mod notice;
pub mod socket_kind;
pub mod subscription;
pub mod write_queue;

// Small prelude for downstream crates. Kept minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::assembly::InboundAssembly;
    pub use crate::endpoint::{Endpoint, EndpointError};
    pub use crate::message::Message;
    pub use crate::notice::{notice_channel, NoticeSender, SocketNotice, SocketNotices};
    pub use crate::socket_kind::SocketKind;
    pub use crate::subscription::FilterSet;
    pub use crate::write_queue::WriteQueue;
}
