//! Option facade.
//!
//! Stateless translation between semantic socket properties and the
//! transport's untyped option primitives. Scalars travel as little-endian
//! `i32`. A transport rejecting one of these options indicates a broken
//! contract between engine and transport, so every helper (except
//! `unsubscribe`, see below) treats failure as fatal.

use crate::transport::{OptionName, RawSocket, Readiness};
use bytes::Bytes;
use std::time::Duration;

/// Longest identity the transport accepts.
const IDENTITY_MAX: usize = 255;

fn get_i32(sock: &dyn RawSocket, name: OptionName) -> i32 {
    let mut buf = [0u8; 4];
    let len = sock
        .get_option(name, &mut buf)
        .unwrap_or_else(|e| panic!("transport rejected get of {name:?}: {e}"));
    assert_eq!(len, 4, "scalar option {name:?} returned {len} bytes");
    i32::from_le_bytes(buf)
}

fn set_i32(sock: &mut dyn RawSocket, name: OptionName, value: i32) {
    sock.set_option(name, &value.to_le_bytes())
        .unwrap_or_else(|e| panic!("transport rejected set of {name:?}: {e}"));
}

/// Current socket identity bytes.
pub fn identity(sock: &dyn RawSocket) -> Bytes {
    let mut buf = [0u8; IDENTITY_MAX];
    let len = sock
        .get_option(OptionName::Identity, &mut buf)
        .expect("transport rejected identity get");
    Bytes::copy_from_slice(&buf[..len])
}

/// Set the socket identity.
pub fn set_identity(sock: &mut dyn RawSocket, id: &[u8]) {
    sock.set_option(OptionName::Identity, id)
        .expect("transport rejected identity set");
}

/// Outbound high-water mark, in frames.
pub fn send_hwm(sock: &dyn RawSocket) -> i32 {
    get_i32(sock, OptionName::SendHwm)
}

/// Set the outbound high-water mark.
pub fn set_send_hwm(sock: &mut dyn RawSocket, value: i32) {
    set_i32(sock, OptionName::SendHwm, value);
}

/// Inbound high-water mark, in frames.
pub fn receive_hwm(sock: &dyn RawSocket) -> i32 {
    get_i32(sock, OptionName::ReceiveHwm)
}

/// Set the inbound high-water mark.
pub fn set_receive_hwm(sock: &mut dyn RawSocket, value: i32) {
    set_i32(sock, OptionName::ReceiveHwm, value);
}

/// Combined high-water mark: reads the send side.
pub fn hwm(sock: &dyn RawSocket) -> i32 {
    send_hwm(sock)
}

/// Combined high-water mark: sets both directions.
pub fn set_hwm(sock: &mut dyn RawSocket, value: i32) {
    set_send_hwm(sock, value);
    set_receive_hwm(sock, value);
}

/// Add a subscription prefix.
pub fn subscribe(sock: &mut dyn RawSocket, filter: &[u8]) {
    sock.set_option(OptionName::Subscribe, filter)
        .expect("transport rejected subscribe");
}

/// Remove a subscription prefix.
///
/// Errors are ignored: unsubscribing a filter that was never added is
/// harmless.
pub fn unsubscribe(sock: &mut dyn RawSocket, filter: &[u8]) {
    let _ = sock.set_option(OptionName::Unsubscribe, filter);
}

/// Set the linger/shutdown-wait option. `None` selects the transport default.
pub fn set_linger(sock: &mut dyn RawSocket, wait: Option<Duration>) {
    let millis = match wait {
        None => -1,
        Some(d) => i32::try_from(d.as_millis()).unwrap_or(i32::MAX),
    };
    set_i32(sock, OptionName::Linger, millis);
}

/// Current readiness flags.
pub fn events(sock: &dyn RawSocket) -> Readiness {
    Readiness::from_bits(get_i32(sock, OptionName::Events))
}

/// Whether the last received frame carried the continuation flag.
pub fn receive_more(sock: &dyn RawSocket) -> bool {
    get_i32(sock, OptionName::ReceiveMore) != 0
}
