//! Transport context lifecycle.
//!
//! Adapters that don't ask for anything special share one process-wide
//! context, created lazily and destroyed when the last owner drops. Ownership
//! is a plain `Arc`; the only lock in the crate guards the shared slot's
//! upgrade-or-create transition and nothing else.

use crate::mem::MemContext;
use crate::transport::{RawContext, RawSocket};
use once_cell::sync::Lazy;
use outrigger_core::socket_kind::SocketKind;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Weak slot for the process-wide default context.
static SHARED: Lazy<Mutex<Weak<MemContext>>> = Lazy::new(|| Mutex::new(Weak::new()));

/// A shared-ownership handle to a transport context.
///
/// Cloning is cheap and keeps the underlying context alive; the context is
/// destroyed when the last clone drops.
#[derive(Clone)]
pub struct Context {
    raw: Arc<dyn RawContext>,
}

impl Context {
    /// A clone of the process-wide default context, created on first use.
    ///
    /// Once every owner has dropped, the default context is destroyed; a later
    /// call creates a fresh one.
    #[must_use]
    pub fn shared() -> Self {
        let mut slot = SHARED.lock();
        let raw = match slot.upgrade() {
            Some(ctx) => ctx,
            None => {
                debug!("creating shared default context");
                let ctx = Arc::new(MemContext::new());
                *slot = Arc::downgrade(&ctx);
                ctx
            }
        };
        Self { raw }
    }

    /// A fresh private context, unrelated to the shared default.
    #[must_use]
    pub fn private() -> Self {
        Self {
            raw: Arc::new(MemContext::new()),
        }
    }

    /// Wrap an externally supplied context. The shared slot is never touched.
    #[must_use]
    pub fn external(raw: Arc<dyn RawContext>) -> Self {
        Self { raw }
    }

    /// True if both handles refer to the same underlying context.
    #[must_use]
    pub fn same_context(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.raw, &b.raw)
    }

    pub(crate) fn open(&self, kind: SocketKind) -> Box<dyn RawSocket> {
        self.raw.open(kind)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("owners", &Arc::strong_count(&self.raw))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The whole shared-slot lifecycle in one test: other tests stick to
    // private/external contexts so this one owns the slot.
    #[test]
    fn test_shared_context_lifecycle() {
        let a = Context::shared();
        let b = Context::shared();
        assert!(Context::same_context(&a, &b));

        // Still alive while one owner remains.
        drop(a);
        let c = Context::shared();
        assert!(Context::same_context(&b, &c));

        // Destroyed with the last owner, recreated on next use.
        let probe = Arc::downgrade(&b.raw);
        drop(b);
        drop(c);
        assert!(probe.upgrade().is_none());

        let fresh = Context::shared();
        assert!(probe.upgrade().is_none());
        drop(fresh);
    }

    #[test]
    fn test_private_contexts_are_distinct() {
        let a = Context::private();
        let b = Context::private();
        assert!(!Context::same_context(&a, &b));
        assert!(Context::same_context(&a, &a.clone()));
    }

    #[test]
    fn test_external_bypasses_shared_slot() {
        let raw: Arc<dyn RawContext> = Arc::new(MemContext::new());
        let ctx = Context::external(Arc::clone(&raw));
        drop(ctx);
        // The external context stays alive with its outside owner.
        assert_eq!(Arc::strong_count(&raw), 1);
    }
}
