//! Subscription prefix filters.
//!
//! A subscriber's filter set decides which messages the transport delivers to
//! it. Matching is prefix-based on the first frame of a message.

use bytes::Bytes;

/// A set of subscription prefixes.
///
/// An empty set matches nothing (an unsubscribed subscriber receives no
/// messages); an empty prefix matches everything.
#[derive(Debug, Default, Clone)]
pub struct FilterSet {
    prefixes: Vec<Bytes>,
}

impl FilterSet {
    /// Create an empty filter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prefixes: Vec::new(),
        }
    }

    /// Add a prefix. Duplicates are ignored.
    pub fn add(&mut self, prefix: Bytes) {
        if !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
    }

    /// Remove a prefix. Removing a prefix that was never added is harmless.
    pub fn remove(&mut self, prefix: &[u8]) {
        self.prefixes.retain(|p| p != prefix);
    }

    /// True if the topic matches any prefix.
    #[must_use]
    pub fn matches(&self, topic: &[u8]) -> bool {
        self.prefixes.iter().any(|p| topic.starts_with(p))
    }

    /// True if no prefixes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Number of registered prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }
}
