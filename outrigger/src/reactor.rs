//! Cooperative event loop.
//!
//! The host loop the adapter runs inside: readiness notifiers registered per
//! socket, plus a next-tick queue standing in for a zero-delay single-fire
//! timer. Everything is single-threaded and non-blocking; "waiting" means
//! returning to the loop and being woken by a later `poll`.

use tracing::trace;

/// Identifies one registered socket within its event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub usize);

/// One wake-up delivered by [`EventLoop::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The socket's transport handle signalled possible readiness.
    Readiness(Token),
    /// The socket's deferred wake was armed last turn.
    Deferred(Token),
}

impl Wake {
    /// The token this wake belongs to.
    #[must_use]
    pub const fn token(self) -> Token {
        match self {
            Self::Readiness(t) | Self::Deferred(t) => t,
        }
    }
}

/// Armable handle for a single-fire deferred wake.
///
/// Arming queues the token for the loop's next turn. Arming twice before the
/// wake fires delivers two wakes; callers gate with their own pending flag,
/// which is what makes the wake single-fire in practice.
#[derive(Clone)]
pub struct DeferredHandle {
    token: Token,
    tick: flume::Sender<Token>,
}

impl DeferredHandle {
    /// Schedule a wake for the next loop turn.
    pub fn arm(&self) {
        trace!(token = self.token.0, "deferred wake armed");
        // The receiver lives in the loop; failure only happens at teardown.
        let _ = self.tick.send(self.token);
    }
}

/// A minimal single-threaded readiness loop.
///
/// Deferred wakes are delivered before readiness wakes within one turn; a
/// wake armed while dispatching surfaces on the following turn.
pub struct EventLoop {
    notifiers: Vec<(Token, flume::Receiver<()>)>,
    tick_tx: flume::Sender<Token>,
    tick_rx: flume::Receiver<Token>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Create an empty loop.
    #[must_use]
    pub fn new() -> Self {
        let (tick_tx, tick_rx) = flume::unbounded();
        Self {
            notifiers: Vec::new(),
            tick_tx,
            tick_rx,
        }
    }

    /// Register a socket's readiness-notification channel under `token`.
    pub fn register_notifier(&mut self, token: Token, notifier: flume::Receiver<()>) {
        self.notifiers.push((token, notifier));
    }

    /// Drop the registration for `token`.
    pub fn deregister(&mut self, token: Token) {
        self.notifiers.retain(|(t, _)| *t != token);
    }

    /// A deferred-wake handle for `token`.
    #[must_use]
    pub fn deferred_handle(&self, token: Token) -> DeferredHandle {
        DeferredHandle {
            token,
            tick: self.tick_tx.clone(),
        }
    }

    /// Collect the wakes for one loop turn without blocking.
    ///
    /// Pending notifier signals are drained and collapsed to one readiness
    /// wake per token; the dispatched callback re-queries actual readiness.
    #[must_use]
    pub fn poll(&self) -> Vec<Wake> {
        let mut wakes = Vec::new();

        while let Ok(token) = self.tick_rx.try_recv() {
            if !wakes.contains(&Wake::Deferred(token)) {
                wakes.push(Wake::Deferred(token));
            }
        }

        for (token, notifier) in &self.notifiers {
            let mut signalled = false;
            while notifier.try_recv().is_ok() {
                signalled = true;
            }
            if signalled {
                wakes.push(Wake::Readiness(*token));
            }
        }

        if !wakes.is_empty() {
            trace!(count = wakes.len(), "loop turn");
        }
        wakes
    }

    /// Run turns until a turn produces no wakes, dispatching each wake to
    /// `dispatch`. Cascades (a dispatch arming a deferred wake or causing a
    /// peer's readiness signal) settle before this returns.
    pub fn run_until_idle(&self, mut dispatch: impl FnMut(Wake)) {
        loop {
            let wakes = self.poll();
            if wakes.is_empty() {
                return;
            }
            for wake in wakes {
                dispatch(wake);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_wake_fires_once_per_arm() {
        let lp = EventLoop::new();
        let handle = lp.deferred_handle(Token(3));

        handle.arm();
        assert_eq!(lp.poll(), vec![Wake::Deferred(Token(3))]);
        assert!(lp.poll().is_empty());
    }

    #[test]
    fn test_double_arm_collapses_within_a_turn() {
        let lp = EventLoop::new();
        let handle = lp.deferred_handle(Token(0));
        handle.arm();
        handle.arm();
        assert_eq!(lp.poll(), vec![Wake::Deferred(Token(0))]);
    }

    #[test]
    fn test_notifier_signals_collapse_to_one_wake() {
        let mut lp = EventLoop::new();
        let (tx, rx) = flume::unbounded();
        lp.register_notifier(Token(1), rx);

        tx.send(()).unwrap();
        tx.send(()).unwrap();
        assert_eq!(lp.poll(), vec![Wake::Readiness(Token(1))]);
        assert!(lp.poll().is_empty());
    }

    #[test]
    fn test_deferred_before_readiness_in_a_turn() {
        let mut lp = EventLoop::new();
        let (tx, rx) = flume::unbounded();
        lp.register_notifier(Token(1), rx);
        tx.send(()).unwrap();
        lp.deferred_handle(Token(2)).arm();

        assert_eq!(
            lp.poll(),
            vec![Wake::Deferred(Token(2)), Wake::Readiness(Token(1))]
        );
    }

    #[test]
    fn test_run_until_idle_settles_cascades() {
        let lp = EventLoop::new();
        let handle = lp.deferred_handle(Token(0));
        handle.arm();

        let mut fired = 0;
        let rearm = lp.deferred_handle(Token(0));
        lp.run_until_idle(|wake| {
            assert_eq!(wake, Wake::Deferred(Token(0)));
            fired += 1;
            if fired < 3 {
                rearm.arm();
            }
        });
        assert_eq!(fired, 3);
    }
}
