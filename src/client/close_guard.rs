//! One-shot close guard shared by a connection's two pumps and the hub.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Guards the teardown of a connection so it happens at most once, no
/// matter how many paths ask for it (read failure, write failure, hub
/// eviction, explicit unregister).
///
/// The first [`close`](CloseGuard::close) moves the connection from `Open`
/// to `Closing` and wakes every task parked in
/// [`closed`](CloseGuard::closed). The outbound pump, which owns the sink,
/// calls [`mark_closed`](CloseGuard::mark_closed) once the transport has
/// been released.
#[derive(Debug, Default)]
pub struct CloseGuard {
    state: AtomicU8,
    notify: Notify,
}

impl CloseGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests teardown. Returns `true` only for the call that won.
    pub fn close(&self) -> bool {
        let won = self
            .state
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.notify.notify_waiters();
        }
        won
    }

    pub fn mark_closed(&self) {
        self.state.store(2, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.state() != ConnectionState::Open
    }

    /// Resolves once teardown has been requested.
    pub async fn closed(&self) {
        loop {
            // register before checking so a close in between is not missed
            let notified = self.notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}
