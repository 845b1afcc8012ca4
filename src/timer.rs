// Copyright 2020 Joyent, Inc.

//! Timers used by the session negotiator.
//!
//! A timer hands out a [`TimeoutToken`] per scheduled timeout and reports the
//! token back when it fires. The owner decides whether a fired token is still
//! relevant, so a timeout that was already in flight when it was cancelled is
//! simply ignored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutToken(u64);

pub trait NegotiationTimer: Send {
    fn schedule(&mut self, after: Duration) -> TimeoutToken;

    /// Returns false if the token is unknown or was already cancelled.
    fn cancel(&mut self, token: TimeoutToken) -> bool;
}

/// Timer backed by the tokio runtime. Fired tokens are delivered on the
/// receiver returned by [`TokioTimer::new`].
pub struct TokioTimer {
    tx: mpsc::UnboundedSender<TimeoutToken>,
    next: u64,
    pending: HashMap<TimeoutToken, JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new() -> (TokioTimer, mpsc::UnboundedReceiver<TimeoutToken>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = TokioTimer {
            tx,
            next: 0,
            pending: HashMap::new(),
        };
        (timer, rx)
    }
}

impl NegotiationTimer for TokioTimer {
    fn schedule(&mut self, after: Duration) -> TimeoutToken {
        self.next += 1;
        let token = TimeoutToken(self.next);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(token);
        });
        self.pending.insert(token, handle);
        token
    }

    fn cancel(&mut self, token: TimeoutToken) -> bool {
        match self.pending.remove(&token) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

#[derive(Debug, Default)]
struct ManualState {
    next: u64,
    armed: Vec<(TimeoutToken, Duration)>,
    cancelled: Vec<TimeoutToken>,
}

/// A timer that never fires by itself. Clones share state, so a test can
/// keep one handle while the negotiator owns another, then fire tokens by
/// hand.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> ManualTimer {
        ManualTimer::default()
    }

    /// Tokens scheduled and not cancelled.
    pub fn armed(&self) -> Vec<TimeoutToken> {
        match self.state.lock() {
            Ok(state) => state.armed.iter().map(|(t, _)| *t).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn cancelled(&self) -> Vec<TimeoutToken> {
        match self.state.lock() {
            Ok(state) => state.cancelled.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn duration_of(&self, token: TimeoutToken) -> Option<Duration> {
        let state = self.state.lock().ok()?;
        state
            .armed
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, d)| *d)
    }
}

impl NegotiationTimer for ManualTimer {
    fn schedule(&mut self, after: Duration) -> TimeoutToken {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.next += 1;
        let token = TimeoutToken(state.next);
        state.armed.push((token, after));
        token
    }

    fn cancel(&mut self, token: TimeoutToken) -> bool {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = state.armed.len();
        state.armed.retain(|(t, _)| *t != token);
        if state.armed.len() == before {
            return false;
        }
        state.cancelled.push(token);
        true
    }
}
