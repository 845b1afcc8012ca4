// Copyright 2020 Joyent, Inc.

//! Reconnection policy.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

/// Consulted by the reconnecting client after every failed connection or
/// negotiation attempt and after an established session goes down.
pub trait ReconnectStrategy: Send {
    /// Delay before the next attempt, or `None` to give up.
    fn next_delay(&mut self, cause: &str) -> Option<Duration>;

    /// A session was established; backoff state starts over.
    fn reconnect_succeeded(&mut self);
}

/// Exponential backoff with an optional cap, jitter and attempt limit.
#[derive(Debug, Clone)]
pub struct TimedReconnectStrategy {
    max_attempts: u32,
    initial: Duration,
    sleep_factor: f64,
    max_sleep: Option<Duration>,
    jitter: f64,
    attempts: u32,
    last: Option<Duration>,
}

impl TimedReconnectStrategy {
    pub fn new(config: &ReconnectConfig) -> TimedReconnectStrategy {
        TimedReconnectStrategy {
            max_attempts: config.max_connection_attempts,
            initial: Duration::from_millis(config.between_attempts_timeout_ms),
            sleep_factor: config.sleep_factor.max(1.0),
            max_sleep: config.max_sleep_ms.map(Duration::from_millis),
            jitter: config.jitter.max(0.0).min(1.0),
            attempts: 0,
            last: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn base_delay(&self) -> Duration {
        let delay = match self.last {
            None => self.initial,
            Some(last) => scale(last, self.sleep_factor),
        };
        match self.max_sleep {
            Some(max) if delay > max => max,
            _ => delay,
        }
    }
}

// whole milliseconds, so repeated scaling does not drift
fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::from_millis((delay.as_millis() as f64 * factor).round() as u64)
}

impl ReconnectStrategy for TimedReconnectStrategy {
    fn next_delay(&mut self, _cause: &str) -> Option<Duration> {
        if self.max_attempts != 0 && self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;

        let delay = self.base_delay();
        self.last = Some(delay);

        if self.jitter > 0.0 {
            let spread = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
            Some(scale(delay, 1.0 + spread))
        } else {
            Some(delay)
        }
    }

    fn reconnect_succeeded(&mut self) {
        self.attempts = 0;
        self.last = None;
    }
}
