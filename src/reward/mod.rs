//! Watch-an-ad reward loop.
//!
//! `RewardTimer` is the pure countdown; `dashboard` drives it on a tokio
//! interval and syncs the resulting balance.

pub mod dashboard;

pub use dashboard::{AdWatch, RewardsDashboard};

use crate::balance::UserBalance;
use crate::constants::{AD_WATCH_SECONDS, EARNINGS_PER_AD};
use crate::error::{MarketError, MarketResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Watching { remaining: u32 },
}

/// Outcome of a single one-second tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Idle,
    Counting { remaining: u32 },
    Granted(RewardGrant),
}

/// Deltas applied to a balance when an ad finishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardGrant {
    pub tokens: u64,
    pub impressions: u64,
    pub clicks: u64,
    pub earnings: f64,
}

impl RewardGrant {
    pub fn per_ad() -> Self {
        Self {
            tokens: 1,
            impressions: 1,
            clicks: 1,
            earnings: EARNINGS_PER_AD,
        }
    }

    pub fn apply(&self, balance: &mut UserBalance) {
        balance.tokens = balance.tokens.saturating_add(self.tokens);

        let performance = &mut balance.ad_performance;
        performance.impressions = performance.impressions.saturating_add(self.impressions);
        performance.clicks = performance.clicks.saturating_add(self.clicks);
        performance.earnings = round_cents(performance.earnings + self.earnings);

        balance.advance_history();
    }
}

impl Default for RewardGrant {
    fn default() -> Self {
        Self::per_ad()
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone)]
pub struct RewardTimer {
    state: TimerState,
    duration: u32,
    grant: RewardGrant,
    // Id of the most recent watch; bumped by every successful start.
    watch: u64,
}

impl RewardTimer {
    pub fn new(duration: u32) -> Self {
        Self {
            state: TimerState::Idle,
            duration: duration.max(1),
            grant: RewardGrant::per_ad(),
            watch: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_watching(&self) -> bool {
        matches!(self.state, TimerState::Watching { .. })
    }

    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            TimerState::Watching { remaining } => Some(remaining),
            TimerState::Idle => None,
        }
    }

    /// Id of the running watch, if any.
    pub fn current_watch(&self) -> Option<u64> {
        self.is_watching().then_some(self.watch)
    }

    /// Begins a watch and returns its id. A second start while one is running
    /// is refused and leaves the running countdown untouched.
    pub fn start(&mut self) -> MarketResult<u64> {
        if let TimerState::Watching { remaining } = self.state {
            return Err(MarketError::AlreadyWatching { remaining });
        }
        self.watch = self.watch.wrapping_add(1);
        self.state = TimerState::Watching {
            remaining: self.duration,
        };
        Ok(self.watch)
    }

    /// Ticks on behalf of watch `watch`. A superseded watch only ever sees `Idle`.
    pub fn tick_watch(&mut self, watch: u64) -> Tick {
        if self.current_watch() != Some(watch) {
            return Tick::Idle;
        }
        self.tick()
    }

    pub fn tick(&mut self) -> Tick {
        match self.state {
            TimerState::Idle => Tick::Idle,
            TimerState::Watching { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    // Back to Idle before returning so the grant cannot repeat.
                    self.state = TimerState::Idle;
                    Tick::Granted(self.grant)
                } else {
                    self.state = TimerState::Watching { remaining };
                    Tick::Counting { remaining }
                }
            }
        }
    }

    /// Abandons a running watch without a reward.
    pub fn cancel(&mut self) -> bool {
        let was_watching = self.is_watching();
        self.state = TimerState::Idle;
        was_watching
    }

    /// Like `cancel`, but leaves a newer watch alone.
    pub fn cancel_watch(&mut self, watch: u64) -> bool {
        if self.current_watch() != Some(watch) {
            return false;
        }
        self.cancel()
    }
}

impl Default for RewardTimer {
    fn default() -> Self {
        Self::new(AD_WATCH_SECONDS)
    }
}
