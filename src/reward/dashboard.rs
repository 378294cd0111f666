use log::{debug, info, warn};
use metrics::counter;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::{wrappers::IntervalStream, StreamExt};

use super::{RewardTimer, Tick, TimerState};
use crate::balance::{BalanceSynchronizer, UserBalance};
use crate::config::RuntimeConfig;
use crate::error::MarketResult;
use crate::metrics::{METRIC_AD_WATCHES_STARTED, METRIC_REWARDS_GRANTED};
use crate::session::Session;

// The timer lock is never held across an await, so Drop can always take it.
type SharedTimer = Arc<Mutex<RewardTimer>>;

fn lock_timer(timer: &SharedTimer) -> MutexGuard<'_, RewardTimer> {
    timer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Token dashboard for the connected wallet: the in-memory balance is the
/// source of truth for the session, the remote copy is best effort.
pub struct RewardsDashboard {
    address: String,
    balance: Arc<tokio::sync::Mutex<UserBalance>>,
    timer: SharedTimer,
    synchronizer: BalanceSynchronizer,
    tick_interval: Duration,
}

impl RewardsDashboard {
    pub async fn load(
        session: &Session,
        synchronizer: BalanceSynchronizer,
        runtime: &RuntimeConfig,
    ) -> MarketResult<Self> {
        let address = session.require_address()?.to_string();
        let balance = synchronizer.fetch(&address).await;

        Ok(Self {
            address,
            balance: Arc::new(tokio::sync::Mutex::new(balance)),
            timer: Arc::new(Mutex::new(RewardTimer::new(runtime.ad_watch_seconds))),
            synchronizer,
            tick_interval: runtime.tick_interval,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn balance(&self) -> UserBalance {
        self.balance.lock().await.clone()
    }

    pub fn timer_state(&self) -> TimerState {
        lock_timer(&self.timer).state()
    }

    /// Starts the countdown. Fails with `AlreadyWatching` while another watch runs.
    pub fn watch_ad(&self) -> MarketResult<AdWatch> {
        let watch = lock_timer(&self.timer).start()?;
        counter!(METRIC_AD_WATCHES_STARTED, 1);
        info!("{} started watching an ad", self.address);

        let handle = tokio::spawn(run_watch(
            watch,
            self.address.clone(),
            self.timer.clone(),
            self.balance.clone(),
            self.synchronizer.clone(),
            self.tick_interval,
        ));

        Ok(AdWatch {
            watch,
            handle: Some(handle),
            timer: self.timer.clone(),
        })
    }

    pub async fn save(&self) -> bool {
        let snapshot = self.balance().await;
        self.synchronizer.persist(&self.address, &snapshot).await
    }
}

async fn run_watch(
    watch: u64,
    address: String,
    timer: SharedTimer,
    balance: Arc<tokio::sync::Mutex<UserBalance>>,
    synchronizer: BalanceSynchronizer,
    period: Duration,
) -> Option<UserBalance> {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = IntervalStream::new(interval);

    while ticks.next().await.is_some() {
        let tick = lock_timer(&timer).tick_watch(watch);
        match tick {
            Tick::Counting { remaining } => {
                debug!("{}: token in {} seconds", address, remaining);
            }
            Tick::Idle => return None,
            Tick::Granted(grant) => {
                let snapshot = {
                    let mut balance = balance.lock().await;
                    grant.apply(&mut balance);
                    balance.clone()
                };
                counter!(METRIC_REWARDS_GRANTED, 1);
                info!("{} earned a token, balance is now {}", address, snapshot.tokens);

                // Separate task: aborting the watch must not cancel the write.
                let saved = snapshot.clone();
                let persist =
                    tokio::spawn(async move { synchronizer.persist(&address, &saved).await });
                if persist.await.is_err() {
                    warn!("Balance write task for watch {} did not complete", watch);
                }
                return Some(snapshot);
            }
        }
    }

    None
}

/// Handle to a running watch. Dropping it tears the countdown down without a reward.
pub struct AdWatch {
    watch: u64,
    handle: Option<JoinHandle<Option<UserBalance>>>,
    timer: SharedTimer,
}

impl AdWatch {
    pub fn remaining(&self) -> Option<u32> {
        let timer = lock_timer(&self.timer);
        match timer.current_watch() {
            Some(watch) if watch == self.watch => timer.remaining(),
            _ => None,
        }
    }

    /// Waits for the countdown; yields the rewarded balance, or `None` if it was cancelled.
    /// Dropping the returned future tears the watch down like dropping the handle.
    pub async fn finished(mut self) -> Option<UserBalance> {
        let result = match self.handle.as_mut() {
            Some(handle) => handle.await.ok().flatten(),
            None => return None,
        };
        self.handle = None;
        result
    }

    pub fn cancel(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let handle = match self.handle.take() {
            Some(handle) if !handle.is_finished() => handle,
            _ => return,
        };
        if !lock_timer(&self.timer).cancel_watch(self.watch) {
            // Already granted; the task is finishing its balance write.
            return;
        }
        handle.abort();
        debug!("Ad watch {} cancelled before completion", self.watch);
    }
}

impl Drop for AdWatch {
    fn drop(&mut self) {
        self.teardown();
    }
}
