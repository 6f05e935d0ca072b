//! Recurring timers behind a small trait so the state machine can be driven
//! by tokio in production and by hand in tests.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Poll,
    Clock,
}

// Delivered to the event loop each time a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub id: TimerId,
    pub kind: TimerKind,
}

pub trait Scheduler {
    /// Starts a timer that fires every `interval`, the first time one
    /// interval from now.
    fn start_recurring(&mut self, kind: TimerKind, interval: Duration) -> TimerId;

    /// Cancels a timer. Returns `false` if it was not active, which makes
    /// double cancellation harmless.
    fn cancel(&mut self, id: TimerId) -> bool;
}

// Timers backed by tokio intervals, ticking into an mpsc channel
pub struct TokioScheduler {
    ticks: UnboundedSender<TimerTick>,
    shutdown: CancellationToken,
    timers: HashMap<TimerId, CancellationToken>,
    next_id: u64,
}

impl TokioScheduler {
    pub fn new(ticks: UnboundedSender<TimerTick>, shutdown: CancellationToken) -> Self {
        Self {
            ticks,
            shutdown,
            timers: HashMap::new(),
            next_id: 0,
        }
    }

    #[cfg(test)]
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for TokioScheduler {
    fn start_recurring(&mut self, kind: TimerKind, interval: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let token = self.shutdown.child_token();
        let task_token = token.clone();
        let ticks = self.ticks.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if ticks.send(TimerTick { id, kind }).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        tracing::trace!("Started {:?} timer {:?} every {:?}", kind, id, interval);
        self.timers.insert(id, token);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(token) => {
                token.cancel();
                tracing::trace!("Cancelled timer {:?}", id);
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, token) in self.timers.drain() {
            token.cancel();
        }
    }
}
