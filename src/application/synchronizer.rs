// Periodic synchronizer - Fixed-cadence tick for publishing snapshots
use std::time::Duration;
use tokio::task::JoinHandle;

pub type SyncCallback = Box<dyn FnMut() + Send + 'static>;

/// Cancels the scheduled callback when cancelled or dropped
pub struct SyncHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SyncHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub trait Synchronizer: Send + Sync {
    fn schedule(&self, callback: SyncCallback) -> SyncHandle;
}

/// Runs callbacks on a tokio interval
#[derive(Debug, Clone)]
pub struct IntervalSynchronizer {
    period: Duration,
}

impl IntervalSynchronizer {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl Synchronizer for IntervalSynchronizer {
    fn schedule(&self, mut callback: SyncCallback) -> SyncHandle {
        let period = self.period;
        let task: JoinHandle<()> = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        SyncHandle::new(move || task.abort())
    }
}
