// In-memory collaborators for engine tests
use crate::application::archive_source::{AlarmRecord, ArchiveSource};
use crate::application::live_source::{LiveChannel, LiveSource, LiveSubscription, SubscriptionRequest};
use crate::application::synchronizer::{SyncCallback, SyncHandle, Synchronizer};
use crate::domain::live::LiveMessage;
use crate::domain::telemetry::{ArchivedSample, EnumerationRange, Window};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc, oneshot};

#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveRequest {
    Samples { parameter: String, window: Window, count: usize },
    Ranges { parameter: String, window: Window, min_range_ms: i64 },
}

/// Archive with canned responses; requests for a gated window block until the gate opens
#[derive(Default)]
pub struct FakeArchive {
    samples: Mutex<HashMap<String, Vec<ArchivedSample>>>,
    window_samples: Mutex<HashMap<(String, DateTime<Utc>), Vec<ArchivedSample>>>,
    ranges: Mutex<HashMap<String, Vec<EnumerationRange>>>,
    gates: Mutex<HashMap<DateTime<Utc>, oneshot::Receiver<()>>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<ArchiveRequest>>,
    arrived: Notify,
}

impl FakeArchive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_samples(&self, parameter: &str, samples: Vec<ArchivedSample>) {
        self.samples.lock().unwrap().insert(parameter.to_string(), samples);
    }

    /// Samples returned only for fetches whose expanded window starts at `window_start`
    pub fn set_window_samples(&self, parameter: &str, window_start: DateTime<Utc>, samples: Vec<ArchivedSample>) {
        self.window_samples
            .lock()
            .unwrap()
            .insert((parameter.to_string(), window_start), samples);
    }

    pub fn set_ranges(&self, parameter: &str, ranges: Vec<EnumerationRange>) {
        self.ranges.lock().unwrap().insert(parameter.to_string(), ranges);
    }

    pub fn fail(&self, parameter: &str) {
        self.failing.lock().unwrap().insert(parameter.to_string());
    }

    /// Hold every fetch for the expanded window starting at `window_start` until the sender fires
    pub fn gate(&self, window_start: DateTime<Utc>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(window_start, rx);
        tx
    }

    pub fn requests(&self) -> Vec<ArchiveRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            let notified = self.arrived.notified();
            if self.requests.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }

    async fn record(&self, request: ArchiveRequest, parameter: &str, window: Window) -> anyhow::Result<()> {
        self.requests.lock().unwrap().push(request);
        self.arrived.notify_waiters();

        let gate = self.gates.lock().unwrap().remove(&window.start);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.failing.lock().unwrap().contains(parameter) {
            anyhow::bail!("archive unavailable for {}", parameter);
        }
        Ok(())
    }
}

#[async_trait]
impl ArchiveSource for FakeArchive {
    async fn fetch_samples(&self, parameter: &str, window: Window, count: usize) -> anyhow::Result<Vec<ArchivedSample>> {
        let request = ArchiveRequest::Samples {
            parameter: parameter.to_string(),
            window,
            count,
        };
        self.record(request, parameter, window).await?;

        let specific = self
            .window_samples
            .lock()
            .unwrap()
            .get(&(parameter.to_string(), window.start))
            .cloned();
        Ok(specific
            .or_else(|| self.samples.lock().unwrap().get(parameter).cloned())
            .unwrap_or_default())
    }

    async fn fetch_enumeration_ranges(
        &self,
        parameter: &str,
        window: Window,
        min_range_ms: i64,
    ) -> anyhow::Result<Vec<EnumerationRange>> {
        let request = ArchiveRequest::Ranges {
            parameter: parameter.to_string(),
            window,
            min_range_ms,
        };
        self.record(request, parameter, window).await?;
        Ok(self.ranges.lock().unwrap().get(parameter).cloned().unwrap_or_default())
    }

    async fn fetch_alarms(&self, _parameter: &str, _window: Window) -> anyhow::Result<Vec<AlarmRecord>> {
        Ok(Vec::new())
    }
}

struct FakeChannel {
    sent: Arc<Mutex<Vec<SubscriptionRequest>>>,
    closed: Arc<AtomicUsize>,
    broken: Arc<AtomicBool>,
}

impl LiveChannel for FakeChannel {
    fn send(&self, request: SubscriptionRequest) -> anyhow::Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            anyhow::bail!("live session is gone");
        }
        self.sent.lock().unwrap().push(request);
        Ok(())
    }

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Live source that records subscription traffic and lets tests push messages
#[derive(Default)]
pub struct FakeLiveSource {
    opened: Mutex<Vec<SubscriptionRequest>>,
    sent: Arc<Mutex<Vec<SubscriptionRequest>>>,
    closed: Arc<AtomicUsize>,
    broken: Mutex<Vec<Arc<AtomicBool>>>,
    senders: Mutex<Vec<mpsc::UnboundedSender<LiveMessage>>>,
}

impl FakeLiveSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opened(&self) -> Vec<SubscriptionRequest> {
        self.opened.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<SubscriptionRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make `send` fail on every channel opened so far
    pub fn fail_sends(&self) {
        for broken in self.broken.lock().unwrap().iter() {
            broken.store(true, Ordering::SeqCst);
        }
    }

    /// Close the message stream of the most recently opened subscription
    pub fn end_feed(&self) {
        self.senders.lock().unwrap().pop();
    }

    /// Push a message on the most recently opened subscription
    pub fn deliver(&self, message: LiveMessage) {
        if let Some(tx) = self.senders.lock().unwrap().last() {
            let _ = tx.send(message);
        }
    }
}

impl LiveSource for FakeLiveSource {
    fn open(&self, request: SubscriptionRequest) -> anyhow::Result<LiveSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let broken = Arc::new(AtomicBool::new(false));
        self.broken.lock().unwrap().push(broken.clone());
        self.opened.lock().unwrap().push(request);
        self.senders.lock().unwrap().push(tx);
        Ok(LiveSubscription {
            channel: Box::new(FakeChannel {
                sent: self.sent.clone(),
                closed: self.closed.clone(),
                broken,
            }),
            messages: rx,
        })
    }
}

type CallbackSlots = Arc<Mutex<Vec<Option<SyncCallback>>>>;

/// Synchronizer whose ticks are fired by the test
#[derive(Default, Clone)]
pub struct ManualSynchronizer {
    callbacks: CallbackSlots,
}

impl ManualSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self) {
        for callback in self.callbacks.lock().unwrap().iter_mut().flatten() {
            callback();
        }
    }

    pub fn active(&self) -> usize {
        self.callbacks.lock().unwrap().iter().flatten().count()
    }
}

impl Synchronizer for ManualSynchronizer {
    fn schedule(&self, callback: SyncCallback) -> SyncHandle {
        let slot = {
            let mut callbacks = self.callbacks.lock().unwrap();
            callbacks.push(Some(callback));
            callbacks.len() - 1
        };
        let callbacks = self.callbacks.clone();
        SyncHandle::new(move || {
            if let Some(entry) = callbacks.lock().unwrap().get_mut(slot) {
                *entry = None;
            }
        })
    }
}

/// Let spawned tasks run on the current-thread test runtime
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
