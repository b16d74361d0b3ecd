// Plot data source - Window controller joining archive fetches with the live feed
use crate::application::annotations::produce_annotations;
use crate::application::archive_source::{AlarmRecord, ArchiveSource};
use crate::application::errors::{PlotError, PlotResult};
use crate::application::live_source::{LiveChannel, LiveSource, SubscriptionRequest};
use crate::application::merger::{NamedSeries, merge_series};
use crate::application::normalizer::SampleNormalizer;
use crate::application::plot_buffer::{LiveAppend, PlotBuffer};
use crate::application::reconciler::LiveValueReconciler;
use crate::application::synchronizer::{SyncHandle, Synchronizer};
use crate::domain::live::LiveMessage;
use crate::domain::parameter::Parameter;
use crate::domain::plot::{Annotation, PlotData};
use crate::domain::telemetry::{ArchivedSample, EnumerationRange, MergedRow, ValueRange, Window};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Bucket count requested for continuous parameters
    pub sample_count: usize,
    /// Enumeration ranges are requested no shorter than window / divisor
    pub range_divisor: i64,
    pub live_capacity: usize,
    /// Used by a reload before any window was applied
    pub default_window: chrono::Duration,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            sample_count: 6000,
            range_divisor: 6000,
            live_capacity: 10_000,
            default_window: chrono::Duration::hours(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    Applied,
    /// A later window change started before this one completed; its result was dropped
    Superseded,
}

enum ArchiveData {
    Samples(Vec<ArchivedSample>),
    Ranges(Vec<EnumerationRange>),
}

struct FetchedSeries {
    parameter: String,
    data: ArchiveData,
    alarms: Vec<AlarmRecord>,
}

struct ActiveLive {
    id: u64,
    channel: Box<dyn LiveChannel>,
    task: JoinHandle<()>,
}

struct Publishers {
    loading: watch::Sender<bool>,
    parameters: watch::Sender<Vec<Parameter>>,
    data: watch::Sender<Arc<PlotData>>,
    notices: broadcast::Sender<String>,
}

struct PlotState {
    parameters: Vec<Parameter>,
    buffer: PlotBuffer,
    reconciler: LiveValueReconciler,
    generation: u64,
    loading: bool,
    visible: Option<Window>,
    live: Option<ActiveLive>,
    next_live_id: u64,
    sync: Option<SyncHandle>,
    publishers: Option<Publishers>,
    disposed: bool,
}

impl PlotState {
    fn set_loading(&mut self, loading: bool) {
        if self.loading == loading {
            return;
        }
        self.loading = loading;
        if let Some(publishers) = &self.publishers {
            publishers.loading.send_replace(loading);
        }
    }

    fn publish_parameters(&self) {
        if let Some(publishers) = &self.publishers {
            publishers.parameters.send_replace(self.parameters.clone());
        }
    }

    fn publish_notice(&self, error: &PlotError) {
        if let Some(publishers) = &self.publishers {
            let _ = publishers.notices.send(error.to_string());
        }
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.qualified_name.clone()).collect()
    }
}

struct Inner {
    archive: Arc<dyn ArchiveSource>,
    live_source: Arc<dyn LiveSource>,
    options: PlotOptions,
    state: Mutex<PlotState>,
}

/// Data source behind one parameter plot.
///
/// Archive fetches for the visible window and the live subscription both feed a
/// single [`PlotBuffer`]; a periodic tick publishes a snapshot whenever the buffer
/// changed and no window change is loading.
#[derive(Clone)]
pub struct PlotDataSource {
    inner: Arc<Inner>,
}

impl PlotDataSource {
    pub fn new(
        archive: Arc<dyn ArchiveSource>,
        live_source: Arc<dyn LiveSource>,
        synchronizer: &dyn Synchronizer,
        options: PlotOptions,
    ) -> Self {
        let state = PlotState {
            parameters: Vec::new(),
            buffer: PlotBuffer::new(options.live_capacity),
            reconciler: LiveValueReconciler::new(),
            generation: 0,
            loading: false,
            visible: None,
            live: None,
            next_live_id: 0,
            sync: None,
            publishers: Some(Publishers {
                loading: watch::Sender::new(false),
                parameters: watch::Sender::new(Vec::new()),
                data: watch::Sender::new(Arc::new(PlotData::default())),
                notices: broadcast::channel(64).0,
            }),
            disposed: false,
        };
        let source = Self {
            inner: Arc::new(Inner {
                archive,
                live_source,
                options,
                state: Mutex::new(state),
            }),
        };

        let weak = Arc::downgrade(&source.inner);
        let handle = synchronizer.schedule(Box::new(move || {
            if let Some(source) = Self::upgrade(&weak) {
                source.on_tick();
            }
        }));
        source.state().sync = Some(handle);
        source
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn state(&self) -> MutexGuard<'_, PlotState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, error: &PlotError) {
        self.state().publish_notice(error);
    }

    pub fn loading(&self) -> Option<watch::Receiver<bool>> {
        self.state().publishers.as_ref().map(|p| p.loading.subscribe())
    }

    pub fn parameters(&self) -> Option<watch::Receiver<Vec<Parameter>>> {
        self.state().publishers.as_ref().map(|p| p.parameters.subscribe())
    }

    /// Snapshots published by the periodic tick
    pub fn data(&self) -> Option<watch::Receiver<Arc<PlotData>>> {
        self.state().publishers.as_ref().map(|p| p.data.subscribe())
    }

    /// User-facing error notices
    pub fn notifications(&self) -> Option<broadcast::Receiver<String>> {
        self.state().publishers.as_ref().map(|p| p.notices.subscribe())
    }

    pub fn current_parameters(&self) -> Vec<Parameter> {
        self.state().parameters.clone()
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn visible_window(&self) -> Option<Window> {
        self.state().visible
    }

    /// Pull the current buffer contents without touching the dirty flag
    pub fn snapshot(&self) -> PlotData {
        let state = self.state();
        state.buffer.snapshot(state.parameters.len())
    }

    /// Show the given window. Archive data is loaded for the window widened by its own
    /// length on both sides; a call made while another is pending supersedes it.
    pub async fn update_window(&self, window: Window, value_range: ValueRange) -> PlotResult<WindowOutcome> {
        let (generation, parameters) = {
            let mut state = self.state();
            if state.disposed {
                return Err(PlotError::Disposed);
            }
            state.generation += 1;
            state.set_loading(true);
            (state.generation, state.parameters.clone())
        };
        let _loading = LoadingReset {
            source: self,
            generation,
        };

        let expanded = window.expanded();
        tracing::debug!(
            generation,
            parameters = parameters.len(),
            start = %expanded.start,
            stop = %expanded.stop,
            "Fetching archive window"
        );

        let fetches = parameters.iter().map(|p| self.fetch_parameter(p, expanded));
        let fetched = futures::future::try_join_all(fetches).await;

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!(generation, current = state.generation, "Discarding superseded window");
            return Ok(WindowOutcome::Superseded);
        }

        let merged = fetched
            .map_err(|e| PlotError::Fetch(format!("{:#}", e)))
            .and_then(build_archive_rows);
        let (rows, annotations, extent) = match merged {
            Ok(archive) => archive,
            Err(e) => {
                state.set_loading(false);
                drop(state);
                tracing::error!(generation, error = %e, "Window change failed");
                self.notify(&e);
                return Err(e);
            }
        };

        state.buffer.reset();
        state.reconciler.clear_latest();
        state.buffer.set_archive_data(rows, annotations);
        state.buffer.set_data_extent(extent);
        state.buffer.set_value_range(value_range);
        state.visible = Some(window);
        state.set_loading(false);
        Ok(WindowOutcome::Applied)
    }

    /// Reload the currently applied window, dropping any user value range
    pub async fn reload_visible_range(&self) -> PlotResult<WindowOutcome> {
        let window = self
            .visible_window()
            .unwrap_or_else(|| Window::trailing(self.inner.options.default_window));
        self.update_window(window, ValueRange::unset()).await
    }

    async fn fetch_parameter(&self, parameter: &Parameter, window: Window) -> anyhow::Result<FetchedSeries> {
        let archive = &self.inner.archive;
        let name = parameter.qualified_name.as_str();
        let data = async {
            if parameter.eng_type.is_enumeration() {
                let min_range_ms = min_range_ms(window, self.inner.options.range_divisor);
                archive
                    .fetch_enumeration_ranges(name, window, min_range_ms)
                    .await
                    .map(ArchiveData::Ranges)
            } else {
                archive
                    .fetch_samples(name, window, self.inner.options.sample_count)
                    .await
                    .map(ArchiveData::Samples)
            }
        };
        let (data, alarms) = futures::try_join!(data, archive.fetch_alarms(name, window))?;
        Ok(FetchedSeries {
            parameter: parameter.qualified_name.clone(),
            data,
            alarms,
        })
    }

    /// Append parameters to the plot and to the live feed
    pub fn add_parameters(&self, parameters: Vec<Parameter>) -> PlotResult<()> {
        let mut state = self.state();
        if state.disposed {
            return Err(PlotError::Disposed);
        }
        let names: Vec<String> = parameters.iter().map(|p| p.qualified_name.clone()).collect();
        state.parameters.extend(parameters);
        state.publish_parameters();

        if let Some(live) = &state.live {
            tracing::info!(?names, "Extending live subscription");
            match live.channel.send(SubscriptionRequest::add(names)) {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(error = %e, "Live subscription unusable, reopening"),
            }
            if let Some(stale) = state.live.take() {
                stale.channel.close();
                stale.task.abort();
            }
        }
        self.connect_live(&mut state)
    }

    /// Stop tracking a parameter; rows already buffered are left as they are
    pub fn remove_parameter(&self, qualified_name: &str) {
        let mut state = self.state();
        state.parameters.retain(|p| p.qualified_name != qualified_name);
        state.publish_parameters();
    }

    fn connect_live(&self, state: &mut PlotState) -> PlotResult<()> {
        let request = SubscriptionRequest::replace(state.parameter_names());
        tracing::info!(parameters = request.parameters.len(), "Opening live subscription");
        let subscription = self
            .inner
            .live_source
            .open(request)
            .map_err(|e| PlotError::Subscription(format!("{:#}", e)))?;

        state.reconciler.reset();
        state.next_live_id += 1;
        let id = state.next_live_id;

        let weak = Arc::downgrade(&self.inner);
        let mut messages = subscription.messages;
        let task = tokio::spawn(async move {
            let mut failure = None;
            while let Some(message) = messages.recv().await {
                let Some(source) = Self::upgrade(&weak) else {
                    return;
                };
                if let Err(e) = source.on_live_message(message) {
                    failure = Some(e);
                    break;
                }
            }
            if let Some(source) = Self::upgrade(&weak) {
                source.release_live(id, failure);
            }
        });

        state.live = Some(ActiveLive {
            id,
            channel: subscription.channel,
            task,
        });
        Ok(())
    }

    fn on_live_message(&self, message: LiveMessage) -> PlotResult<()> {
        let mut guard = self.state();
        let state = &mut *guard;
        if state.disposed {
            return Err(PlotError::Disposed);
        }

        if let Some(row) = state.reconciler.on_message(message, &state.parameters)? {
            let time = row.time;
            if state.buffer.add_realtime_value(row) == LiveAppend::Dropped {
                tracing::warn!(%time, "Dropping out-of-order live row");
            }
            tracing::trace!(%time, mapping_version = state.reconciler.version(), "Live row buffered");
        }
        Ok(())
    }

    /// Drop the subscription `id` once its message stream ended, unless it was already replaced
    fn release_live(&self, id: u64, failure: Option<PlotError>) {
        let mut state = self.state();
        if !state.live.as_ref().is_some_and(|live| live.id == id) {
            return;
        }
        if let Some(live) = state.live.take() {
            live.channel.close();
        }
        let error = failure.unwrap_or_else(|| PlotError::Subscription("live feed ended".to_string()));
        tracing::error!(id, error = %error, "Live subscription closed");
        state.publish_notice(&error);
    }

    fn on_tick(&self) {
        let mut state = self.state();
        if state.disposed {
            return;
        }

        if state.buffer.take_reload_request() {
            tracing::debug!(live_rows = state.buffer.live_len(), "Live buffer full, reloading window");
            let source = self.clone();
            tokio::spawn(async move {
                if let Err(e) = source.reload_visible_range().await {
                    tracing::warn!(error = %e, "Reload of visible range failed");
                }
            });
        }

        if state.buffer.is_dirty() && !state.loading {
            let data = state.buffer.snapshot(state.parameters.len());
            if let Some(publishers) = &state.publishers {
                publishers.data.send_replace(Arc::new(data));
            }
            state.buffer.clear_dirty();
        }
    }

    /// Stop the tick and the live feed and complete all observable streams.
    /// Pending window changes are discarded. Calling this again does nothing.
    pub fn dispose(&self) {
        let (sync, live, publishers) = {
            let mut state = self.state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.generation += 1;
            (state.sync.take(), state.live.take(), state.publishers.take())
        };

        if let Some(mut sync) = sync {
            sync.cancel();
        }
        if let Some(live) = live {
            live.channel.close();
            live.task.abort();
        }
        drop(publishers);
        tracing::info!("Plot data source disposed");
    }
}

/// Clears `loading` when a window change is dropped before it completes
struct LoadingReset<'a> {
    source: &'a PlotDataSource,
    generation: u64,
}

impl Drop for LoadingReset<'_> {
    fn drop(&mut self) {
        let mut state = self.source.state();
        if state.generation == self.generation {
            state.set_loading(false);
        }
    }
}

fn min_range_ms(window: Window, divisor: i64) -> i64 {
    let span = window.duration().num_milliseconds() as f64;
    (span / divisor.max(1) as f64).round() as i64
}

/// Normalize every fetched series and merge them into one multi-column series
fn build_archive_rows(fetched: Vec<FetchedSeries>) -> PlotResult<(Vec<MergedRow>, Vec<Annotation>, ValueRange)> {
    let mut normalizer = SampleNormalizer::new();
    let mut series = fetched.into_iter();
    let Some(primary) = series.next() else {
        return Ok((Vec::new(), Vec::new(), ValueRange::unset()));
    };

    let mut normalize = |data: ArchiveData| match data {
        ArchiveData::Samples(samples) => normalizer.normalize_samples(&samples),
        ArchiveData::Ranges(ranges) => normalizer.normalize_ranges(&ranges),
    };

    let primary_rows = normalize(primary.data);
    let annotations = produce_annotations(&primary.alarms, &primary_rows);
    let additional = series
        .map(|s| NamedSeries {
            parameter: s.parameter,
            rows: normalize(s.data),
        })
        .collect();

    let rows = merge_series(primary_rows, additional)?;
    Ok((rows, annotations, normalizer.extent()))
}
