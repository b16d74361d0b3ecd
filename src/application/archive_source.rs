// Archive access trait for historical telemetry
use crate::domain::telemetry::{ArchivedSample, EnumerationRange, Window};
use async_trait::async_trait;

/// Raw alarm record; only carried through to the annotation hook
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRecord {
    pub parameter: String,
    pub trigger_time: chrono::DateTime<chrono::Utc>,
    pub severity: String,
}

#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Aggregated samples for a continuous parameter; empty when there is no data
    async fn fetch_samples(
        &self,
        parameter: &str,
        window: Window,
        count: usize,
    ) -> anyhow::Result<Vec<ArchivedSample>>;

    /// State ranges for an enumerated parameter, no shorter than `min_range_ms` where possible
    async fn fetch_enumeration_ranges(
        &self,
        parameter: &str,
        window: Window,
        min_range_ms: i64,
    ) -> anyhow::Result<Vec<EnumerationRange>>;

    async fn fetch_alarms(&self, parameter: &str, window: Window) -> anyhow::Result<Vec<AlarmRecord>>;
}
