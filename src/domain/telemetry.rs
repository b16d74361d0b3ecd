// Telemetry data domain models
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Aggregated statistics of one archive bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

/// One server-side aggregation bucket; `stats` is `None` when the bucket was empty
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedSample {
    pub time: DateTime<Utc>,
    pub stats: Option<SampleStats>,
}

#[cfg(test)]
impl ArchivedSample {
    pub fn new(time: DateTime<Utc>, min: f64, avg: f64, max: f64) -> Self {
        Self {
            time,
            stats: Some(SampleStats { min, avg, max }),
        }
    }

    pub fn gap(time: DateTime<Utc>) -> Self {
        Self { time, stats: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateCount {
    pub label: String,
    pub count: u32,
}

/// Half-open interval `[start, stop)` of an enumerated parameter with the states seen inside
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationRange {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub states: Vec<StateCount>,
}

/// Value held by one slot of a merged row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SlotValue {
    /// `[min, avg, max]`
    Bars([f64; 3]),
    State(String),
    States(Vec<String>),
}

impl SlotValue {
    pub fn bars(min: f64, avg: f64, max: f64) -> Self {
        SlotValue::Bars([min, avg, max])
    }

    pub fn point(value: f64) -> Self {
        SlotValue::Bars([value, value, value])
    }
}

/// `None` renders as a gap
pub type Slot = Option<SlotValue>;

/// One timestamp plus one slot per parameter, in parameter order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    pub time: DateTime<Utc>,
    pub values: Vec<Slot>,
}

impl MergedRow {
    pub fn new(time: DateTime<Utc>, values: Vec<Slot>) -> Self {
        Self { time, values }
    }

    pub fn single(time: DateTime<Utc>, value: Slot) -> Self {
        Self {
            time,
            values: vec![value],
        }
    }

    /// Copy of this row with exactly `width` slots; missing trailing slots become gaps
    pub fn conformed(&self, width: usize) -> Self {
        let mut values: Vec<Slot> = self.values.iter().take(width).cloned().collect();
        values.resize(width, None);
        Self {
            time: self.time,
            values,
        }
    }
}

/// Y-axis range; an unset bound lets the renderer autoscale
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ValueRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn unset() -> Self {
        Self::default()
    }

    pub fn is_unset(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Bounds set on `self` win, the rest come from `fallback`
    pub fn or(self, fallback: ValueRange) -> Self {
        Self {
            min: self.min.or(fallback.min),
            max: self.max.or(fallback.max),
        }
    }
}

/// Visible time window `[start, stop)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        Self { start, stop }
    }

    /// Window of the given length ending now
    pub fn trailing(length: Duration) -> Self {
        let stop = Utc::now();
        Self::new(stop - length, stop)
    }

    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }

    /// Widen by one window length on each side so panning has data ready
    pub fn expanded(&self) -> Self {
        let delta = self.duration();
        Self::new(self.start - delta, self.stop + delta)
    }
}
