// Plot snapshot domain model
use super::telemetry::{MergedRow, ValueRange};
use serde::Serialize;

/// Marker drawn on top of a series, e.g. an alarm trigger
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub series: String,
    pub time_ms: i64,
    pub short_text: String,
    pub text: String,
}

/// Immutable view of a plot buffer, the unit handed to rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotData {
    pub rows: Vec<MergedRow>,
    pub value_range: ValueRange,
    pub annotations: Vec<Annotation>,
}
