// Yamcs JSON wire types and their mapping to domain types
use crate::application::archive_source::AlarmRecord;
use crate::domain::live::{AcquisitionStatus, EngValue, LiveMessage, ParameterValue};
use crate::domain::telemetry::{ArchivedSample, EnumerationRange, SampleStats, StateCount};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct SamplesResponse {
    #[serde(default)]
    pub sample: Vec<WireSample>,
}

#[derive(Debug, Deserialize)]
pub struct WireSample {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub avg: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub n: u64,
}

#[derive(Debug, Deserialize)]
pub struct RangesResponse {
    #[serde(default)]
    pub range: Vec<WireRange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRange {
    pub time_start: DateTime<Utc>,
    pub time_stop: DateTime<Utc>,
    #[serde(default)]
    pub eng_values: Vec<WireValue>,
    #[serde(default)]
    pub counts: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AlarmsResponse {
    #[serde(default)]
    pub alarms: Vec<WireAlarm>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAlarm {
    pub trigger_time: DateTime<Utc>,
    #[serde(default)]
    pub severity: String,
    pub id: WireNamedId,
}

#[derive(Debug, Deserialize)]
pub struct WireNamedId {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireValue {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub float_value: Option<f32>,
    pub double_value: Option<f64>,
    pub uint32_value: Option<u32>,
    pub sint32_value: Option<i32>,
    /// 64-bit integers arrive as strings in protobuf JSON
    pub uint64_value: Option<serde_json::Value>,
    pub sint64_value: Option<serde_json::Value>,
    pub boolean_value: Option<bool>,
    pub string_value: Option<String>,
    pub binary_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireParameterValue {
    pub numeric_id: u32,
    #[serde(default)]
    pub eng_value: WireValue,
    #[serde(default)]
    pub acquisition_status: String,
    pub generation_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireParameterData {
    #[serde(default)]
    pub mapping: HashMap<u32, WireNamedId>,
    #[serde(default)]
    pub values: Vec<WireParameterValue>,
}

pub fn sample_to_domain(sample: WireSample) -> ArchivedSample {
    let stats = (sample.n > 0).then_some(SampleStats {
        min: sample.min,
        avg: sample.avg,
        max: sample.max,
    });
    ArchivedSample {
        time: sample.time,
        stats,
    }
}

pub fn range_to_domain(range: WireRange) -> EnumerationRange {
    let states = range
        .eng_values
        .into_iter()
        .enumerate()
        .map(|(i, value)| StateCount {
            label: value.string_value.unwrap_or_default(),
            count: range.counts.get(i).copied().unwrap_or(0),
        })
        .collect();
    EnumerationRange {
        start: range.time_start,
        stop: range.time_stop,
        states,
    }
}

pub fn alarm_to_domain(alarm: WireAlarm) -> AlarmRecord {
    AlarmRecord {
        parameter: alarm.id.name,
        trigger_time: alarm.trigger_time,
        severity: alarm.severity,
    }
}

fn wide_int<T: std::str::FromStr>(value: &serde_json::Value) -> Option<T> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        other => other.to_string().parse().ok(),
    }
}

pub fn value_to_domain(value: WireValue) -> EngValue {
    let parsed = match value.kind.as_str() {
        "FLOAT" => value.float_value.map(EngValue::Float),
        "DOUBLE" => value.double_value.map(EngValue::Double),
        "UINT32" => value.uint32_value.map(EngValue::Uint32),
        "SINT32" => value.sint32_value.map(EngValue::Sint32),
        "UINT64" => value.uint64_value.as_ref().and_then(wide_int).map(EngValue::Uint64),
        "SINT64" => value.sint64_value.as_ref().and_then(wide_int).map(EngValue::Sint64),
        "ENUMERATED" => value.string_value.map(EngValue::Enumerated),
        "BOOLEAN" => value.boolean_value.map(EngValue::Boolean),
        "STRING" => value.string_value.map(EngValue::String),
        "BINARY" => value.binary_value.map(|b| EngValue::Binary(b.into_bytes())),
        _ => None,
    };
    parsed.unwrap_or(EngValue::Other)
}

pub fn parameter_data_to_domain(data: WireParameterData) -> LiveMessage {
    LiveMessage {
        id_mapping: data.mapping.into_iter().map(|(id, named)| (id, named.name)).collect(),
        values: data
            .values
            .into_iter()
            .map(|pval| ParameterValue {
                numeric_id: pval.numeric_id,
                eng_value: value_to_domain(pval.eng_value),
                acquisition_status: AcquisitionStatus::from_wire(&pval.acquisition_status),
                generation_time: pval.generation_time,
            })
            .collect(),
    }
}
