// Live parameter update domain models
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStatus {
    Acquired,
    NotReceived,
    Invalid,
    Expired,
}

impl AcquisitionStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "ACQUIRED" => AcquisitionStatus::Acquired,
            "EXPIRED" => AcquisitionStatus::Expired,
            "INVALID" => AcquisitionStatus::Invalid,
            _ => AcquisitionStatus::NotReceived,
        }
    }
}

/// Engineering value as carried by a live update
#[derive(Debug, Clone, PartialEq)]
pub enum EngValue {
    Float(f32),
    Double(f64),
    Uint32(u32),
    Sint32(i32),
    Uint64(u64),
    Sint64(i64),
    Enumerated(String),
    Boolean(bool),
    String(String),
    Binary(Vec<u8>),
    Other,
}

/// One live update, referencing its parameter by subscription-local numeric id
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValue {
    pub numeric_id: u32,
    pub eng_value: EngValue,
    pub acquisition_status: AcquisitionStatus,
    pub generation_time: DateTime<Utc>,
}

/// One message of a live subscription
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveMessage {
    /// Incremental id -> qualified name entries
    pub id_mapping: HashMap<u32, String>,
    pub values: Vec<ParameterValue>,
}
