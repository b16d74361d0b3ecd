// Parameter domain model
use serde::{Deserialize, Serialize};

/// Engineering-value type tag, decides how archived data is fetched and normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngType {
    Continuous,
    Enumeration,
}

impl EngType {
    /// Map a Yamcs engineering type name ("float", "enumeration", ...) to a tag
    pub fn from_type_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "enumeration" | "enumerated" => EngType::Enumeration,
            _ => EngType::Continuous,
        }
    }

    pub fn is_enumeration(&self) -> bool {
        matches!(self, EngType::Enumeration)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub qualified_name: String,
    pub eng_type: EngType,
}

impl Parameter {
    pub fn new(qualified_name: impl Into<String>, eng_type: EngType) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            eng_type,
        }
    }

    pub fn continuous(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, EngType::Continuous)
    }

    pub fn enumeration(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, EngType::Enumeration)
    }
}
