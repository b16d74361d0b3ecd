// Live value reconciler - Complete rows out of partial live deliveries
use crate::application::errors::{PlotError, PlotResult};
use crate::domain::live::{AcquisitionStatus, EngValue, LiveMessage, ParameterValue};
use crate::domain::parameter::Parameter;
use crate::domain::telemetry::{MergedRow, Slot, SlotValue};
use std::collections::HashMap;

/// Keeps the id mapping of one subscription and the latest value per parameter.
///
/// Deliveries may report any subset of the subscribed parameters, so every emitted
/// row is filled from the latest known values.
#[derive(Debug, Default)]
pub struct LiveValueReconciler {
    id_mapping: HashMap<u32, String>,
    latest: HashMap<String, Slot>,
    version: u64,
}

impl LiveValueReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped on every change to the mapping or the latest values
    pub fn version(&self) -> u64 {
        self.version
    }

    #[cfg(test)]
    pub fn latest(&self, qualified_name: &str) -> Option<&SlotValue> {
        self.latest.get(qualified_name).and_then(|slot| slot.as_ref())
    }

    /// Apply one subscription message; returns the row to append, if the message carried values
    pub fn on_message(&mut self, message: LiveMessage, parameters: &[Parameter]) -> PlotResult<Option<MergedRow>> {
        self.merge_mapping(message.id_mapping);
        self.reconcile(&message.values, parameters)
    }

    /// Mapping entries accumulate for the lifetime of a subscription
    pub fn merge_mapping(&mut self, mapping: HashMap<u32, String>) {
        if mapping.is_empty() {
            return;
        }
        self.id_mapping.extend(mapping);
        self.version += 1;
    }

    /// Record a delivery and build the row for it, stamped with the first value's generation time.
    ///
    /// Fails without touching any state when a value references an id that was never mapped.
    pub fn reconcile(&mut self, values: &[ParameterValue], parameters: &[Parameter]) -> PlotResult<Option<MergedRow>> {
        let Some(first) = values.first() else {
            return Ok(None);
        };
        let time = first.generation_time;

        let resolved = values
            .iter()
            .map(|pval| {
                self.id_mapping
                    .get(&pval.numeric_id)
                    .map(|name| (name.clone(), coerce(pval)))
                    .ok_or(PlotError::UnknownParameterId(pval.numeric_id))
            })
            .collect::<PlotResult<Vec<_>>>()?;

        self.latest.extend(resolved);
        self.version += 1;

        let row = parameters
            .iter()
            .map(|p| self.latest.get(&p.qualified_name).cloned().flatten())
            .collect();
        Ok(Some(MergedRow::new(time, row)))
    }

    /// Forget latest values; the id mapping stays valid for the open subscription
    pub fn clear_latest(&mut self) {
        self.latest.clear();
        self.version += 1;
    }

    /// Start over for a new subscription
    pub fn reset(&mut self) {
        self.id_mapping.clear();
        self.latest.clear();
        self.version += 1;
    }
}

/// Plottable form of a live value; anything but an acquired numeric or enumerated value is a gap
pub fn coerce(pval: &ParameterValue) -> Slot {
    if pval.acquisition_status != AcquisitionStatus::Acquired {
        return None;
    }
    match &pval.eng_value {
        EngValue::Float(v) => Some(SlotValue::point(f64::from(*v))),
        EngValue::Double(v) => Some(SlotValue::point(*v)),
        EngValue::Uint32(v) => Some(SlotValue::point(f64::from(*v))),
        EngValue::Sint32(v) => Some(SlotValue::point(f64::from(*v))),
        EngValue::Uint64(v) => Some(SlotValue::point(*v as f64)),
        EngValue::Sint64(v) => Some(SlotValue::point(*v as f64)),
        EngValue::Enumerated(label) => Some(SlotValue::State(label.clone())),
        EngValue::Boolean(_) | EngValue::String(_) | EngValue::Binary(_) | EngValue::Other => None,
    }
}
