// Sample normalizer - Archive records to single-column rows
use crate::domain::telemetry::{
    ArchivedSample, EnumerationRange, MergedRow, Slot, SlotValue, StateCount, ValueRange,
};

/// Converts archive records into one-slot rows and tracks the value extent
/// of everything normalized since the last reset.
#[derive(Debug, Default)]
pub struct SampleNormalizer {
    extent: ValueRange,
}

impl SampleNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Min/max over all continuous samples seen in this fetch cycle
    pub fn extent(&self) -> ValueRange {
        self.extent
    }

    /// One row per sample, same order; empty buckets become gaps
    pub fn normalize_samples(&mut self, samples: &[ArchivedSample]) -> Vec<MergedRow> {
        samples
            .iter()
            .map(|sample| {
                let value = sample.stats.map(|stats| {
                    self.widen(stats.min, stats.max);
                    SlotValue::bars(stats.min, stats.avg, stats.max)
                });
                MergedRow::single(sample.time, value)
            })
            .collect()
    }

    /// Two rows per range, at `start` and `stop`, carrying the same states.
    ///
    /// Where a range starts at the previous range's `stop`, the start row takes that
    /// timestamp over, so the step switches state there and timestamps stay strictly
    /// increasing.
    pub fn normalize_ranges(&self, ranges: &[EnumerationRange]) -> Vec<MergedRow> {
        let mut rows = Vec::with_capacity(ranges.len() * 2);
        for range in ranges {
            let value = flatten_states(&range.states);
            push_boundary(&mut rows, MergedRow::single(range.start, value.clone()));
            push_boundary(&mut rows, MergedRow::single(range.stop, value));
        }
        rows
    }

    fn widen(&mut self, min: f64, max: f64) {
        self.extent.min = Some(self.extent.min.map_or(min, |current| current.min(min)));
        self.extent.max = Some(self.extent.max.map_or(max, |current| current.max(max)));
    }
}

/// Equal timestamps replace the last row; older ones are skipped
fn push_boundary(rows: &mut Vec<MergedRow>, row: MergedRow) {
    match rows.last_mut() {
        Some(last) if last.time == row.time => *last = row,
        Some(last) if last.time > row.time => {}
        _ => rows.push(row),
    }
}

/// Most frequent state first; equal counts ordered by label, descending
fn flatten_states(states: &[StateCount]) -> Slot {
    match states {
        [] => None,
        [single] => Some(SlotValue::State(single.label.clone())),
        _ => {
            let mut sorted: Vec<&StateCount> = states.iter().collect();
            sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| b.label.cmp(&a.label)));
            Some(SlotValue::States(
                sorted.into_iter().map(|s| s.label.clone()).collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn state(label: &str, count: u32) -> StateCount {
        StateCount {
            label: label.to_string(),
            count,
        }
    }

    #[test]
    fn test_samples_keep_order_and_gaps() {
        let mut normalizer = SampleNormalizer::new();
        let samples = vec![
            ArchivedSample::new(at(0), 5.0, 5.0, 5.0),
            ArchivedSample::gap(at(60)),
            ArchivedSample::new(at(120), 7.0, 7.0, 7.0),
        ];

        let rows = normalizer.normalize_samples(&samples);

        assert_eq!(
            rows,
            vec![
                MergedRow::single(at(0), Some(SlotValue::bars(5.0, 5.0, 5.0))),
                MergedRow::single(at(60), None),
                MergedRow::single(at(120), Some(SlotValue::bars(7.0, 7.0, 7.0))),
            ]
        );
    }

    #[test]
    fn test_extent_only_grows() {
        let mut normalizer = SampleNormalizer::new();
        assert!(normalizer.extent().is_unset());

        normalizer.normalize_samples(&[ArchivedSample::new(at(0), 2.0, 3.0, 4.0)]);
        normalizer.normalize_samples(&[ArchivedSample::new(at(1), 3.0, 3.5, 3.9)]);
        assert_eq!(normalizer.extent(), ValueRange::new(Some(2.0), Some(4.0)));

        normalizer.normalize_samples(&[ArchivedSample::new(at(2), -1.0, 0.0, 10.0)]);
        assert_eq!(normalizer.extent(), ValueRange::new(Some(-1.0), Some(10.0)));
    }

    #[test]
    fn test_single_state_range_yields_two_boundaries() {
        let normalizer = SampleNormalizer::new();
        let ranges = vec![EnumerationRange {
            start: at(10),
            stop: at(20),
            states: vec![state("ON", 4)],
        }];

        let rows = normalizer.normalize_ranges(&ranges);

        let on = Some(SlotValue::State("ON".to_string()));
        assert_eq!(rows, vec![MergedRow::single(at(10), on.clone()), MergedRow::single(at(20), on)]);
    }

    #[test]
    fn test_adjacent_ranges_share_one_boundary_row() {
        let normalizer = SampleNormalizer::new();
        let ranges = vec![
            EnumerationRange {
                start: at(0),
                stop: at(30),
                states: vec![state("SAFE", 3)],
            },
            EnumerationRange {
                start: at(30),
                stop: at(60),
                states: vec![state("NOMINAL", 3)],
            },
        ];

        let rows = normalizer.normalize_ranges(&ranges);

        let safe = Some(SlotValue::State("SAFE".to_string()));
        let nominal = Some(SlotValue::State("NOMINAL".to_string()));
        assert_eq!(
            rows,
            vec![
                MergedRow::single(at(0), safe),
                MergedRow::single(at(30), nominal.clone()),
                MergedRow::single(at(60), nominal),
            ]
        );
    }

    #[test]
    fn test_multi_state_range_sorted_by_count_then_label() {
        let normalizer = SampleNormalizer::new();
        let ranges = vec![EnumerationRange {
            start: at(0),
            stop: at(5),
            states: vec![state("ALPHA", 2), state("OFF", 5), state("ZULU", 2), state("ON", 1)],
        }];

        let rows = normalizer.normalize_ranges(&ranges);

        let expected = Some(SlotValue::States(vec![
            "OFF".to_string(),
            "ZULU".to_string(),
            "ALPHA".to_string(),
            "ON".to_string(),
        ]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values[0], expected);
        assert_eq!(rows[1].values[0], expected);
    }
}
