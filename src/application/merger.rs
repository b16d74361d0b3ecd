// Multi-series merger - Column-wise join of series on a shared timestamp grid
use crate::application::errors::{PlotError, PlotResult};
use crate::domain::telemetry::MergedRow;

/// Named single-column series produced by the normalizer
pub struct NamedSeries {
    pub parameter: String,
    pub rows: Vec<MergedRow>,
}

/// Append the value column of every additional series onto `primary`.
///
/// All series were fetched with the same window and granularity, so they share
/// `primary`'s timestamps row for row. A different row count means the fetches
/// disagree; nothing is merged in that case.
pub fn merge_series(mut primary: Vec<MergedRow>, additional: Vec<NamedSeries>) -> PlotResult<Vec<MergedRow>> {
    let expected = primary.len();
    if let Some(bad) = additional.iter().find(|series| series.rows.len() != expected) {
        return Err(PlotError::LengthMismatch {
            parameter: bad.parameter.clone(),
            expected,
            actual: bad.rows.len(),
        });
    }

    for series in additional {
        for (row, other) in primary.iter_mut().zip(series.rows) {
            row.values.extend(other.values);
        }
    }

    Ok(primary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::SlotValue;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn series(values: &[Option<f64>]) -> Vec<MergedRow> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MergedRow::single(at(i as i64 * 60), v.map(SlotValue::point)))
            .collect()
    }

    #[test]
    fn test_merge_appends_columns_in_order() {
        let primary = series(&[Some(1.0), None, Some(3.0)]);
        let second = NamedSeries {
            parameter: "/P2".to_string(),
            rows: series(&[Some(10.0), Some(20.0), None]),
        };
        let third = NamedSeries {
            parameter: "/P3".to_string(),
            rows: series(&[None, Some(200.0), Some(300.0)]),
        };

        let merged = merge_series(primary, vec![second, third]).unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].time, at(0));
        assert_eq!(merged[2].time, at(120));
        assert_eq!(
            merged[1].values,
            vec![None, Some(SlotValue::point(20.0)), Some(SlotValue::point(200.0))]
        );
        assert_eq!(
            merged[2].values,
            vec![Some(SlotValue::point(3.0)), None, Some(SlotValue::point(300.0))]
        );
    }

    #[test]
    fn test_merge_rejects_unequal_length() {
        let primary = series(&[Some(1.0), Some(2.0)]);
        let short = NamedSeries {
            parameter: "/P2".to_string(),
            rows: series(&[Some(1.0)]),
        };

        match merge_series(primary, vec![short]) {
            Err(PlotError::LengthMismatch {
                parameter,
                expected,
                actual,
            }) => {
                assert_eq!(parameter, "/P2");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected length mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_without_additional_series_is_identity() {
        let primary = series(&[Some(1.0), None]);
        let merged = merge_series(primary.clone(), Vec::new()).unwrap();
        assert_eq!(merged, primary);
    }
}
