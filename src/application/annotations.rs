// Alarm annotation hook
use crate::application::archive_source::AlarmRecord;
use crate::domain::plot::Annotation;
use crate::domain::telemetry::MergedRow;

/// Annotations to overlay on `rows` for the fetched alarms.
///
/// Alarm markers are not drawn yet, so this always yields nothing; callers already
/// fetch alarms and route them through here.
pub fn produce_annotations(alarms: &[AlarmRecord], _rows: &[MergedRow]) -> Vec<Annotation> {
    for alarm in alarms {
        tracing::trace!(
            parameter = %alarm.parameter,
            trigger_time = %alarm.trigger_time,
            severity = %alarm.severity,
            "Alarm left unannotated"
        );
    }
    Vec::new()
}
