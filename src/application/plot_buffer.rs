// Plot buffer - Archived rows plus the live tail, read through snapshots
use crate::domain::plot::{Annotation, PlotData};
use crate::domain::telemetry::{MergedRow, ValueRange};

/// What happened to a live row handed to [`PlotBuffer::add_realtime_value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveAppend {
    Appended,
    /// Same timestamp as the previous live row, which it replaced
    Replaced,
    /// Older than the previous live row
    Dropped,
}

/// Combined archive + live series of one plot.
///
/// The dirty flag is raised by every write and lowered only by the owner once it
/// has published a snapshot, so any number of writes between two ticks show up in
/// exactly one snapshot.
#[derive(Debug)]
pub struct PlotBuffer {
    archive: Vec<MergedRow>,
    annotations: Vec<Annotation>,
    live: Vec<MergedRow>,
    data_extent: ValueRange,
    user_range: ValueRange,
    dirty: bool,
    live_capacity: usize,
    reload_requested: bool,
}

impl PlotBuffer {
    pub fn new(live_capacity: usize) -> Self {
        Self {
            archive: Vec::new(),
            annotations: Vec::new(),
            live: Vec::new(),
            data_extent: ValueRange::unset(),
            user_range: ValueRange::unset(),
            dirty: false,
            live_capacity,
            reload_requested: false,
        }
    }

    /// Replace the archive half wholesale
    pub fn set_archive_data(&mut self, rows: Vec<MergedRow>, annotations: Vec<Annotation>) {
        self.archive = rows;
        self.annotations = annotations;
        self.dirty = true;
    }

    /// Extent computed from the archive fetch, used where no user range is set
    pub fn set_data_extent(&mut self, extent: ValueRange) {
        self.data_extent = extent;
        self.dirty = true;
    }

    /// User zoom; bounds set here win over the computed extent until the next reset
    pub fn set_value_range(&mut self, range: ValueRange) {
        self.user_range = range;
        self.dirty = true;
    }

    pub fn add_realtime_value(&mut self, row: MergedRow) -> LiveAppend {
        let outcome = match self.live.last_mut() {
            Some(last) if row.time < last.time => return LiveAppend::Dropped,
            Some(last) if row.time == last.time => {
                *last = row;
                LiveAppend::Replaced
            }
            _ => {
                self.live.push(row);
                LiveAppend::Appended
            }
        };
        if self.live.len() > self.live_capacity {
            self.reload_requested = true;
        }
        self.dirty = true;
        outcome
    }

    /// Copy of the combined series with every row conformed to `width` slots.
    ///
    /// Live rows that do not come after the last archive row are left out so
    /// timestamps stay strictly increasing.
    pub fn snapshot(&self, width: usize) -> PlotData {
        let archive_end = self.archive.last().map(|row| row.time);
        let live = self
            .live
            .iter()
            .filter(|row| archive_end.is_none_or(|end| row.time > end));

        PlotData {
            rows: self
                .archive
                .iter()
                .chain(live)
                .map(|row| row.conformed(width))
                .collect(),
            value_range: self.user_range.or(self.data_extent),
            annotations: self.annotations.clone(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    /// True once, after the live half outgrew its capacity
    pub fn take_reload_request(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    pub fn reset(&mut self) {
        self.archive.clear();
        self.annotations.clear();
        self.live.clear();
        self.data_extent = ValueRange::unset();
        self.user_range = ValueRange::unset();
        self.dirty = false;
        self.reload_requested = false;
    }
}
