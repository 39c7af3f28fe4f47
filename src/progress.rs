use crate::models::{DayStatus, PhaseProgress, Progress};
use crate::storage::{KeyValueStore, PROGRESS_KEY, load_record, persist_record};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Completed lessons and the current lesson, persisted after every change.
///
/// Mutations are ignored until [`ProgressStore::load`] has run.
pub struct ProgressStore {
    store: Arc<dyn KeyValueStore>,
    record: Progress,
    loaded: bool,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            record: Progress::empty(Utc::now()),
            loaded: false,
        }
    }

    pub fn load(&mut self) -> &Progress {
        self.load_at(Utc::now())
    }

    pub fn load_at(&mut self, now: DateTime<Utc>) -> &Progress {
        self.record = load_record(self.store.as_ref(), PROGRESS_KEY)
            .unwrap_or_else(|| Progress::empty(now));
        self.loaded = true;
        info!(
            completed = self.record.completed_days.len(),
            current = ?self.record.current_day,
            "progress loaded"
        );
        &self.record
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn progress(&self) -> &Progress {
        &self.record
    }

    pub fn mark_completed(&mut self, day: i32) {
        self.mark_completed_at(day, Utc::now());
    }

    pub fn mark_completed_at(&mut self, day: i32, now: DateTime<Utc>) {
        if !self.accepts("mark_completed") {
            return;
        }
        self.record.completed_days.insert(day);
        self.record.last_access_date = now;
        debug!(day, "day marked completed");
        self.persist();
    }

    pub fn mark_incomplete(&mut self, day: i32) {
        self.mark_incomplete_at(day, Utc::now());
    }

    pub fn mark_incomplete_at(&mut self, day: i32, now: DateTime<Utc>) {
        if !self.accepts("mark_incomplete") {
            return;
        }
        self.record.completed_days.remove(&day);
        self.record.last_access_date = now;
        debug!(day, "day marked incomplete");
        self.persist();
    }

    /// Flips completion for `day` and returns its new status.
    pub fn toggle(&mut self, day: i32) -> DayStatus {
        if self.record.completed_days.contains(&day) {
            self.mark_incomplete(day);
        } else {
            self.mark_completed(day);
        }
        self.status(day)
    }

    /// Returns whether anything changed. Revisiting the current day writes nothing.
    pub fn set_current_day(&mut self, day: i32) -> bool {
        self.set_current_day_at(day, Utc::now())
    }

    pub fn set_current_day_at(&mut self, day: i32, now: DateTime<Utc>) -> bool {
        if !self.accepts("set_current_day") || self.record.current_day == Some(day) {
            return false;
        }
        self.record.current_day = Some(day);
        self.record.last_access_date = now;
        debug!(day, "current day updated");
        self.persist();
        true
    }

    pub fn status(&self, day: i32) -> DayStatus {
        if self.record.completed_days.contains(&day) {
            DayStatus::Completed
        } else if self.record.current_day == Some(day) {
            DayStatus::Current
        } else {
            DayStatus::Pending
        }
    }

    pub fn phase_progress(&self, days: &[i32]) -> PhaseProgress {
        let completed = days
            .iter()
            .filter(|day| self.record.completed_days.contains(day))
            .count();
        let current = days
            .iter()
            .copied()
            .find(|day| self.record.current_day == Some(*day));

        PhaseProgress {
            completed,
            current,
            total: days.len(),
            progress: completed + usize::from(current.is_some()),
        }
    }

    pub fn reset(&mut self) {
        self.reset_at(Utc::now());
    }

    pub fn reset_at(&mut self, now: DateTime<Utc>) {
        if !self.accepts("reset") {
            return;
        }
        self.record = Progress::empty(now);
        info!("progress reset");
        self.persist();
    }

    fn accepts(&self, operation: &str) -> bool {
        if !self.loaded {
            warn!(operation, "progress not loaded yet, ignoring");
        }
        self.loaded
    }

    fn persist(&self) {
        persist_record(self.store.as_ref(), PROGRESS_KEY, &self.record);
    }
}
