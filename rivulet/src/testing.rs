//! Helpers for asserting on what a subscription delivered.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::queue::ValueAt;
use crate::scheduler::{IntoScheduler, SchedulerRef};
use crate::types::*;

/// An [Observer] that keeps every notification it receives, stamped with
/// the time it arrived.
///
/// Times come from the scheduler given to [Recorder::with_scheduler];
/// without one every record is stamped [NanoTime::ZERO].  Clones share the
/// same records, so a clone can be subscribed and the original inspected.
pub struct Recorder<T> {
    records: Arc<Mutex<Vec<ValueAt<Notification<T>>>>>,
    scheduler: Option<SchedulerRef>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T: Element> Recorder<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            scheduler: None,
        }
    }

    pub fn with_scheduler(scheduler: impl IntoScheduler) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            scheduler: Some(scheduler.into_scheduler()),
        }
    }

    pub fn records(&self) -> Vec<ValueAt<Notification<T>>> {
        self.records.lock().clone()
    }

    pub fn notifications(&self) -> Vec<Notification<T>> {
        self.records
            .lock()
            .iter()
            .map(|record| record.value.clone())
            .collect()
    }

    /// The values of the `Next` notifications, in arrival order.
    pub fn values(&self) -> Vec<T> {
        self.records
            .lock()
            .iter()
            .filter_map(|record| record.value.value().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_completed(&self) -> bool {
        self.records
            .lock()
            .iter()
            .any(|record| matches!(record.value, Notification::Completed))
    }

    pub fn error(&self) -> Option<SourceError> {
        self.records
            .lock()
            .iter()
            .find_map(|record| match &record.value {
                Notification::Error(err) => Some(err.clone()),
                _ => None,
            })
    }

    fn record(&self, notification: Notification<T>) {
        let time = self
            .scheduler
            .as_ref()
            .map_or(NanoTime::ZERO, |scheduler| scheduler.now());
        self.records.lock().push(ValueAt::at(time, notification));
    }
}

impl<T: Element> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Observer<T> for Recorder<T> {
    fn on_next(&mut self, value: T) {
        self.record(Notification::Next(value));
    }

    fn on_error(&mut self, error: SourceError) {
        self.record(Notification::Error(error));
    }

    fn on_completed(&mut self) {
        self.record(Notification::Completed);
    }
}
