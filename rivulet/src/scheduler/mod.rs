//! Schedulers decide when, and on which thread, work runs.
//!
//! [VirtualTimeScheduler] keeps a logical clock that only moves when it is
//! told to, and runs everything on the thread that moves it.
//! [RealTimeScheduler] follows a real clock and runs work on an injectable
//! [Executor].  Both hand out a [Disposable] per scheduled action; disposing
//! it before the action fires means the action never runs.

mod real_time;
mod virtual_time;

pub use real_time::*;
pub use virtual_time::*;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::types::*;

/// Work handed to a [Scheduler].
pub enum ScheduledAction {
    /// Runs once.
    OneShot(Box<dyn FnOnce() + Send>),
    /// Runs every `period` until its [Disposable] is disposed.
    Recurring {
        period: NanoTime,
        action: Box<dyn FnMut() + Send>,
    },
}

impl ScheduledAction {
    pub fn is_recurring(&self) -> bool {
        matches!(self, ScheduledAction::Recurring { .. })
    }

    /// A recurring period is never shorter than one nanosecond, so a
    /// recurring action always moves the clock forward.
    pub(crate) fn period(&self) -> Option<NanoTime> {
        match self {
            ScheduledAction::OneShot(_) => None,
            ScheduledAction::Recurring { period, .. } => Some((*period).max(NanoTime::new(1))),
        }
    }
}

impl fmt::Debug for ScheduledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduledAction::OneShot(_) => f.write_str("OneShot"),
            ScheduledAction::Recurring { period, .. } => write!(f, "Recurring({period})"),
        }
    }
}

/// Something that owns a notion of "now" and can run work, now or later.
pub trait Scheduler: Send + Sync {
    /// The scheduler's current time.
    fn now(&self) -> NanoTime;
    /// Queues `action`, first due after `delay`.  Disposing the result
    /// cancels it; a recurring action stops recurring.
    fn schedule_action(&self, delay: Duration, action: ScheduledAction) -> Disposable;
}

/// A shared handle on a [Scheduler].
pub type SchedulerRef = Arc<dyn Scheduler>;

/// Convenience methods over [Scheduler::schedule_action].
pub trait SchedulerOperators {
    /// Runs `action` as soon as possible.
    fn schedule(&self, action: impl FnOnce() + Send + 'static) -> Disposable;
    /// Runs `action` once, `delay` from now.
    fn schedule_after(&self, delay: Duration, action: impl FnOnce() + Send + 'static) -> Disposable;
    /// Runs `action` every `period`, first at `now + period`.
    fn schedule_recurring(
        &self,
        period: Duration,
        action: impl FnMut() + Send + 'static,
    ) -> Disposable;
}

impl<S: Scheduler + ?Sized> SchedulerOperators for S {
    fn schedule(&self, action: impl FnOnce() + Send + 'static) -> Disposable {
        self.schedule_after(Duration::ZERO, action)
    }

    fn schedule_after(&self, delay: Duration, action: impl FnOnce() + Send + 'static) -> Disposable {
        self.schedule_action(delay, ScheduledAction::OneShot(Box::new(action)))
    }

    fn schedule_recurring(
        &self,
        period: Duration,
        action: impl FnMut() + Send + 'static,
    ) -> Disposable {
        let action = ScheduledAction::Recurring {
            period: NanoTime::from(period),
            action: Box::new(action),
        };
        self.schedule_action(period, action)
    }
}

/// Used to turn the concrete schedulers (or references to them) into a
/// [SchedulerRef].
pub trait IntoScheduler {
    fn into_scheduler(self) -> SchedulerRef;
}

impl IntoScheduler for SchedulerRef {
    fn into_scheduler(self) -> SchedulerRef {
        self
    }
}

impl IntoScheduler for &SchedulerRef {
    fn into_scheduler(self) -> SchedulerRef {
        self.clone()
    }
}

impl IntoScheduler for VirtualTimeScheduler {
    fn into_scheduler(self) -> SchedulerRef {
        Arc::new(self)
    }
}

impl IntoScheduler for &VirtualTimeScheduler {
    fn into_scheduler(self) -> SchedulerRef {
        Arc::new(self.clone())
    }
}

impl IntoScheduler for RealTimeScheduler {
    fn into_scheduler(self) -> SchedulerRef {
        Arc::new(self)
    }
}

impl IntoScheduler for &RealTimeScheduler {
    fn into_scheduler(self) -> SchedulerRef {
        Arc::new(self.clone())
    }
}

/// How a source that can produce synchronously should deliver.
#[derive(Clone, Default)]
pub enum Delivery {
    /// Everything is pushed before `subscribe` returns.
    #[default]
    Immediate,
    /// One scheduled action per element on the given scheduler;
    /// `subscribe` returns straight away.
    On(SchedulerRef),
}

impl Delivery {
    pub fn on(scheduler: impl IntoScheduler) -> Self {
        Delivery::On(scheduler.into_scheduler())
    }
}

impl From<SchedulerRef> for Delivery {
    fn from(scheduler: SchedulerRef) -> Self {
        Delivery::On(scheduler)
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Immediate => f.write_str("Immediate"),
            Delivery::On(_) => f.write_str("On(..)"),
        }
    }
}
