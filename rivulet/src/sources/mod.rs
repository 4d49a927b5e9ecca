//! Constructors for [Observable]s, and [Subject].
//!

mod cold;
mod create;
mod iter;
mod range;
mod subject;
mod timer;

pub use cold::*;
pub use subject::*;

use create::*;
use iter::*;
use range::*;
use timer::*;

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::observer::Sink;
use crate::queue::ValueAt;
use crate::scheduler::*;
use crate::types::*;

/// Emits `count` consecutive integers starting at `start`, then completes.
///
/// With [Delivery::Immediate] everything is delivered before `subscribe`
/// returns.  With [Delivery::On] each value is a separate scheduled action
/// and disposing the subscription stops the remaining ones.  Fails if
/// `count` is negative or the last value would overflow.
pub fn range(start: i64, count: i64, delivery: Delivery) -> Result<Arc<dyn Observable<i64>>> {
    if count < 0 {
        return Err(Error::invalid_argument(format!(
            "range count must not be negative, got {count}"
        )));
    }
    if count > 0 && start.checked_add(count - 1).is_none() {
        return Err(Error::invalid_argument(format!(
            "range of {count} values from {start} overflows i64"
        )));
    }
    Ok(RangeObservable::new(start, count, delivery).into_observable())
}

/// Calls `setup` for every subscription with that subscription's [Sink].
/// The returned [Disposable] is released exactly once, when the
/// subscription ends.  An `Err` from `setup` is delivered as `on_error`.
pub fn create<T, F>(setup: F) -> Arc<dyn Observable<T>>
where
    T: Element,
    F: Fn(Sink<T>) -> anyhow::Result<Disposable> + Send + Sync + 'static,
{
    CreateObservable::new(Box::new(setup)).into_observable()
}

/// Builds a fresh [Observable] with `factory` for every subscription.
pub fn defer<T, F>(factory: F) -> Arc<dyn Observable<T>>
where
    T: Element,
    F: Fn() -> Arc<dyn Observable<T>> + Send + Sync + 'static,
{
    let factory = move || -> anyhow::Result<Arc<dyn Observable<T>>> { Ok(factory()) };
    DeferObservable::new(Box::new(factory)).into_observable()
}

/// Like [defer], for factories that can fail.  A failure is delivered as
/// `on_error` to the subscription that triggered it.
pub fn try_defer<T, F>(factory: F) -> Arc<dyn Observable<T>>
where
    T: Element,
    F: Fn() -> anyhow::Result<Arc<dyn Observable<T>>> + Send + Sync + 'static,
{
    DeferObservable::new(Box::new(factory)).into_observable()
}

/// Emits the items of `items`, in order, then completes.  Every
/// subscription walks its own iterator over the collection.
pub fn from_iter<T, I>(items: I, delivery: Delivery) -> Arc<dyn Observable<T>>
where
    T: Element,
    I: IntoIterator<Item = T>,
    I::IntoIter: Clone + Send + Sync + 'static,
{
    IterObservable::new(items.into_iter(), delivery).into_observable()
}

/// Emits `0` once `delay` has passed on `scheduler`, then completes.
pub fn timer(delay: Duration, scheduler: impl IntoScheduler) -> Arc<dyn Observable<u64>> {
    TimerObservable::new(delay, scheduler.into_scheduler()).into_observable()
}

/// Emits `0, 1, 2, ...`, one value every `period`, until disposed.  Each
/// subscription has its own counter.
pub fn interval(period: Duration, scheduler: impl IntoScheduler) -> Arc<dyn Observable<u64>> {
    IntervalObservable::new(period, scheduler.into_scheduler()).into_observable()
}

/// Replays `messages` to each subscriber, each message `time` after the
/// moment of subscription.
pub fn cold_observable<T: Element>(
    messages: Vec<ValueAt<Notification<T>>>,
    scheduler: impl IntoScheduler,
) -> ColdObservable<T> {
    ColdObservable::new(messages, scheduler.into_scheduler())
}

/// Schedules one action per item of `items`, each scheduled by the one
/// before it, and completes after the last one.
fn schedule_each<T, I>(scheduler: &SchedulerRef, sink: Sink<T>, items: I) -> Disposable
where
    T: Element,
    I: Iterator<Item = T> + Send + 'static,
{
    let cursor = StepCursor::default();
    schedule_step(scheduler.clone(), sink, items, cursor.clone(), 0);
    cursor.disposable()
}

fn schedule_step<T, I>(
    scheduler: SchedulerRef,
    sink: Sink<T>,
    mut items: I,
    cursor: StepCursor,
    step: u64,
) where
    T: Element,
    I: Iterator<Item = T> + Send + 'static,
{
    let next_scheduler = scheduler.clone();
    let next_cursor = cursor.clone();
    let action = scheduler.schedule(move || match items.next() {
        Some(item) => {
            sink.next(item);
            if !sink.is_closed() {
                schedule_step(next_scheduler, sink, items, next_cursor, step + 1);
            }
        }
        None => sink.completed(),
    });
    cursor.set(step, action);
}

/// Holds the pending action of a chain of scheduled steps.  A step may run,
/// and schedule its successor, before its own handle is stored; the
/// step number keeps the newer handle in place.
#[derive(Clone, Default)]
struct StepCursor {
    serial: SerialDisposable,
    latest: Arc<Mutex<u64>>,
}

impl StepCursor {
    fn set(&self, step: u64, action: Disposable) {
        let mut latest = self.latest.lock();
        if step >= *latest {
            *latest = step;
            self.serial.set(action);
        }
    }

    fn disposable(&self) -> Disposable {
        self.serial.disposable()
    }
}
