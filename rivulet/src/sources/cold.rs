use derive_new::new;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::observer::Sink;
use crate::queue::ValueAt;
use crate::scheduler::{SchedulerOperators, SchedulerRef};
use crate::types::*;

/// When one subscription to a [ColdObservable] started and ended, on the
/// scheduler's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct SubscriptionLog {
    pub subscribed: NanoTime,
    pub unsubscribed: Option<NanoTime>,
}

/// Replays a fixed list of timed notifications.
///
/// Each subscription gets its own copy of the schedule: a message stamped
/// `t` is delivered `t` after that subscription started.  Disposing a
/// subscription cancels what it has not yet received and leaves other
/// subscriptions alone.
#[derive(Clone)]
pub struct ColdObservable<T: Element> {
    messages: Arc<Vec<ValueAt<Notification<T>>>>,
    scheduler: SchedulerRef,
    log: Arc<Mutex<Vec<SubscriptionLog>>>,
}

impl<T: Element> ColdObservable<T> {
    pub fn new(messages: Vec<ValueAt<Notification<T>>>, scheduler: SchedulerRef) -> Self {
        Self {
            messages: Arc::new(messages),
            scheduler,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn messages(&self) -> &[ValueAt<Notification<T>>] {
        &self.messages
    }

    /// Every subscription made so far, in subscription order.  A
    /// subscription ends when it is disposed or delivers its terminal
    /// notification.
    pub fn subscriptions(&self) -> Vec<SubscriptionLog> {
        self.log.lock().clone()
    }
}

impl<T: Element> Observable<T> for ColdObservable<T> {
    fn subscribe_sink(&self, sink: Sink<T>) -> Disposable {
        let index = {
            let mut log = self.log.lock();
            log.push(SubscriptionLog::new(self.scheduler.now(), None));
            log.len() - 1
        };
        let composite: CompositeDisposable = self
            .messages
            .iter()
            .map(|message| {
                let sink = sink.clone();
                let notification = message.value.clone();
                self.scheduler
                    .schedule_after(Duration::from(message.time), move || {
                        sink.deliver(notification)
                    })
            })
            .collect();
        let scheduler = self.scheduler.clone();
        let log = self.log.clone();
        composite.add(Disposable::new(move || {
            if let Some(entry) = log.lock().get_mut(index) {
                entry.unsubscribed = Some(scheduler.now());
            }
        }));
        composite.into()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use itertools::Itertools;
    use std::time::Duration;

    use super::*;
    use crate::scheduler::*;
    use crate::sources::cold_observable;
    use crate::testing::Recorder;

    fn on_next<T>(time: u64, value: T) -> ValueAt<Notification<T>> {
        ValueAt::at(NanoTime::new(time), Notification::Next(value))
    }

    fn on_completed<T>(time: u64) -> ValueAt<Notification<T>> {
        ValueAt::at(NanoTime::new(time), Notification::Completed)
    }

    fn times<T: Element>(recorder: &Recorder<T>) -> Vec<u64> {
        recorder.records().iter().map(|r| u64::from(r.time)).collect_vec()
    }

    #[test]
    fn each_subscription_replays_from_its_own_start() {
        let _ = env_logger::try_init();
        let scheduler = VirtualTimeScheduler::new();
        let source = cold_observable(
            vec![on_next(10, 'a'), on_next(20, 'b'), on_completed(30)],
            &scheduler,
        );
        let first = Recorder::with_scheduler(&scheduler);
        source.subscribe(first.clone());
        scheduler.advance_to(100u64).unwrap();
        let second = Recorder::with_scheduler(&scheduler);
        source.subscribe(second.clone());
        scheduler.advance_by(Duration::from_nanos(100)).unwrap();

        assert_eq!(first.notifications(), second.notifications());
        assert_eq!(times(&first), vec![10, 20, 30]);
        assert_eq!(times(&second), vec![110, 120, 130]);
        assert_eq!(
            source.subscriptions(),
            vec![
                SubscriptionLog::new(NanoTime::new(0), Some(NanoTime::new(30))),
                SubscriptionLog::new(NanoTime::new(100), Some(NanoTime::new(130))),
            ]
        );
    }

    #[test]
    fn one_big_step_fires_in_time_then_schedule_order() {
        let scheduler = VirtualTimeScheduler::new();
        let source = cold_observable(
            vec![on_next(30, 3), on_next(10, 1), on_next(10, 2), on_completed(40)],
            &scheduler,
        );
        let recorder = Recorder::new();
        source.subscribe(recorder.clone());
        scheduler.advance_to(1_000u64).unwrap();
        assert_eq!(recorder.values(), vec![1, 2, 3]);
        assert!(recorder.is_completed());
    }

    #[test]
    fn disposing_cancels_the_rest_of_the_replay() {
        let scheduler = VirtualTimeScheduler::new();
        let source = cold_observable(
            vec![on_next(10, 1), on_next(20, 2), on_next(30, 3)],
            &scheduler,
        );
        let disposed = Recorder::new();
        let kept = Recorder::new();
        let subscription = source.subscribe(disposed.clone());
        source.subscribe(kept.clone());
        scheduler.advance_to(15u64).unwrap();
        subscription.dispose().unwrap();
        scheduler.advance_to(100u64).unwrap();
        assert_eq!(disposed.values(), vec![1]);
        assert_eq!(kept.values(), vec![1, 2, 3]);
        assert_eq!(source.subscriptions()[0].unsubscribed, Some(NanoTime::new(15)));
        assert_eq!(source.subscriptions()[1].unsubscribed, None);
    }

    #[test]
    fn error_ends_the_replay() {
        let scheduler = VirtualTimeScheduler::new();
        let source = cold_observable(
            vec![
                on_next(10, 1),
                ValueAt::at(NanoTime::new(20), Notification::Error(anyhow!("boom").into())),
                on_next(30, 2),
            ],
            &scheduler,
        );
        let recorder = Recorder::new();
        source.subscribe(recorder.clone());
        scheduler.start().unwrap();
        assert_eq!(recorder.values(), vec![1]);
        assert_eq!(recorder.error().map(|e| e.to_string()), Some("boom".to_string()));
        // the message at 30 was cancelled with the subscription
        assert_eq!(scheduler.pending(), 0);
    }
}
