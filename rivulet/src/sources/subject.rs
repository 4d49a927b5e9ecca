use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::observer::Sink;
use crate::types::*;

type ObserverId = u64;

struct SubjectState<T> {
    observers: Vec<(ObserverId, Sink<T>)>,
    terminal: Option<Notification<T>>,
    next_id: ObserverId,
}

/// Both an [Observer] and an [Observable]: whatever it is told is
/// broadcast, live, to the observers subscribed at that moment.
///
/// Past values are not kept, so late subscribers miss them.  After `error`
/// or `completed` the subject is stopped: the observer set is cleared and
/// every later subscriber receives that same terminal notification straight
/// away.  Clones share the same observer set.
pub struct Subject<T: Element> {
    state: Arc<Mutex<SubjectState<T>>>,
}

impl<T: Element> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Element> Subject<T> {
    pub fn new() -> Self {
        let state = SubjectState {
            observers: Vec::new(),
            terminal: None,
            next_id: 0,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn next(&self, value: T) {
        // a snapshot, so observers may subscribe or dispose while we deliver
        let sinks: SmallVec<[Sink<T>; 4]> = {
            let state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.observers.iter().map(|(_, sink)| sink.clone()).collect()
        };
        for sink in sinks {
            sink.next(value.clone());
        }
    }

    pub fn error(&self, error: impl Into<SourceError>) {
        self.terminate(Notification::Error(error.into()));
    }

    pub fn completed(&self) {
        self.terminate(Notification::Completed);
    }

    fn terminate(&self, notification: Notification<T>) {
        let observers = {
            let mut state = self.state.lock();
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(notification.clone());
            std::mem::take(&mut state.observers)
        };
        debug!("subject stopped, notifying {} observer(s)", observers.len());
        for (_, sink) in observers {
            sink.deliver(notification.clone());
        }
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    pub fn has_observers(&self) -> bool {
        self.observer_count() > 0
    }

    /// True once `error` or `completed` has been called.
    pub fn is_stopped(&self) -> bool {
        self.state.lock().terminal.is_some()
    }

    /// The observable side alone, for handing out without the ability to
    /// push.
    pub fn as_observable(&self) -> Arc<dyn Observable<T>> {
        self.clone().into_observable()
    }
}

impl<T: Element> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Observable<T> for Subject<T> {
    fn subscribe_sink(&self, sink: Sink<T>) -> Disposable {
        let id = {
            let mut state = self.state.lock();
            if let Some(terminal) = state.terminal.clone() {
                drop(state);
                sink.deliver(terminal);
                return Disposable::empty();
            }
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push((id, sink));
            id
        };
        let state = Arc::downgrade(&self.state);
        Disposable::new(move || {
            if let Some(state) = state.upgrade() {
                state.lock().observers.retain(|(other, _)| *other != id);
            }
        })
    }
}

impl<T: Element> Observer<T> for Subject<T> {
    fn on_next(&mut self, value: T) {
        self.next(value)
    }

    fn on_error(&mut self, error: SourceError) {
        self.error(error)
    }

    fn on_completed(&mut self) {
        self.completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::*;
    use crate::sources::*;
    use crate::testing::Recorder;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn delivers_to_current_observers_only() {
        let _ = env_logger::try_init();
        let subject = Subject::new();
        let early = Recorder::new();
        subject.subscribe(early.clone());
        subject.next(1);
        let late = Recorder::new();
        subject.subscribe(late.clone());
        subject.next(2);
        assert_eq!(early.values(), vec![1, 2]);
        assert_eq!(late.values(), vec![2]);
        assert_eq!(subject.observer_count(), 2);
    }

    #[test]
    fn dispose_removes_observer() {
        let subject = Subject::new();
        let recorder = Recorder::new();
        let subscription = subject.subscribe(recorder.clone());
        assert!(subject.has_observers());
        subject.next("a");
        subscription.dispose().unwrap();
        subscription.dispose().unwrap();
        assert!(!subject.has_observers());
        subject.next("b");
        assert_eq!(recorder.values(), vec!["a"]);
    }

    #[test]
    fn terminal_is_replayed_to_late_subscribers() {
        let subject = Subject::new();
        let early = Recorder::new();
        subject.subscribe(early.clone());
        subject.next(1);
        subject.completed();
        subject.next(2);
        subject.error(SourceError::msg("ignored"));
        assert!(subject.is_stopped());
        assert!(!subject.has_observers());

        let late = Recorder::<i32>::new();
        let subscription = subject.subscribe(late.clone());
        assert_eq!(
            early.notifications(),
            vec![Notification::Next(1), Notification::Completed]
        );
        assert_eq!(late.notifications(), vec![Notification::Completed]);
        subscription.dispose().unwrap();
    }

    #[test]
    fn error_is_replayed_to_late_subscribers() {
        let subject = Subject::<i32>::new();
        subject.error(SourceError::msg("feed lost"));
        let late = Recorder::new();
        subject.subscribe(late.clone());
        assert_eq!(
            late.notifications(),
            vec![Notification::Error(SourceError::msg("feed lost"))]
        );
    }

    #[test]
    fn subscribing_during_next_does_not_see_current_value() {
        let subject = Subject::new();
        let joined = Recorder::new();
        let (s, j) = (subject.clone(), joined.clone());
        let mut subscribed = false;
        subject.subscribe_next(move |_: i32| {
            if !subscribed {
                subscribed = true;
                s.subscribe(j.clone());
            }
        });
        subject.next(1);
        subject.next(2);
        assert_eq!(joined.values(), vec![2]);
    }

    #[test]
    fn reentrant_next_reaches_every_observer() {
        let subject = Subject::new();
        let recorder = Recorder::new();
        let s = subject.clone();
        subject.subscribe_next(move |v: i32| {
            if v < 3 {
                s.next(v + 1);
            }
        });
        subject.subscribe(recorder.clone());
        subject.next(0);
        // nested values overtake the outer one for later observers
        assert_eq!(recorder.values(), vec![1, 2, 3, 0]);
    }

    #[test]
    fn subject_as_observer_of_a_source() {
        let subject = Subject::new();
        let recorder = Recorder::new();
        subject.as_observable().subscribe(recorder.clone());
        range(1, 3, Delivery::Immediate)
            .unwrap()
            .subscribe(subject.clone());
        assert_eq!(recorder.values(), vec![1, 2, 3]);
        assert!(recorder.is_completed());
        assert!(subject.is_stopped());
    }

    #[test]
    fn subject_fed_by_virtual_interval() {
        let scheduler = VirtualTimeScheduler::new();
        let subject = Subject::new();
        let feed = interval(Duration::from_nanos(10), &scheduler).subscribe(subject.clone());
        let first = Recorder::with_scheduler(&scheduler);
        subject.subscribe(first.clone());
        scheduler.advance_to(25u64).unwrap();
        let second = Recorder::with_scheduler(&scheduler);
        subject.subscribe(second.clone());
        scheduler.advance_to(45u64).unwrap();
        feed.dispose().unwrap();
        assert_eq!(first.values(), vec![0, 1, 2, 3]);
        assert_eq!(second.values(), vec![2, 3]);
    }

    #[test]
    fn concurrent_subscribe_and_dispose() {
        let subject = Subject::<u32>::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let subject = subject.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let subscription = subject.subscribe_next(|_| {});
                        subject.next(1);
                        subscription.dispose().unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(subject.observer_count(), 0);
    }
}
