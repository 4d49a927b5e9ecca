use derive_new::new;
use std::sync::Arc;

use crate::observer::Sink;
use crate::types::*;

type Setup<T> = Box<dyn Fn(Sink<T>) -> anyhow::Result<Disposable> + Send + Sync>;
type Factory<T> = Box<dyn Fn() -> anyhow::Result<Arc<dyn Observable<T>>> + Send + Sync>;

#[derive(new)]
pub(crate) struct CreateObservable<T: Element> {
    setup: Setup<T>,
}

impl<T: Element> Observable<T> for CreateObservable<T> {
    fn subscribe_sink(&self, sink: Sink<T>) -> Disposable {
        match (self.setup)(sink.clone()) {
            Ok(teardown) => teardown,
            Err(err) => {
                debug!("create setup failed: {err:#}");
                sink.error(err);
                Disposable::empty()
            }
        }
    }
}

#[derive(new)]
pub(crate) struct DeferObservable<T: Element> {
    factory: Factory<T>,
}

impl<T: Element> Observable<T> for DeferObservable<T> {
    fn subscribe_sink(&self, sink: Sink<T>) -> Disposable {
        match (self.factory)() {
            Ok(source) => {
                trace!("deferred to {}", source.type_name());
                source.subscribe_sink(sink)
            }
            Err(err) => {
                sink.error(err);
                Disposable::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::observer::Sink;
    use crate::scheduler::*;
    use crate::sources::*;
    use crate::testing::Recorder;
    use crate::types::*;

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (count.clone(), count)
    }

    #[test]
    fn teardown_runs_once_when_source_completes() {
        let (teardowns, t) = counter();
        let source = create(move |sink: Sink<i32>| {
            sink.next(1);
            sink.next(2);
            sink.completed();
            let t = t.clone();
            Ok(Disposable::new(move || {
                t.fetch_add(1, Ordering::SeqCst);
            }))
        });
        let recorder = Recorder::new();
        let subscription = source.subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![1, 2]);
        assert!(recorder.is_completed());
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
        subscription.dispose().unwrap();
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn teardown_runs_once_when_disposed() {
        let (teardowns, t) = counter();
        let held = Arc::new(Mutex::new(None));
        let h = held.clone();
        let source = create(move |sink: Sink<i32>| {
            *h.lock() = Some(sink);
            let t = t.clone();
            Ok(Disposable::new(move || {
                t.fetch_add(1, Ordering::SeqCst);
            }))
        });
        let recorder = Recorder::new();
        let subscription = source.subscribe(recorder.clone());
        let sink = held.lock().clone().unwrap();
        sink.next(10);
        subscription.dispose().unwrap();
        subscription.dispose().unwrap();
        sink.next(11);
        sink.completed();
        assert_eq!(recorder.values(), vec![10]);
        assert!(!recorder.is_completed());
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn setup_runs_for_each_subscriber() {
        let (calls, c) = counter();
        let (teardowns, t) = counter();
        let source = create(move |sink: Sink<i32>| {
            c.fetch_add(1, Ordering::SeqCst);
            sink.next(1);
            sink.next(2);
            let t = t.clone();
            Ok(Disposable::new(move || {
                t.fetch_add(1, Ordering::SeqCst);
                sink.completed();
            }))
        });
        let a = Recorder::new();
        let b = Recorder::new();
        let first = source.subscribe(a.clone());
        let second = source.subscribe(b.clone());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.values(), vec![1, 2]);
        assert_eq!(b.values(), vec![1, 2]);
        first.dispose().unwrap();
        second.dispose().unwrap();
        assert_eq!(teardowns.load(Ordering::SeqCst), 2);
        // the subscription is already closed when its teardown completes it
        assert!(!a.is_completed());
        assert!(!b.is_completed());
    }

    #[test]
    fn setup_failure_is_delivered_as_error() {
        let source = create(|sink: Sink<i32>| {
            sink.next(1);
            Err(anyhow!("connection refused"))
        });
        let recorder = Recorder::new();
        let subscription = source.subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![1]);
        assert_eq!(
            recorder.error().map(|e| e.to_string()),
            Some("connection refused".to_string())
        );
        subscription.dispose().unwrap();
        assert!(subscription.is_disposed());
    }

    #[test]
    fn teardown_failure_surfaces_from_dispose() {
        let source = create(|_sink: Sink<i32>| {
            Ok(Disposable::try_new(|| Err(anyhow!("already closed"))))
        });
        let subscription = source.subscribe(Recorder::new());
        let err = subscription.dispose().unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert!(err.to_string().contains("already closed"));
    }

    #[test]
    fn defer_calls_factory_per_subscription() {
        let (calls, c) = counter();
        let source = defer(move || {
            let n = c.fetch_add(1, Ordering::SeqCst) as i64;
            range(n * 10, 2, Delivery::Immediate).unwrap()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let first = Recorder::new();
        let second = Recorder::new();
        source.subscribe(first.clone());
        source.subscribe(second.clone());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.values(), vec![0, 1]);
        assert_eq!(second.values(), vec![10, 11]);
    }

    #[test]
    fn try_defer_failure_only_hits_that_subscription() {
        let (calls, c) = counter();
        let source = try_defer(move || {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow!("not ready"))
            } else {
                Ok(range(1, 1, Delivery::Immediate)?)
            }
        });
        let first = Recorder::<i64>::new();
        let second = Recorder::new();
        source.subscribe(first.clone());
        source.subscribe(second.clone());
        assert!(first.error().is_some());
        assert!(second.error().is_none());
        assert_eq!(second.values(), vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
