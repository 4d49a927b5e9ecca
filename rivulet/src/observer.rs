use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::types::*;

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type ErrorFn = Box<dyn FnMut(SourceError) + Send>;
type CompletedFn = Box<dyn FnMut() + Send>;

/// An [Observer] assembled from closures.  Callbacks that are not supplied
/// do nothing.
pub struct FnObserver<T> {
    on_next: NextFn<T>,
    on_error: Option<ErrorFn>,
    on_completed: Option<CompletedFn>,
}

impl<T> FnObserver<T> {
    pub fn new(on_next: impl FnMut(T) + Send + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_error: None,
            on_completed: None,
        }
    }

    pub fn with_error(mut self, on_error: impl FnMut(SourceError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn with_completed(mut self, on_completed: impl FnMut() + Send + 'static) -> Self {
        self.on_completed = Some(Box::new(on_completed));
        self
    }
}

impl<T: Send> Observer<T> for FnObserver<T> {
    fn on_next(&mut self, value: T) {
        (self.on_next)(value)
    }

    fn on_error(&mut self, error: SourceError) {
        if let Some(on_error) = self.on_error.as_mut() {
            on_error(error)
        }
    }

    fn on_completed(&mut self) {
        if let Some(on_completed) = self.on_completed.as_mut() {
            on_completed()
        }
    }
}

struct SinkState<T> {
    observer: Option<Box<dyn Observer<T>>>,
    queue: VecDeque<Notification<T>>,
    draining: bool,
    // a terminal notification has been accepted
    terminated: bool,
    // the observer has been released
    closed: bool,
}

struct SinkInner<T> {
    state: Mutex<SinkState<T>>,
    upstream: SerialDisposable,
}

/// The producing end of one subscription.
///
/// Sources push into a sink from any thread.  The sink guarantees the
/// observer sees at most one terminal notification and nothing after it,
/// and that callbacks never overlap: a notification arriving while another
/// is being delivered (from a second thread, or re-entrantly from inside
/// the observer) is queued and delivered by whoever is already draining.
/// Once the terminal notification is delivered, or the subscription is
/// disposed, the observer is dropped and the upstream resources are
/// released.
pub struct Sink<T> {
    inner: Arc<SinkInner<T>>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Element> Sink<T> {
    pub(crate) fn new(observer: Box<dyn Observer<T>>) -> Self {
        let state = SinkState {
            observer: Some(observer),
            queue: VecDeque::new(),
            draining: false,
            terminated: false,
            closed: false,
        };
        let inner = SinkInner {
            state: Mutex::new(state),
            upstream: SerialDisposable::new(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn next(&self, value: T) {
        self.deliver(Notification::Next(value));
    }

    pub fn error(&self, error: impl Into<SourceError>) {
        self.deliver(Notification::Error(error.into()));
    }

    pub fn completed(&self) {
        self.deliver(Notification::Completed);
    }

    /// True once a terminal notification was accepted or the subscription
    /// was disposed.  Producers can use it to stop early.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().terminated
    }

    pub fn deliver(&self, notification: Notification<T>) {
        {
            let mut state = self.inner.state.lock();
            if state.terminated {
                return;
            }
            if notification.is_terminal() {
                state.terminated = true;
            }
            state.queue.push_back(notification);
            if state.draining {
                return;
            }
            state.draining = true;
        }
        self.drain();
    }

    fn drain(&self) {
        loop {
            let (notification, mut observer) = {
                let mut state = self.inner.state.lock();
                let next = match state.queue.pop_front() {
                    Some(notification) => state.observer.take().map(|obs| (notification, obs)),
                    None => None,
                };
                match next {
                    Some(next) => next,
                    None => {
                        state.queue.clear();
                        state.draining = false;
                        return;
                    }
                }
            };
            let terminal = notification.is_terminal();
            let _unwind = scopeguard::guard_on_unwind((), |()| self.abandon());
            notification.accept(&mut *observer);
            let mut state = self.inner.state.lock();
            if terminal || state.closed {
                state.closed = true;
                state.queue.clear();
                state.draining = false;
                drop(state);
                drop(observer);
                if terminal {
                    self.inner
                        .upstream
                        .disposable()
                        .dispose_logged("releasing completed subscription");
                }
                return;
            }
            state.observer = Some(observer);
        }
    }

    /// Closes the sink when its observer panics.  The observer is lost with
    /// the unwinding stack, so nothing more can be delivered.
    fn abandon(&self) {
        warn!("observer panicked, closing subscription");
        {
            let mut state = self.inner.state.lock();
            state.terminated = true;
            state.closed = true;
            state.draining = false;
            state.queue.clear();
        }
        self.inner
            .upstream
            .disposable()
            .dispose_logged("releasing subscription after observer panic");
    }

    /// Hands the sink the resources the source allocated for this
    /// subscription.  Released at once if the subscription already ended.
    pub(crate) fn attach(&self, upstream: Disposable) {
        self.inner.upstream.set(upstream);
        if self.inner.state.lock().closed {
            self.inner
                .upstream
                .disposable()
                .dispose_logged("releasing completed subscription");
        }
    }

    /// The caller's handle on this subscription.
    pub(crate) fn subscription(&self) -> Disposable {
        let sink = self.clone();
        Disposable::try_new(move || sink.close())
    }

    fn close(&self) -> anyhow::Result<()> {
        let observer = {
            let mut state = self.inner.state.lock();
            state.terminated = true;
            state.closed = true;
            state.queue.clear();
            state.observer.take()
        };
        drop(observer);
        self.inner.upstream.dispose()?;
        Ok(())
    }
}

impl<T: Element> Observer<T> for Sink<T> {
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
