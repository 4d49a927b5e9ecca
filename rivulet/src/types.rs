use std::fmt::Debug;
use std::sync::Arc;

pub use crate::disposable::*;
pub use crate::notification::*;
pub use crate::time::*;

use crate::observer::{FnObserver, Sink};

/// [Observable]s emit values constrained by this trait.  Values may be
/// delivered from a scheduler thread and shared between subscriptions, so
/// they must be [Send] and [Sync].  For large payloads wrap them in an
/// [Arc] so they can be cloned cheaply.
#[doc(hidden)]
pub trait Element: Debug + Clone + Send + Sync + 'static {}

impl<T> Element for T where T: Debug + Clone + Send + Sync + 'static {}

/// Implement this trait to receive the notifications of a subscription.
///
/// Calls for one subscription never overlap and nothing follows the first
/// `on_error` or `on_completed`, so implementations need no locking of
/// their own.
pub trait Observer<T>: Send {
    fn on_next(&mut self, value: T);
    fn on_error(&mut self, error: SourceError);
    fn on_completed(&mut self);
}

impl<T, O: Observer<T> + ?Sized> Observer<T> for Box<O> {
    fn on_next(&mut self, value: T) {
        (**self).on_next(value)
    }
    fn on_error(&mut self, error: SourceError) {
        (**self).on_error(error)
    }
    fn on_completed(&mut self) {
        (**self).on_completed()
    }
}

/// A description of how to produce a stream of values.
///
/// Implementors push notifications into the supplied [Sink] and return a
/// [Disposable] that releases whatever the subscription holds (scheduled
/// actions, observer-set membership).  Unless the implementation is
/// explicitly hot, every call must start an independent execution.
pub trait Observable<T: Element>: Send + Sync {
    fn subscribe_sink(&self, sink: Sink<T>) -> Disposable;

    fn type_name(&self) -> String {
        tynm::type_name::<Self>()
    }
}

impl<T: Element, O: Observable<T> + ?Sized> Observable<T> for Arc<O> {
    fn subscribe_sink(&self, sink: Sink<T>) -> Disposable {
        (**self).subscribe_sink(sink)
    }
    fn type_name(&self) -> String {
        (**self).type_name()
    }
}

/// Used to consume a concrete [Observable] and return an
/// `Arc<dyn Observable>`.
pub trait IntoObservable<T: Element> {
    fn into_observable(self) -> Arc<dyn Observable<T>>;
}

impl<T: Element, O: Observable<T> + 'static> IntoObservable<T> for O {
    fn into_observable(self) -> Arc<dyn Observable<T>> {
        Arc::new(self)
    }
}

/// Subscription helpers available on every [Observable].
pub trait ObservableOperators<T: Element> {
    /// Subscribes an observer object.  The returned [Disposable] stops
    /// delivery and releases the subscription's resources.
    fn subscribe(&self, observer: impl Observer<T> + 'static) -> Disposable;
    /// Subscribes a closure for values, ignoring errors and completion.
    fn subscribe_next(&self, on_next: impl FnMut(T) + Send + 'static) -> Disposable;
    /// Subscribes one closure per notification kind.
    fn subscribe_all(
        &self,
        on_next: impl FnMut(T) + Send + 'static,
        on_error: impl FnMut(SourceError) + Send + 'static,
        on_completed: impl FnMut() + Send + 'static,
    ) -> Disposable;
}

impl<T: Element, O: Observable<T> + ?Sized> ObservableOperators<T> for O {
    fn subscribe(&self, observer: impl Observer<T> + 'static) -> Disposable {
        let sink = Sink::new(Box::new(observer));
        let upstream = self.subscribe_sink(sink.clone());
        sink.attach(upstream);
        sink.subscription()
    }

    fn subscribe_next(&self, on_next: impl FnMut(T) + Send + 'static) -> Disposable {
        self.subscribe(FnObserver::new(on_next))
    }

    fn subscribe_all(
        &self,
        on_next: impl FnMut(T) + Send + 'static,
        on_error: impl FnMut(SourceError) + Send + 'static,
        on_completed: impl FnMut() + Send + 'static,
    ) -> Disposable {
        self.subscribe(
            FnObserver::new(on_next)
                .with_error(on_error)
                .with_completed(on_completed),
        )
    }
}
