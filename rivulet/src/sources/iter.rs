use derive_new::new;

use super::schedule_each;
use crate::observer::Sink;
use crate::scheduler::Delivery;
use crate::types::*;

/// Walks a clone of `items` per subscription.
#[derive(new)]
pub(crate) struct IterObservable<I> {
    items: I,
    delivery: Delivery,
}

impl<T, I> Observable<T> for IterObservable<I>
where
    T: Element,
    I: Iterator<Item = T> + Clone + Send + Sync + 'static,
{
    fn subscribe_sink(&self, sink: Sink<T>) -> Disposable {
        let items = self.items.clone();
        match &self.delivery {
            Delivery::Immediate => {
                for item in items {
                    if sink.is_closed() {
                        return Disposable::empty();
                    }
                    sink.next(item);
                }
                sink.completed();
                Disposable::empty()
            }
            Delivery::On(scheduler) => schedule_each(scheduler, sink, items),
        }
    }
}
