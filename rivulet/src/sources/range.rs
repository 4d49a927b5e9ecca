use derive_new::new;

use super::schedule_each;
use crate::observer::Sink;
use crate::scheduler::Delivery;
use crate::types::*;

/// Counts up from `start`.  Arguments are validated by [super::range].
#[derive(new)]
pub(crate) struct RangeObservable {
    start: i64,
    count: i64,
    delivery: Delivery,
}

impl Observable<i64> for RangeObservable {
    fn subscribe_sink(&self, sink: Sink<i64>) -> Disposable {
        let start = self.start;
        let values = (0..self.count).map(move |offset| start + offset);
        match &self.delivery {
            Delivery::Immediate => {
                for value in values {
                    if sink.is_closed() {
                        return Disposable::empty();
                    }
                    sink.next(value);
                }
                sink.completed();
                Disposable::empty()
            }
            Delivery::On(scheduler) => schedule_each(scheduler, sink, values),
        }
    }
}
