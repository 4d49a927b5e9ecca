use crate::time::NanoTime;
use derive_new::new;
use std::fmt::Debug;

/// A value emitted at, or captured at a specific time.  Recorded
/// notifications and the messages of a
/// [ColdObservable](crate::ColdObservable) are `ValueAt`s.
#[derive(Debug, Clone, new, Default, PartialEq, Eq)]
pub struct ValueAt<T> {
    pub value: T,
    pub time: NanoTime,
}

impl<T> ValueAt<T> {
    pub fn at(time: impl Into<NanoTime>, value: T) -> Self {
        Self::new(value, time.into())
    }
}
