mod time_queue;
mod value_at;

pub(crate) use time_queue::TimeQueue;
pub use value_at::ValueAt;
