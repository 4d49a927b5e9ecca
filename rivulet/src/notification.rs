use std::fmt;
use std::sync::Arc;

use crate::types::Observer;

/// An error produced by a source and delivered through `on_error`.  Cheap to
/// clone so one failure can be broadcast to many observers.
#[derive(Clone, Debug)]
pub struct SourceError(Arc<anyhow::Error>);

impl SourceError {
    pub fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }

    pub fn msg(msg: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::new(anyhow::Error::msg(msg))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SourceError {}

impl From<anyhow::Error> for SourceError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err)
    }
}

// Equal when they are the same error or say the same thing.
impl PartialEq for SourceError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.to_string() == other.to_string()
    }
}

impl Eq for SourceError {}

/// One event of a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification<T> {
    Next(T),
    Error(SourceError),
    Completed,
}

impl<T> Notification<T> {
    /// Error and Completed end a subscription.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Notification::Next(value) => Some(value),
            _ => None,
        }
    }

    /// Hands the notification to the matching observer callback.
    pub fn accept(self, observer: &mut dyn Observer<T>) {
        match self {
            Notification::Next(value) => observer.on_next(value),
            Notification::Error(err) => observer.on_error(err),
            Notification::Completed => observer.on_completed(),
        }
    }

    pub fn map<OUT>(self, func: impl FnOnce(T) -> OUT) -> Notification<OUT> {
        match self {
            Notification::Next(value) => Notification::Next(func(value)),
            Notification::Error(err) => Notification::Error(err),
            Notification::Completed => Notification::Completed,
        }
    }
}
