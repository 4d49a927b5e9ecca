use std::fmt;
use thiserror::Error;

/// Errors surfaced synchronously to the caller.  Failures produced by a
/// source travel through `on_error` as a
/// [SourceError](crate::SourceError) instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {what}")]
    InvalidArgument { what: String },
    #[error("virtual time scheduler is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Disposal(#[from] DisposalError),
}

impl Error {
    pub(crate) fn invalid_argument(what: impl Into<String>) -> Self {
        Error::InvalidArgument { what: what.into() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every teardown failure seen while releasing one [Disposable](crate::Disposable).
/// A failing teardown never stops its siblings from running.
#[derive(Debug, Default)]
pub struct DisposalError {
    pub failures: Vec<anyhow::Error>,
}

impl DisposalError {
    pub(crate) fn push(&mut self, err: anyhow::Error) {
        // keep one flat list when composites nest
        match err.downcast::<DisposalError>() {
            Ok(nested) => self.failures.extend(nested.failures),
            Err(err) => self.failures.push(err),
        }
    }

    pub(crate) fn merge(&mut self, result: std::result::Result<(), DisposalError>) {
        if let Err(nested) = result {
            self.failures.extend(nested.failures);
        }
    }

    pub(crate) fn into_result(self) -> std::result::Result<(), DisposalError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for DisposalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} teardown(s) failed during dispose", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DisposalError {}
