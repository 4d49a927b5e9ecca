//! Handles for releasing the resources of a subscription or scheduled action.
//!
//! A [Disposable] flips from active to disposed exactly once; the release
//! logic runs on that transition and never again.  [CompositeDisposable]
//! and [SerialDisposable] group other disposables and release all of them,
//! collecting failures into a [DisposalError] rather than stopping at the
//! first one.

use anyhow::anyhow;
use parking_lot::Mutex;
use scopeguard::ScopeGuard;
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::DisposalError;

type Teardown = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

enum Resource {
    Empty,
    Action(Teardown),
    Composite(Vec<Disposable>),
    Serial(Option<Disposable>),
}

impl Resource {
    fn release(self) -> Result<(), DisposalError> {
        let mut errors = DisposalError::default();
        match self {
            Resource::Empty => {}
            Resource::Action(teardown) => {
                if let Err(err) = run_teardown(teardown) {
                    errors.push(err);
                }
            }
            Resource::Composite(children) => {
                for child in children {
                    errors.merge(child.dispose());
                }
            }
            Resource::Serial(current) => {
                if let Some(child) = current {
                    errors.merge(child.dispose());
                }
            }
        }
        errors.into_result()
    }
}

fn run_teardown(teardown: Teardown) -> anyhow::Result<()> {
    match catch_unwind(AssertUnwindSafe(teardown)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("teardown panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

struct Inner {
    disposed: AtomicBool,
    resource: Mutex<Resource>,
}

/// A shareable handle to an active resource.  Clones refer to the same
/// resource; disposing any clone disposes all of them.  Dropping a handle
/// does not dispose it, use [Disposable::scoped] for that.
#[derive(Clone)]
pub struct Disposable {
    inner: Arc<Inner>,
}

impl Disposable {
    fn from_resource(resource: Resource) -> Self {
        let inner = Inner {
            disposed: AtomicBool::new(false),
            resource: Mutex::new(resource),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// A disposable with nothing to release.
    pub fn empty() -> Self {
        Self::from_resource(Resource::Empty)
    }

    /// Runs `teardown` on first disposal.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self::try_new(move || {
            teardown();
            Ok(())
        })
    }

    /// Like [Disposable::new] for teardown logic that can fail.  The failure
    /// is reported by [Disposable::dispose].
    pub fn try_new(teardown: impl FnOnce() -> anyhow::Result<()> + Send + 'static) -> Self {
        Self::from_resource(Resource::Action(Box::new(teardown)))
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Releases the resource.  Only the first call does anything; later
    /// calls return `Ok(())`.
    pub fn dispose(&self) -> Result<(), DisposalError> {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let resource = std::mem::replace(&mut *self.inner.resource.lock(), Resource::Empty);
        resource.release()
    }

    /// Wraps the handle so that it is disposed on every exit path of the
    /// enclosing scope.
    pub fn scoped(self) -> ScopedDisposable {
        scopeguard::guard(self, release_on_exit as fn(Disposable))
    }

    pub(crate) fn dispose_logged(&self, context: &str) {
        if let Err(err) = self.dispose() {
            warn!("{context}: {err}");
        }
    }

    pub(crate) fn same(&self, other: &Disposable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Disposable {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A [Disposable] that is released when it goes out of scope.  Derefs to
/// the wrapped handle.
pub type ScopedDisposable = ScopeGuard<Disposable, fn(Disposable)>;

fn release_on_exit(disposable: Disposable) {
    disposable.dispose_logged("scoped dispose failed");
}

/// A group of disposables released together.
#[derive(Clone, Debug)]
pub struct CompositeDisposable {
    disposable: Disposable,
}

impl CompositeDisposable {
    pub fn new() -> Self {
        Self {
            disposable: Disposable::from_resource(Resource::Composite(Vec::new())),
        }
    }

    /// Adds a child.  If the group was already released the child is
    /// disposed straight away.
    pub fn add(&self, child: Disposable) {
        let rejected = {
            let mut resource = self.disposable.inner.resource.lock();
            match &mut *resource {
                Resource::Composite(children) => {
                    children.push(child);
                    None
                }
                _ => Some(child),
            }
        };
        if let Some(child) = rejected {
            child.dispose_logged("disposing child of released composite");
        }
    }

    pub fn len(&self) -> usize {
        match &*self.disposable.inner.resource.lock() {
            Resource::Composite(children) => children.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }

    /// Disposes every child, even when some of them fail.
    pub fn dispose(&self) -> Result<(), DisposalError> {
        self.disposable.dispose()
    }

    pub fn disposable(&self) -> Disposable {
        self.disposable.clone()
    }
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Disposable> for CompositeDisposable {
    fn from_iter<I: IntoIterator<Item = Disposable>>(iter: I) -> Self {
        let children = iter.into_iter().collect();
        Self {
            disposable: Disposable::from_resource(Resource::Composite(children)),
        }
    }
}

impl From<CompositeDisposable> for Disposable {
    fn from(composite: CompositeDisposable) -> Self {
        composite.disposable
    }
}

/// Holds at most one child.  Setting a new child disposes the previous one.
#[derive(Clone, Debug)]
pub struct SerialDisposable {
    disposable: Disposable,
}

impl SerialDisposable {
    pub fn new() -> Self {
        Self {
            disposable: Disposable::from_resource(Resource::Serial(None)),
        }
    }

    pub fn set(&self, child: Disposable) {
        let released = {
            let mut resource = self.disposable.inner.resource.lock();
            match &mut *resource {
                Resource::Serial(current) => {
                    if current.as_ref().is_some_and(|c| c.same(&child)) {
                        None
                    } else {
                        current.replace(child)
                    }
                }
                _ => Some(child),
            }
        };
        if let Some(released) = released {
            released.dispose_logged("disposing replaced serial child");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }

    pub fn dispose(&self) -> Result<(), DisposalError> {
        self.disposable.dispose()
    }

    pub fn disposable(&self) -> Disposable {
        self.disposable.clone()
    }
}

impl Default for SerialDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl From<SerialDisposable> for Disposable {
    fn from(serial: SerialDisposable) -> Self {
        serial.disposable
    }
}
