use crossbeam::channel::{Receiver, Sender, select};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{ScheduledAction, Scheduler};
use crate::queue::TimeQueue;
use crate::types::*;

/// Source of the current time for a [RealTimeScheduler].
pub trait Clock: Send + Sync {
    fn now(&self) -> NanoTime;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NanoTime {
        NanoTime::now()
    }
}

pub type Job = Box<dyn FnOnce() + Send>;

/// Where a [RealTimeScheduler] runs the actions that have come due.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs jobs directly on the scheduler's timer thread.  Long running
/// actions delay everything queued behind them.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job()
    }
}

/// Spawns jobs onto a tokio runtime.
#[cfg(feature = "async")]
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "async")]
impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// The runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

#[cfg(feature = "async")]
impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

type ActionId = u64;

struct Pending {
    cancelled: AtomicBool,
    // a dispatched run has not finished yet
    in_flight: AtomicBool,
    period: Option<NanoTime>,
    action: Mutex<Option<ScheduledAction>>,
}

impl Pending {
    /// Claims the action for one dispatch.  False while an earlier run is
    /// still executing, in which case the occurrence is skipped.
    fn claim(&self) -> bool {
        !self.in_flight.swap(true, Ordering::AcqRel)
    }

    fn run(&self) {
        let _release = scopeguard::guard((), |()| self.in_flight.store(false, Ordering::Release));
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        // uncontended, only the claimed run or a cancel touches the slot
        let mut slot = self.action.lock();
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }
        match slot.take() {
            Some(ScheduledAction::OneShot(action)) => {
                drop(slot);
                action();
            }
            Some(ScheduledAction::Recurring { period, mut action }) => {
                action();
                *slot = Some(ScheduledAction::Recurring { period, action });
            }
            None => {}
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        // a running action still holds the lock, the timer thread drops it later
        if let Some(mut slot) = self.action.try_lock() {
            slot.take();
        }
    }
}

enum Command {
    Schedule {
        id: ActionId,
        due: NanoTime,
        pending: Arc<Pending>,
    },
    Cancel(ActionId),
    Shutdown,
}

struct TimerLoop {
    clock: Arc<dyn Clock>,
    executor: Arc<dyn Executor>,
    receiver: Receiver<Command>,
    queue: TimeQueue<ActionId>,
    pending: HashMap<ActionId, Arc<Pending>>,
}

impl TimerLoop {
    fn run(mut self) {
        debug!("timer thread started");
        loop {
            self.fire_due();
            let command = match self.queue.next_time() {
                Some(due) => {
                    let wait = Duration::from(due.saturating_sub(self.clock.now()));
                    select! {
                        recv(self.receiver) -> msg => Some(msg),
                        default(wait) => None,
                    }
                }
                None => Some(self.receiver.recv()),
            };
            let Some(command) = command else {
                continue;
            };
            match command {
                Ok(Command::Schedule { id, due, pending }) => {
                    self.queue.push(id, due);
                    self.pending.insert(id, pending);
                }
                Ok(Command::Cancel(id)) => {
                    self.queue.remove(&id);
                    self.pending.remove(&id);
                }
                Ok(Command::Shutdown) | Err(_) => break,
            }
        }
        debug!("timer thread stopped with {} action(s) pending", self.pending.len());
    }

    fn fire_due(&mut self) {
        let now = self.clock.now();
        while let Some((id, due)) = self.queue.pop_due(now) {
            let Some(pending) = self.pending.get(&id).cloned() else {
                continue;
            };
            if pending.cancelled.load(Ordering::Acquire) {
                self.pending.remove(&id);
                continue;
            }
            match pending.period {
                Some(period) => self.queue.push(id, due.saturating_add(period)),
                None => {
                    self.pending.remove(&id);
                }
            }
            if !pending.claim() {
                trace!("skipping #{id} due at {due}, previous run still in flight");
                continue;
            }
            trace!("dispatching #{id} due at {due}, late by {}", now.saturating_sub(due));
            self.executor.execute(Box::new(move || pending.run()));
        }
    }
}

struct RealTimeInner {
    clock: Arc<dyn Clock>,
    sender: Sender<Command>,
    next_id: AtomicU64,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for RealTimeInner {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(handle) = self.thread.lock().take() {
            // the last handle may be released by an action on the timer thread
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("timer thread panicked");
            }
        }
    }
}

/// A scheduler that follows a real clock.
///
/// A dedicated `rivulet-timer` thread waits for actions to come due and
/// hands them to the [Executor].  Cancelling an action before it is
/// dispatched means it never runs.  Clones share the timer thread, which
/// stops when the last clone is dropped.
#[derive(Clone)]
pub struct RealTimeScheduler {
    inner: Arc<RealTimeInner>,
}

impl RealTimeScheduler {
    /// Uses the [SystemClock] and runs actions on the timer thread.
    pub fn new() -> Self {
        Self::new_with(Arc::new(SystemClock), Arc::new(InlineExecutor))
    }

    pub fn new_with(clock: Arc<dyn Clock>, executor: Arc<dyn Executor>) -> Self {
        let (sender, receiver) = crossbeam::channel::unbounded();
        let timer = TimerLoop {
            clock: clock.clone(),
            executor,
            receiver,
            queue: TimeQueue::new(),
            pending: HashMap::new(),
        };
        let thread = thread::Builder::new()
            .name("rivulet-timer".to_string())
            .spawn(move || timer.run());
        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!("failed to start timer thread, scheduled actions will not run: {err}");
                None
            }
        };
        let inner = RealTimeInner {
            clock,
            sender,
            next_id: AtomicU64::new(0),
            thread: Mutex::new(thread),
        };
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl Default for RealTimeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for RealTimeScheduler {
    fn now(&self) -> NanoTime {
        self.inner.clock.now()
    }

    fn schedule_action(&self, delay: Duration, action: ScheduledAction) -> Disposable {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let due = self.inner.clock.now().saturating_add(delay);
        let pending = Arc::new(Pending {
            cancelled: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            period: action.period(),
            action: Mutex::new(Some(action)),
        });
        let command = Command::Schedule {
            id,
            due,
            pending: pending.clone(),
        };
        if self.inner.sender.send(command).is_err() {
            warn!("timer thread has stopped, dropping action #{id}");
            return Disposable::empty();
        }
        let sender = self.inner.sender.clone();
        Disposable::new(move || {
            pending.cancel();
            // fails only once the timer thread is gone, nothing left to cancel
            let _ = sender.send(Command::Cancel(id));
        })
    }
}
