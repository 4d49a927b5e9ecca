use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{ScheduledAction, Scheduler};
use crate::error::{Error, Result};
use crate::queue::TimeQueue;
use crate::types::*;

type ActionId = u64;

struct VirtualState {
    now: NanoTime,
    queue: TimeQueue<ActionId>,
    // None while the action is running
    actions: HashMap<ActionId, Option<ScheduledAction>>,
    next_id: ActionId,
    running: bool,
}

/// A scheduler driven by a logical clock.
///
/// Nothing runs until the clock is moved with [advance_to](Self::advance_to),
/// [advance_by](Self::advance_by) or [start](Self::start); all due actions
/// then run on the calling thread in (due time, schedule order).  For a
/// fixed sequence of schedule and advance calls the outcome is always the
/// same, which makes time dependent behaviour testable without waiting.
///
/// Clones share the same clock and queue.
#[derive(Clone)]
pub struct VirtualTimeScheduler {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualTimeScheduler {
    pub fn new() -> Self {
        Self::new_at(NanoTime::ZERO)
    }

    /// A scheduler whose clock starts at `start`.
    pub fn new_at(start: impl Into<NanoTime>) -> Self {
        let state = VirtualState {
            now: start.into(),
            queue: TimeQueue::new(),
            actions: HashMap::new(),
            next_id: 0,
            running: false,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn now(&self) -> NanoTime {
        self.state.lock().now
    }

    /// Number of actions waiting to fire.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Runs, in order, every action due at or before `time`, then sets the
    /// clock to `time`.  While an action runs the clock reads its due time.
    /// Recurring actions are re-queued at `due + period` and keep firing
    /// for as long as that is still at or before `time`.
    #[cfg_attr(feature = "instrument-advance", tracing::instrument(skip_all))]
    pub fn advance_to(&self, time: impl Into<NanoTime>) -> Result<()> {
        let time = time.into();
        let from = {
            let mut state = self.state.lock();
            if state.running {
                return Err(Error::AlreadyRunning);
            }
            if time < state.now {
                return Err(Error::invalid_argument(format!(
                    "cannot advance virtual time backwards from {} to {}",
                    state.now, time
                )));
            }
            state.running = true;
            state.now
        };
        let _running = scopeguard::guard(self.state.clone(), |state| {
            state.lock().running = false;
        });
        let mut fired = 0;
        while let Some((id, due, action)) = self.take_due(time) {
            trace!("firing {action:?} #{id} due at {due}");
            self.fire(id, due, action);
            fired += 1;
        }
        self.state.lock().now = time;
        debug!("advanced {from} -> {time}, fired {fired} action(s)");
        Ok(())
    }

    /// Same as `advance_to(now + delta)`.
    pub fn advance_by(&self, delta: Duration) -> Result<()> {
        let target = self.now().saturating_add(delta);
        self.advance_to(target)
    }

    /// Advances to the latest due time queued at the moment of the call.
    /// Actions scheduled while draining that fall beyond it stay queued.
    pub fn start(&self) -> Result<()> {
        let target = {
            let state = self.state.lock();
            state.queue.last_time().map(|last| last.max(state.now))
        };
        match target {
            Some(target) => self.advance_to(target),
            None => Ok(()),
        }
    }

    fn take_due(&self, time: NanoTime) -> Option<(ActionId, NanoTime, ScheduledAction)> {
        let mut state = self.state.lock();
        loop {
            let (id, due) = state.queue.peek().map(|(id, due)| (*id, due))?;
            if due > time {
                return None;
            }
            state.queue.pop();
            if let Some(action) = state.actions.get_mut(&id).and_then(Option::take) {
                state.now = state.now.max(due);
                return Some((id, due, action));
            }
        }
    }

    fn fire(&self, id: ActionId, due: NanoTime, action: ScheduledAction) {
        let period = action.period();
        match action {
            ScheduledAction::OneShot(action) => {
                action();
                self.state.lock().actions.remove(&id);
            }
            ScheduledAction::Recurring {
                action: mut recurring,
                ..
            } => {
                recurring();
                let mut state = self.state.lock();
                let next = due.saturating_add(period.unwrap_or(NanoTime::new(1)));
                // a slot that is gone was cancelled while running
                match state.actions.get_mut(&id) {
                    Some(slot) if next > due => {
                        *slot = Some(ScheduledAction::Recurring {
                            period: period.unwrap_or_default(),
                            action: recurring,
                        });
                        state.queue.push(id, next);
                    }
                    Some(_) => {
                        state.actions.remove(&id);
                    }
                    None => {}
                }
            }
        }
    }

    fn cancel(state: &Mutex<VirtualState>, id: ActionId) {
        let removed = {
            let mut state = state.lock();
            state.queue.remove(&id);
            state.actions.remove(&id)
        };
        if removed.is_some() {
            trace!("cancelled #{id}");
        }
        // dropped outside the lock, it may own sinks and disposables
        drop(removed);
    }
}

impl Default for VirtualTimeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualTimeScheduler {
    fn now(&self) -> NanoTime {
        VirtualTimeScheduler::now(self)
    }

    fn schedule_action(&self, delay: Duration, action: ScheduledAction) -> Disposable {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            let due = state.now.saturating_add(delay);
            trace!("scheduling {action:?} #{id} at {due}");
            state.queue.push(id, due);
            state.actions.insert(id, Some(action));
            id
        };
        let state = Arc::downgrade(&self.state);
        Disposable::new(move || {
            if let Some(state) = state.upgrade() {
                Self::cancel(&state, id);
            }
        })
    }
}
