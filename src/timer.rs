use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::Duration;

use spin::RwLock;

use super::constants::TIMER_MAX_DURATION;
use super::types::{Deferred, Scheduler};

/* A cancellable, reschedulable single-shot action,
 * roughly following the interface of the kernel's struct timer_list.
 *
 * Two locks are used:
 *
 * - "pending" (state lock) guards the pending flag and all (re)scheduling,
 *   it is never held while the callback runs.
 * - "running" (execution lock) is held for the entire duration of a firing,
 *   which allows stop_sync to wait for an in-flight callback.
 */
struct TimerInner<P> {
    pending: RwLock<bool>,
    running: StdMutex<()>,
    owner: Weak<P>,
    expired: fn(&P),
}

pub struct Timer<P> {
    inner: Arc<TimerInner<P>>,
    handle: Box<dyn Deferred>,
}

impl<P> TimerInner<P> {
    fn fire(&self) {
        let _running = self.running.lock().unwrap_or_else(PoisonError::into_inner);

        // a firing which lost the race against stop is stale
        {
            let mut pending = self.pending.write();
            if !*pending {
                return;
            }
            *pending = false;
        }

        if let Some(owner) = self.owner.upgrade() {
            (self.expired)(&owner);
        }
    }
}

impl<P: Send + Sync + 'static> Timer<P> {
    /// Create an inert timer invoking `expired` with the owner on expiration.
    ///
    /// The timer holds no strong reference to the owner:
    /// once the owner is dropped every firing is a noop.
    pub fn new(scheduler: &dyn Scheduler, owner: Weak<P>, expired: fn(&P)) -> Timer<P> {
        let inner = Arc::new(TimerInner {
            pending: RwLock::new(false),
            running: StdMutex::new(()),
            owner,
            expired,
        });

        let handle = {
            let inner = Arc::downgrade(&inner);
            scheduler.schedule_once(
                TIMER_MAX_DURATION,
                Box::new(move || {
                    if let Some(inner) = inner.upgrade() {
                        inner.fire();
                    }
                }),
            )
        };
        handle.cancel();

        Timer { inner, handle }
    }
}

impl<P> Timer<P> {
    /// Arm the timer to expire after `duration`,
    /// postponing (or advancing) any pending expiration.
    pub fn reset(&self, duration: Duration) {
        let mut pending = self.inner.pending.write();
        *pending = true;
        self.handle.reset(duration);
    }

    /// Disarm the timer without waiting for an in-flight callback.
    ///
    /// Safe to call from any callback, including the timer's own.
    pub fn stop(&self) {
        let mut pending = self.inner.pending.write();
        *pending = false;
        self.handle.cancel();
    }

    /// Disarm the timer and wait for an in-flight callback to complete.
    ///
    /// On return no callback is executing and none will,
    /// until the timer is armed again.
    /// Must not be called from the timer's own callback (deadlock).
    pub fn stop_sync(&self) {
        self.stop();
        let _running = self
            .inner
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // a firing may have passed the pending check before the first stop
        self.stop();
    }

    pub fn is_pending(&self) -> bool {
        *self.inner.pending.read()
    }

    // dispatch the expiration as the scheduler would,
    // regardless of whether the timer is armed
    #[cfg(test)]
    pub(crate) fn fire(&self) {
        self.inner.fire()
    }
}

impl<P> fmt::Debug for Timer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timer {{ pending = {} }}", self.is_pending())
    }
}
