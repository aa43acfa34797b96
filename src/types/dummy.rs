use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Callbacks, Deferred, Endpoint, Scheduler};
use crate::peer::PeerInner;

/* This submodule provides pure/dummy implementations of the collaborator interfaces
 * for use in unit tests thoughout the project.
 */

/* Scheduler implementation:
 *
 * Time only moves when the test calls "advance",
 * expired actions are then dispatched on the calling thread in deadline order.
 */

pub struct VirtualTimer {
    clock: Arc<Mutex<Duration>>,
    deadline: Mutex<Option<Duration>>,
    callback: Box<dyn Fn() + Send + Sync>,
    resets: AtomicUsize,
}

struct VirtualHandle(Arc<VirtualTimer>);

pub struct VirtualScheduler {
    clock: Arc<Mutex<Duration>>,
    timers: Mutex<Vec<Arc<VirtualTimer>>>,
}

impl VirtualTimer {
    /// Remaining time until the scheduled dispatch (if any).
    pub fn deadline(&self) -> Option<Duration> {
        let now = *self.clock.lock().unwrap();
        self.deadline.lock().unwrap().map(|d| d - now)
    }

    /// Number of times the action has been (re)scheduled.
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Dispatch the action now, ignoring the schedule
    /// (like a wheel which had already expired the action when it was cancelled).
    pub fn fire(&self) {
        (self.callback)()
    }
}

impl Deferred for VirtualHandle {
    fn reset(&self, duration: Duration) {
        let now = *self.0.clock.lock().unwrap();
        self.0.resets.fetch_add(1, Ordering::SeqCst);
        *self.0.deadline.lock().unwrap() = Some(now + duration);
    }

    fn cancel(&self) {
        *self.0.deadline.lock().unwrap() = None;
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_once(
        &self,
        duration: Duration,
        callback: Box<dyn Fn() + Send + Sync>,
    ) -> Box<dyn Deferred> {
        let timer = Arc::new(VirtualTimer {
            clock: self.clock.clone(),
            deadline: Mutex::new(None),
            callback,
            resets: AtomicUsize::new(0),
        });
        self.timers.lock().unwrap().push(timer.clone());
        let handle = VirtualHandle(timer);
        handle.reset(duration);
        Box::new(handle)
    }
}

impl VirtualScheduler {
    pub fn new() -> Arc<VirtualScheduler> {
        Arc::new(VirtualScheduler {
            clock: Arc::new(Mutex::new(Duration::from_secs(0))),
            timers: Mutex::new(vec![]),
        })
    }

    /// All actions ever scheduled, in creation order.
    pub fn timers(&self) -> Vec<Arc<VirtualTimer>> {
        self.timers.lock().unwrap().clone()
    }

    pub fn now(&self) -> Duration {
        *self.clock.lock().unwrap()
    }

    /// Move the clock forward, dispatching every action which expires on the way.
    pub fn advance(&self, duration: Duration) {
        let target = self.now() + duration;
        loop {
            // find the earliest expired action
            let next = self
                .timers()
                .into_iter()
                .filter_map(|t| {
                    let deadline = (*t.deadline.lock().unwrap())?;
                    if deadline <= target {
                        Some((deadline, t))
                    } else {
                        None
                    }
                })
                .min_by_key(|(deadline, _)| *deadline);

            match next {
                None => break,
                Some((deadline, timer)) => {
                    *self.clock.lock().unwrap() = deadline;
                    *timer.deadline.lock().unwrap() = None;
                    timer.fire();
                }
            }
        }
        *self.clock.lock().unwrap() = target;
    }
}

/* Endpoint implementation */

#[derive(Clone)]
pub struct UnitEndpoint {
    cleared: Arc<AtomicUsize>,
}

impl Endpoint for UnitEndpoint {
    fn from_address(_: SocketAddr) -> UnitEndpoint {
        UnitEndpoint::new()
    }

    fn to_address(&self) -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn clear_src(&mut self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }
}

impl UnitEndpoint {
    pub fn new() -> UnitEndpoint {
        UnitEndpoint {
            cleared: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times the source address has been cleared (shared between clones).
    pub fn cleared(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }
}

/* Callbacks implementation:
 *
 * Records every action requested by the timers.
 */

#[derive(Default)]
pub struct Events {
    pub handshakes: Mutex<Vec<bool>>,
    pub keepalives: AtomicUsize,
    pub flushes: AtomicUsize,
    pub zeroed: AtomicUsize,
}

impl Events {
    /// The is_retry flag of every requested handshake initiation, in order.
    pub fn handshakes(&self) -> Vec<bool> {
        self.handshakes.lock().unwrap().clone()
    }

    pub fn keepalives(&self) -> usize {
        self.keepalives.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn zeroed(&self) -> usize {
        self.zeroed.load(Ordering::SeqCst)
    }
}

pub struct TestCallbacks();

impl Callbacks for TestCallbacks {
    type Opaque = Events;
    type Endpoint = UnitEndpoint;

    fn send_handshake_initiation(peer: &PeerInner<Self>, is_retry: bool) {
        peer.opaque.handshakes.lock().unwrap().push(is_retry);
    }

    fn send_keepalive(peer: &PeerInner<Self>) {
        peer.opaque.keepalives.fetch_add(1, Ordering::SeqCst);
    }

    fn flush_staged_packets(peer: &PeerInner<Self>) {
        peer.opaque.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn zero_keys(peer: &PeerInner<Self>) {
        peer.opaque.zeroed.fetch_add(1, Ordering::SeqCst);
    }
}
