use super::device::DeviceInner;
use super::timers::Timers;
use super::types::{Callbacks, Endpoint, Scheduler};

use std::fmt;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use rand::rngs::OsRng;
use rand::Rng;

use spin::{Mutex, RwLock, RwLockReadGuard};
use x25519_dalek::PublicKey;

pub struct Peer<C: Callbacks> {
    inner: Arc<PeerInner<C>>,
}

// runtime state, every access takes the lock for the duration of the access only
struct PeerRuntime<C: Callbacks> {
    device: Weak<DeviceInner<C>>,
    endpoint: Option<C::Endpoint>,
    keepalive_interval: u64,
}

pub struct PeerInner<C: Callbacks> {
    // internal id (for logging)
    pub id: u64,

    pub pk: PublicKey,

    // state owned by the protocol layer
    pub opaque: C::Opaque,

    // held (read) across the "timers active" check and the subsequent (re)arming of a timer
    running: RwLock<bool>,

    state: RwLock<PeerRuntime<C>>,

    pub walltime_last_handshake: Mutex<Option<SystemTime>>,

    // timer model
    pub timers: Timers<C>,
}

impl<C: Callbacks> Clone for Peer<C> {
    fn clone(&self) -> Peer<C> {
        Peer {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Callbacks> Deref for Peer<C> {
    type Target = PeerInner<C>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<C: Callbacks> fmt::Display for PeerInner<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer(id = {})", self.id)
    }
}

impl<C: Callbacks> fmt::Display for Peer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl<C: Callbacks> Peer<C> {
    pub(crate) fn new(
        pk: PublicKey,
        opaque: C::Opaque,
        device: Weak<DeviceInner<C>>,
        scheduler: &dyn Scheduler,
    ) -> Peer<C> {
        let inner = Arc::new_cyclic(|peer| PeerInner {
            id: OsRng.gen(),
            pk,
            opaque,
            running: RwLock::new(false),
            state: RwLock::new(PeerRuntime {
                device,
                endpoint: None,
                keepalive_interval: 0,
            }),
            walltime_last_handshake: Mutex::new(None),
            timers: Timers::new(scheduler, peer.clone()),
        });
        Peer { inner }
    }
}

impl<C: Callbacks> PeerInner<C> {
    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Returns a guard over the running flag if the peer is running.
    ///
    /// While the guard is held the peer cannot be stopped.
    pub(crate) fn running(&self) -> Option<RwLockReadGuard<'_, bool>> {
        let running = self.running.read();
        if *running {
            Some(running)
        } else {
            None
        }
    }

    pub(crate) fn device(&self) -> Option<Arc<DeviceInner<C>>> {
        self.state.read().device.upgrade()
    }

    pub fn set_endpoint(&self, endpoint: C::Endpoint) {
        self.state.write().endpoint = Some(endpoint);
    }

    pub fn get_endpoint(&self) -> Option<SocketAddr> {
        self.state.read().endpoint.as_ref().map(|e| e.to_address())
    }

    /// Clear the source address of the cached endpoint (if any).
    pub fn clear_src(&self) {
        if let Some(endpoint) = self.state.write().endpoint.as_mut() {
            endpoint.clear_src();
        }
    }

    pub fn get_keepalive_interval(&self) -> u64 {
        self.state.read().keepalive_interval
    }

    pub(crate) fn store_keepalive_interval(&self, secs: u64) {
        self.state.write().keepalive_interval = secs;
    }

    /// Start the peer: enables the timers and resets the timer state.
    pub fn start(&self) {
        {
            let mut running = self.running.write();
            if *running {
                return;
            }
            *running = true;
        }

        log::debug!("{} : started", self);
        self.start_timers();
    }

    /// Stop the peer: disables the timers and waits for any expiration in progress,
    /// then erases all key material and drops staged packets.
    ///
    /// Must not be called from a timer callback of the peer.
    pub fn stop(&self) {
        let was_running = {
            // the upgradeable guard turns away new readers,
            // so the upgrade only waits for the gates already open
            let mut running = self.running.upgradeable_read().upgrade();
            let was_running = *running;
            *running = false;
            was_running
        };

        self.timers.stop();

        if was_running {
            log::debug!("{} : stopped", self);
            C::zero_keys(self);
            C::flush_staged_packets(self);
        }
    }
}
