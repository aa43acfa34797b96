use super::configuration::ConfigError;
use super::peer::Peer;
use super::types::{Callbacks, Scheduler};

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Mutex as StdMutex;
use std::sync::{Arc, PoisonError};

use rand::rngs::OsRng;
use rand::Rng;

use spin::RwLock;
use x25519_dalek::PublicKey;

pub struct DeviceInner<C: Callbacks> {
    // identifier (for logging)
    pub id: u32,

    // facility dispatching the timers of every peer
    scheduler: Arc<dyn Scheduler>,

    // device enabled
    up: RwLock<bool>,

    // serializes up/down transitions (held while peers are started/stopped)
    transition: StdMutex<()>,

    // peer map
    peers: RwLock<HashMap<PublicKey, Peer<C>>>,
}

pub struct Device<C: Callbacks> {
    inner: Arc<DeviceInner<C>>,
}

impl<C: Callbacks> fmt::Display for Device<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device({:x})", self.id)
    }
}

impl<C: Callbacks> Deref for Device<C> {
    type Target = DeviceInner<C>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<C: Callbacks> Clone for Device<C> {
    fn clone(&self) -> Self {
        Device {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Callbacks> DeviceInner<C> {
    pub fn is_up(&self) -> bool {
        *self.up.read()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.read().len()
    }
}

impl<C: Callbacks> Device<C> {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Device<C> {
        Device {
            inner: Arc::new(DeviceInner {
                id: OsRng.gen(),
                scheduler,
                up: RwLock::new(false),
                transition: StdMutex::new(()),
                peers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Brings the device up, starting the timers of every peer.
    pub fn up(&self) {
        let _transition = self
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // check if already up
        {
            let mut up = self.up.write();
            if *up {
                return;
            }
            *up = true;
        }

        log::debug!("{} : up", self);
        for peer in self.list_peers() {
            peer.start();
        }
    }

    /// Brings the device down.
    ///
    /// Every peer is stopped: on return no timer callback is running on any peer,
    /// however the device retains its peers and their configuration.
    pub fn down(&self) {
        let _transition = self
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // check if already down
        {
            let mut up = self.up.write();
            if !*up {
                return;
            }
            *up = false;
        }

        log::debug!("{} : down", self);
        for peer in self.list_peers() {
            peer.stop();
        }
    }

    pub fn add_peer(&self, pk: PublicKey, opaque: C::Opaque) -> Result<Peer<C>, ConfigError> {
        let peer = {
            let mut peers = self.peers.write();
            if peers.contains_key(&pk) {
                return Err(ConfigError::PeerExists);
            }
            let peer = Peer::new(pk, opaque, Arc::downgrade(&self.inner), &*self.scheduler);
            peers.insert(pk, peer.clone());
            peer
        };

        log::debug!("{} : added {}", self, peer);

        // prevent up/down while starting
        let _transition = self
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_up() {
            peer.start();
        }
        Ok(peer)
    }

    /// Removes the peer from the device and stops it.
    ///
    /// On return no timer callback is running on the peer.
    pub fn remove_peer(&self, pk: &PublicKey) -> Result<(), ConfigError> {
        // the map lock must be released before stopping:
        // an expiring timer may be waiting to read the peer count
        let peer = self
            .peers
            .write()
            .remove(pk)
            .ok_or(ConfigError::UnknownPeer)?;

        log::debug!("{} : removed {}", self, peer);
        peer.stop();
        Ok(())
    }

    pub fn clear_peers(&self) {
        let peers: Vec<Peer<C>> = self.peers.write().drain().map(|(_, peer)| peer).collect();
        for peer in peers {
            peer.stop();
        }
    }

    pub fn lookup_peer(&self, pk: &PublicKey) -> Option<Peer<C>> {
        self.peers.read().get(pk).cloned()
    }

    pub fn list_peers(&self) -> Vec<Peer<C>> {
        self.peers.read().values().cloned().collect()
    }
}
