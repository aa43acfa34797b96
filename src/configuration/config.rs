use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

use x25519_dalek::PublicKey;

use super::super::constants::MAX_PERSISTENT_KEEPALIVE_INTERVAL;
use super::super::device::Device;
use super::super::types::{Callbacks, Endpoint};
use super::ConfigError;

/* The configuration interface hides the collaborator types
 * (over which the device is generic) from the host application.
 */

/// Describes a snapshot of the state of a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerState {
    pub public_key: PublicKey,
    pub endpoint: Option<SocketAddr>,
    pub persistent_keepalive_interval: u64,
    pub last_handshake_time: Option<(u64, u64)>,
    pub handshake_attempts: usize,
}

/// Exposed configuration interface
pub trait Configuration {
    /// Bring the device up, enabling the timers of all peers
    fn up(&self);

    /// Bring the device down, stopping the timers of all peers
    fn down(&self);

    /// Adds a new peer to the device
    ///
    /// # Arguments
    ///
    /// - `peer`: The public key of the peer to add
    ///
    /// # Returns
    ///
    /// An error if the peer already exists
    fn add_peer(&self, peer: &PublicKey) -> Result<(), ConfigError>;

    /// Remove the peer from the device
    ///
    /// # Arguments
    ///
    /// - `peer`: The public key of the peer to remove
    ///
    /// # Returns
    ///
    /// An error if no such peer exists
    fn remove_peer(&self, peer: &PublicKey) -> Result<(), ConfigError>;

    /// Removes all peers from the device
    fn replace_peers(&self);

    /// Update the endpoint of the peer
    fn set_endpoint(&self, peer: &PublicKey, addr: SocketAddr) -> Result<(), ConfigError>;

    /// Update the persistent keepalive interval of the peer
    ///
    /// # Arguments
    ///
    /// - `peer`: The public key of the peer
    /// - `secs`: The interval in seconds, 0 disables persistent keepalives
    ///
    /// # Returns
    ///
    /// An error if no such peer exists or the interval exceeds 65535 seconds
    fn set_persistent_keepalive_interval(&self, peer: &PublicKey, secs: u64)
        -> Result<(), ConfigError>;

    /// Returns the state of all peers
    fn get_peers(&self) -> Vec<PeerState>;
}

impl<C: Callbacks> Configuration for Device<C>
where
    C::Opaque: Default,
{
    fn up(&self) {
        Device::up(self)
    }

    fn down(&self) {
        Device::down(self)
    }

    fn add_peer(&self, peer: &PublicKey) -> Result<(), ConfigError> {
        log::trace!("Config, Add peer, pk = {}", hex::encode(peer.as_bytes()));
        Device::add_peer(self, *peer, Default::default()).map(|_| ())
    }

    fn remove_peer(&self, peer: &PublicKey) -> Result<(), ConfigError> {
        log::trace!("Config, Remove peer, pk = {}", hex::encode(peer.as_bytes()));
        Device::remove_peer(self, peer)
    }

    fn replace_peers(&self) {
        log::trace!("Config, Replace peers");
        self.clear_peers();
    }

    fn set_endpoint(&self, peer: &PublicKey, addr: SocketAddr) -> Result<(), ConfigError> {
        log::trace!("Config, Set endpoint: {}", addr);
        let peer = self.lookup_peer(peer).ok_or(ConfigError::UnknownPeer)?;
        peer.set_endpoint(<C::Endpoint as Endpoint>::from_address(addr));
        Ok(())
    }

    fn set_persistent_keepalive_interval(
        &self,
        peer: &PublicKey,
        secs: u64,
    ) -> Result<(), ConfigError> {
        log::trace!("Config, Set persistent keepalive interval: {}", secs);
        if secs > MAX_PERSISTENT_KEEPALIVE_INTERVAL {
            return Err(ConfigError::InvalidKeepaliveInterval);
        }
        let peer = self.lookup_peer(peer).ok_or(ConfigError::UnknownPeer)?;
        peer.set_persistent_keepalive_interval(secs);
        Ok(())
    }

    fn get_peers(&self) -> Vec<PeerState> {
        let peers = self.list_peers();
        let mut state = Vec::with_capacity(peers.len());

        for p in peers {
            // convert the system time to (secs, nano) since epoch
            let last_handshake_time = (*p.walltime_last_handshake.lock()).map(|t| {
                let duration = t
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .unwrap_or(Duration::from_secs(0));
                (duration.as_secs(), duration.subsec_nanos() as u64)
            });

            state.push(PeerState {
                public_key: p.pk,
                endpoint: p.get_endpoint(),
                persistent_keepalive_interval: p.get_keepalive_interval(),
                last_handshake_time,
                handshake_attempts: p.timers.handshake_attempts(),
            });
        }
        state
    }
}
