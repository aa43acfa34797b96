use super::Endpoint;
use crate::peer::PeerInner;

pub trait Opaque: Send + Sync + 'static {}

impl<T> Opaque for T where T: Send + Sync + 'static {}

/// Protocol-layer actions invoked by the expiration policies.
///
/// Every action is fire-and-forget from the point of view of the timers:
/// failures are the concern of the implementor.
/// Implementations must not call `Timers::stop` (or `PeerInner::stop`)
/// for the peer they are invoked on, since they may run inside a timer callback.
pub trait Callbacks: Sized + Send + Sync + 'static {
    /// Per-peer state owned by the protocol layer.
    type Opaque: Opaque;
    type Endpoint: Endpoint;

    fn send_handshake_initiation(peer: &PeerInner<Self>, is_retry: bool);
    fn send_keepalive(peer: &PeerInner<Self>);

    /// Drop every packet staged while waiting for a session key.
    fn flush_staged_packets(peer: &PeerInner<Self>);

    /// Erase all session key material (current, previous and next keypairs).
    fn zero_keys(peer: &PeerInner<Self>);
}
