//! Timer state machine of WireGuard peers.
//!
//! Every peer carries five timers (handshake retransmission, passive keepalive,
//! new handshake after silence, key-material erasure and persistent keepalive),
//! armed and disarmed by the protocol layer through the `timers_*` event handlers of [`PeerInner`].
//!
//! The crate decides when protocol actions happen, the actions themselves
//! (sending handshakes and keepalives, erasing keys) are provided by the host through [`Callbacks`].
//! The device described here does not depend on particular IO implementations,
//! and can be instantiated in unit-tests with the dummy scheduler and callbacks.

pub mod configuration;
pub mod constants;

mod device;
mod peer;
mod timer;
mod timers;
mod types;
mod wheel;


pub use device::{Device, DeviceInner};
pub use peer::{Peer, PeerInner};
pub use timer::Timer;
pub use timers::Timers;
pub use types::{Callbacks, Deferred, Endpoint, Opaque, Scheduler};
pub use wheel::Wheel;
