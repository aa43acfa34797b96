use std::net::SocketAddr;

/// The cached remote address of a peer,
/// as learned from the last authenticated packet or set by configuration.
pub trait Endpoint: Send + Sync + 'static {
    fn from_address(addr: SocketAddr) -> Self;
    fn to_address(&self) -> SocketAddr;

    /// Forget the local source address used to reach the endpoint,
    /// letting the routing table pick a fresh one on the next send.
    fn clear_src(&mut self);
}
