use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    UnknownPeer,
    PeerExists,
    InvalidKeepaliveInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownPeer => write!(f, "No peer with the given public key"),
            ConfigError::PeerExists => write!(f, "A peer with the given public key already exists"),
            ConfigError::InvalidKeepaliveInterval => {
                write!(f, "Persistent keepalive interval out of range")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
