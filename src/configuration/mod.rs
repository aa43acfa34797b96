mod config;
mod error;

pub use config::{Configuration, PeerState};
pub use error::ConfigError;
