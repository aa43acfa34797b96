mod callbacks;
mod endpoint;
mod scheduler;

#[cfg(test)]
pub mod dummy;

pub use callbacks::{Callbacks, Opaque};
pub use endpoint::Endpoint;
pub use scheduler::{Deferred, Scheduler};
