//! Position source implementations.

pub mod channel;

pub use channel::{ChannelPositionSource, DEFAULT_WATCH_CAPACITY};
