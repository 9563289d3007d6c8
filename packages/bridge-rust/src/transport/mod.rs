//! Channel providers.

mod memory;

pub use memory::{MemoryChannel, MemoryProvider};
