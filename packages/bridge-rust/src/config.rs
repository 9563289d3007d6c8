//! Configuration types for bridges and the in-process channel provider.

/// Per-bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Label attached to every log line and metric emitted by this bridge.
    /// Defaults to a fresh UUID so independent bridges are distinguishable.
    pub name: String,
}

impl BridgeConfig {
    /// Creates a configuration with the given bridge name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Configuration for [`MemoryProvider`](crate::transport::MemoryProvider).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Bounded mpsc capacity of the worker-to-caller direction. Handlers
    /// that emit faster than the bridge consumes wait for space. The
    /// caller-to-worker queue is unbounded.
    pub channel_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_are_unique() {
        let a = BridgeConfig::default();
        let b = BridgeConfig::default();
        assert_ne!(a.name, b.name);
    }

    #[test]
    fn named_config_keeps_name() {
        assert_eq!(BridgeConfig::named("render").name, "render");
    }

    #[test]
    fn memory_defaults() {
        assert_eq!(MemoryConfig::default().channel_capacity, 256);
    }
}
