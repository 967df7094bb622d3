//! Pool configuration types

use std::time::Duration;

use rfcpool_core::{ConnectionParameters, Result, RfcError};
use serde::{Deserialize, Serialize};

/// Configuration for a connection pool
///
/// Controls pool capacity, idle eviction timing and the parameters forwarded
/// to the connection factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Hard upper bound on simultaneously open connections (idle + borrowed)
    pool_size: usize,
    /// Time in milliseconds a returned connection may sit idle before eviction
    connection_idle_timeout_ms: u64,
    /// Period in milliseconds of the background eviction pass
    idle_detection_interval_ms: u64,
    /// Ping idle connections before handing them out
    test_on_checkout: bool,
    /// Opaque parameters forwarded verbatim to the factory
    parameters: ConnectionParameters,
}

impl PoolConfig {
    /// Create a new pool configuration with the given capacity
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize) -> Self {
        assert!(
            pool_size > 0,
            "pool_size must be greater than 0, got {}",
            pool_size
        );

        Self {
            pool_size,
            connection_idle_timeout_ms: 30_000, // 30 seconds default
            idle_detection_interval_ms: 1_000,  // 1 second default
            test_on_checkout: false,
            parameters: ConnectionParameters::default(),
        }
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: PoolConfig =
            toml::from_str(source).map_err(|e| RfcError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that `new` enforces but deserialization bypasses
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(RfcError::Configuration(
                "pool_size must be greater than 0".into(),
            ));
        }
        if self.idle_detection_interval_ms == 0 {
            return Err(RfcError::Configuration(
                "idle_detection_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Set the idle timeout in milliseconds
    pub fn with_connection_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connection_idle_timeout_ms = timeout_ms;
        self
    }

    /// Set the eviction interval in milliseconds
    pub fn with_idle_detection_interval_ms(mut self, interval_ms: u64) -> Self {
        self.idle_detection_interval_ms = interval_ms;
        self
    }

    /// Enable or disable pinging idle connections on checkout
    pub fn with_test_on_checkout(mut self, enabled: bool) -> Self {
        self.test_on_checkout = enabled;
        self
    }

    /// Set the parameters forwarded to the factory
    pub fn with_parameters(mut self, parameters: ConnectionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Get the pool capacity
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Get the idle timeout as a Duration
    pub fn connection_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_idle_timeout_ms)
    }

    /// Get the eviction interval as a Duration
    pub fn idle_detection_interval(&self) -> Duration {
        Duration::from_millis(self.idle_detection_interval_ms)
    }

    pub fn test_on_checkout(&self) -> bool {
        self.test_on_checkout
    }

    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - pool_size: 5
    /// - connection_idle_timeout: 30 seconds
    /// - idle_detection_interval: 1 second
    /// - test_on_checkout: false
    fn default() -> Self {
        Self::new(5)
    }
}
