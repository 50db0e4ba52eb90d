//! Centralized configuration for the session engine

use serde::{Deserialize, Serialize};

use crate::guest::GUEST_TOKEN_KEY;

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Buffer sizes for the resolver's channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Buffer size for the command channel (callers → resolver task)
    pub command_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32, // session commands are infrequent
        }
    }
}

// ----------------------------------------------------------------------------
// Guest Store Configuration
// ----------------------------------------------------------------------------

/// Configuration for the guest identity store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestStoreConfig {
    /// Storage slot the device session token is persisted under
    pub storage_key: String,
}

impl Default for GuestStoreConfig {
    fn default() -> Self {
        Self {
            storage_key: GUEST_TOKEN_KEY.to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Resolver Configuration
// ----------------------------------------------------------------------------

/// Top-level configuration for the session resolver runtime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub channels: ChannelConfig,
    pub guest: GuestStoreConfig,
}

impl ResolverConfig {
    /// Configuration for tests: small buffers, default keys
    pub fn testing() -> Self {
        Self {
            channels: ChannelConfig {
                command_buffer_size: 8,
            },
            guest: GuestStoreConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.channels.command_buffer_size == 0 {
            return Err("command_buffer_size must be greater than zero".to_string());
        }
        if self.guest.storage_key.is_empty() {
            return Err("guest storage_key must not be empty".to_string());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let mut config = ResolverConfig::default();
        config.channels.command_buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_storage_key_rejected() {
        let mut config = ResolverConfig::default();
        config.guest.storage_key.clear();
        assert!(config.validate().is_err());
    }
}
