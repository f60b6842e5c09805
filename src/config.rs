//! Driver configuration parameters
//!
//! Tunables for the transport retry loop and the watchdog feeder.
//! Both structs deserialize from JSON so deployments can override them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Transport retry and framing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Total attempts per transfer, including the first.
    pub max_attempts: u8,
    /// Pause between failed attempts (milliseconds).
    pub retry_backoff_ms: u32,
    /// Byte written ahead of a block read; ignored by board firmware.
    pub read_trigger: u8,
    /// First frame id a fresh peripheral handle generates.
    pub first_frame_id: u8,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff_ms: 10,
            read_trigger: 0xFF,
            first_frame_id: 0x1F,
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1"));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("transport config JSON"))?;
        config.validate()?;
        Ok(config)
    }
}

/// Watchdog feeder thread parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederConfig {
    /// How long the loop waits for a control message per iteration (milliseconds).
    pub poll_interval_ms: u32,
    /// Feeder thread stack size (KiB).
    pub stack_kb: usize,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            stack_kb: 16,
        }
    }
}

impl FeederConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be non-zero"));
        }
        if self.stack_kb == 0 {
            return Err(Error::Config("stack_kb must be non-zero"));
        }
        Ok(())
    }
}
