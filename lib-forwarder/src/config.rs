//! Host configuration and gas schedule

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Maximum nested frame depth (call stack) per invocation
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 128;

/// Default gas budget for a top-level invocation
pub const DEFAULT_GAS_LIMIT: u64 = 10_000_000;

/// Gas prices charged by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// Charged on entry to every frame
    pub call_base: u64,
    /// Charged per started 32-byte word when copying call or return data
    pub copy_per_word: u64,
    pub storage_read: u64,
    pub storage_write: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            call_base: 700,
            copy_per_word: 3,
            storage_read: 200,
            storage_write: 5_000,
        }
    }
}

impl GasSchedule {
    /// Cost of copying `len` bytes
    pub fn copy_cost(&self, len: usize) -> u64 {
        let words = (len as u64).div_ceil(32);
        words.saturating_mul(self.copy_per_word)
    }
}

/// Execution host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub max_call_depth: u32,
    /// Budget for invocations whose `Call` carries none
    pub default_gas_limit: u64,
    pub gas: GasSchedule,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            default_gas_limit: DEFAULT_GAS_LIMIT,
            gas: GasSchedule::default(),
        }
    }
}

impl HostConfig {
    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HostConfig = serde_json::from_str(json)
            .map_err(|e| anyhow!("Invalid host config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_call_depth(mut self, depth: u32) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 {
            return Err(anyhow!("max_call_depth must be > 0"));
        }
        if self.default_gas_limit == 0 {
            return Err(anyhow!("default_gas_limit must be > 0"));
        }
        if self.gas.call_base > self.default_gas_limit {
            return Err(anyhow!(
                "call_base {} exceeds default_gas_limit {}",
                self.gas.call_base,
                self.default_gas_limit
            ));
        }
        Ok(())
    }
}
