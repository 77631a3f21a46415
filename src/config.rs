use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VortexError};

const DEFAULT_RPC_TIMEOUT_MS: u64 = 1000;

fn default_rpc_timeout_ms() -> u64 {
    DEFAULT_RPC_TIMEOUT_MS
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_rpc_timeout_ms")]
    pub default_rpc_timeout_ms: u64,
    /// Upper bound on concurrently running request handlers. `None` means
    /// one task per inbound message with no cap.
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            max_in_flight: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| VortexError::Config(e.to_string()))?;
        let config: RuntimeConfig =
            serde_json::from_str(&content).map_err(|e| VortexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_overrides(
        mut self,
        rpc_timeout_ms: Option<u64>,
        max_in_flight: Option<usize>,
    ) -> Result<Self> {
        if let Some(timeout) = rpc_timeout_ms {
            self.default_rpc_timeout_ms = timeout;
        }
        if max_in_flight.is_some() {
            self.max_in_flight = max_in_flight;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_rpc_timeout_ms == 0 {
            return Err(VortexError::Config(
                "default_rpc_timeout_ms must be positive".to_string(),
            ));
        }
        if self.max_in_flight == Some(0) {
            return Err(VortexError::Config(
                "max_in_flight must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.default_rpc_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_partial_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_in_flight": 8}}"#).unwrap();

        let config = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_in_flight, Some(8));
        assert_eq!(config.default_rpc_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn rejects_zero_limits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_rpc_timeout_ms": 0}}"#).unwrap();
        let err = RuntimeConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, VortexError::Config(_)));

        let config = RuntimeConfig {
            max_in_flight: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_rpc_timeout_ms": 250, "max_in_flight": 4}}"#).unwrap();

        let config = RuntimeConfig::load(Some(file.path()))
            .unwrap()
            .with_overrides(Some(500), None)
            .unwrap();
        assert_eq!(config.default_rpc_timeout_ms, 500);
        assert_eq!(config.max_in_flight, Some(4));

        let config = RuntimeConfig::load(None::<&Path>).unwrap();
        assert_eq!(config.max_in_flight, None);
        assert!(config.with_overrides(Some(0), None).is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = RuntimeConfig::from_file("/nonexistent/vortex.json").unwrap_err();
        assert!(matches!(err, VortexError::Config(_)));
    }
}
