//! Static process configuration.
//!
//! Read once from the environment at startup. Invalid values are
//! configuration errors raised immediately, except the offload threshold
//! which is clamped to its floor with a warning.

use tracing::warn;

/// Default fraction of available cores used for CPU-bound crypto/hash work.
pub const DEFAULT_THREAD_LIMIT_PERCENTAGE: f64 = 0.34;

/// Default byte threshold above which a field value is offloaded.
pub const DEFAULT_OFFLOAD_THRESHOLD_BYTES: usize = 1024;

/// Floor for the offload threshold; lower configured values are clamped up.
pub const MIN_OFFLOAD_THRESHOLD_BYTES: usize = 1024;

const ENV_THREAD_LIMIT: &str = "VAULTIC_THREAD_LIMIT_PERCENTAGE";
const ENV_OFFLOAD_THRESHOLD: &str = "VAULTIC_OFFLOAD_THRESHOLD_BYTES";
const ENV_INTEGRITY_CHECK: &str = "VAULTIC_INTEGRITY_CHECK_ENABLED";

/// Errors from reading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("thread limit percentage {0} outside valid range 0.01..=1.0")]
    InvalidThreadLimit(f64),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Process-wide configuration for the persistence core.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Fraction of available cores used by the crypto/hash worker pool.
    pub thread_limit_percentage: f64,
    /// Field values larger than this many bytes are offloaded to the blob store.
    pub offload_threshold_bytes: usize,
    /// Whether orphaned offload references are cleaned up on load.
    pub integrity_check_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            thread_limit_percentage: DEFAULT_THREAD_LIMIT_PERCENTAGE,
            offload_threshold_bytes: DEFAULT_OFFLOAD_THRESHOLD_BYTES,
            integrity_check_enabled: true,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from environment variables, falling back to
    /// defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through a lookup function (environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_THREAD_LIMIT) {
            config.thread_limit_percentage =
                raw.parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                    key: ENV_THREAD_LIMIT.into(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(raw) = lookup(ENV_OFFLOAD_THRESHOLD) {
            config.offload_threshold_bytes =
                raw.parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                    key: ENV_OFFLOAD_THRESHOLD.into(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(raw) = lookup(ENV_INTEGRITY_CHECK) {
            config.integrity_check_enabled =
                raw.parse::<bool>().map_err(|e| ConfigError::InvalidValue {
                    key: ENV_INTEGRITY_CHECK.into(),
                    reason: e.to_string(),
                })?;
        }

        config.validated()
    }

    /// Validates ranges. The offload threshold is clamped to its floor; a
    /// thread limit outside 0.01..=1.0 is an error.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if !(0.01..=1.0).contains(&self.thread_limit_percentage) {
            return Err(ConfigError::InvalidThreadLimit(self.thread_limit_percentage));
        }
        if self.offload_threshold_bytes < MIN_OFFLOAD_THRESHOLD_BYTES {
            warn!(
                configured = self.offload_threshold_bytes,
                floor = MIN_OFFLOAD_THRESHOLD_BYTES,
                "offload threshold below floor, clamping"
            );
            self.offload_threshold_bytes = MIN_OFFLOAD_THRESHOLD_BYTES;
        }
        Ok(self)
    }

    /// Number of worker threads for CPU-bound crypto/hash work:
    /// `ceil(cores * thread_limit_percentage)`, at least 1.
    #[must_use]
    pub fn worker_threads(&self) -> usize {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let limit = (cores as f64 * self.thread_limit_percentage).ceil() as usize;
        limit.clamp(1, cores)
    }
}
