use std::path::PathBuf;
use std::time::Duration;

use filestore_protocol::constants::{
    DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_MAX_OVERLAP_TOKENS, DEFAULT_MAX_TOKENS_PER_CHUNK,
};
use filestore_protocol::{ChunkConfig, ChunkConfigError};
use filestore_transfer::mb_to_bytes;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::retry::RetryPolicy;

/// Upload configuration inputs.
///
/// Every field has a default, so a partial config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens_per_chunk: u32,
    #[serde(default = "default_overlap")]
    pub default_max_overlap_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_upload_retries: u32,
    /// Seconds.
    #[serde(default = "default_initial_delay")]
    pub upload_retry_initial_delay: f64,
    /// Seconds.
    #[serde(default = "default_max_delay")]
    pub upload_retry_max_delay: f64,
    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,
    #[serde(default = "default_failure_log_path")]
    pub failure_log_path: PathBuf,
}

fn default_max_file_size_mb() -> u64 {
    DEFAULT_MAX_FILE_SIZE_MB
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS_PER_CHUNK
}

fn default_overlap() -> u32 {
    DEFAULT_MAX_OVERLAP_TOKENS
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> f64 {
    1.0
}

fn default_max_delay() -> f64 {
    32.0
}

fn default_concurrency() -> usize {
    5
}

fn default_failure_log_path() -> PathBuf {
    PathBuf::from("upload_failures.jsonl")
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            default_max_tokens_per_chunk: default_max_tokens(),
            default_max_overlap_tokens: default_overlap(),
            max_upload_retries: default_max_retries(),
            upload_retry_initial_delay: default_initial_delay(),
            upload_retry_max_delay: default_max_delay(),
            concurrency_limit: default_concurrency(),
            failure_log_path: default_failure_log_path(),
        }
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

impl UploadSettings {
    /// Checks every setting once, before anything is dispatched.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.concurrency_limit == 0 {
            return Err(UploadError::InvalidConcurrency(0));
        }
        if self.max_file_size_mb == 0 {
            return Err(UploadError::InvalidSettings(
                "max_file_size_mb must be positive".into(),
            ));
        }
        for (name, value) in [
            ("upload_retry_initial_delay", self.upload_retry_initial_delay),
            ("upload_retry_max_delay", self.upload_retry_max_delay),
        ] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(UploadError::InvalidSettings(format!(
                    "{name} must be a non-negative, representable number of seconds, got {value}"
                )));
            }
        }
        if self.upload_retry_initial_delay > self.upload_retry_max_delay {
            return Err(UploadError::InvalidSettings(format!(
                "upload_retry_initial_delay ({}) exceeds upload_retry_max_delay ({})",
                self.upload_retry_initial_delay, self.upload_retry_max_delay
            )));
        }
        self.default_chunk_config()?;
        Ok(())
    }

    /// Backoff policy. Delays that [`validate`](Self::validate) would
    /// reject saturate instead of panicking.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_upload_retries,
            initial_delay: seconds(self.upload_retry_initial_delay),
            max_delay: seconds(self.upload_retry_max_delay),
        }
    }

    pub fn default_chunk_config(&self) -> Result<ChunkConfig, ChunkConfigError> {
        ChunkConfig::new(
            self.default_max_tokens_per_chunk,
            self.default_max_overlap_tokens,
        )
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        mb_to_bytes(self.max_file_size_mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = UploadSettings::default();
        assert_eq!(s.max_file_size_mb, 100);
        assert_eq!(s.max_upload_retries, 3);
        assert_eq!(s.concurrency_limit, 5);
        assert!(s.validate().is_ok());
        assert_eq!(s.retry_policy(), RetryPolicy::default());
        assert_eq!(s.default_chunk_config().unwrap(), ChunkConfig::default());
        assert_eq!(s.max_file_size_bytes(), 100 * 1024 * 1024);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let s: UploadSettings =
            serde_json::from_str(r#"{"max_upload_retries": 5, "concurrency_limit": 2}"#).unwrap();
        assert_eq!(s.max_upload_retries, 5);
        assert_eq!(s.concurrency_limit, 2);
        assert_eq!(s.upload_retry_max_delay, 32.0);
        assert_eq!(s.failure_log_path, PathBuf::from("upload_failures.jsonl"));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let s = UploadSettings {
            concurrency_limit: 0,
            ..UploadSettings::default()
        };
        assert!(matches!(s.validate(), Err(UploadError::InvalidConcurrency(0))));
    }

    #[test]
    fn rejects_bad_delays() {
        let negative = UploadSettings {
            upload_retry_initial_delay: -1.0,
            ..UploadSettings::default()
        };
        assert!(matches!(negative.validate(), Err(UploadError::InvalidSettings(_))));

        let inverted = UploadSettings {
            upload_retry_initial_delay: 10.0,
            upload_retry_max_delay: 5.0,
            ..UploadSettings::default()
        };
        assert!(matches!(inverted.validate(), Err(UploadError::InvalidSettings(_))));

        let nan = UploadSettings {
            upload_retry_max_delay: f64::NAN,
            ..UploadSettings::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn rejects_unrepresentable_delay() {
        let huge = UploadSettings {
            upload_retry_max_delay: 1e20,
            ..UploadSettings::default()
        };
        let err = huge.validate().unwrap_err();
        assert!(err.to_string().contains("upload_retry_max_delay"));

        let infinite = UploadSettings {
            upload_retry_initial_delay: f64::INFINITY,
            upload_retry_max_delay: f64::INFINITY,
            ..UploadSettings::default()
        };
        assert!(infinite.validate().is_err());

        // Building the policy from unchecked settings must not panic.
        assert_eq!(huge.retry_policy().max_delay, Duration::MAX);
        assert_eq!(huge.retry_policy().initial_delay, Duration::from_secs(1));
    }

    #[test]
    fn rejects_invalid_default_chunking() {
        let s = UploadSettings {
            default_max_tokens_per_chunk: 100,
            default_max_overlap_tokens: 150,
            ..UploadSettings::default()
        };
        assert!(matches!(s.validate(), Err(UploadError::InvalidChunkConfig(_))));
    }

    #[test]
    fn fractional_delays() {
        let s = UploadSettings {
            upload_retry_initial_delay: 0.5,
            upload_retry_max_delay: 2.0,
            ..UploadSettings::default()
        };
        let policy = s.retry_policy();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(2));
    }
}
