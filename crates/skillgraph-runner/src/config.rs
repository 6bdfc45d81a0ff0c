//! Batch pacing and retry configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

pub const BATCH_SIZE_VAR: &str = "SKILLGRAPH_BATCH_SIZE";
pub const BATCH_DELAY_VAR: &str = "SKILLGRAPH_BATCH_DELAY_MS";
pub const MAX_RETRIES_VAR: &str = "SKILLGRAPH_MAX_RETRIES";
pub const RETRY_BACKOFF_VAR: &str = "SKILLGRAPH_RETRY_BACKOFF_MS";

/// How the runner paces calls to the fragment source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Questions sent per fragment request. Default: 5.
    pub batch_size: usize,
    /// Pause between consecutive batches. Default: 2s.
    pub inter_batch_delay: Duration,
    /// Extra attempts after a failed fetch. Default: 2.
    pub max_retries: u32,
    /// Base backoff; attempt `n` waits `n * retry_backoff`. Default: 1s.
    pub retry_backoff: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            batch_size: 5,
            inter_batch_delay: Duration::from_secs(2),
            max_retries: 2,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

impl RunnerConfig {
    /// Reads overrides from the process environment. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), with an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RunnerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RunnerConfig::default();

        if let Some(size) = parse_var::<usize, _>(&lookup, BATCH_SIZE_VAR)? {
            if size == 0 {
                return Err(RunnerError::Config {
                    var: BATCH_SIZE_VAR,
                    value: size.to_string(),
                    reason: "batch size must be at least 1".to_string(),
                });
            }
            config.batch_size = size;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, BATCH_DELAY_VAR)? {
            config.inter_batch_delay = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var::<u32, _>(&lookup, MAX_RETRIES_VAR)? {
            config.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, RETRY_BACKOFF_VAR)? {
            config.retry_backoff = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Total fetch attempts per batch.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, RunnerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|err| RunnerError::Config {
            var,
            value: raw.clone(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = RunnerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.attempts(), 3);
    }

    #[test]
    fn overrides_are_applied() {
        let config = RunnerConfig::from_lookup(lookup(&[
            (BATCH_SIZE_VAR, "8"),
            (BATCH_DELAY_VAR, "250"),
            (MAX_RETRIES_VAR, "0"),
            (RETRY_BACKOFF_VAR, " 40 "),
        ]))
        .unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.inter_batch_delay, Duration::from_millis(250));
        assert_eq!(config.attempts(), 1);
        assert_eq!(config.backoff_for(3), Duration::from_millis(120));
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = RunnerConfig::from_lookup(lookup(&[(BATCH_SIZE_VAR, "0")])).unwrap_err();
        assert!(matches!(err, RunnerError::Config { var: BATCH_SIZE_VAR, .. }));

        let err = RunnerConfig::from_lookup(lookup(&[(MAX_RETRIES_VAR, "lots")])).unwrap_err();
        assert!(err.to_string().contains(MAX_RETRIES_VAR));
    }
}
