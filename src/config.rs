use std::time::Duration;

use crate::data::ingest::DEFAULT_SAMPLE_SIZE;

pub const DEFAULT_DATA_LOCATION: &str = "matched_peace_conflict_episodes.csv";

/// Delays before the entrance animation is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTiming {
    pub after_load: Duration,
    pub after_select: Duration,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            after_load: Duration::from_millis(500),
            after_select: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// File path or http(s) URL of the episodes table.
    pub data_location: String,
    pub sample_size: usize,
    pub timing: AnimationTiming,
    /// Pins bloodiness, fallback ids and layout jitter.
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_location: DEFAULT_DATA_LOCATION.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            timing: AnimationTiming::default(),
            rng_seed: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_location: std::env::var("CONFLICT_DATA").unwrap_or(defaults.data_location),
            sample_size: std::env::var("SAMPLE_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.sample_size),
            timing: AnimationTiming {
                after_load: std::env::var("LOAD_ARM_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.timing.after_load),
                after_select: std::env::var("RESELECT_ARM_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.timing.after_select),
            },
            rng_seed: std::env::var("RNG_SEED").ok().and_then(|v| v.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_screen() {
        let cfg = Config::default();
        assert_eq!(cfg.sample_size, 8);
        assert_eq!(cfg.timing.after_load, Duration::from_millis(500));
        assert_eq!(cfg.timing.after_select, Duration::from_millis(100));
        assert_eq!(cfg.data_location, DEFAULT_DATA_LOCATION);
        assert!(cfg.rng_seed.is_none());
    }
}
