use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HypnosConfig {
    pub sleep: SleepConfig,
    pub replay: ReplayConfig,
    pub training: TrainingConfig,
}

impl HypnosConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: HypnosConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env
    /// overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HYPNOS_INACTIVITY_MINUTES") {
            if let Ok(n) = v.parse() {
                self.sleep.inactivity_threshold_minutes = n;
            }
        }
        if let Ok(v) = std::env::var("HYPNOS_POSITIVE_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.sleep.positive_score_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("HYPNOS_REPLAY_RATIO") {
            if let Ok(n) = v.parse() {
                self.replay.ratio = n;
            }
        }
        if let Ok(v) = std::env::var("HYPNOS_LEARNING_RATE") {
            if let Ok(n) = v.parse() {
                self.training.learning_rate = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    /// Idle time before consolidation may run. Boundary inclusive: exactly
    /// this much idle time counts as inactive.
    pub inactivity_threshold_minutes: u64,
    /// Feedback with a combined score strictly above this becomes training
    /// evidence.
    pub positive_score_threshold: f32,
    /// How many retained important examples to pull for replay.
    pub important_examples_limit: i64,
    /// Cap on examples merged in from validated courses per run.
    pub course_examples_limit: i64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold_minutes: 30,
            positive_score_threshold: 0.7,
            important_examples_limit: 100,
            course_examples_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Old examples per new example in the mixed dataset.
    pub ratio: f32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { ratio: 0.3 }
    }
}

/// Hyperparameters carried to the training backend. This engine never
/// interprets them; they are part of the backend contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learning_rate: f32,
    pub batch_size: u32,
    pub num_epochs: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 3e-4,
            batch_size: 4,
            num_epochs: 3,
        }
    }
}
