//! Replay mixing: fresh positive evidence blended with retained history.
//!
//! Pure score-based prioritization, deliberately decoupled from how
//! "importance" was computed — alternate strategies can replace this without
//! touching the orchestrator.

use hypnos_core::ExampleRecord;

/// Mixes new training examples with a score-prioritized slice of old ones.
pub struct ReplayBuffer {
    ratio: f32,
}

impl ReplayBuffer {
    /// Default mixing ratio: 0.3 old examples per new example.
    pub fn new() -> Self {
        Self::with_ratio(0.3)
    }

    pub fn with_ratio(ratio: f32) -> Self {
        tracing::info!("replay buffer initialized (ratio: {})", ratio);
        Self { ratio }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Mix old and new examples into one training dataset.
    ///
    /// If either side is empty the other is returned unchanged. Otherwise
    /// `floor(len(new) * ratio)` old examples are selected by descending
    /// score and appended after all new examples — new evidence always comes
    /// first, so downstream consumers that truncate prefer it.
    pub fn mix(
        &self,
        old_examples: Vec<ExampleRecord>,
        new_examples: Vec<ExampleRecord>,
    ) -> Vec<ExampleRecord> {
        if old_examples.is_empty() {
            tracing::debug!("no old examples, using only new examples");
            return new_examples;
        }
        if new_examples.is_empty() {
            tracing::debug!("no new examples, using only old examples");
            return old_examples;
        }

        let num_old = (new_examples.len() as f32 * self.ratio).floor() as usize;
        let mut selected_old = Self::prioritize(old_examples);
        selected_old.truncate(num_old);

        tracing::info!(
            "mixed {} new examples with {} old examples",
            new_examples.len(),
            selected_old.len()
        );

        let mut mixed = new_examples;
        mixed.extend(selected_old);
        mixed
    }

    /// Sort examples by descending score; ties keep their original order.
    ///
    /// Used by the mixing policy and exposed for callers assembling the
    /// important-examples pool.
    pub fn prioritize(mut examples: Vec<ExampleRecord>) -> Vec<ExampleRecord> {
        // sort_by is stable; total_cmp keeps NaN scores from poisoning the order.
        examples.sort_by(|a, b| b.score.total_cmp(&a.score));
        examples
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}
