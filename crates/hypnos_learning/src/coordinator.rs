//! Assistant coordinator: wires the gate, scorer collaborators, store, and
//! consolidator into the surface the surrounding service calls.
//!
//! Collaborators are injected; the sentiment analyzer defaults to the no-op
//! neutral one so the coordinator can be constructed and tested without any
//! model.

use anyhow::{Context, Result};
use hypnos_core::{
    combine_scores, implicit_reward, reaction_signal, HypnosConfig, InteractionLog,
    NeutralAnalyzer, SentimentAnalyzer, UserAction,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::consolidation::{ConsolidationConfig, ConsolidationRun, SleepConsolidator};
use crate::gate::{ActivityGate, SleepStatus};
use crate::replay::ReplayBuffer;
use crate::store::{NewFeedback, Storage};
use crate::training::TrainingBackend;

/// A user reaction as received from the API boundary.
#[derive(Debug, Clone, Default)]
pub struct FeedbackCapture {
    pub query: String,
    pub response: String,
    /// Free-text reaction; empty text skips the sentiment classifier.
    pub reaction: String,
    /// Identifier of the suggestion this reaction is about, when the caller
    /// tracks one.
    pub suggestion_id: Option<String>,
    pub action: Option<UserAction>,
    pub edit_distance: Option<f32>,
    /// Explicit numeric rating in `[-1, 1]`; replaces the inferred
    /// emotional term when present.
    pub explicit_score: Option<f32>,
    pub context: Option<String>,
}

pub struct AssistantCoordinator {
    gate: Arc<ActivityGate>,
    analyzer: Arc<dyn SentimentAnalyzer>,
    store: Arc<dyn Storage>,
    consolidator: Arc<SleepConsolidator>,
    interactions: Mutex<InteractionLog>,
}

impl AssistantCoordinator {
    pub fn new(
        config: &HypnosConfig,
        store: Arc<dyn Storage>,
        backend: Arc<dyn TrainingBackend>,
    ) -> Self {
        Self::with_analyzer(config, store, backend, Arc::new(NeutralAnalyzer))
    }

    pub fn with_analyzer(
        config: &HypnosConfig,
        store: Arc<dyn Storage>,
        backend: Arc<dyn TrainingBackend>,
        analyzer: Arc<dyn SentimentAnalyzer>,
    ) -> Self {
        let gate = Arc::new(ActivityGate::new(config.sleep.inactivity_threshold_minutes));
        let consolidator = Arc::new(SleepConsolidator::new(
            gate.clone(),
            ReplayBuffer::with_ratio(config.replay.ratio),
            store.clone(),
            backend,
            ConsolidationConfig {
                positive_score_threshold: config.sleep.positive_score_threshold,
                important_examples_limit: config.sleep.important_examples_limit,
                course_examples_limit: config.sleep.course_examples_limit,
            },
        ));

        Self {
            gate,
            analyzer,
            store,
            consolidator,
            interactions: Mutex::new(InteractionLog::new()),
        }
    }

    /// Mark the user as active. Called by every successful query-processing
    /// path.
    pub async fn record_activity(&self) {
        self.gate.record_activity().await;
    }

    /// Score and store one user reaction. Returns the stored feedback id.
    ///
    /// Emotional signal comes from the analyzer (or the explicit rating when
    /// given); implicit signal from the action table, `0.0` when no action
    /// was observed. The two are folded with the fixed 70/30 weighting.
    pub async fn capture_feedback(&self, capture: FeedbackCapture) -> Result<i64> {
        tracing::info!("capturing user feedback...");

        let analysis = reaction_signal(self.analyzer.as_ref(), &capture.reaction);
        let emotional_score = match capture.explicit_score {
            Some(rating) => rating.clamp(-1.0, 1.0),
            None => analysis.signal,
        };

        let implicit_score = capture
            .action
            .map(|action| implicit_reward(action, capture.edit_distance))
            .unwrap_or(0.0);

        let combined_score = combine_scores(implicit_score, emotional_score, None);

        if let Some(action) = capture.action {
            let suggestion_id = capture
                .suggestion_id
                .clone()
                .unwrap_or_else(|| "unlabeled".to_string());
            let mut log = self.interactions.lock().await;
            log.track(suggestion_id, action, capture.edit_distance, None);
        }

        let id = self
            .store
            .store_feedback(NewFeedback {
                prompt: capture.query,
                response: capture.response,
                implicit_score,
                emotional_score,
                combined_score,
                context: capture.context,
            })
            .await
            .context("storing feedback")?;

        tracing::info!("feedback stored (score: {:.2})", combined_score);
        Ok(id)
    }

    /// Run consolidation. `force` bypasses the activity gate.
    pub async fn trigger_sleep(&self, force: bool) -> ConsolidationRun {
        if force {
            self.consolidator.trigger_manual().await
        } else {
            self.consolidator.consolidate().await
        }
    }

    pub async fn sleep_status(&self) -> SleepStatus {
        self.gate.status().await
    }

    /// Aggregate implicit-interaction statistics.
    pub async fn interaction_stats(&self) -> hypnos_core::InteractionStats {
        self.interactions.lock().await.stats()
    }

    pub fn consolidator(&self) -> Arc<SleepConsolidator> {
        self.consolidator.clone()
    }

    pub fn gate(&self) -> Arc<ActivityGate> {
        self.gate.clone()
    }
}
