//! Feedback scoring: behavior and emotion folded into one bounded reward.
//!
//! Two signals are combined with a fixed 70/30 weighting:
//! - implicit: what the user *did* with the suggestion (accept/edit/delete/
//!   ignore, refined by edit distance)
//! - emotional: what the user *said* about it (sentiment signal, or an
//!   explicit numeric rating when the user gave one)
//!
//! The implicit reward is a tiered table rather than a continuous function:
//! coarse bands are more robust to noisy edit-distance measurement than a
//! smooth curve.

use crate::action::UserAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weight of the implicit (behavioral) signal in the combined score.
pub const IMPLICIT_WEIGHT: f32 = 0.7;
/// Weight of the emotional (sentiment or explicit rating) signal.
pub const EMOTIONAL_WEIGHT: f32 = 0.3;

/// A captured user reaction, scored and ready for storage.
///
/// Immutable once stored; all three score fields lie in `[-1, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub prompt: String,
    pub response: String,
    pub implicit_score: f32,
    pub emotional_score: f32,
    pub combined_score: f32,
    /// Domain the response was generated for (e.g. file type or framework);
    /// partitions training per adapter.
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Training-ready example shape, derived from positive feedback or from the
/// retained important-examples pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub prompt: String,
    pub response: String,
    pub score: f32,
    pub context: String,
}

impl ExampleRecord {
    pub fn from_feedback(feedback: &FeedbackRecord) -> Self {
        Self {
            prompt: feedback.prompt.clone(),
            response: feedback.response.clone(),
            score: feedback.combined_score,
            context: feedback.context.clone().unwrap_or_default(),
        }
    }
}

/// Reward for an observed user action, refined by edit distance.
///
/// `edit_distance` is a caller-supplied normalized dissimilarity in `[0, 1]`
/// between the suggested and final content; `None` means unknown.
pub fn implicit_reward(action: UserAction, edit_distance: Option<f32>) -> f32 {
    match action {
        UserAction::Accept => match edit_distance {
            None => 1.0,
            Some(d) if d < 0.1 => 1.0,
            Some(d) if d < 0.3 => 0.8,
            Some(d) if d < 0.6 => 0.5,
            Some(_) => 0.2,
        },
        UserAction::Edit => match edit_distance {
            None => 0.3,
            Some(d) if d < 0.3 => 0.5,
            Some(d) if d < 0.6 => 0.2,
            Some(_) => -0.2,
        },
        UserAction::Delete => -0.5,
        UserAction::Ignore => -0.1,
    }
}

/// Combine implicit and emotional signals with the fixed 70/30 weighting.
///
/// An explicit numeric rating, when present, is used *as* the emotional term
/// (clamped to `[-1, 1]`) — it is considered more reliable than the inferred
/// sentiment but does not bypass the weighting scheme.
pub fn combine_scores(implicit: f32, emotional: f32, explicit_override: Option<f32>) -> f32 {
    let emotional = match explicit_override {
        Some(rating) => rating.clamp(-1.0, 1.0),
        None => emotional,
    };
    IMPLICIT_WEIGHT * implicit + EMOTIONAL_WEIGHT * emotional
}

/// One tracked suggestion interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub suggestion_id: String,
    pub action: UserAction,
    pub edit_distance: Option<f32>,
    /// Seconds from suggestion to action.
    pub time_to_action: Option<f32>,
    pub at: DateTime<Utc>,
}

/// Aggregate interaction statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionStats {
    pub total: usize,
    pub accept_rate: f32,
    pub edit_rate: f32,
    pub delete_rate: f32,
    pub ignore_rate: f32,
    pub average_reward: f32,
}

/// In-memory log of suggestion interactions.
///
/// Bounded: older entries are dropped once `capacity` is exceeded, so a
/// long-lived process does not grow without limit.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    history: Vec<Interaction>,
    capacity: usize,
}

impl InteractionLog {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: Vec::new(),
            capacity,
        }
    }

    pub fn track(
        &mut self,
        suggestion_id: impl Into<String>,
        action: UserAction,
        edit_distance: Option<f32>,
        time_to_action: Option<f32>,
    ) {
        let suggestion_id = suggestion_id.into();
        tracing::debug!("interaction tracked: {} - {}", suggestion_id, action);
        self.history.push(Interaction {
            suggestion_id,
            action,
            edit_distance,
            time_to_action,
            at: Utc::now(),
        });
        if self.history.len() > self.capacity {
            let drain = self.history.len() - self.capacity;
            self.history.drain(0..drain);
        }
    }

    /// Most recent interactions, newest last.
    pub fn recent(&self, limit: usize) -> &[Interaction] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn stats(&self) -> InteractionStats {
        if self.history.is_empty() {
            return InteractionStats::default();
        }

        let total = self.history.len();
        let count = |a: UserAction| self.history.iter().filter(|i| i.action == a).count() as f32;
        let reward_sum: f32 = self
            .history
            .iter()
            .map(|i| implicit_reward(i.action, i.edit_distance))
            .sum();

        InteractionStats {
            total,
            accept_rate: count(UserAction::Accept) / total as f32,
            edit_rate: count(UserAction::Edit) / total as f32,
            delete_rate: count(UserAction::Delete) / total as f32,
            ignore_rate: count(UserAction::Ignore) / total as f32,
            average_reward: reward_sum / total as f32,
        }
    }
}

impl Default for InteractionLog {
    fn default() -> Self {
        Self::new()
    }
}
