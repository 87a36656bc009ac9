//! Storage contract consumed by the consolidation engine.
//!
//! The engine never owns durable state itself: feedback lives forever in the
//! external store, and the store decides how. [`crate::sqlite::SqliteStore`]
//! is the reference implementation.

use anyhow::Result;
use async_trait::async_trait;
use hypnos_core::{ExampleRecord, FeedbackRecord};
use serde::{Deserialize, Serialize};

/// A scored reaction about to be stored. The store assigns the id and
/// timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFeedback {
    pub prompt: String,
    pub response: String,
    pub implicit_score: f32,
    pub emotional_score: f32,
    pub combined_score: f32,
    pub context: Option<String>,
}

/// A validated learning module whose examples may augment a consolidation
/// run. Only validated courses are ever surfaced through [`Storage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: i64,
    pub name: String,
}

/// External store contract: feedback, the retained important-examples pool,
/// and the course accessors used by the optional augmentation step.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist one captured reaction; returns its id.
    async fn store_feedback(&self, feedback: NewFeedback) -> Result<i64>;

    /// Every stored feedback record. The engine filters; the store does not.
    async fn get_all_feedbacks(&self) -> Result<Vec<FeedbackRecord>>;

    /// Retained important examples, highest score first.
    async fn get_important_examples(&self, limit: i64) -> Result<Vec<ExampleRecord>>;

    /// Add an example to the retained pool.
    async fn add_important_example(&self, example: &ExampleRecord) -> Result<i64>;

    /// Courses that have passed validation.
    async fn get_validated_courses(&self) -> Result<Vec<CourseRecord>>;

    /// Replay-ready examples for one course.
    async fn get_course_examples(&self, course_id: i64, limit: i64) -> Result<Vec<ExampleRecord>>;
}
