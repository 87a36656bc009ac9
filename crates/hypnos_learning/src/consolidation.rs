//! Sleep consolidation: offline learning during system idle.
//!
//! On trigger, the pipeline pulls feedback from storage, keeps the positive
//! slice, merges in validated course examples (best-effort), mixes with
//! retained history via replay, trains the backend one context at a time,
//! and persists the adapters. Every stage short-circuits to an error or
//! no-data result rather than retrying; re-invocation is the caller's
//! responsibility.

use anyhow::{Context, Result};
use hypnos_core::ExampleRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::gate::ActivityGate;
use crate::replay::ReplayBuffer;
use crate::store::Storage;
use crate::training::{PersistOutcome, TrainingBackend, TrainingOutcome};

/// Grouping key for examples without a context.
const GENERIC_CONTEXT: &str = "generic";

/// Consolidation pipeline settings.
#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    /// Feedback above this combined score becomes training evidence.
    pub positive_score_threshold: f32,
    /// Retained important examples pulled for replay.
    pub important_examples_limit: i64,
    /// Cap on course examples merged in per run.
    pub course_examples_limit: i64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            positive_score_threshold: 0.7,
            important_examples_limit: 100,
            course_examples_limit: 50,
        }
    }
}

/// Terminal state of one consolidation run.
///
/// `Active` and `NoData` are expected steady-state outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    NoData,
    Success,
    Error,
}

/// Per-context training result; one context failing does not abort others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContextOutcome {
    Trained(TrainingOutcome),
    Failed { message: String },
}

/// Result of one orchestration call. Born and dies with the call; nothing
/// here is persisted by this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationRun {
    pub status: RunStatus,
    pub message: Option<String>,
    /// Count of new (positive) examples that entered the run.
    pub feedbacks_processed: usize,
    pub dataset_size: usize,
    pub per_context: BTreeMap<String, ContextOutcome>,
    pub persist: Option<PersistOutcome>,
}

impl ConsolidationRun {
    fn active() -> Self {
        Self::terminal(
            RunStatus::Active,
            "System is still active, no consolidation needed",
        )
    }

    fn no_data(message: &str) -> Self {
        Self::terminal(RunStatus::NoData, message)
    }

    fn error(message: String) -> Self {
        Self {
            status: RunStatus::Error,
            message: Some(message),
            feedbacks_processed: 0,
            dataset_size: 0,
            per_context: BTreeMap::new(),
            persist: None,
        }
    }

    fn terminal(status: RunStatus, message: &str) -> Self {
        Self {
            status,
            message: Some(message.to_string()),
            feedbacks_processed: 0,
            dataset_size: 0,
            per_context: BTreeMap::new(),
            persist: None,
        }
    }
}

/// The consolidation orchestrator.
pub struct SleepConsolidator {
    gate: Arc<ActivityGate>,
    replay: ReplayBuffer,
    store: Arc<dyn Storage>,
    backend: Arc<dyn TrainingBackend>,
    config: ConsolidationConfig,
    /// Serializes runs: consolidation must never execute twice concurrently
    /// against the same store and backend. In-process only; cross-process
    /// exclusion is a deployment concern.
    run_lock: Mutex<()>,
}

impl SleepConsolidator {
    pub fn new(
        gate: Arc<ActivityGate>,
        replay: ReplayBuffer,
        store: Arc<dyn Storage>,
        backend: Arc<dyn TrainingBackend>,
        config: ConsolidationConfig,
    ) -> Self {
        Self {
            gate,
            replay,
            store,
            backend,
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// Consolidate if the system has been idle long enough. Returns an
    /// `Active` run while the gate reports activity — the expected steady
    /// state, not an error.
    pub async fn consolidate(&self) -> ConsolidationRun {
        if !self.gate.is_inactive().await {
            return ConsolidationRun::active();
        }
        self.run().await
    }

    /// Consolidate now, bypassing the gate. Used by explicit operator
    /// requests.
    pub async fn trigger_manual(&self) -> ConsolidationRun {
        tracing::info!("manual sleep consolidation triggered");
        self.run().await
    }

    async fn run(&self) -> ConsolidationRun {
        let _guard = self.run_lock.lock().await;
        tracing::info!("starting sleep consolidation...");

        match self.run_inner().await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!("error during sleep consolidation: {:#}", e);
                ConsolidationRun::error(format!("{e:#}"))
            }
        }
    }

    async fn run_inner(&self) -> Result<ConsolidationRun> {
        // 1. Extract
        let all_feedbacks = self
            .store
            .get_all_feedbacks()
            .await
            .context("extracting feedback from storage")?;
        tracing::info!("extracted {} feedbacks from storage", all_feedbacks.len());

        // 2. Filter positive
        let positive: Vec<ExampleRecord> = all_feedbacks
            .iter()
            .filter(|f| f.combined_score > self.config.positive_score_threshold)
            .map(ExampleRecord::from_feedback)
            .collect();
        tracing::info!("filtered {} positive feedbacks", positive.len());

        if positive.is_empty() {
            return Ok(ConsolidationRun::no_data(
                "No positive feedbacks to consolidate",
            ));
        }

        // 3. Old pool + best-effort course augmentation
        let mut old_examples = self
            .store
            .get_important_examples(self.config.important_examples_limit)
            .await
            .context("fetching important examples")?;

        match self.course_examples().await {
            Ok(course_examples) if !course_examples.is_empty() => {
                tracing::info!(
                    "adding {} examples from validated courses",
                    course_examples.len()
                );
                old_examples.extend(course_examples);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("error getting course examples: {:#}", e),
        }

        // 4. Mix
        let feedbacks_processed = positive.len();
        let dataset = self.replay.mix(old_examples, positive);
        tracing::info!("created dataset with {} examples (replay)", dataset.len());

        self.train_and_persist(feedbacks_processed, dataset).await
    }

    /// Consolidate one validated course's examples through the same
    /// mix/train/persist tail, without the feedback filter.
    pub async fn consolidate_course(&self, course_id: i64) -> ConsolidationRun {
        let _guard = self.run_lock.lock().await;
        tracing::info!("consolidating knowledge from course {}", course_id);

        match self.consolidate_course_inner(course_id).await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!("error consolidating course knowledge: {:#}", e);
                ConsolidationRun::error(format!("{e:#}"))
            }
        }
    }

    async fn consolidate_course_inner(&self, course_id: i64) -> Result<ConsolidationRun> {
        let course_examples = self
            .store
            .get_course_examples(course_id, self.config.course_examples_limit * 2)
            .await
            .context("fetching course examples")?;

        if course_examples.is_empty() {
            return Ok(ConsolidationRun::no_data("No examples found for course"));
        }

        let old_examples = self
            .store
            .get_important_examples(self.config.important_examples_limit)
            .await
            .context("fetching important examples")?;

        let examples_processed = course_examples.len();
        let dataset = self.replay.mix(old_examples, course_examples);

        self.train_and_persist(examples_processed, dataset).await
    }

    /// Shared pipeline tail: group by context, train each group
    /// independently, then flush adapters.
    async fn train_and_persist(
        &self,
        feedbacks_processed: usize,
        dataset: Vec<ExampleRecord>,
    ) -> Result<ConsolidationRun> {
        let dataset_size = dataset.len();

        let mut by_context: BTreeMap<String, Vec<ExampleRecord>> = BTreeMap::new();
        for example in dataset {
            let key = if example.context.is_empty() {
                GENERIC_CONTEXT.to_string()
            } else {
                example.context.clone()
            };
            by_context.entry(key).or_default().push(example);
        }

        let mut per_context = BTreeMap::new();
        for (context, group) in by_context {
            tracing::info!(
                "training adapter for context: {} ({} examples)",
                context,
                group.len()
            );
            match self.backend.train_incremental(&group).await {
                Ok(outcome) => {
                    per_context.insert(context, ContextOutcome::Trained(outcome));
                }
                Err(e) => {
                    tracing::warn!("training failed for context {}: {:#}", context, e);
                    per_context.insert(
                        context,
                        ContextOutcome::Failed {
                            message: format!("{e:#}"),
                        },
                    );
                }
            }
        }

        let persist = self
            .backend
            .update_adapters()
            .await
            .context("updating adapters")?;
        tracing::info!("adapters updated");

        Ok(ConsolidationRun {
            status: RunStatus::Success,
            message: None,
            feedbacks_processed,
            dataset_size,
            per_context,
            persist: Some(persist),
        })
    }

    /// Collect replay-ready examples from every validated course, split
    /// evenly across courses and capped by config. Failures here are the
    /// caller's to swallow — augmentation is best-effort by design.
    async fn course_examples(&self) -> Result<Vec<ExampleRecord>> {
        let courses = self.store.get_validated_courses().await?;
        if courses.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.config.course_examples_limit;
        let per_course = (limit / courses.len() as i64).max(1);

        let mut examples = Vec::new();
        for course in &courses {
            let mut batch = self.store.get_course_examples(course.id, per_course).await?;
            examples.append(&mut batch);
        }

        examples.truncate(limit as usize);
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CourseRecord, NewFeedback};
    use anyhow::bail;
    use async_trait::async_trait;
    use chrono::Utc;
    use hypnos_core::FeedbackRecord;
    use tokio::sync::RwLock;

    /// In-memory store for pipeline tests.
    #[derive(Default)]
    struct MemoryStore {
        feedbacks: RwLock<Vec<FeedbackRecord>>,
        important: RwLock<Vec<ExampleRecord>>,
        fail_feedback_fetch: bool,
        fail_courses: bool,
    }

    impl MemoryStore {
        async fn push_feedback(&self, combined_score: f32, context: Option<&str>) {
            let mut feedbacks = self.feedbacks.write().await;
            let id = feedbacks.len() as i64 + 1;
            feedbacks.push(FeedbackRecord {
                id,
                prompt: format!("prompt {id}"),
                response: format!("response {id}"),
                implicit_score: combined_score,
                emotional_score: combined_score,
                combined_score,
                context: context.map(String::from),
                created_at: Utc::now(),
            });
        }
    }

    #[async_trait]
    impl Storage for MemoryStore {
        async fn store_feedback(&self, _feedback: NewFeedback) -> Result<i64> {
            unimplemented!("not exercised by these tests")
        }

        async fn get_all_feedbacks(&self) -> Result<Vec<FeedbackRecord>> {
            if self.fail_feedback_fetch {
                bail!("storage unreachable");
            }
            Ok(self.feedbacks.read().await.clone())
        }

        async fn get_important_examples(&self, limit: i64) -> Result<Vec<ExampleRecord>> {
            let mut examples = self.important.read().await.clone();
            examples.sort_by(|a, b| b.score.total_cmp(&a.score));
            examples.truncate(limit as usize);
            Ok(examples)
        }

        async fn add_important_example(&self, example: &ExampleRecord) -> Result<i64> {
            let mut important = self.important.write().await;
            important.push(example.clone());
            Ok(important.len() as i64)
        }

        async fn get_validated_courses(&self) -> Result<Vec<CourseRecord>> {
            if self.fail_courses {
                bail!("course table corrupted");
            }
            Ok(Vec::new())
        }

        async fn get_course_examples(
            &self,
            _course_id: i64,
            _limit: i64,
        ) -> Result<Vec<ExampleRecord>> {
            Ok(Vec::new())
        }
    }

    /// Backend that records calls and optionally fails one context.
    #[derive(Default)]
    struct RecordingBackend {
        trained: RwLock<Vec<Vec<ExampleRecord>>>,
        persists: RwLock<usize>,
        fail_context: Option<String>,
    }

    #[async_trait]
    impl TrainingBackend for RecordingBackend {
        async fn train_incremental(&self, examples: &[ExampleRecord]) -> Result<TrainingOutcome> {
            if let Some(fail) = &self.fail_context {
                if examples.iter().any(|e| &e.context == fail) {
                    bail!("GPU fell over");
                }
            }
            self.trained.write().await.push(examples.to_vec());
            Ok(TrainingOutcome {
                contexts_trained: 1,
                examples_seen: examples.len(),
            })
        }

        async fn update_adapters(&self) -> Result<PersistOutcome> {
            *self.persists.write().await += 1;
            Ok(PersistOutcome {
                adapters_updated: 1,
                adapter_names: vec!["generic:stable".to_string()],
            })
        }
    }

    fn consolidator(
        store: Arc<MemoryStore>,
        backend: Arc<RecordingBackend>,
        gate: Arc<ActivityGate>,
    ) -> SleepConsolidator {
        SleepConsolidator::new(
            gate,
            ReplayBuffer::new(),
            store,
            backend,
            ConsolidationConfig::default(),
        )
    }

    #[tokio::test]
    async fn gate_blocks_while_active() {
        let store = Arc::new(MemoryStore::default());
        store.push_feedback(0.9, None).await;
        let backend = Arc::new(RecordingBackend::default());
        let gate = Arc::new(ActivityGate::new(30));
        gate.record_activity().await;

        let run = consolidator(store, backend.clone(), gate).consolidate().await;
        assert_eq!(run.status, RunStatus::Active);
        // Nothing reached the backend.
        assert!(backend.trained.read().await.is_empty());
    }

    #[tokio::test]
    async fn no_positive_feedback_is_no_data() {
        let store = Arc::new(MemoryStore::default());
        store.push_feedback(0.4, None).await;
        store.push_feedback(0.7, None).await; // threshold is strict
        let backend = Arc::new(RecordingBackend::default());
        let gate = Arc::new(ActivityGate::new(30));

        let run = consolidator(store, backend, gate).trigger_manual().await;
        assert_eq!(run.status, RunStatus::NoData);
    }

    #[tokio::test]
    async fn successful_run_reports_counts_and_contexts() {
        let store = Arc::new(MemoryStore::default());
        store.push_feedback(0.85, Some("rust")).await;
        store.push_feedback(0.4, Some("rust")).await;
        store.push_feedback(0.95, None).await;
        let backend = Arc::new(RecordingBackend::default());
        let gate = Arc::new(ActivityGate::new(30));

        let run = consolidator(store, backend.clone(), gate).trigger_manual().await;
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.feedbacks_processed, 2);
        assert_eq!(run.dataset_size, 2);
        assert!(run.per_context.contains_key("rust"));
        assert!(run.per_context.contains_key("generic"));
        assert_eq!(*backend.persists.read().await, 1);
        assert!(run.persist.is_some());
    }

    #[tokio::test]
    async fn one_failing_context_does_not_abort_the_run() {
        let store = Arc::new(MemoryStore::default());
        store.push_feedback(0.85, Some("rust")).await;
        store.push_feedback(0.9, Some("python")).await;
        let backend = Arc::new(RecordingBackend {
            fail_context: Some("python".to_string()),
            ..Default::default()
        });
        let gate = Arc::new(ActivityGate::new(30));

        let run = consolidator(store, backend, gate).trigger_manual().await;
        assert_eq!(run.status, RunStatus::Success);
        assert!(matches!(
            run.per_context.get("rust"),
            Some(ContextOutcome::Trained(_))
        ));
        assert!(matches!(
            run.per_context.get("python"),
            Some(ContextOutcome::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn storage_failure_is_an_error_run() {
        let store = Arc::new(MemoryStore {
            fail_feedback_fetch: true,
            ..Default::default()
        });
        let backend = Arc::new(RecordingBackend::default());
        let gate = Arc::new(ActivityGate::new(30));

        let run = consolidator(store, backend, gate).trigger_manual().await;
        assert_eq!(run.status, RunStatus::Error);
        assert!(run.message.unwrap().contains("storage unreachable"));
    }

    #[tokio::test]
    async fn augmentation_failure_is_swallowed() {
        let store = Arc::new(MemoryStore {
            fail_courses: true,
            ..Default::default()
        });
        store.push_feedback(0.85, None).await;
        let backend = Arc::new(RecordingBackend::default());
        let gate = Arc::new(ActivityGate::new(30));

        let run = consolidator(store, backend, gate).trigger_manual().await;
        // Best-effort: the run still succeeds.
        assert_eq!(run.status, RunStatus::Success);
    }

    #[tokio::test]
    async fn replay_mixes_important_examples_in() {
        let store = Arc::new(MemoryStore::default());
        // Ten new positives and ten retained examples: floor(10*0.3) = 3 old.
        for _ in 0..10 {
            store.push_feedback(0.9, None).await;
        }
        for i in 0..10 {
            store
                .add_important_example(&ExampleRecord {
                    prompt: format!("old {i}"),
                    response: String::new(),
                    score: i as f32 / 10.0,
                    context: String::new(),
                })
                .await
                .unwrap();
        }
        let backend = Arc::new(RecordingBackend::default());
        let gate = Arc::new(ActivityGate::new(30));

        let run = consolidator(store, backend, gate).trigger_manual().await;
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.feedbacks_processed, 10);
        assert_eq!(run.dataset_size, 13);
    }
}
