//! Training backend contract and the reference adapter registry stub.
//!
//! The orchestrator treats the backend as opaque, possibly slow, and
//! possibly failing; it imposes no retry or timeout policy of its own. Any
//! such policy belongs to the backend implementation — this boundary keeps
//! the scheduling/mixing policy isolated from how model weights are
//! actually updated.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hypnos_core::{ExampleRecord, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// Result of one incremental training call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub contexts_trained: usize,
    pub examples_seen: usize,
}

/// Result of flushing trained adapter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistOutcome {
    pub adapters_updated: usize,
    pub adapter_names: Vec<String>,
}

/// The two operations this engine depends on.
#[async_trait]
pub trait TrainingBackend: Send + Sync {
    /// Incrementally train on a batch of examples (typically one context
    /// group). May block for a long time.
    async fn train_incremental(&self, examples: &[ExampleRecord]) -> Result<TrainingOutcome>;

    /// Flush trained state to durable adapters.
    async fn update_adapters(&self) -> Result<PersistOutcome>;
}

/// Adapter lifecycle slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterVersion {
    /// Receives incremental updates during training.
    Staging,
    /// Promoted copy served for generation.
    Stable,
}

/// Bookkeeping handle for one adapter slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterHandle {
    pub context: String,
    pub version: AdapterVersion,
    pub updates: u64,
    pub examples_seen: u64,
    pub last_trained: Option<DateTime<Utc>>,
}

impl AdapterHandle {
    fn new(context: &str, version: AdapterVersion) -> Self {
        Self {
            context: context.to_string(),
            version,
            updates: 0,
            examples_seen: 0,
            last_trained: None,
        }
    }

    pub fn name(&self) -> String {
        match self.version {
            AdapterVersion::Staging => format!("{}:staging", self.context),
            AdapterVersion::Stable => format!("{}:stable", self.context),
        }
    }
}

/// Reference [`TrainingBackend`]: an explicit keyed registry of
/// `(context, version) → handle`.
///
/// Training bumps the staging handle per context; `update_adapters` promotes
/// every context trained since the last flush to its stable slot. No real
/// gradient work happens here — the registry records exactly what a real
/// backend would be asked to do.
pub struct AdapterRegistry {
    adapters: RwLock<BTreeMap<(String, AdapterVersion), AdapterHandle>>,
    /// Contexts trained since the last `update_adapters` flush.
    dirty: RwLock<BTreeSet<String>>,
    config: TrainingConfig,
}

impl AdapterRegistry {
    pub fn new(config: TrainingConfig) -> Self {
        tracing::info!(
            "adapter registry initialized (lr={}, batch_size={}, epochs={})",
            config.learning_rate,
            config.batch_size,
            config.num_epochs
        );
        Self {
            adapters: RwLock::new(BTreeMap::new()),
            dirty: RwLock::new(BTreeSet::new()),
            config,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub async fn get(&self, context: &str, version: AdapterVersion) -> Option<AdapterHandle> {
        self.adapters
            .read()
            .await
            .get(&(context.to_string(), version))
            .cloned()
    }

    pub async fn list(&self) -> Vec<AdapterHandle> {
        self.adapters.read().await.values().cloned().collect()
    }

    /// Copy the staging handle into the stable slot. Returns false when the
    /// context has no staging adapter.
    pub async fn promote_to_stable(&self, context: &str) -> bool {
        let mut adapters = self.adapters.write().await;
        let Some(staging) = adapters
            .get(&(context.to_string(), AdapterVersion::Staging))
            .cloned()
        else {
            return false;
        };
        let mut stable = staging;
        stable.version = AdapterVersion::Stable;
        tracing::debug!("promoting adapter to stable: {}", context);
        adapters.insert((context.to_string(), AdapterVersion::Stable), stable);
        true
    }
}

#[async_trait]
impl TrainingBackend for AdapterRegistry {
    async fn train_incremental(&self, examples: &[ExampleRecord]) -> Result<TrainingOutcome> {
        if examples.is_empty() {
            return Ok(TrainingOutcome {
                contexts_trained: 0,
                examples_seen: 0,
            });
        }

        let mut by_context: BTreeMap<&str, usize> = BTreeMap::new();
        for example in examples {
            *by_context.entry(example.context.as_str()).or_default() += 1;
        }

        let mut adapters = self.adapters.write().await;
        let mut dirty = self.dirty.write().await;
        for (context, count) in &by_context {
            let handle = adapters
                .entry((context.to_string(), AdapterVersion::Staging))
                .or_insert_with(|| AdapterHandle::new(context, AdapterVersion::Staging));
            handle.updates += 1;
            handle.examples_seen += *count as u64;
            handle.last_trained = Some(Utc::now());
            dirty.insert(context.to_string());
            tracing::info!("trained adapter for context: {} ({} examples)", context, count);
        }

        Ok(TrainingOutcome {
            contexts_trained: by_context.len(),
            examples_seen: examples.len(),
        })
    }

    async fn update_adapters(&self) -> Result<PersistOutcome> {
        let contexts: Vec<String> = {
            let mut dirty = self.dirty.write().await;
            std::mem::take(&mut *dirty).into_iter().collect()
        };

        let mut adapter_names = Vec::new();
        for context in &contexts {
            if self.promote_to_stable(context).await {
                adapter_names.push(format!("{context}:stable"));
            }
        }

        tracing::info!("adapters updated: {}", adapter_names.len());
        Ok(PersistOutcome {
            adapters_updated: adapter_names.len(),
            adapter_names,
        })
    }
}
