//! Activity gate: tracks the last user activity and answers "has this
//! running process been idle long enough to sleep?"
//!
//! Two logical states, ACTIVE and INACTIVE. The only transition into
//! INACTIVE is wall-clock elapse; `record_activity` always forces ACTIVE by
//! resetting the timer. The timestamp is never persisted — a restart starts
//! the gate fresh, answering for this process only.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Gate state as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Active,
    Inactive,
}

/// Status report for the sleep surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepStatus {
    pub state: GateState,
    pub last_activity: Option<DateTime<Utc>>,
    pub threshold_minutes: i64,
}

/// Shared last-activity tracker with an inclusive inactivity predicate.
///
/// Safe under concurrent writers: racing `record_activity` calls resolve
/// last-writer-wins, which is all the gate needs — it only cares about the
/// most recent activity within threshold granularity.
pub struct ActivityGate {
    last_activity: RwLock<Option<DateTime<Utc>>>,
    threshold: Duration,
}

impl ActivityGate {
    pub fn new(threshold_minutes: u64) -> Self {
        tracing::info!(
            "activity gate initialized (threshold: {} minutes)",
            threshold_minutes
        );
        Self {
            last_activity: RwLock::new(None),
            threshold: Duration::minutes(threshold_minutes as i64),
        }
    }

    /// Mark the user as active right now.
    pub async fn record_activity(&self) {
        let mut last = self.last_activity.write().await;
        *last = Some(Utc::now());
    }

    /// True once the idle time reaches the threshold (boundary inclusive).
    /// False while activity is recent — and false when no activity has ever
    /// been recorded: a process that has not seen a user is not "idle after
    /// activity", and consolidation should not fire on boot.
    pub async fn is_inactive(&self) -> bool {
        self.is_inactive_at(Utc::now()).await
    }

    /// The pure predicate against a supplied clock.
    pub async fn is_inactive_at(&self, now: DateTime<Utc>) -> bool {
        let last = self.last_activity.read().await;
        match *last {
            None => false,
            Some(last_time) => now - last_time >= self.threshold,
        }
    }

    pub async fn last_activity(&self) -> Option<DateTime<Utc>> {
        *self.last_activity.read().await
    }

    pub fn threshold_minutes(&self) -> i64 {
        self.threshold.num_minutes()
    }

    pub async fn status(&self) -> SleepStatus {
        let state = if self.is_inactive().await {
            GateState::Inactive
        } else {
            GateState::Active
        };
        SleepStatus {
            state,
            last_activity: self.last_activity().await,
            threshold_minutes: self.threshold_minutes(),
        }
    }
}
