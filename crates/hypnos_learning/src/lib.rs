pub mod consolidation;
pub mod coordinator;
pub mod gate;
pub mod replay;
pub mod sqlite;
pub mod store;
pub mod training;

pub use consolidation::{
    ConsolidationConfig, ConsolidationRun, ContextOutcome, RunStatus, SleepConsolidator,
};
pub use coordinator::{AssistantCoordinator, FeedbackCapture};
pub use gate::{ActivityGate, GateState, SleepStatus};
pub use replay::ReplayBuffer;
pub use sqlite::SqliteStore;
pub use store::{CourseRecord, NewFeedback, Storage};
pub use training::{
    AdapterHandle, AdapterRegistry, AdapterVersion, PersistOutcome, TrainingBackend,
    TrainingOutcome,
};
