pub mod action;
pub mod config;
pub mod feedback;
pub mod sentiment;

pub use action::{ParseActionError, UserAction};
pub use config::{HypnosConfig, ReplayConfig, SleepConfig, TrainingConfig};
pub use feedback::{
    combine_scores, implicit_reward, ExampleRecord, FeedbackRecord, Interaction, InteractionLog,
    InteractionStats, EMOTIONAL_WEIGHT, IMPLICIT_WEIGHT,
};
pub use sentiment::{
    reaction_signal, LexiconAnalyzer, NeutralAnalyzer, Sentiment, SentimentAnalysis,
    SentimentAnalyzer, SentimentProbabilities,
};
