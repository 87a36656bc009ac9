//! Emotional signal extraction from user reaction text.
//!
//! The classifier itself is an external oracle: anything that can produce
//! per-class probabilities implements [`SentimentAnalyzer`]. This module owns
//! the mapping from those probabilities to a signed scalar in `[-1, 1]`:
//! `+p(positive)` when positive dominates, `-p(negative)` when negative
//! dominates, `0.0` otherwise.
//!
//! A keyword-lexicon analyzer ships as the reference implementation, and a
//! no-op neutral analyzer lets the engine be constructed and tested without
//! any model at all.

use serde::{Deserialize, Serialize};

/// Dominant sentiment class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Per-class probabilities as reported by the classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SentimentProbabilities {
    pub positive: f32,
    pub neutral: f32,
    pub negative: f32,
}

/// A classified reaction: dominant class, its probability, and the signed
/// scalar the scorer consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    /// Probability of the dominant class.
    pub intensity: f32,
    /// Signed scalar in `[-1, 1]`.
    pub signal: f32,
    pub probabilities: SentimentProbabilities,
}

impl SentimentAnalysis {
    /// The neutral result: no signal, used for empty reactions and by the
    /// no-op analyzer.
    pub fn neutral() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            intensity: 0.0,
            signal: 0.0,
            probabilities: SentimentProbabilities {
                positive: 0.0,
                neutral: 1.0,
                negative: 0.0,
            },
        }
    }

    /// Map per-class probabilities to a dominant class and signed signal.
    pub fn from_probabilities(probabilities: SentimentProbabilities) -> Self {
        let SentimentProbabilities {
            positive,
            neutral,
            negative,
        } = probabilities;

        let (sentiment, intensity, signal) = if positive > negative && positive > neutral {
            (Sentiment::Positive, positive, positive)
        } else if negative > positive && negative > neutral {
            (Sentiment::Negative, negative, -negative)
        } else {
            (Sentiment::Neutral, neutral, 0.0)
        };

        Self {
            sentiment,
            intensity,
            signal,
            probabilities,
        }
    }
}

/// Capability interface over the external sentiment classifier.
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> SentimentAnalysis;
}

/// Analyze a user reaction, short-circuiting empty or whitespace-only text
/// to neutral without invoking the classifier.
pub fn reaction_signal(analyzer: &dyn SentimentAnalyzer, text: &str) -> SentimentAnalysis {
    if text.trim().is_empty() {
        return SentimentAnalysis::neutral();
    }
    analyzer.analyze(text)
}

/// No-op analyzer: every reaction is neutral. Default collaborator when no
/// sentiment model is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralAnalyzer;

impl SentimentAnalyzer for NeutralAnalyzer {
    fn analyze(&self, _text: &str) -> SentimentAnalysis {
        SentimentAnalysis::neutral()
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "great", "good", "nice", "perfect", "love", "thanks", "thank", "works", "helpful", "awesome",
    "excellent", "clean", "exactly", "👍", "❤️", "🎉",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "wrong", "broken", "hate", "awful", "terrible", "useless", "ugly", "fails", "failed",
    "worse", "garbage", "annoying", "👎", "😡", "💔",
];

/// Keyword-lexicon reference analyzer.
///
/// Counts positive and negative word hits and converts them into smoothed
/// per-class probabilities; the shared mapping derives the signal. Good
/// enough for development and tests; production wires in a real classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconAnalyzer;

impl SentimentAnalyzer for LexiconAnalyzer {
    fn analyze(&self, text: &str) -> SentimentAnalysis {
        let lowered = text.to_lowercase();
        let pos = POSITIVE_WORDS
            .iter()
            .filter(|w| lowered.contains(*w))
            .count() as f32;
        let neg = NEGATIVE_WORDS
            .iter()
            .filter(|w| lowered.contains(*w))
            .count() as f32;

        // +1 of neutral mass smooths the no-hit case.
        let total = pos + neg + 1.0;
        SentimentAnalysis::from_probabilities(SentimentProbabilities {
            positive: pos / total,
            neutral: 1.0 / total,
            negative: neg / total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_dominant_maps_to_positive_signal() {
        let analysis = SentimentAnalysis::from_probabilities(SentimentProbabilities {
            positive: 0.8,
            neutral: 0.15,
            negative: 0.05,
        });
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert!((analysis.signal - 0.8).abs() < 1e-6);
    }

    #[test]
    fn negative_dominant_maps_to_negative_signal() {
        let analysis = SentimentAnalysis::from_probabilities(SentimentProbabilities {
            positive: 0.1,
            neutral: 0.2,
            negative: 0.7,
        });
        assert_eq!(analysis.sentiment, Sentiment::Negative);
        assert!((analysis.signal + 0.7).abs() < 1e-6);
    }

    #[test]
    fn neutral_dominant_has_no_signal() {
        let analysis = SentimentAnalysis::from_probabilities(SentimentProbabilities {
            positive: 0.2,
            neutral: 0.6,
            negative: 0.2,
        });
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
        assert_eq!(analysis.signal, 0.0);
    }

    #[test]
    fn empty_reaction_short_circuits() {
        struct Panicking;
        impl SentimentAnalyzer for Panicking {
            fn analyze(&self, _text: &str) -> SentimentAnalysis {
                panic!("classifier must not be invoked for empty text");
            }
        }

        let analysis = reaction_signal(&Panicking, "   \n\t ");
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
        assert_eq!(analysis.signal, 0.0);
    }

    #[test]
    fn lexicon_positive_text() {
        let analysis = LexiconAnalyzer.analyze("this is great, thanks!");
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert!(analysis.signal > 0.0);
    }

    #[test]
    fn lexicon_negative_text() {
        let analysis = LexiconAnalyzer.analyze("wrong and broken, useless");
        assert_eq!(analysis.sentiment, Sentiment::Negative);
        assert!(analysis.signal < 0.0);
    }

    #[test]
    fn lexicon_plain_text_is_neutral() {
        let analysis = LexiconAnalyzer.analyze("refactored the parser module");
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
        assert_eq!(analysis.signal, 0.0);
    }

    #[test]
    fn neutral_analyzer_ignores_text() {
        let analysis = NeutralAnalyzer.analyze("absolutely fantastic");
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
        assert_eq!(analysis.signal, 0.0);
    }
}
