//! Property-based tests for hypnos_core scoring.
//!
//! Uses proptest to verify invariants that must hold for ALL possible inputs,
//! not just hand-picked examples.

use hypnos_core::{
    combine_scores, implicit_reward, SentimentAnalysis, SentimentProbabilities, UserAction,
    EMOTIONAL_WEIGHT, IMPLICIT_WEIGHT,
};
use proptest::prelude::*;

fn arb_action() -> impl Strategy<Value = UserAction> {
    prop_oneof![
        Just(UserAction::Accept),
        Just(UserAction::Edit),
        Just(UserAction::Delete),
        Just(UserAction::Ignore),
    ]
}

fn arb_edit_distance() -> impl Strategy<Value = Option<f32>> {
    prop_oneof![Just(None), (0.0f32..=1.0).prop_map(Some)]
}

proptest! {
    /// **Core invariant**: implicit rewards stay in [-1, 1] for every action
    /// and every valid edit distance.
    #[test]
    fn implicit_reward_is_bounded(
        action in arb_action(),
        distance in arb_edit_distance(),
    ) {
        let reward = implicit_reward(action, distance);
        prop_assert!(reward.is_finite());
        prop_assert!((-1.0..=1.0).contains(&reward), "reward out of range: {}", reward);
    }

    /// The combined score equals the fixed weighted sum and stays bounded
    /// whenever both signals are valid.
    #[test]
    fn combine_is_weighted_sum_and_bounded(
        implicit in -1.0f32..=1.0,
        emotional in -1.0f32..=1.0,
    ) {
        let combined = combine_scores(implicit, emotional, None);
        let expected = IMPLICIT_WEIGHT * implicit + EMOTIONAL_WEIGHT * emotional;
        prop_assert!((combined - expected).abs() < 1e-6);
        // A float-rounding ULP either side of the bound is acceptable.
        prop_assert!(combined.abs() <= 1.0 + 1e-6, "combined out of range: {}", combined);
    }

    /// An explicit rating replaces the emotional term entirely; the inferred
    /// sentiment has no residual influence.
    #[test]
    fn explicit_override_replaces_emotional(
        implicit in -1.0f32..=1.0,
        emotional in -1.0f32..=1.0,
        rating in -1.0f32..=1.0,
    ) {
        let with_override = combine_scores(implicit, emotional, Some(rating));
        let direct = combine_scores(implicit, rating, None);
        prop_assert!((with_override - direct).abs() < 1e-6);
    }

    /// Even wild out-of-range ratings cannot push the combined score out of
    /// bounds: the override is clamped before weighting.
    #[test]
    fn wild_ratings_stay_bounded(
        implicit in -1.0f32..=1.0,
        rating in -100.0f32..=100.0,
    ) {
        let combined = combine_scores(implicit, 0.0, Some(rating));
        prop_assert!(combined.abs() <= 1.0 + 1e-6, "combined out of range: {}", combined);
    }

    /// The dominant-class mapping always produces a signal in [-1, 1] whose
    /// sign matches the dominant class.
    #[test]
    fn sentiment_signal_matches_dominant_class(
        positive in 0.0f32..=1.0,
        neutral in 0.0f32..=1.0,
        negative in 0.0f32..=1.0,
    ) {
        let analysis = SentimentAnalysis::from_probabilities(SentimentProbabilities {
            positive,
            neutral,
            negative,
        });
        prop_assert!((-1.0..=1.0).contains(&analysis.signal));
        if positive > negative && positive > neutral {
            prop_assert!(analysis.signal > 0.0 || positive == 0.0);
        } else if negative > positive && negative > neutral {
            prop_assert!(analysis.signal < 0.0 || negative == 0.0);
        } else {
            prop_assert_eq!(analysis.signal, 0.0);
        }
    }
}
