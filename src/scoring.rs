//! Similarity between the user's wave and a target wave.
//!
//! Two formulas live here and they are not interchangeable:
//!
//! * [MatchScorer::score] is the conjunctive gate. Every parameter is scored on its own and
//!   `overall` is the weakest of them, so a match can't be bought by overshooting one knob.
//!   All "is this a match" decisions go through it.
//! * [MatchScores::display_percent] averages the per-parameter scores. It is softer and only
//!   meant for the percentage printed next to the sliders.

use crate::wave::{ParamRange, Parameter, WaveParameters};
use serde::Serialize;
use std::f64::consts::{PI, TAU};
use strum::Display;

/// Slack applied to tolerance checks so slider steps that land on float noise still count.
const TOLERANCE_EPSILON: f64 = 1e-9;

/// Per-parameter and overall similarity, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MatchScores {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
    /// The minimum of the three scores above.
    pub overall: f64,
}

impl MatchScores {
    /// Whether the conjunctive score clears `threshold`. The boundary itself counts.
    pub fn is_match(&self, threshold: f64) -> bool {
        self.overall >= threshold
    }

    /// Cosmetic 0-100 percentage: the rounded average of the three scores.
    pub fn display_percent(&self) -> u8 {
        let average = (self.amplitude + self.frequency + self.phase) / 3.0;
        (average.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    pub fn tier(&self) -> MatchTier {
        MatchTier::from_percent(self.display_percent())
    }
}

/// Coarse bucket used to color the match percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchTier {
    Perfect,
    Close,
    Warm,
    Cold,
}

impl MatchTier {
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            95.. => Self::Perfect,
            80..=94 => Self::Close,
            50..=79 => Self::Warm,
            _ => Self::Cold,
        }
    }
}

/// Scores parameter sets against each other using the legal slider ranges for normalization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchScorer {
    amplitude_range: ParamRange,
    frequency_range: ParamRange,
}

impl MatchScorer {
    pub fn new(amplitude_range: ParamRange, frequency_range: ParamRange) -> Self {
        Self { amplitude_range, frequency_range }
    }

    pub fn score(&self, user: &WaveParameters, target: &WaveParameters) -> MatchScores {
        let amplitude = linear_score((user.amplitude - target.amplitude).abs(), self.amplitude_range.width());
        let frequency = linear_score((user.frequency - target.frequency).abs(), self.frequency_range.width());
        let phase = phase_score(user.phase, target.phase);
        let overall = amplitude.min(frequency).min(phase);
        MatchScores { amplitude, frequency, phase, overall }
    }
}

impl Default for MatchScorer {
    fn default() -> Self {
        Self::new(ParamRange::new(0.5, 2.0), ParamRange::new(0.5, 3.0))
    }
}

/// `1 - diff / width`, floored at zero.
///
/// A zero-width range can't be normalized against: only an exact match scores.
pub fn linear_score(diff: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return if diff == 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - diff / width).max(0.0)
}

/// Shortest distance between two angles, in `[0, π]`.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs().rem_euclid(TAU);
    diff.min(TAU - diff)
}

/// Phase similarity where half a turn apart is the worst possible score.
pub fn phase_score(user: f64, target: f64) -> f64 {
    (1.0 - circular_distance(user, target) / PI).max(0.0)
}

/// Distance between a live value and an anchor for the given parameter.
///
/// Phase is measured around the circle, the others on the line.
pub fn parameter_distance(parameter: Parameter, live: f64, anchor: f64) -> f64 {
    match parameter {
        Parameter::Phase => circular_distance(live, anchor),
        Parameter::Amplitude | Parameter::Frequency => (live - anchor).abs(),
    }
}

/// Whether `live` is close enough to `anchor`. A difference exactly at the tolerance matches.
pub fn within_tolerance(parameter: Parameter, live: f64, anchor: f64, tolerance: f64) -> bool {
    parameter_distance(parameter, live, anchor) <= tolerance + TOLERANCE_EPSILON
}

/// Eases a score into a glow intensity: `score^1.5`.
///
/// Score 0.5 gives ~0.35 and 0.8 gives ~0.72, so partial matches already light up.
pub fn glow(score: f64) -> f64 {
    score.clamp(0.0, 1.0).powf(1.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::f64::consts::FRAC_PI_2;

    fn scorer() -> MatchScorer {
        MatchScorer::default()
    }

    #[rstest]
    #[case(WaveParameters::new(1.0, 1.0, 0.0))]
    #[case(WaveParameters::new(2.0, 3.0, 3.0 * FRAC_PI_2))]
    #[case(WaveParameters::new(0.5, 0.5, 6.2))]
    fn identical_parameters_score_perfectly(#[case] params: WaveParameters) {
        let scores = scorer().score(&params, &params);
        assert!((scores.overall - 1.0).abs() < 1e-12);
        assert_eq!(scores.display_percent(), 100);
    }

    #[test]
    fn overall_is_the_weakest_parameter() {
        let target = WaveParameters::new(1.0, 1.0, 0.0);
        let user = WaveParameters::new(1.75, 1.0, 0.0);
        let scores = scorer().score(&user, &target);
        assert!((scores.amplitude - 0.5).abs() < 1e-12);
        assert_eq!(scores.frequency, 1.0);
        assert_eq!(scores.overall, scores.amplitude);
        // the averaged display is kinder than the gate
        assert_eq!(scores.display_percent(), 83);
        assert!(!scores.is_match(0.95));
    }

    #[rstest]
    #[case(0.95, true)]
    #[case(0.96, true)]
    #[case(0.949_999, false)]
    fn threshold_boundary_counts_as_match(#[case] overall: f64, #[case] expected: bool) {
        let scores = MatchScores { amplitude: 1.0, frequency: 1.0, phase: overall, overall };
        assert_eq!(scores.is_match(0.95), expected);
    }

    #[test]
    fn scores_floor_at_zero() {
        let scorer = MatchScorer::new(ParamRange::new(0.5, 1.0), ParamRange::new(0.5, 1.0));
        let scores = scorer.score(&WaveParameters::new(3.0, 3.0, 0.0), &WaveParameters::NEUTRAL);
        assert_eq!(scores.amplitude, 0.0);
        assert_eq!(scores.frequency, 0.0);
    }

    #[test]
    fn phase_wraps_around() {
        let scores = scorer().score(&WaveParameters::new(1.0, 1.0, 6.2), &WaveParameters::new(1.0, 1.0, 0.1));
        assert!(scores.phase > 0.94, "{}", scores.phase);
    }

    #[test]
    fn opposite_phase_scores_zero() {
        assert!(phase_score(0.0, PI).abs() < 1e-12);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(0.1, 6.2)]
    #[case(1.0, 4.5)]
    #[case(PI, 0.0)]
    #[case(-3.0, 9.0)]
    #[case(5.9, 0.3)]
    fn circular_distance_is_bounded_and_symmetric(#[case] a: f64, #[case] b: f64) {
        let forward = circular_distance(a, b);
        let backward = circular_distance(b, a);
        assert!(forward <= PI + 1e-12);
        assert!(forward >= 0.0);
        assert_eq!(forward, backward);
    }

    #[rstest]
    #[case(0.0, 0.0, 1.0)]
    #[case(0.1, 0.0, 0.0)]
    #[case(0.0, -1.0, 1.0)]
    fn degenerate_ranges_do_not_divide_by_zero(#[case] diff: f64, #[case] width: f64, #[case] expected: f64) {
        assert_eq!(linear_score(diff, width), expected);
    }

    #[test]
    fn glow_endpoints_and_monotonicity() {
        assert_eq!(glow(0.0), 0.0);
        assert_eq!(glow(1.0), 1.0);
        let mut previous = 0.0;
        for step in 0..=100 {
            let value = glow(step as f64 / 100.0);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[rstest]
    #[case(Parameter::Amplitude, 1.9, 2.0, 0.1, true)]
    #[case(Parameter::Amplitude, 1.95, 2.0, 0.1, true)]
    #[case(Parameter::Amplitude, 1.5, 2.0, 0.1, false)]
    #[case(Parameter::Frequency, 2.15, 2.0, 0.15, true)]
    #[case(Parameter::Frequency, 2.2, 2.0, 0.15, false)]
    #[case(Parameter::Phase, 1.4, FRAC_PI_2, 0.2, true)]
    #[case(Parameter::Phase, 6.2, 0.05, 0.2, true)]
    fn tolerance_checks(
        #[case] parameter: Parameter,
        #[case] live: f64,
        #[case] anchor: f64,
        #[case] tolerance: f64,
        #[case] expected: bool,
    ) {
        assert_eq!(within_tolerance(parameter, live, anchor, tolerance), expected);
    }

    #[rstest]
    #[case(100, MatchTier::Perfect)]
    #[case(95, MatchTier::Perfect)]
    #[case(94, MatchTier::Close)]
    #[case(50, MatchTier::Warm)]
    #[case(12, MatchTier::Cold)]
    fn tiers(#[case] percent: u8, #[case] tier: MatchTier) {
        assert_eq!(MatchTier::from_percent(percent), tier);
    }
}
