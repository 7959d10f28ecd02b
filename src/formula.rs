//! The formula text assembled from what the user has found so far.

use crate::lesson::Discoveries;
use crate::wave::WaveParameters;
use std::f64::consts::PI;

const PI_FRACTION_EPSILON: f64 = 0.01;

const NAMED_FRACTIONS: [(f64, &str); 6] =
    [(0.0, "0"), (0.25, "π/4"), (0.5, "π/2"), (0.75, "3π/4"), (1.0, "π"), (2.0, "0")];

/// Formats a phase as a multiple of π, using the common fractions by name.
pub fn format_phase(phase: f64) -> String {
    let multiple = phase / PI;
    NAMED_FRACTIONS
        .iter()
        .find(|(fraction, _)| (multiple - fraction).abs() < PI_FRACTION_EPSILON)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("{multiple:.2}π"))
}

fn render(amplitude: Option<f64>, frequency: Option<f64>, phase: Option<f64>) -> String {
    let amplitude = amplitude.map(|a| format!("{a:.1}")).unwrap_or_else(|| "?".into());
    let frequency = frequency.map(|f| format!("{f:.1}")).unwrap_or_else(|| "?".into());
    let phase = phase.map(format_phase).unwrap_or_else(|| "?".into());
    format!("y = {amplitude} × sin({frequency}t + {phase})")
}

/// The partially filled formula, or `None` before the first discovery.
pub fn preview(discoveries: &Discoveries) -> Option<String> {
    if discoveries.is_empty() {
        return None;
    }
    Some(render(discoveries.amplitude, discoveries.frequency, discoveries.phase))
}

/// The complete formula for a matched wave.
pub fn reveal(values: &WaveParameters) -> String {
    render(Some(values.amplitude), Some(values.frequency), Some(values.phase))
}
