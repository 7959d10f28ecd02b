use crate::config::LabConfig;
use crate::wave::WaveParameters;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// What differs between a diagnose-challenge target and the neutral wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Diagnosis {
    Amplitude,
    Frequency,
    Both,
}

/// Draws challenge targets from the configured candidate pools.
///
/// Teaching anchors are removed from the pools up front so the challenge never asks for a value
/// the user has just been walked to.
#[derive(Debug)]
pub struct TargetGenerator {
    rng: fastrand::Rng,
    amplitudes: Vec<f64>,
    frequencies: Vec<f64>,
    phases: Vec<f64>,
}

impl TargetGenerator {
    pub fn new(config: &LabConfig, rng: fastrand::Rng) -> Self {
        let pools = &config.pools;
        Self {
            rng,
            amplitudes: pools.amplitude_candidates(config.anchors.amplitude).collect(),
            frequencies: pools.frequency_candidates(config.anchors.frequency).collect(),
            phases: pools.phases.clone(),
        }
    }

    pub fn with_seed(config: &LabConfig, seed: u64) -> Self {
        Self::new(config, fastrand::Rng::with_seed(seed))
    }

    /// A full random target, each field sampled independently and uniformly.
    pub fn challenge(&mut self) -> WaveParameters {
        let neutral = WaveParameters::NEUTRAL;
        let amplitude = pick(&mut self.rng, &self.amplitudes).unwrap_or(neutral.amplitude);
        let frequency = pick(&mut self.rng, &self.frequencies).unwrap_or(neutral.frequency);
        let phase = pick(&mut self.rng, &self.phases).unwrap_or(neutral.phase);
        let target = WaveParameters::new(amplitude, frequency, phase);
        tracing::debug!(?target, "generated challenge target");
        target
    }

    /// A target that differs from the neutral wave in amplitude, frequency or both.
    ///
    /// Phase stays at zero so only the diagnosed parameters move.
    pub fn diagnosis(&mut self) -> (Diagnosis, WaveParameters) {
        let variants: Vec<_> = Diagnosis::iter().collect();
        let diagnosis = variants[self.rng.usize(..variants.len())];
        let mut target = WaveParameters::NEUTRAL;
        if matches!(diagnosis, Diagnosis::Amplitude | Diagnosis::Both) {
            target.amplitude = pick_changed(&mut self.rng, &self.amplitudes, target.amplitude);
        }
        if matches!(diagnosis, Diagnosis::Frequency | Diagnosis::Both) {
            target.frequency = pick_changed(&mut self.rng, &self.frequencies, target.frequency);
        }
        tracing::debug!(%diagnosis, ?target, "generated diagnose target");
        (diagnosis, target)
    }
}

fn pick(rng: &mut fastrand::Rng, values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values[rng.usize(..values.len())])
}

/// Picks a value different from `current`, falling back to any candidate.
fn pick_changed(rng: &mut fastrand::Rng, values: &[f64], current: f64) -> f64 {
    let changed: Vec<f64> = values.iter().copied().filter(|value| (value - current).abs() > 1e-9).collect();
    pick(rng, &changed).or_else(|| pick(rng, values)).unwrap_or(current)
}
