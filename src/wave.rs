use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use strum::{Display, EnumIter};

/// One of the three knobs of a sine wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub enum Parameter {
    Amplitude,
    Frequency,
    Phase,
}

/// The parameters of `y = A × sin(f·t + φ)`.
///
/// This is a value type: every control change produces a new instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct WaveParameters {
    pub amplitude: f64,
    pub frequency: f64,
    /// Radians, kept in `[0, 2π)` by the lab.
    pub phase: f64,
}

impl WaveParameters {
    /// The unit wave every lesson starts from.
    pub const NEUTRAL: Self = Self { amplitude: 1.0, frequency: 1.0, phase: 0.0 };

    pub const fn new(amplitude: f64, frequency: f64, phase: f64) -> Self {
        Self { amplitude, frequency, phase }
    }

    pub fn get(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Amplitude => self.amplitude,
            Parameter::Frequency => self.frequency,
            Parameter::Phase => self.phase,
        }
    }

    /// Returns a copy with a single parameter replaced.
    pub fn with(mut self, parameter: Parameter, value: f64) -> Self {
        match parameter {
            Parameter::Amplitude => self.amplitude = value,
            Parameter::Frequency => self.frequency = value,
            Parameter::Phase => self.phase = value,
        };
        self
    }

    /// Angle of the rotating point at time `t` (seconds).
    pub fn angle(&self, t: f64) -> f64 {
        self.frequency * t + self.phase
    }

    /// The wave's height at time `t` (seconds).
    pub fn sample(&self, t: f64) -> f64 {
        self.amplitude * self.angle(t).sin()
    }

    /// Position of the point on the circle of radius `amplitude` whose projection is the wave.
    pub fn circle_point(&self, t: f64) -> (f64, f64) {
        let angle = self.angle(t);
        (self.amplitude * angle.cos(), self.amplitude * angle.sin())
    }
}

impl Default for WaveParameters {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Wraps any angle into `[0, 2π)`.
pub fn normalize_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// A closed interval of legal slider values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Clamps without panicking on an inverted range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}
