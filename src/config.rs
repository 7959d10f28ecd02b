use crate::lesson::question_for;
use crate::wave::{ParamRange, Parameter, WaveParameters};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Every tunable of the lab.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct LabConfig {
    pub flow: FlowConfig,
    pub tolerances: ToleranceConfig,
    pub timing: TimingConfig,
    pub scoring: ScoringConfig,
    pub anchors: AnchorConfig,
    pub pools: PoolConfig,
    pub display: DisplayConfig,
}

impl LabConfig {
    /// Loads a config file and validates it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = serde_yaml::from_str(&contents)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded lab config");
        Ok(config)
    }

    /// Loads from `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// The per-user config location, e.g. `~/.config/sinelab/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "sinelab").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let teaching = &self.flow.teaching;
        if teaching.is_empty() {
            return Err(ConfigError::Invalid("flow.teaching must name at least one parameter".into()));
        }
        let unique: HashSet<_> = teaching.iter().collect();
        if unique.len() != teaching.len() {
            return Err(ConfigError::Invalid("flow.teaching contains duplicates".into()));
        }
        if self.flow.challenge == ChallengeMode::DiagnoseThenMatch
            && !(teaching.contains(&Parameter::Amplitude) && teaching.contains(&Parameter::Frequency))
        {
            return Err(ConfigError::Invalid("diagnose_then_match needs amplitude and frequency to be taught".into()));
        }
        for parameter in [Parameter::Amplitude, Parameter::Frequency, Parameter::Phase] {
            let tolerance = self.tolerances.get(parameter);
            if !(tolerance > 0.0) {
                return Err(ConfigError::Invalid(format!("tolerances.{parameter} must be positive")));
            }
        }
        let timing = &self.timing;
        for (name, delay) in [
            ("observe_continue_delay", timing.observe_continue_delay),
            ("question_delay", timing.question_delay),
            ("reveal_delay", timing.reveal_delay),
        ] {
            if !(delay >= 0.0) {
                return Err(ConfigError::Invalid(format!("timing.{name} must not be negative")));
            }
        }
        let threshold = self.scoring.match_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid("scoring.match_threshold must be in (0, 1]".into()));
        }
        for (name, range) in [("amplitude_range", self.scoring.amplitude_range), ("frequency_range", self.scoring.frequency_range)] {
            if range.min > range.max {
                return Err(ConfigError::Invalid(format!("scoring.{name} is inverted")));
            }
        }
        for parameter in [Parameter::Amplitude, Parameter::Frequency, Parameter::Phase] {
            let anchor = self.anchors.get(parameter);
            let answer = question_for(parameter).answer;
            if (anchor - answer).abs() > 1e-9 {
                return Err(ConfigError::Invalid(format!("anchors.{parameter} must be {answer} to match its question")));
            }
            if !self.range(parameter).contains(anchor) {
                return Err(ConfigError::Invalid(format!("anchors.{parameter} is outside its slider range")));
            }
        }
        let pools = &self.pools;
        for (parameter, values) in [(Parameter::Amplitude, &pools.amplitudes), (Parameter::Frequency, &pools.frequencies)] {
            let range = self.range(parameter);
            if let Some(value) = values.iter().find(|value| !range.contains(**value)) {
                return Err(ConfigError::Invalid(format!("pools value {value} for {parameter} is outside its slider range")));
            }
        }
        if pools.amplitude_candidates(self.anchors.amplitude).next().is_none() {
            return Err(ConfigError::Invalid("pools.amplitudes has no value besides the anchor".into()));
        }
        if pools.frequency_candidates(self.anchors.frequency).next().is_none() {
            return Err(ConfigError::Invalid("pools.frequencies has no value besides the anchor".into()));
        }
        if self.flow.challenge == ChallengeMode::DiagnoseThenMatch {
            let neutral = WaveParameters::NEUTRAL;
            let amplitude_moves = pools.amplitude_candidates(self.anchors.amplitude).any(|a| (a - neutral.amplitude).abs() > 1e-9);
            let frequency_moves = pools.frequency_candidates(self.anchors.frequency).any(|f| (f - neutral.frequency).abs() > 1e-9);
            if !(amplitude_moves && frequency_moves) {
                return Err(ConfigError::Invalid("diagnose_then_match needs pool values away from the neutral wave".into()));
            }
        }
        if pools.phases.is_empty() {
            return Err(ConfigError::Invalid("pools.phases must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.display.ghost_opacity) {
            return Err(ConfigError::Invalid("display.ghost_opacity must be in [0, 1]".into()));
        }
        Ok(())
    }

    /// The range a parameter's slider may take.
    pub fn range(&self, parameter: Parameter) -> ParamRange {
        match parameter {
            Parameter::Amplitude => self.scoring.amplitude_range,
            Parameter::Frequency => self.scoring.frequency_range,
            Parameter::Phase => ParamRange::new(0.0, std::f64::consts::TAU),
        }
    }
}

/// Which stages the lesson runs and how the challenge starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct FlowConfig {
    /// The parameters taught before the challenge, in order.
    pub teaching: Vec<Parameter>,
    pub challenge: ChallengeMode,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self { teaching: vec![Parameter::Amplitude, Parameter::Frequency, Parameter::Phase], challenge: ChallengeMode::Match }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub enum ChallengeMode {
    /// Match a fully random target right away.
    #[default]
    Match,

    /// First name which parameter differs from the neutral wave, then match it.
    DiagnoseThenMatch,
}

/// How close a teaching parameter must get to its anchor to count as found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct ToleranceConfig {
    pub amplitude: f64,
    pub frequency: f64,
    /// Radians.
    pub phase: f64,
}

impl ToleranceConfig {
    pub fn get(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Amplitude => self.amplitude,
            Parameter::Frequency => self.frequency,
            Parameter::Phase => self.phase,
        }
    }
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self { amplitude: 0.1, frequency: 0.15, phase: 0.2 }
    }
}

/// Delays in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct TimingConfig {
    /// How long the observe stage plays before it can be left.
    pub observe_continue_delay: f64,

    /// Pause between matching an anchor and being asked about it.
    pub question_delay: f64,

    /// Pause between matching the challenge and the reveal.
    pub reveal_delay: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { observe_continue_delay: 5.0, question_delay: 0.5, reveal_delay: 0.5 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct ScoringConfig {
    /// Normalized overall score the challenge must reach.
    pub match_threshold: f64,
    pub amplitude_range: ParamRange,
    pub frequency_range: ParamRange,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.95,
            amplitude_range: ParamRange::new(0.5, 2.0),
            frequency_range: ParamRange::new(0.5, 3.0),
        }
    }
}

/// The fixed values each teaching stage steers toward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct AnchorConfig {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
}

impl AnchorConfig {
    pub fn get(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Amplitude => self.amplitude,
            Parameter::Frequency => self.frequency,
            Parameter::Phase => self.phase,
        }
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self { amplitude: 2.0, frequency: 2.0, phase: FRAC_PI_2 }
    }
}

/// Candidate values challenge targets are drawn from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct PoolConfig {
    pub amplitudes: Vec<f64>,
    pub frequencies: Vec<f64>,
    pub phases: Vec<f64>,
}

impl PoolConfig {
    /// Amplitude candidates without the teaching anchor.
    pub fn amplitude_candidates(&self, anchor: f64) -> impl Iterator<Item = f64> + '_ {
        without(&self.amplitudes, anchor)
    }

    /// Frequency candidates without the teaching anchor.
    pub fn frequency_candidates(&self, anchor: f64) -> impl Iterator<Item = f64> + '_ {
        without(&self.frequencies, anchor)
    }
}

fn without(values: &[f64], excluded: f64) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(move |value| (value - excluded).abs() > 1e-9)
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            amplitudes: vec![0.75, 1.0, 1.25, 1.5, 1.75, 2.0],
            frequencies: vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0],
            phases: vec![0.0, FRAC_PI_4, FRAC_PI_2, 3.0 * FRAC_PI_4, PI],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct DisplayConfig {
    /// Opacity of the ghost wave whenever one is shown.
    pub ghost_opacity: f64,

    /// How many samples the wave trail keeps.
    pub trail_points: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { ghost_opacity: 0.4, trail_points: 200 }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    Io(PathBuf, io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
