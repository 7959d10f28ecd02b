use crate::wave::Parameter;
use serde::{Deserialize, Serialize};
use strum::Display;

/// The coarse phase of the lesson.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Watch the circle draw the wave. No controls.
    Observe,
    Amplitude,
    Frequency,
    Phase,
    /// Reproduce a random target from scratch.
    Challenge,
    /// The target was matched; the formula is shown.
    Reveal,
}

impl Stage {
    pub fn teaching(parameter: Parameter) -> Self {
        match parameter {
            Parameter::Amplitude => Self::Amplitude,
            Parameter::Frequency => Self::Frequency,
            Parameter::Phase => Self::Phase,
        }
    }

    /// The parameter a teaching stage is about.
    pub fn parameter(&self) -> Option<Parameter> {
        match self {
            Self::Amplitude => Some(Parameter::Amplitude),
            Self::Frequency => Some(Parameter::Frequency),
            Self::Phase => Some(Parameter::Phase),
            Self::Observe | Self::Challenge | Self::Reveal => None,
        }
    }

    pub fn is_teaching(&self) -> bool {
        self.parameter().is_some()
    }

    /// The nudge shown while exploring this stage.
    pub fn prompt(&self) -> Option<Prompt> {
        let (text, subtext) = match self {
            Self::Observe => ("Watch where the wave comes from", None),
            Self::Amplitude => ("Make the wave taller", Some("Match the ghost wave")),
            Self::Frequency => ("Make the wave faster", Some("Match the ghost wave")),
            Self::Phase => ("Shift where the wave starts", Some("Match the ghost wave")),
            Self::Challenge => ("Match the wave", None),
            Self::Reveal => return None,
        };
        Some(Prompt { text, subtext })
    }
}

/// The fine-grained cycle within a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubStage {
    /// Sliders are live.
    Explore,
    /// A comprehension question about the stage's parameter is open.
    Question,
    /// The challenge asks which parameter differs before matching starts.
    Diagnose,
    /// The last answer is being judged.
    Feedback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub text: &'static str,
    pub subtext: Option<&'static str>,
}

/// 1-based position in the flow, for progress bars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// The ordered stages of one lesson: observe, the taught parameters, challenge and reveal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Flow {
    stages: Vec<Stage>,
}

impl Flow {
    pub fn new(teaching: &[Parameter]) -> Self {
        let mut stages = vec![Stage::Observe];
        stages.extend(teaching.iter().copied().map(Stage::teaching));
        stages.extend([Stage::Challenge, Stage::Reveal]);
        Self { stages }
    }

    /// Parameters taught by this flow, in order.
    pub fn teaching(&self) -> impl Iterator<Item = Parameter> + '_ {
        self.stages.iter().filter_map(Stage::parameter)
    }

    pub fn teaches(&self, parameter: Parameter) -> bool {
        self.stages.contains(&Stage::teaching(parameter))
    }

    pub fn next(&self, stage: Stage) -> Option<Stage> {
        let index = self.position(stage)?;
        self.stages.get(index + 1).copied()
    }

    pub fn position(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|s| *s == stage)
    }

    pub fn progress(&self, stage: Stage) -> Progress {
        let current = self.position(stage).map(|index| index + 1).unwrap_or(0);
        Progress { current, total: self.stages.len() }
    }

    /// Teaching parameters introduced before `stage`.
    pub fn taught_before(&self, stage: Stage) -> Vec<Parameter> {
        let end = self.position(stage).unwrap_or(0);
        self.stages[..end].iter().filter_map(Stage::parameter).collect()
    }
}
