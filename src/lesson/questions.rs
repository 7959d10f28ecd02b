use crate::target::Diagnosis;
use crate::wave::Parameter;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

const ANSWER_EPSILON: f64 = 1e-9;

/// One selectable answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Choice {
    pub label: &'static str,
    pub value: f64,
    /// Why this choice is wrong, when it is.
    #[serde(skip)]
    pub explanation: Option<&'static str>,
}

/// A multiple-choice question asked once a teaching anchor is matched.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Question {
    pub parameter: Parameter,
    pub prompt: &'static str,
    pub choices: Vec<Choice>,
    #[serde(skip)]
    pub answer: f64,
    #[serde(skip)]
    pub why: &'static str,
}

impl Question {
    pub fn is_correct(&self, value: f64) -> bool {
        (value - self.answer).abs() < ANSWER_EPSILON
    }

    /// The wrong-choice explanation for `selected`, or the general one.
    pub fn explanation(&self, selected: f64) -> &'static str {
        if self.is_correct(selected) {
            return self.why;
        }
        self.choices
            .iter()
            .find(|choice| (choice.value - selected).abs() < ANSWER_EPSILON)
            .and_then(|choice| choice.explanation)
            .unwrap_or(self.why)
    }
}

fn choice(label: &'static str, value: f64, explanation: Option<&'static str>) -> Choice {
    Choice { label, value, explanation }
}

static QUESTIONS: Lazy<[Question; 3]> = Lazy::new(|| {
    [
        Question {
            parameter: Parameter::Amplitude,
            prompt: "What value doubled the wave's height?",
            choices: vec![
                choice("1.0", 1.0, Some("At A = 1, the wave height stays the same as the original. We need a value that makes it twice as tall.")),
                choice("1.5", 1.5, Some("A = 1.5 makes the wave 1.5× taller, but we asked for double. What value would give us 2×?")),
                choice("2.0", 2.0, None),
                choice("2.5", 2.5, Some("A = 2.5 makes it 2.5× taller, more than double! We need exactly twice the height.")),
            ],
            answer: 2.0,
            why: "Amplitude multiplies every point's distance from the center line. A = 2 means the wave is twice as tall.",
        },
        Question {
            parameter: Parameter::Frequency,
            prompt: "How many complete waves fit when frequency doubles?",
            choices: vec![
                choice("1", 1.0, Some("With 1 wave, that's the same as before. Doubling the frequency should pack more waves into the same space.")),
                choice("2", 2.0, None),
                choice("3", 3.0, Some("3 waves would mean tripling the frequency. We only doubled it, so how many waves should fit?")),
                choice("4", 4.0, Some("4 waves would mean quadrupling the frequency. Think about what 'double' means for the wave count.")),
            ],
            answer: 2.0,
            why: "Frequency controls cycles per interval. Double the frequency means double the waves in the same space.",
        },
        Question {
            parameter: Parameter::Phase,
            prompt: "What phase makes sine start at its peak?",
            choices: vec![
                choice("0", 0.0, Some("At phase = 0, sine starts at zero and rises. We want it to start at its highest point.")),
                choice("π/4", FRAC_PI_4, Some("At π/4, sine starts partway up but not at the peak. The peak is at a quarter of the full cycle.")),
                choice("π/2", FRAC_PI_2, None),
                choice("π", PI, Some("At phase = π, sine starts at zero and falls. We want it to start at its maximum, not crossing zero.")),
            ],
            answer: FRAC_PI_2,
            why: "At φ = π/2, sine starts at its maximum value. This is actually the cosine function!",
        },
    ]
});

/// The question asked at the end of a teaching stage.
pub fn question_for(parameter: Parameter) -> &'static Question {
    let index = match parameter {
        Parameter::Amplitude => 0,
        Parameter::Frequency => 1,
        Parameter::Phase => 2,
    };
    &QUESTIONS[index]
}

/// The "what changed?" question that opens a diagnose challenge.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnoseQuestion {
    pub prompt: &'static str,
    pub choices: Vec<(&'static str, Diagnosis)>,
}

impl DiagnoseQuestion {
    /// Explains what the user should have seen, given the actual difference.
    pub fn explanation(&self, actual: Diagnosis, selected: Diagnosis) -> &'static str {
        if actual == selected {
            return match actual {
                Diagnosis::Amplitude => "Only the height changed: the peaks moved but every wave is as wide as before.",
                Diagnosis::Frequency => "Only the spacing changed: the waves are as tall as before but fit more or fewer in the same space.",
                Diagnosis::Both => "The height and the spacing both changed, so both knobs need to move.",
            };
        }
        match selected {
            Diagnosis::Amplitude => "Look at the spacing too: do the peaks of both waves line up in time?",
            Diagnosis::Frequency => "Look at the height too: do both waves reach the same peak?",
            Diagnosis::Both => "Compare one thing at a time: is it the height, the spacing, or really both?",
        }
    }
}

pub static DIAGNOSE_QUESTION: Lazy<DiagnoseQuestion> = Lazy::new(|| DiagnoseQuestion {
    prompt: "What changed in the ghost wave?",
    choices: vec![("Amplitude", Diagnosis::Amplitude), ("Frequency", Diagnosis::Frequency), ("Both", Diagnosis::Both)],
});
