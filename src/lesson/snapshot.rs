use super::discoveries::Discoveries;
use super::machine::{Answer, LabMachine};
use super::questions::{question_for, DiagnoseQuestion, Question, DIAGNOSE_QUESTION};
use super::stage::{Progress, Prompt, Stage, SubStage};
use crate::formula;
use crate::scoring::{glow, MatchScores, MatchTier};
use crate::wave::{Parameter, WaveParameters};
use serde::Serialize;

/// The dimmed wave the user is steering toward.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GhostWave {
    pub params: WaveParameters,
    pub opacity: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Feedback {
    pub correct: bool,
    pub explanation: &'static str,
}

/// The cosmetic match percentage shown during the challenge.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChallengeMeter {
    pub percent: u8,
    pub tier: MatchTier,
}

/// Everything a presentation layer needs to draw one frame.
///
/// Built in one pass from a single machine state, so the parameters, scores and glow always
/// describe the same instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameSnapshot {
    /// The lab clock.
    pub time: f64,
    /// The clock the waves are sampled at. Stops while paused.
    pub wave_time: f64,
    pub stage: Stage,
    pub sub_stage: SubStage,
    pub progress: Progress,
    pub params: WaveParameters,
    pub y: f64,
    pub circle: (f64, f64),
    pub ghost: Option<GhostWave>,
    pub scores: Option<MatchScores>,
    pub glow: f64,
    pub meter: Option<ChallengeMeter>,
    pub discoveries: Discoveries,
    pub formula: Option<String>,
    pub prompt: Option<Prompt>,
    pub question: Option<&'static Question>,
    pub diagnose: Option<&'static DiagnoseQuestion>,
    pub answer: Option<Answer>,
    pub feedback: Option<Feedback>,
    pub continue_available: bool,
    pub adjustable: Vec<Parameter>,
    pub locked: Vec<Parameter>,
    pub matched: bool,
    pub celebrations: u32,
    pub finished: bool,
}

impl FrameSnapshot {
    pub fn capture(machine: &LabMachine, wave_time: f64) -> Self {
        let state = machine.state();
        let params = state.params;
        let scores = machine.scores();
        let ghost = machine.ghost().map(|ghost| GhostWave {
            params: ghost,
            opacity: machine.config().display.ghost_opacity,
            y: ghost.sample(wave_time),
        });
        let meter = match state.stage {
            Stage::Challenge => scores.map(|scores| ChallengeMeter { percent: scores.display_percent(), tier: scores.tier() }),
            _ => None,
        };
        let formula = match state.stage {
            Stage::Reveal => Some(formula::reveal(&state.completed_with.unwrap_or(params))),
            _ => formula::preview(&state.discoveries),
        };
        let asking = matches!(state.sub_stage, SubStage::Question | SubStage::Feedback);
        let question = match state.stage.parameter() {
            Some(parameter) if asking => Some(question_for(parameter)),
            _ => None,
        };
        let diagnose = match (state.stage, state.sub_stage) {
            (Stage::Challenge, SubStage::Diagnose | SubStage::Feedback) => Some(&*DIAGNOSE_QUESTION),
            _ => None,
        };
        let feedback = state
            .correct
            .zip(machine.feedback_explanation())
            .map(|(correct, explanation)| Feedback { correct, explanation });
        Self {
            time: machine.now(),
            wave_time,
            stage: state.stage,
            sub_stage: state.sub_stage,
            progress: machine.progress(),
            params,
            y: params.sample(wave_time),
            circle: params.circle_point(wave_time),
            ghost,
            scores,
            glow: scores.map(|scores| glow(scores.overall)).unwrap_or(0.0),
            meter,
            discoveries: state.discoveries,
            formula,
            prompt: machine.prompt(),
            question,
            diagnose,
            answer: state.answer,
            feedback,
            continue_available: state.continue_available,
            adjustable: machine.adjustable(),
            locked: machine.locked(),
            matched: state.matched,
            celebrations: state.celebrations,
            finished: state.finished,
        }
    }
}
