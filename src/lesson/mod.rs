//! The staged lesson: observe, one stage per taught parameter, challenge and reveal.

mod discoveries;
mod machine;
mod questions;
mod snapshot;
mod stage;
mod timer;

pub use discoveries::Discoveries;
pub use machine::{Answer, Effect, Event, LabMachine, LabState};
pub use questions::{question_for, Choice, DiagnoseQuestion, Question, DIAGNOSE_QUESTION};
pub use snapshot::{ChallengeMeter, Feedback, FrameSnapshot, GhostWave};
pub use stage::{Flow, Progress, Prompt, Stage, SubStage};
pub use timer::{Scheduler, TimerAction, TimerToken};
