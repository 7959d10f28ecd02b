//! An interactive lab that teaches the three parameters of `y = A × sin(f·t + φ)`.
//!
//! The lesson is a single [LabMachine] fed with discrete [Event]s and clock ticks. It owns the
//! stage flow, the delayed transitions between stages and the user's discoveries, and scores the
//! live wave against the ghost wave with a [MatchScorer]. Hosts wrap the machine in a
//! [LabSession], poll it once per frame and draw the [FrameSnapshot] it produces.

pub mod config;
pub mod formula;
pub mod lesson;
pub mod render;
pub mod scoring;
pub mod stream;
pub mod target;
pub mod wave;

pub use crate::{
    config::{ConfigError, LabConfig},
    lesson::{Effect, Event, FrameSnapshot, LabMachine, Stage, SubStage},
    render::{LabSession, Pollable, PollableState},
    scoring::{MatchScorer, MatchScores},
    target::{Diagnosis, TargetGenerator},
    wave::{Parameter, WaveParameters},
};
