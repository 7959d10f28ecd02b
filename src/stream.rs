//! A line-oriented host: JSON commands in, one JSON frame out per command.
//!
//! Each input line looks like `{"at": 5.5, "event": {"set_amplitude": 1.95}}`. The session
//! is advanced to `at` seconds, the optional event is applied and the resulting frame is written
//! as a single line.

use crate::lesson::{Effect, Event, FrameSnapshot};
use crate::render::LabSession;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamCommand {
    /// Session time in seconds.
    pub at: f64,
    #[serde(default)]
    pub event: Option<Event>,
}

#[derive(Debug, Serialize)]
struct StreamFrame {
    effects: Vec<Effect>,
    #[serde(flatten)]
    snapshot: FrameSnapshot,
}

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: invalid command: {source}")]
    Parse { line: usize, source: serde_json::Error },

    #[error("line {line}: time {at} is not a valid number of seconds")]
    InvalidTime { line: usize, at: f64 },

    #[error("serializing frame: {0}")]
    Serialize(serde_json::Error),
}

/// Runs every command in `reader` against `session`, returning how many were processed.
///
/// Blank lines are skipped. The first malformed line stops the stream.
pub fn run_stream<R, W>(session: &LabSession, reader: R, mut writer: W) -> Result<usize, StreamError>
where
    R: BufRead,
    W: Write,
{
    let mut processed = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        let command: StreamCommand =
            serde_json::from_str(&line).map_err(|source| StreamError::Parse { line: line_number, source })?;
        if !command.at.is_finite() || command.at < 0.0 {
            return Err(StreamError::InvalidTime { line: line_number, at: command.at });
        }

        let mut effects = session.advance_to(command.at);
        if let Some(event) = command.event {
            tracing::debug!(?event, at = command.at, "applying streamed event");
            effects.extend(session.dispatch(event));
        }
        let frame = StreamFrame { effects, snapshot: session.snapshot() };
        serde_json::to_writer(&mut writer, &frame).map_err(StreamError::Serialize)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        processed += 1;
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabConfig;
    use crate::lesson::LabMachine;
    use serde_json::Value;

    fn run(input: &str) -> (Result<usize, StreamError>, Vec<Value>) {
        let session = LabSession::new(LabMachine::with_seed(LabConfig::default(), 2));
        let mut output = Vec::new();
        let result = run_stream(&session, input.as_bytes(), &mut output);
        let frames = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (result, frames)
    }

    #[test]
    fn walks_into_the_amplitude_question() {
        let input = r#"
{"at": 5.0}
{"at": 5.0, "event": "continue"}
{"at": 6.0, "event": {"set_amplitude": 1.95}}
{"at": 6.5}
"#;
        let (result, frames) = run(input);
        assert_eq!(result.unwrap(), 4);
        assert_eq!(frames[0]["continue_available"], true);
        assert_eq!(frames[1]["stage"], "amplitude");
        assert_eq!(frames[2]["sub_stage"], "explore");
        assert_eq!(frames[2]["params"]["amplitude"], 1.95);
        assert_eq!(frames[3]["sub_stage"], "question");
        assert_eq!(frames[3]["question"]["prompt"], "What value doubled the wave's height?");
    }

    #[test]
    fn celebrations_are_reported_as_effects() {
        let input = r#"
{"at": 5.0, "event": "continue"}
{"at": 5.0, "event": {"set_amplitude": 2.0}}
{"at": 6.0, "event": {"select_answer": 2.0}}
{"at": 6.0, "event": "continue"}
"#;
        let (result, frames) = run(input);
        assert_eq!(result.unwrap(), 4);
        assert_eq!(frames[3]["effects"], serde_json::json!(["celebrate"]));
        assert_eq!(frames[3]["stage"], "frequency");
        assert_eq!(frames[3]["formula"], "y = 2.0 × sin(?t + ?)");
    }

    #[test]
    fn malformed_line_stops_the_stream() {
        let (result, frames) = run("{\"at\": 1.0}\n{\"at\": 2.0, \"event\": \"jump\"}\n{\"at\": 3.0}\n");
        assert!(matches!(result, Err(StreamError::Parse { line: 2, .. })));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn negative_time_is_rejected() {
        let (result, _) = run("{\"at\": -1.0}\n");
        assert!(matches!(result, Err(StreamError::InvalidTime { line: 1, .. })));
    }
}
