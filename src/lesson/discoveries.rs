use crate::wave::Parameter;
use serde::Serialize;

/// The values the user was at when they passed each teaching stage.
///
/// Each field is written once per run and only cleared by a restart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Discoveries {
    pub amplitude: Option<f64>,
    pub frequency: Option<f64>,
    pub phase: Option<f64>,
}

impl Discoveries {
    pub fn get(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Amplitude => self.amplitude,
            Parameter::Frequency => self.frequency,
            Parameter::Phase => self.phase,
        }
    }

    /// Stores `value` unless the parameter was already discovered. Returns whether it was stored.
    pub fn record(&mut self, parameter: Parameter, value: f64) -> bool {
        let slot = match parameter {
            Parameter::Amplitude => &mut self.amplitude,
            Parameter::Frequency => &mut self.frequency,
            Parameter::Phase => &mut self.phase,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.amplitude.is_none() && self.frequency.is_none() && self.phase.is_none()
    }
}
