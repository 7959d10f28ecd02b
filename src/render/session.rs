use super::trail::WaveTrail;
use super::{Pollable, PollableState};
use crate::lesson::{Effect, Event, FrameSnapshot, LabMachine};
use crate::wave::WaveParameters;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

type CompletionHandler = Box<dyn FnMut(WaveParameters) + Send>;

#[derive(Debug, Default)]
struct Playback {
    /// Wall clock origin, set on the first poll.
    start_time: Option<Instant>,
    /// Session time the machine was last advanced to.
    elapsed: f64,
    /// Time the waves are sampled at. Doesn't move while paused.
    wave_time: f64,
    paused: bool,
    completed: bool,
}

struct Shared {
    machine: LabMachine,
    playback: Playback,
    trail: WaveTrail,
    on_complete: Option<CompletionHandler>,
}

impl Shared {
    fn tick(&mut self, elapsed: f64) -> Vec<Effect> {
        let delta = (elapsed - self.playback.elapsed).max(0.0);
        self.playback.elapsed += delta;
        if !self.playback.paused && delta > 0.0 {
            self.playback.wave_time += delta;
            self.trail.push(self.machine.state().params.sample(self.playback.wave_time));
        }
        let effects = self.machine.advance(self.playback.elapsed);
        self.deliver(&effects);
        effects
    }

    fn deliver(&mut self, effects: &[Effect]) {
        for effect in effects {
            if let Effect::Complete(values) = effect {
                if let Some(handler) = self.on_complete.as_mut() {
                    handler(*values);
                }
            }
        }
    }
}

/// A shareable handle to a running lab.
///
/// Controls dispatch events through it while a render loop polls it every frame, so all access
/// goes through one lock and every event fully resolves before the next frame reads state.
#[derive(Clone)]
pub struct LabSession {
    shared: Arc<Mutex<Shared>>,
}

impl LabSession {
    pub fn new(machine: LabMachine) -> Self {
        let trail = WaveTrail::new(machine.config().display.trail_points);
        let shared = Shared { machine, playback: Playback::default(), trail, on_complete: None };
        Self { shared: Arc::new(Mutex::new(shared)) }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the handler called with the matched values when a challenge completes.
    ///
    /// The handler runs while the session is locked and must not call back into it.
    pub fn on_complete<F>(&self, handler: F)
    where
        F: FnMut(WaveParameters) + Send + 'static,
    {
        self.lock().on_complete = Some(Box::new(handler));
    }

    pub fn dispatch(&self, event: Event) -> Vec<Effect> {
        let mut shared = self.lock();
        let effects = shared.machine.handle(event);
        if matches!(event, Event::Restart) {
            shared.trail.clear();
        }
        shared.deliver(&effects);
        effects
    }

    /// Advances the session to `elapsed` seconds since it started.
    pub fn advance_to(&self, elapsed: f64) -> Vec<Effect> {
        self.lock().tick(elapsed)
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let shared = self.lock();
        FrameSnapshot::capture(&shared.machine, shared.playback.wave_time)
    }

    /// The user's recent wave samples, newest first.
    pub fn trail(&self) -> Vec<f64> {
        self.lock().trail.points().collect()
    }

    pub fn set_paused(&self, paused: bool) {
        let mut shared = self.lock();
        if shared.playback.paused != paused {
            tracing::debug!(paused, "playback toggled");
        }
        shared.playback.paused = paused;
    }

    /// Flips pause and returns the new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.is_paused();
        self.set_paused(paused);
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.lock().playback.paused
    }

    pub fn is_finished(&self) -> bool {
        self.lock().machine.state().finished
    }

    pub fn pollable(&self) -> Box<dyn Pollable> {
        Box::new(LabPollable { shared: self.shared.clone() })
    }
}

struct LabPollable {
    shared: Arc<Mutex<Shared>>,
}

impl Pollable for LabPollable {
    fn poll(&mut self) -> PollableState {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(start_time) = shared.playback.start_time else {
            shared.playback.start_time = Some(Instant::now());
            return PollableState::Modified;
        };

        if shared.machine.state().finished {
            if !shared.playback.completed {
                shared.playback.completed = true;
                return PollableState::Done;
            }
            return PollableState::Unmodified;
        }
        shared.playback.completed = false;

        let effects = shared.tick(start_time.elapsed().as_secs_f64());
        if shared.playback.paused && effects.is_empty() {
            return PollableState::Unmodified;
        }
        PollableState::Modified
    }
}
