use super::discoveries::Discoveries;
use super::questions::{question_for, DIAGNOSE_QUESTION};
use super::stage::{Flow, Progress, Prompt, Stage, SubStage};
use super::timer::{Scheduler, TimerAction, TimerToken};
use crate::config::{ChallengeMode, LabConfig};
use crate::scoring::{within_tolerance, MatchScorer, MatchScores};
use crate::target::{Diagnosis, TargetGenerator};
use crate::wave::{normalize_phase, Parameter, WaveParameters};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// How many times a challenge target is redrawn when it happens to equal the starting wave.
const MAX_TARGET_DRAWS: usize = 16;

/// A discrete input from the controls.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    SetAmplitude(f64),
    SetFrequency(f64),
    SetPhase(f64),
    SelectAnswer(f64),
    SelectDiagnosis(Diagnosis),
    Continue,
    TryAgain,
    NewChallenge,
    Restart,
    Exit,
}

impl Event {
    pub fn set(parameter: Parameter, value: f64) -> Self {
        match parameter {
            Parameter::Amplitude => Self::SetAmplitude(value),
            Parameter::Frequency => Self::SetFrequency(value),
            Parameter::Phase => Self::SetPhase(value),
        }
    }
}

/// Something the outside world should react to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// A stage was passed.
    Celebrate,

    /// The challenge was matched with these values.
    Complete(WaveParameters),

    /// The user left the lab from the reveal.
    Exit(WaveParameters),
}

/// The answer picked in the current question or diagnosis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Value(f64),
    Diagnosis(Diagnosis),
}

/// Everything that changes while the lesson runs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabState {
    pub stage: Stage,
    pub sub_stage: SubStage,
    /// The user's live parameters.
    pub params: WaveParameters,
    /// The active challenge target.
    pub target: Option<WaveParameters>,
    /// What the diagnose challenge target differs in.
    pub diagnosis: Option<Diagnosis>,
    pub discoveries: Discoveries,
    /// Whether observe can be left.
    pub continue_available: bool,
    pub answer: Option<Answer>,
    /// Whether `answer` was right, while in feedback.
    pub correct: Option<bool>,
    /// Whether the current challenge crossed the threshold.
    pub matched: bool,
    pub completed_with: Option<WaveParameters>,
    pub celebrations: u32,
    pub finished: bool,
}

impl LabState {
    fn initial() -> Self {
        Self {
            stage: Stage::Observe,
            sub_stage: SubStage::Explore,
            params: WaveParameters::NEUTRAL,
            target: None,
            diagnosis: None,
            discoveries: Discoveries::default(),
            continue_available: false,
            answer: None,
            correct: None,
            matched: false,
            completed_with: None,
            celebrations: 0,
            finished: false,
        }
    }
}

/// The lesson controller.
///
/// All state lives in a single [LabState]. Inputs arrive either as [Event]s through
/// [LabMachine::handle] or as clock ticks through [LabMachine::advance]; both fully resolve,
/// including any timers that became due, before returning. Every stage or sub-stage change
/// cancels the timers scheduled for the one being left, so a delayed transition can never land
/// on a stage it wasn't meant for.
#[derive(Debug)]
pub struct LabMachine {
    config: LabConfig,
    flow: Flow,
    scorer: MatchScorer,
    generator: TargetGenerator,
    scheduler: Scheduler,
    /// The transition scheduled for the current stage and sub-stage, if any.
    transition: Option<TimerToken>,
    state: LabState,
    now: f64,
}

impl LabMachine {
    pub fn new(config: LabConfig, generator: TargetGenerator) -> Self {
        let flow = Flow::new(&config.flow.teaching);
        let scorer = MatchScorer::new(config.scoring.amplitude_range, config.scoring.frequency_range);
        let mut machine = Self {
            config,
            flow,
            scorer,
            generator,
            scheduler: Scheduler::default(),
            transition: None,
            state: LabState::initial(),
            now: 0.0,
        };
        machine.enter(Stage::Observe);
        machine
    }

    pub fn with_seed(config: LabConfig, seed: u64) -> Self {
        let generator = TargetGenerator::with_seed(&config, seed);
        Self::new(config, generator)
    }

    pub fn with_random_targets(config: LabConfig) -> Self {
        let generator = TargetGenerator::new(&config, fastrand::Rng::new());
        Self::new(config, generator)
    }

    pub fn state(&self) -> &LabState {
        &self.state
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// The lab clock, in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Applies an event and any transition it makes due.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.state.finished && !matches!(event, Event::Restart) {
            tracing::debug!(?event, "lab finished, ignoring event");
            return effects;
        }
        match event {
            Event::SetAmplitude(value) => self.set_parameter(Parameter::Amplitude, value),
            Event::SetFrequency(value) => self.set_parameter(Parameter::Frequency, value),
            Event::SetPhase(value) => self.set_parameter(Parameter::Phase, value),
            Event::SelectAnswer(value) => self.select_answer(value),
            Event::SelectDiagnosis(diagnosis) => self.select_diagnosis(diagnosis),
            Event::Continue => self.request_continue(&mut effects),
            Event::TryAgain => self.try_again(),
            Event::NewChallenge => self.new_challenge(),
            Event::Restart => self.restart(),
            Event::Exit => self.exit(&mut effects),
        };
        self.fire_due(&mut effects);
        effects
    }

    /// Moves the clock forward to `now` and fires whatever became due. Going backwards is ignored.
    pub fn advance(&mut self, now: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        if now > self.now {
            self.now = now;
        }
        self.fire_due(&mut effects);
        effects
    }

    pub fn is_adjustable(&self, parameter: Parameter) -> bool {
        if self.state.sub_stage != SubStage::Explore {
            return false;
        }
        match self.state.stage {
            Stage::Observe | Stage::Reveal => false,
            Stage::Challenge => self.flow.teaches(parameter),
            stage => stage.parameter() == Some(parameter),
        }
    }

    pub fn adjustable(&self) -> Vec<Parameter> {
        Parameter::iter().filter(|parameter| self.is_adjustable(*parameter)).collect()
    }

    /// Parameters shown at their discovered value but not editable.
    pub fn locked(&self) -> Vec<Parameter> {
        match self.state.stage {
            stage if stage.is_teaching() => self.flow.taught_before(stage),
            _ => Vec::new(),
        }
    }

    /// The wave the user is steering toward, if one is shown.
    ///
    /// In a teaching stage this is the neutral wave with discovered values in place and the
    /// stage's parameter at its anchor.
    pub fn ghost(&self) -> Option<WaveParameters> {
        match self.state.stage {
            Stage::Observe => None,
            Stage::Challenge | Stage::Reveal => self.state.target,
            stage => {
                let parameter = stage.parameter()?;
                let mut ghost = WaveParameters::NEUTRAL;
                for locked in self.flow.taught_before(stage) {
                    if let Some(value) = self.state.discoveries.get(locked) {
                        ghost = ghost.with(locked, value);
                    }
                }
                Some(ghost.with(parameter, self.config.anchors.get(parameter)))
            }
        }
    }

    /// Live scores against the ghost, recomputed on every call.
    pub fn scores(&self) -> Option<MatchScores> {
        self.ghost().map(|ghost| self.scorer.score(&self.state.params, &ghost))
    }

    pub fn progress(&self) -> Progress {
        self.flow.progress(self.state.stage)
    }

    pub fn prompt(&self) -> Option<Prompt> {
        if self.state.sub_stage != SubStage::Explore {
            return None;
        }
        if self.state.stage == Stage::Challenge && self.state.matched {
            return None;
        }
        self.state.stage.prompt()
    }

    /// The explanation for the answer being judged.
    pub fn feedback_explanation(&self) -> Option<&'static str> {
        if self.state.sub_stage != SubStage::Feedback {
            return None;
        }
        match (self.state.stage.parameter(), self.state.answer?) {
            (Some(parameter), Answer::Value(value)) => Some(question_for(parameter).explanation(value)),
            (None, Answer::Diagnosis(selected)) => Some(DIAGNOSE_QUESTION.explanation(self.state.diagnosis?, selected)),
            _ => None,
        }
    }

    fn set_parameter(&mut self, parameter: Parameter, value: f64) {
        if !value.is_finite() {
            tracing::debug!(%parameter, value, "ignoring non-finite value");
            return;
        }
        if !self.is_adjustable(parameter) {
            tracing::debug!(
                %parameter, value, stage = %self.state.stage, sub_stage = %self.state.sub_stage,
                "parameter not adjustable, ignoring"
            );
            return;
        }
        let value = match parameter {
            Parameter::Phase => normalize_phase(value),
            _ => self.config.range(parameter).clamp(value),
        };
        self.state.params = self.state.params.with(parameter, value);
        self.detect_match();
    }

    fn select_answer(&mut self, value: f64) {
        let Some(parameter) = self.state.stage.parameter() else {
            tracing::debug!(value, stage = %self.state.stage, "no question in this stage, ignoring answer");
            return;
        };
        if self.state.sub_stage != SubStage::Question {
            tracing::debug!(value, sub_stage = %self.state.sub_stage, "no open question, ignoring answer");
            return;
        }
        let correct = question_for(parameter).is_correct(value);
        tracing::info!(%parameter, value, correct, "answer selected");
        self.set_sub_stage(SubStage::Feedback);
        self.state.answer = Some(Answer::Value(value));
        self.state.correct = Some(correct);
    }

    fn select_diagnosis(&mut self, diagnosis: Diagnosis) {
        if self.state.stage != Stage::Challenge || self.state.sub_stage != SubStage::Diagnose {
            tracing::debug!(%diagnosis, "no diagnosis pending, ignoring");
            return;
        }
        let correct = self.state.diagnosis == Some(diagnosis);
        tracing::info!(%diagnosis, correct, "diagnosis selected");
        self.set_sub_stage(SubStage::Feedback);
        self.state.answer = Some(Answer::Diagnosis(diagnosis));
        self.state.correct = Some(correct);
    }

    fn request_continue(&mut self, effects: &mut Vec<Effect>) {
        let LabState { stage, sub_stage, correct, continue_available, .. } = self.state;
        match (stage, sub_stage) {
            (Stage::Observe, _) if continue_available => {
                if let Some(next) = self.flow.next(Stage::Observe) {
                    self.enter(next);
                }
            }
            (Stage::Observe, _) => tracing::debug!("continue not offered yet"),
            (_, SubStage::Feedback) if correct == Some(true) => {
                if stage == Stage::Challenge {
                    self.set_sub_stage(SubStage::Explore);
                } else {
                    self.complete_teaching_stage(effects);
                }
            }
            (_, SubStage::Feedback) => self.try_again(),
            _ => tracing::debug!(%stage, %sub_stage, "nothing to continue to"),
        }
    }

    fn complete_teaching_stage(&mut self, effects: &mut Vec<Effect>) {
        let stage = self.state.stage;
        let Some(parameter) = stage.parameter() else {
            return;
        };
        let value = self.state.params.get(parameter);
        self.state.discoveries.record(parameter, value);
        tracing::info!(%parameter, value, "parameter discovered");
        self.celebrate(effects);
        if let Some(next) = self.flow.next(stage) {
            self.enter(next);
        }
    }

    fn try_again(&mut self) {
        if self.state.sub_stage != SubStage::Feedback || self.state.correct != Some(false) {
            tracing::debug!(sub_stage = %self.state.sub_stage, "nothing to retry");
            return;
        }
        let retry = match self.state.stage {
            Stage::Challenge => SubStage::Diagnose,
            _ => SubStage::Question,
        };
        tracing::info!(stage = %self.state.stage, "trying again");
        self.set_sub_stage(retry);
    }

    fn new_challenge(&mut self) {
        if self.state.stage != Stage::Reveal {
            tracing::debug!(stage = %self.state.stage, "new challenge only starts from the reveal");
            return;
        }
        self.enter(Stage::Challenge);
    }

    fn restart(&mut self) {
        tracing::info!(stage = %self.state.stage, "restarting lab");
        self.scheduler.cancel_all();
        self.transition = None;
        self.state = LabState::initial();
        self.enter(Stage::Observe);
    }

    fn exit(&mut self, effects: &mut Vec<Effect>) {
        if self.state.stage != Stage::Reveal {
            tracing::debug!(stage = %self.state.stage, "exit only allowed from the reveal");
            return;
        }
        self.cancel_transition();
        self.state.finished = true;
        tracing::info!(values = ?self.state.params, "lab exited");
        effects.push(Effect::Exit(self.state.params));
    }

    fn enter(&mut self, stage: Stage) {
        self.cancel_transition();
        tracing::info!(from = %self.state.stage, to = %stage, "stage changed");
        self.state.stage = stage;
        self.state.sub_stage = SubStage::Explore;
        self.state.answer = None;
        self.state.correct = None;
        self.state.continue_available = false;
        match stage {
            Stage::Observe => {
                let due = self.now + self.config.timing.observe_continue_delay;
                self.schedule_transition(due, TimerAction::OfferContinue);
            }
            Stage::Challenge => self.start_challenge(),
            _ => {}
        }
        self.detect_match();
    }

    fn set_sub_stage(&mut self, sub_stage: SubStage) {
        self.cancel_transition();
        tracing::debug!(stage = %self.state.stage, from = %self.state.sub_stage, to = %sub_stage, "sub-stage changed");
        self.state.sub_stage = sub_stage;
        self.state.answer = None;
        self.state.correct = None;
        self.detect_match();
    }

    fn start_challenge(&mut self) {
        self.state.params = WaveParameters::NEUTRAL;
        self.state.matched = false;
        self.state.completed_with = None;
        match self.config.flow.challenge {
            ChallengeMode::Match => {
                let target = self.draw_match_target();
                self.state.target = Some(target);
                self.state.diagnosis = None;
            }
            ChallengeMode::DiagnoseThenMatch => {
                let (diagnosis, target) = self.generator.diagnosis();
                self.state.target = Some(target);
                self.state.diagnosis = Some(diagnosis);
                self.state.sub_stage = SubStage::Diagnose;
            }
        }
    }

    /// A random target that is not already matched by the starting wave.
    ///
    /// Parameters the flow doesn't teach are held at their neutral value.
    fn draw_match_target(&mut self) -> WaveParameters {
        let mut target = WaveParameters::NEUTRAL;
        for _ in 0..MAX_TARGET_DRAWS {
            target = self.generator.challenge();
            for parameter in Parameter::iter().filter(|p| !self.flow.teaches(*p)) {
                target = target.with(parameter, WaveParameters::NEUTRAL.get(parameter));
            }
            let scores = self.scorer.score(&self.state.params, &target);
            if !scores.is_match(self.config.scoring.match_threshold) {
                break;
            }
        }
        target
    }

    fn detect_match(&mut self) {
        if self.state.sub_stage != SubStage::Explore {
            return;
        }
        match self.state.stage {
            Stage::Challenge => self.detect_challenge_match(),
            stage => {
                if let Some(parameter) = stage.parameter() {
                    self.detect_anchor_match(parameter);
                }
            }
        }
    }

    fn detect_anchor_match(&mut self, parameter: Parameter) {
        let live = self.state.params.get(parameter);
        let anchor = self.config.anchors.get(parameter);
        if !within_tolerance(parameter, live, anchor, self.config.tolerances.get(parameter)) {
            return;
        }
        // once matched the question is committed, even if the slider moves on
        if self.transition.is_some_and(|token| self.scheduler.is_pending(token)) {
            return;
        }
        tracing::info!(%parameter, live, anchor, "anchor matched");
        let due = self.now + self.config.timing.question_delay;
        self.schedule_transition(due, TimerAction::OpenQuestion);
    }

    fn detect_challenge_match(&mut self) {
        if self.state.matched {
            return;
        }
        let Some(target) = self.state.target else {
            return;
        };
        let scores = self.scorer.score(&self.state.params, &target);
        if !scores.is_match(self.config.scoring.match_threshold) {
            return;
        }
        self.state.matched = true;
        let values = self.state.params;
        tracing::info!(overall = scores.overall, ?values, "challenge matched");
        let due = self.now + self.config.timing.reveal_delay;
        self.schedule_transition(due, TimerAction::Reveal { values });
    }

    fn schedule_transition(&mut self, due: f64, action: TimerAction) {
        self.cancel_transition();
        self.transition = Some(self.scheduler.schedule(due, action));
    }

    fn cancel_transition(&mut self) {
        if let Some(token) = self.transition.take() {
            if self.scheduler.cancel(token) {
                tracing::debug!(?token, stage = %self.state.stage, "cancelled pending transition");
            }
        }
    }

    fn fire_due(&mut self, effects: &mut Vec<Effect>) {
        while let Some((token, action)) = self.scheduler.pop_due(self.now) {
            tracing::debug!(?token, ?action, now = self.now, "timer fired");
            if self.transition == Some(token) {
                self.transition = None;
            }
            self.apply_timer(action, effects);
        }
    }

    fn apply_timer(&mut self, action: TimerAction, effects: &mut Vec<Effect>) {
        let LabState { stage, sub_stage, .. } = self.state;
        match action {
            TimerAction::OfferContinue if stage == Stage::Observe => {
                self.state.continue_available = true;
            }
            TimerAction::OpenQuestion if stage.is_teaching() && sub_stage == SubStage::Explore => {
                self.set_sub_stage(SubStage::Question);
            }
            TimerAction::Reveal { values } if stage == Stage::Challenge => {
                self.enter(Stage::Reveal);
                self.state.completed_with = Some(values);
                self.celebrate(effects);
                effects.push(Effect::Complete(values));
            }
            action => tracing::warn!(?action, %stage, %sub_stage, "dropping transition for another stage"),
        }
    }

    fn celebrate(&mut self, effects: &mut Vec<Effect>) {
        self.state.celebrations += 1;
        effects.push(Effect::Celebrate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn machine() -> LabMachine {
        LabMachine::with_seed(LabConfig::default(), 1)
    }

    fn leave_observe(machine: &mut LabMachine) {
        let due = machine.now() + machine.config().timing.observe_continue_delay;
        machine.advance(due);
        machine.handle(Event::Continue);
    }

    fn wait(machine: &mut LabMachine, seconds: f64) -> Vec<Effect> {
        let until = machine.now() + seconds;
        machine.advance(until)
    }

    /// Matches the stage's anchor, answers correctly and continues.
    fn pass_stage(machine: &mut LabMachine, value: f64, answer: f64) -> Vec<Effect> {
        let parameter = machine.state().stage.parameter().expect("not a teaching stage");
        machine.handle(Event::set(parameter, value));
        wait(machine, 0.5);
        assert_eq!(machine.state().sub_stage, SubStage::Question);
        machine.handle(Event::SelectAnswer(answer));
        machine.handle(Event::Continue)
    }

    fn reach_challenge(machine: &mut LabMachine) {
        leave_observe(machine);
        pass_stage(machine, 2.0, 2.0);
        pass_stage(machine, 2.0, 2.0);
        pass_stage(machine, FRAC_PI_2, FRAC_PI_2);
        assert_eq!(machine.state().stage, Stage::Challenge);
    }

    fn match_target(machine: &mut LabMachine) -> WaveParameters {
        let target = machine.state().target.expect("no target");
        let taught: Vec<_> = machine.flow().teaching().collect();
        for parameter in taught {
            machine.handle(Event::set(parameter, target.get(parameter)));
        }
        target
    }

    #[test]
    fn starts_observing() {
        let machine = machine();
        assert_eq!(machine.state().stage, Stage::Observe);
        assert_eq!(machine.state().sub_stage, SubStage::Explore);
        assert!(machine.ghost().is_none());
        assert!(machine.adjustable().is_empty());
    }

    #[test]
    fn only_continue_after_delay_leaves_observe() {
        let mut machine = machine();
        machine.handle(Event::Continue);
        machine.handle(Event::SetAmplitude(2.0));
        machine.handle(Event::SelectAnswer(2.0));
        machine.handle(Event::NewChallenge);
        machine.handle(Event::TryAgain);
        machine.advance(4.9);
        machine.handle(Event::Continue);
        assert_eq!(machine.state().stage, Stage::Observe);
        assert!(!machine.state().continue_available);

        machine.advance(5.0);
        assert!(machine.state().continue_available);
        assert_eq!(machine.state().stage, Stage::Observe);
        machine.handle(Event::Continue);
        assert_eq!(machine.state().stage, Stage::Amplitude);
        assert_eq!(machine.state().sub_stage, SubStage::Explore);
    }

    #[test]
    fn near_match_opens_question_after_delay() {
        let mut machine = machine();
        leave_observe(&mut machine);
        let start = machine.now();
        machine.handle(Event::SetAmplitude(1.95));
        assert_eq!(machine.state().sub_stage, SubStage::Explore);
        machine.advance(start + 0.49);
        assert_eq!(machine.state().sub_stage, SubStage::Explore);
        machine.advance(start + 0.5);
        assert_eq!(machine.state().sub_stage, SubStage::Question);
    }

    #[test]
    fn far_value_keeps_exploring() {
        let mut machine = machine();
        leave_observe(&mut machine);
        machine.handle(Event::SetAmplitude(1.5));
        wait(&mut machine, 10.0);
        assert_eq!(machine.state().sub_stage, SubStage::Explore);
        assert_eq!(machine.pending_timers(), 0);
    }

    #[test]
    fn rematching_anchor_keeps_one_question_timer() {
        let mut machine = machine();
        leave_observe(&mut machine);
        let start = machine.now();
        machine.handle(Event::SetAmplitude(1.95));
        machine.handle(Event::SetAmplitude(1.0));
        machine.handle(Event::SetAmplitude(2.05));
        assert_eq!(machine.pending_timers(), 1);
        machine.advance(start + 0.5);
        assert_eq!(machine.state().sub_stage, SubStage::Question);
        assert_eq!(machine.pending_timers(), 0);
    }

    #[test]
    fn correct_and_wrong_answers() {
        let mut machine = machine();
        leave_observe(&mut machine);
        machine.handle(Event::SetAmplitude(2.0));
        wait(&mut machine, 0.5);
        machine.handle(Event::SelectAnswer(1.5));
        assert_eq!(machine.state().sub_stage, SubStage::Feedback);
        assert_eq!(machine.state().correct, Some(false));
        assert!(machine.feedback_explanation().is_some_and(|text| text.starts_with("A = 1.5")));

        machine.handle(Event::TryAgain);
        assert_eq!(machine.state().stage, Stage::Amplitude);
        assert_eq!(machine.state().sub_stage, SubStage::Question);
        assert_eq!(machine.state().answer, None);

        machine.handle(Event::SelectAnswer(2.0));
        assert_eq!(machine.state().sub_stage, SubStage::Feedback);
        assert_eq!(machine.state().correct, Some(true));
    }

    #[test]
    fn continuing_after_wrong_answer_retries() {
        let mut machine = machine();
        leave_observe(&mut machine);
        machine.handle(Event::SetAmplitude(2.0));
        wait(&mut machine, 0.5);
        machine.handle(Event::SelectAnswer(1.0));
        let effects = machine.handle(Event::Continue);
        assert!(effects.is_empty());
        assert_eq!(machine.state().stage, Stage::Amplitude);
        assert_eq!(machine.state().sub_stage, SubStage::Question);
        assert!(machine.state().discoveries.is_empty());
    }

    #[test]
    fn correct_feedback_records_live_value_and_advances() {
        let mut machine = machine();
        leave_observe(&mut machine);
        let effects = pass_stage(&mut machine, 1.95, 2.0);
        assert_eq!(effects, vec![Effect::Celebrate]);
        assert_eq!(machine.state().discoveries.amplitude, Some(1.95));
        assert_eq!(machine.state().stage, Stage::Frequency);
        assert_eq!(machine.state().sub_stage, SubStage::Explore);
        assert_eq!(machine.state().params.amplitude, 1.95);
        assert_eq!(machine.state().celebrations, 1);
    }

    #[test]
    fn discovered_parameters_are_locked() {
        let mut machine = machine();
        leave_observe(&mut machine);
        pass_stage(&mut machine, 1.95, 2.0);
        machine.handle(Event::SetAmplitude(0.5));
        assert_eq!(machine.state().params.amplitude, 1.95);
        assert_eq!(machine.locked(), vec![Parameter::Amplitude]);
        assert_eq!(machine.adjustable(), vec![Parameter::Frequency]);
    }

    #[test]
    fn teaching_ghost_carries_discoveries() {
        let mut machine = machine();
        leave_observe(&mut machine);
        assert_eq!(machine.ghost(), Some(WaveParameters::new(2.0, 1.0, 0.0)));
        pass_stage(&mut machine, 1.95, 2.0);
        assert_eq!(machine.ghost(), Some(WaveParameters::new(1.95, 2.0, 0.0)));
    }

    #[test]
    fn challenge_resets_controls_and_keeps_discoveries() {
        let mut machine = machine();
        reach_challenge(&mut machine);
        let state = machine.state();
        assert_eq!(state.params, WaveParameters::NEUTRAL);
        assert_eq!(state.discoveries.amplitude, Some(2.0));
        assert_eq!(state.discoveries.frequency, Some(2.0));
        assert_eq!(state.discoveries.phase, Some(FRAC_PI_2));
        assert!(state.target.is_some());
        assert_ne!(state.target, Some(WaveParameters::NEUTRAL));
        assert_eq!(machine.adjustable().len(), 3);
    }

    #[test]
    fn exact_challenge_match_reveals_and_completes() {
        let mut machine = machine();
        reach_challenge(&mut machine);
        let target = match_target(&mut machine);
        assert!(machine.state().matched);
        assert!(machine.scores().is_some_and(|scores| scores.overall >= 0.95));
        assert_eq!(machine.state().stage, Stage::Challenge);
        assert!(machine.prompt().is_none());

        let effects = wait(&mut machine, 0.5);
        assert_eq!(machine.state().stage, Stage::Reveal);
        assert_eq!(effects, vec![Effect::Celebrate, Effect::Complete(target)]);
        assert_eq!(machine.state().completed_with, Some(target));

        // complete fires once per challenge
        assert!(wait(&mut machine, 5.0).is_empty());
    }

    #[test]
    fn restart_during_reveal_delay_cancels_it() {
        let mut machine = machine();
        reach_challenge(&mut machine);
        match_target(&mut machine);
        machine.handle(Event::Restart);
        let effects = wait(&mut machine, 10.0);
        assert!(effects.is_empty());
        assert_eq!(machine.state().stage, Stage::Observe);
        assert!(machine.state().discoveries.is_empty());
    }

    #[test]
    fn restart_during_question_delay_cancels_it() {
        let mut machine = machine();
        leave_observe(&mut machine);
        machine.handle(Event::SetAmplitude(2.0));
        machine.handle(Event::Restart);
        wait(&mut machine, 1.0);
        assert_eq!(machine.state().stage, Stage::Observe);
        assert_eq!(machine.state().sub_stage, SubStage::Explore);
    }

    #[test]
    fn restart_is_idempotent() {
        let mut once = machine();
        leave_observe(&mut once);
        pass_stage(&mut once, 2.0, 2.0);
        let mut twice = machine();
        leave_observe(&mut twice);
        pass_stage(&mut twice, 2.0, 2.0);

        once.handle(Event::Restart);
        twice.handle(Event::Restart);
        twice.handle(Event::Restart);
        assert_eq!(once.state(), twice.state());
        assert_eq!(once.pending_timers(), twice.pending_timers());
        assert_eq!(twice.state(), &LabState::initial());
    }

    #[test]
    fn new_challenge_keeps_discoveries() {
        let mut machine = machine();
        reach_challenge(&mut machine);
        match_target(&mut machine);
        wait(&mut machine, 0.5);
        machine.handle(Event::NewChallenge);
        let state = machine.state();
        assert_eq!(state.stage, Stage::Challenge);
        assert!(!state.matched);
        assert_eq!(state.params, WaveParameters::NEUTRAL);
        assert_eq!(state.discoveries.amplitude, Some(2.0));
        assert!(state.completed_with.is_none());
    }

    #[test]
    fn exit_hands_over_values_and_finishes() {
        let mut machine = machine();
        reach_challenge(&mut machine);
        let target = match_target(&mut machine);
        wait(&mut machine, 0.5);
        let effects = machine.handle(Event::Exit);
        assert_eq!(effects, vec![Effect::Exit(target)]);
        assert!(machine.state().finished);
        assert!(machine.handle(Event::NewChallenge).is_empty());
        assert_eq!(machine.state().stage, Stage::Reveal);

        machine.handle(Event::Restart);
        assert!(!machine.state().finished);
        assert_eq!(machine.state().stage, Stage::Observe);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut machine = machine();
        leave_observe(&mut machine);
        machine.handle(Event::SetAmplitude(5.0));
        assert_eq!(machine.state().params.amplitude, 2.0);
        machine.handle(Event::SetAmplitude(f64::NAN));
        assert_eq!(machine.state().params.amplitude, 2.0);
    }

    #[test]
    fn zero_delay_opens_question_immediately() {
        let mut config = LabConfig::default();
        config.timing.question_delay = 0.0;
        let mut machine = LabMachine::with_seed(config, 1);
        leave_observe(&mut machine);
        machine.handle(Event::SetAmplitude(2.0));
        assert_eq!(machine.state().sub_stage, SubStage::Question);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut machine = machine();
        machine.advance(3.0);
        machine.advance(1.0);
        assert_eq!(machine.now(), 3.0);
    }

    fn diagnose_machine(seed: u64) -> LabMachine {
        let mut config = LabConfig::default();
        config.flow.teaching = vec![Parameter::Amplitude, Parameter::Frequency];
        config.flow.challenge = ChallengeMode::DiagnoseThenMatch;
        let mut machine = LabMachine::with_seed(config, seed);
        leave_observe(&mut machine);
        pass_stage(&mut machine, 2.0, 2.0);
        pass_stage(&mut machine, 2.0, 2.0);
        machine
    }

    #[test]
    fn diagnose_then_match() {
        let mut machine = diagnose_machine(5);
        assert_eq!(machine.state().stage, Stage::Challenge);
        assert_eq!(machine.state().sub_stage, SubStage::Diagnose);
        assert_eq!(machine.progress().total, 5);
        assert!(machine.adjustable().is_empty());
        machine.handle(Event::SetAmplitude(0.75));
        assert_eq!(machine.state().params, WaveParameters::NEUTRAL);

        let actual = machine.state().diagnosis.expect("no diagnosis");
        let wrong = Diagnosis::iter().find(|d| *d != actual).expect("no wrong answer");
        machine.handle(Event::SelectDiagnosis(wrong));
        assert_eq!(machine.state().sub_stage, SubStage::Feedback);
        assert_eq!(machine.state().correct, Some(false));
        assert!(machine.feedback_explanation().is_some());
        machine.handle(Event::TryAgain);
        assert_eq!(machine.state().sub_stage, SubStage::Diagnose);

        machine.handle(Event::SelectDiagnosis(actual));
        assert_eq!(machine.state().correct, Some(true));
        machine.handle(Event::Continue);
        assert_eq!(machine.state().sub_stage, SubStage::Explore);
        assert_eq!(machine.adjustable(), vec![Parameter::Amplitude, Parameter::Frequency]);

        let target = match_target(&mut machine);
        let effects = wait(&mut machine, 0.5);
        assert!(effects.contains(&Effect::Complete(target)));
        assert_eq!(machine.state().stage, Stage::Reveal);
    }

    #[test]
    fn match_flow_without_phase_holds_phase_neutral() {
        let mut config = LabConfig::default();
        config.flow.teaching = vec![Parameter::Amplitude, Parameter::Frequency];
        for seed in 0..20 {
            let mut machine = LabMachine::with_seed(config.clone(), seed);
            leave_observe(&mut machine);
            pass_stage(&mut machine, 2.0, 2.0);
            pass_stage(&mut machine, 2.0, 2.0);
            assert_eq!(machine.state().target.map(|t| t.phase), Some(0.0));
            assert!(!machine.is_adjustable(Parameter::Phase));
        }
    }
}
