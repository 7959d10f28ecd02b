use crate::wave::WaveParameters;
use serde::Serialize;

/// Handle to a scheduled transition. Cancelling a stale token is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TimerToken(u64);

/// What happens when a timer fires.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerAction {
    /// Observe has played long enough to be left.
    OfferContinue,

    /// A teaching anchor was matched; ask about it.
    OpenQuestion,

    /// The challenge was matched with these values.
    Reveal { values: WaveParameters },
}

#[derive(Debug)]
struct Pending {
    token: TimerToken,
    due: f64,
    action: TimerAction,
}

/// Cooperative delayed transitions driven by the lab clock.
///
/// Nothing here sleeps: the owner calls [Scheduler::pop_due] with the current time and applies
/// whatever is due.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_token: u64,
    pending: Vec<Pending>,
}

impl Scheduler {
    pub fn schedule(&mut self, due: f64, action: TimerAction) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.pending.push(Pending { token, due, action });
        tracing::trace!(?token, due, ?action, "scheduled transition");
        token
    }

    /// Returns whether the token was still pending.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| pending.token != token);
        before != self.pending.len()
    }

    /// Drops every pending transition, returning how many there were.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        if count > 0 {
            tracing::debug!(count, "cancelled pending transitions");
        }
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.iter().any(|pending| pending.token == token)
    }

    /// Removes and returns the earliest transition due at `now`, if any.
    ///
    /// Ties go to the one scheduled first.
    pub fn pop_due(&mut self, now: f64) -> Option<(TimerToken, TimerAction)> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, pending)| pending.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.token.0.cmp(&b.token.0)))
            .map(|(index, _)| index)?;
        let pending = self.pending.remove(index);
        Some((pending.token, pending.action))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(2.0, TimerAction::OpenQuestion);
        scheduler.schedule(1.0, TimerAction::OfferContinue);
        assert_eq!(scheduler.pop_due(0.5), None);
        assert_eq!(scheduler.pop_due(5.0).map(|(_, a)| a), Some(TimerAction::OfferContinue));
        assert_eq!(scheduler.pop_due(5.0).map(|(_, a)| a), Some(TimerAction::OpenQuestion));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut scheduler = Scheduler::default();
        let token = scheduler.schedule(1.0, TimerAction::OpenQuestion);
        assert!(scheduler.is_pending(token));
        assert!(scheduler.cancel(token));
        assert!(!scheduler.cancel(token));
        assert_eq!(scheduler.pop_due(10.0), None);
    }

    #[test]
    fn cancel_all_is_idempotent() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(1.0, TimerAction::OpenQuestion);
        scheduler.schedule(1.0, TimerAction::Reveal { values: WaveParameters::NEUTRAL });
        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.cancel_all(), 0);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn due_exactly_now_fires() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(0.5, TimerAction::OpenQuestion);
        assert!(scheduler.pop_due(0.5).is_some());
    }
}
