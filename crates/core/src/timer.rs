use std::collections::BTreeMap;

use crate::model::QuestionId;

/// Remaining time under which a countdown is considered low.
pub const LOW_TIME_SECS: u32 = 300;

/// What a single one-second tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing moved (paused, or the countdown already expired).
    Frozen,
    /// One second was accounted.
    Advanced,
    /// The countdown reached zero on this tick. Reported exactly once.
    Expired,
}

/// Session clock plus per-question time buckets.
///
/// Countdown and count-up are the same clock: `limit_secs` is the signed
/// target (`None` counts up forever). Remaining time is always derived as
/// `limit - elapsed`, so a restore only needs the elapsed seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimer {
    limit_secs: Option<u32>,
    elapsed_secs: u32,
    expired: bool,
    question_secs: BTreeMap<QuestionId, u32>,
}

impl SessionTimer {
    #[must_use]
    pub fn new(limit_secs: Option<u32>) -> Self {
        Self::restore(limit_secs, 0, BTreeMap::new())
    }

    /// Rebuild a timer from persisted elapsed time.
    ///
    /// No tick is consumed: a 3600 s countdown restored at 600 s elapsed
    /// reads 3000 s remaining.
    #[must_use]
    pub fn restore(
        limit_secs: Option<u32>,
        elapsed_secs: u32,
        question_secs: BTreeMap<QuestionId, u32>,
    ) -> Self {
        Self {
            limit_secs,
            elapsed_secs,
            expired: false,
            question_secs,
        }
    }

    /// Advance by one second.
    ///
    /// `charge_to` is the question whose bucket receives the second; pass
    /// `None` while a blocking prompt is open. A paused tick has no effect.
    pub fn tick(&mut self, paused: bool, charge_to: Option<QuestionId>) -> TickOutcome {
        if paused || self.expired {
            return TickOutcome::Frozen;
        }

        if let Some(limit) = self.limit_secs {
            // Restored at or past the limit: expire without charging time.
            if self.elapsed_secs >= limit {
                self.expired = true;
                return TickOutcome::Expired;
            }
        }

        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        if let Some(id) = charge_to {
            *self.question_secs.entry(id).or_insert(0) += 1;
        }

        match self.limit_secs {
            Some(limit) if self.elapsed_secs >= limit => {
                self.expired = true;
                TickOutcome::Expired
            }
            _ => TickOutcome::Advanced,
        }
    }

    #[must_use]
    pub fn is_countdown(&self) -> bool {
        self.limit_secs.is_some()
    }

    #[must_use]
    pub fn limit_secs(&self) -> Option<u32> {
        self.limit_secs
    }

    /// Active seconds accumulated so far. Frozen while paused.
    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// Seconds left on a countdown, `None` when untimed.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.limit_secs
            .map(|limit| limit.saturating_sub(self.elapsed_secs))
    }

    /// The value a clock display shows: remaining for countdowns, elapsed otherwise.
    #[must_use]
    pub fn display_secs(&self) -> u32 {
        self.remaining_secs().unwrap_or(self.elapsed_secs)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    #[must_use]
    pub fn is_low_time(&self) -> bool {
        self.remaining_secs()
            .is_some_and(|remaining| remaining < LOW_TIME_SECS)
    }

    #[must_use]
    pub fn question_secs(&self, id: QuestionId) -> u32 {
        self.question_secs.get(&id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn question_times(&self) -> &BTreeMap<QuestionId, u32> {
        &self.question_secs
    }
}

/// Formats seconds as `H:MM:SS`, or `MM:SS` below one hour.
#[must_use]
pub fn format_clock(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q1: QuestionId = QuestionId::new(1);
    const Q2: QuestionId = QuestionId::new(2);

    #[test]
    fn count_up_never_expires() {
        let mut timer = SessionTimer::new(None);
        for _ in 0..10_000 {
            assert_eq!(timer.tick(false, Some(Q1)), TickOutcome::Advanced);
        }
        assert_eq!(timer.elapsed_secs(), 10_000);
        assert_eq!(timer.remaining_secs(), None);
        assert_eq!(timer.display_secs(), 10_000);
    }

    #[test]
    fn one_minute_countdown_expires_on_sixtieth_tick_once() {
        let mut timer = SessionTimer::new(Some(60));
        for _ in 0..59 {
            assert_eq!(timer.tick(false, Some(Q1)), TickOutcome::Advanced);
        }
        assert_eq!(timer.remaining_secs(), Some(1));
        assert_eq!(timer.tick(false, Some(Q1)), TickOutcome::Expired);
        assert_eq!(timer.remaining_secs(), Some(0));
        assert_eq!(timer.tick(false, Some(Q1)), TickOutcome::Frozen);
        assert_eq!(timer.tick(false, Some(Q1)), TickOutcome::Frozen);
        assert_eq!(timer.question_secs(Q1), 60);
    }

    #[test]
    fn paused_ticks_change_nothing() {
        let mut timer = SessionTimer::new(Some(120));
        timer.tick(false, Some(Q1));
        let before = timer.clone();
        for _ in 0..50 {
            assert_eq!(timer.tick(true, Some(Q1)), TickOutcome::Frozen);
        }
        assert_eq!(timer, before);
    }

    #[test]
    fn restore_reconstructs_remaining_without_consuming_a_tick() {
        let timer = SessionTimer::restore(Some(60 * 60), 600, BTreeMap::new());
        assert_eq!(timer.remaining_secs(), Some(3000));
        assert_eq!(timer.elapsed_secs(), 600);
    }

    #[test]
    fn restore_past_limit_expires_on_next_tick_without_charging() {
        let mut timer = SessionTimer::restore(Some(60), 75, BTreeMap::new());
        assert_eq!(timer.tick(false, Some(Q1)), TickOutcome::Expired);
        assert_eq!(timer.elapsed_secs(), 75);
        assert_eq!(timer.question_secs(Q1), 0);
    }

    #[test]
    fn uncharged_ticks_still_advance_the_clock() {
        let mut timer = SessionTimer::new(None);
        timer.tick(false, Some(Q1));
        timer.tick(false, None);
        timer.tick(false, Some(Q2));
        assert_eq!(timer.elapsed_secs(), 3);
        assert_eq!(timer.question_secs(Q1), 1);
        assert_eq!(timer.question_secs(Q2), 1);
    }

    #[test]
    fn low_time_only_applies_to_countdowns() {
        assert!(SessionTimer::restore(Some(600), 301, BTreeMap::new()).is_low_time());
        assert!(!SessionTimer::restore(Some(600), 300, BTreeMap::new()).is_low_time());
        assert!(!SessionTimer::restore(None, 1_000_000, BTreeMap::new()).is_low_time());
    }

    #[test]
    fn formats_clock_like_the_display() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(3000), "50:00");
        assert_eq!(format_clock(3661), "1:01:01");
    }
}
