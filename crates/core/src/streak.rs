//! Daily practice streaks.
//!
//! A day counts toward the streak once the learner has attempted
//! [`DAILY_TARGET`] distinct questions in both subjects.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{Subject, UserId};

/// Attempts per subject needed to complete a day.
pub const DAILY_TARGET: u32 = 5;

/// One learner's attempt tally for a local calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyProgress {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub math_count: u32,
    pub verbal_count: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DailyProgress {
    #[must_use]
    pub fn new(user_id: UserId, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            math_count: 0,
            verbal_count: 0,
            completed_at: None,
        }
    }

    /// Count one new attempt for `subject`.
    ///
    /// Counters saturate at [`DAILY_TARGET`]. Returns `true` when this attempt
    /// completed the day.
    pub fn record(&mut self, subject: Subject, at: DateTime<Utc>) -> bool {
        let counter = match subject {
            Subject::Math => &mut self.math_count,
            Subject::Verbal => &mut self.verbal_count,
        };
        *counter = (*counter + 1).min(DAILY_TARGET);

        if self.completed_at.is_none()
            && self.math_count >= DAILY_TARGET
            && self.verbal_count >= DAILY_TARGET
        {
            self.completed_at = Some(at);
            return true;
        }
        false
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Number of consecutive completed days ending today (or yesterday when
/// today is not complete yet).
#[must_use]
pub fn streak_base(completed_days: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = completed_days.iter().copied().collect();
    let mut expected = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut count = 0;
    while let Some(day) = expected {
        if !days.contains(&day) {
            break;
        }
        count += 1;
        expected = day.pred_opt();
    }
    count
}

/// Apply the administrative offset stored on a profile; never negative.
#[must_use]
pub fn streak_count(base: u32, offset: i64) -> u32 {
    let total = i64::from(base).saturating_add(offset).max(0);
    u32::try_from(total).unwrap_or(u32::MAX)
}

/// Today's tally as shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub math_count: u32,
    pub verbal_count: u32,
    pub completed: bool,
}

impl From<&DailyProgress> for DayStatus {
    fn from(day: &DailyProgress) -> Self {
        Self {
            date: day.date,
            math_count: day.math_count,
            verbal_count: day.verbal_count,
            completed: day.is_completed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakStatus {
    pub streak_count: u32,
    pub today: DayStatus,
    pub time_left_seconds: u64,
}
