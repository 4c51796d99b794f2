use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};

/// UTC offset of the portal's local calendar (Asia/Baku, no DST).
pub const PORTAL_UTC_OFFSET_SECS: i32 = 4 * 3600;

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Calendar date in the portal's timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        local_date(self.now())
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

fn portal_offset() -> FixedOffset {
    FixedOffset::east_opt(PORTAL_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Calendar date of `at` in the portal's timezone.
#[must_use]
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&portal_offset()).date_naive()
}

/// Whole seconds from `at` until the next local midnight.
#[must_use]
pub fn seconds_until_midnight(at: DateTime<Utc>) -> u64 {
    let local = at.with_timezone(&portal_offset());
    let Some(next_day) = local.date_naive().succ_opt() else {
        return 0;
    };
    let Some(midnight) = next_day
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(portal_offset()).single())
    else {
        return 0;
    };
    u64::try_from(midnight.signed_duration_since(local).num_seconds().max(0)).unwrap_or(0)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
