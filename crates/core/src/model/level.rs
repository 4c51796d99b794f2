use std::fmt;

use serde::{Deserialize, Serialize};

/// Administratively granted unlock baseline for one subject.
///
/// A level of `n` treats the first `n` subtopics of the subject (in catalog
/// order) as completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Level(u32);

impl Level {
    pub const ZERO: Level = Level(0);

    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Clamp a signed value into a level; negatives become zero.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
    }

    /// Parse the free-text level stored on a profile.
    ///
    /// Takes the leading run of digits after optional whitespace. Blank,
    /// negative or non-numeric text yields zero.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('-') {
            return Self::ZERO;
        }
        let digits: String = trimmed
            .trim_start_matches('+')
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if digits.is_empty() {
            return Self::ZERO;
        }
        digits.parse::<u32>().map_or(Self(u32::MAX), Self)
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    /// The level as a count, for comparisons against subtopic indexes.
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Level {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_negative_values() {
        assert_eq!(Level::clamped(-3), Level::ZERO);
        assert_eq!(Level::clamped(7), Level::new(7));
        assert_eq!(Level::clamped(i64::MAX), Level::new(u32::MAX));
    }

    #[test]
    fn parses_profile_text() {
        assert_eq!(Level::parse_lenient("4"), Level::new(4));
        assert_eq!(Level::parse_lenient("  12 (placement)"), Level::new(12));
        assert_eq!(Level::parse_lenient("+2"), Level::new(2));
        assert_eq!(Level::parse_lenient("-5"), Level::ZERO);
        assert_eq!(Level::parse_lenient("beginner"), Level::ZERO);
        assert_eq!(Level::parse_lenient(""), Level::ZERO);
    }

    #[test]
    fn parse_saturates_on_overflow() {
        assert_eq!(Level::parse_lenient("99999999999999"), Level::new(u32::MAX));
    }
}
