use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Top-level learning area of the question bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Verbal,
    Math,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown subject: {0}")]
pub struct ParseSubjectError(pub String);

impl Subject {
    pub const ALL: [Subject; 2] = [Subject::Verbal, Subject::Math];

    /// Stable lowercase name used in storage and URLs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Verbal => "verbal",
            Subject::Math => "math",
        }
    }

    /// Human label shown next to the subject header.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Subject::Verbal => "English",
            Subject::Math => "Math",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ParseSubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbal" | "english" => Ok(Subject::Verbal),
            "math" => Ok(Subject::Math),
            _ => Err(ParseSubjectError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("MATH".parse::<Subject>().unwrap(), Subject::Math);
        assert_eq!(" Verbal ".parse::<Subject>().unwrap(), Subject::Verbal);
        assert_eq!("english".parse::<Subject>().unwrap(), Subject::Verbal);
    }

    #[test]
    fn rejects_unknown() {
        let err = "science".parse::<Subject>().unwrap_err();
        assert_eq!(err, ParseSubjectError("science".into()));
    }

    #[test]
    fn labels_verbal_as_english() {
        assert_eq!(Subject::Verbal.label(), "English");
        assert_eq!(Subject::Math.label(), "Math");
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Subject::Math).unwrap();
        assert_eq!(json, "\"math\"");
    }
}
