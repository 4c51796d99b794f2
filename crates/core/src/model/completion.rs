use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between topic and subtopic in the textual key form.
pub const KEY_SEPARATOR: &str = "::";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid completion key: {0:?}")]
pub struct ParseCompletionKeyError(pub String);

/// Identifies a passed catalog node.
///
/// With a subtopic the key marks a passed subtopic quiz; without one it marks
/// a passed topic-level quiz. Textual form is `Topic::Subtopic` or `Topic`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompletionKey {
    pub topic: String,
    pub subtopic: Option<String>,
}

impl CompletionKey {
    #[must_use]
    pub fn subtopic(topic: impl Into<String>, subtopic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subtopic: Some(subtopic.into()),
        }
    }

    #[must_use]
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subtopic: None,
        }
    }

    #[must_use]
    pub fn is_topic(&self) -> bool {
        self.subtopic.is_none()
    }
}

impl fmt::Display for CompletionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtopic {
            Some(sub) => write!(f, "{}{KEY_SEPARATOR}{sub}", self.topic),
            None => f.write_str(&self.topic),
        }
    }
}

impl FromStr for CompletionKey {
    type Err = ParseCompletionKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseCompletionKeyError(s.to_owned());
        match s.split_once(KEY_SEPARATOR) {
            Some((topic, sub)) => {
                let (topic, sub) = (topic.trim(), sub.trim());
                if topic.is_empty() || sub.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::subtopic(topic, sub))
            }
            None => {
                let topic = s.trim();
                if topic.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::topic(topic))
            }
        }
    }
}

/// Raw set of completions recorded for one learner and subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSet {
    keys: HashSet<CompletionKey>,
}

impl CompletionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: CompletionKey) -> bool {
        self.keys.insert(key)
    }

    #[must_use]
    pub fn has_subtopic(&self, topic: &str, subtopic: &str) -> bool {
        self.keys.iter().any(|k| {
            k.topic == topic && k.subtopic.as_deref() == Some(subtopic)
        })
    }

    #[must_use]
    pub fn has_topic(&self, topic: &str) -> bool {
        self.keys
            .iter()
            .any(|k| k.topic == topic && k.subtopic.is_none())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletionKey> {
        self.keys.iter()
    }
}

impl FromIterator<CompletionKey> for CompletionSet {
    fn from_iter<T: IntoIterator<Item = CompletionKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl Extend<CompletionKey> for CompletionSet {
    fn extend<T: IntoIterator<Item = CompletionKey>>(&mut self, iter: T) {
        self.keys.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let key = CompletionKey::subtopic("Algebra", "Linear functions");
        assert_eq!(key.to_string(), "Algebra::Linear functions");
        assert_eq!("Algebra::Linear functions".parse::<CompletionKey>().unwrap(), key);

        let topic = "Algebra".parse::<CompletionKey>().unwrap();
        assert!(topic.is_topic());
        assert_eq!(topic.to_string(), "Algebra");
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!("".parse::<CompletionKey>().is_err());
        assert!("::Sub".parse::<CompletionKey>().is_err());
        assert!("Topic:: ".parse::<CompletionKey>().is_err());
    }

    #[test]
    fn set_distinguishes_topic_and_subtopic_records() {
        let set: CompletionSet = [
            CompletionKey::subtopic("A", "S1"),
            CompletionKey::topic("B"),
        ]
        .into_iter()
        .collect();
        assert!(set.has_subtopic("A", "S1"));
        assert!(!set.has_topic("A"));
        assert!(set.has_topic("B"));
        assert!(!set.has_subtopic("B", "S1"));
    }
}
