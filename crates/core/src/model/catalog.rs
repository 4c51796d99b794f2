use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Subject;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("topic title cannot be empty")]
    EmptyTopicTitle,

    #[error("subtopic title cannot be empty (topic {topic:?})")]
    EmptySubtopicTitle { topic: String },

    #[error("duplicate topic {0:?}")]
    DuplicateTopic(String),

    #[error("duplicate subtopic {subtopic:?} in topic {topic:?}")]
    DuplicateSubtopic { topic: String, subtopic: String },
}

//
// ─── NODES ─────────────────────────────────────────────────────────────────────
//

/// Smallest gated unit of content within a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtopic {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl Subtopic {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            count: None,
        }
    }
}

/// Named grouping of subtopics within a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicGroup {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

impl TopicGroup {
    #[must_use]
    pub fn new<I, S>(title: impl Into<String>, subtopics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            count: None,
            subtopics: subtopics.into_iter().map(Subtopic::new).collect(),
        }
    }
}

/// Aggregated number of questions stored under one catalog node.
///
/// Rows without a subtopic count questions filed directly under the topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCount {
    pub subject: Subject,
    pub topic: String,
    pub subtopic: Option<String>,
    pub count: u32,
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Ordered topic tree for one subject.
///
/// Declaration order is significant: concatenating every topic's subtopics
/// gives the global order used for level gating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    subject: Subject,
    groups: Vec<TopicGroup>,
}

impl Catalog {
    /// Build a catalog from topic groups.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a title is blank or a topic/subtopic repeats,
    /// since completion keys address nodes by title.
    pub fn new(subject: Subject, groups: Vec<TopicGroup>) -> Result<Self, CatalogError> {
        let mut topics = HashSet::new();
        for group in &groups {
            if group.title.trim().is_empty() {
                return Err(CatalogError::EmptyTopicTitle);
            }
            if !topics.insert(group.title.as_str()) {
                return Err(CatalogError::DuplicateTopic(group.title.clone()));
            }
            let mut subtopics = HashSet::new();
            for sub in &group.subtopics {
                if sub.title.trim().is_empty() {
                    return Err(CatalogError::EmptySubtopicTitle {
                        topic: group.title.clone(),
                    });
                }
                if !subtopics.insert(sub.title.as_str()) {
                    return Err(CatalogError::DuplicateSubtopic {
                        topic: group.title.clone(),
                        subtopic: sub.title.clone(),
                    });
                }
            }
        }
        Ok(Self { subject, groups })
    }

    /// The SAT catalog shipped with the portal.
    #[must_use]
    pub fn builtin(subject: Subject) -> Self {
        let source = match subject {
            Subject::Verbal => VERBAL_GROUPS,
            Subject::Math => MATH_GROUPS,
        };
        let groups = source
            .iter()
            .map(|(title, subs)| TopicGroup {
                title: (*title).to_owned(),
                count: Some(0),
                subtopics: subs
                    .iter()
                    .map(|s| Subtopic {
                        title: (*s).to_owned(),
                        count: Some(0),
                    })
                    .collect(),
            })
            .collect();
        Self { subject, groups }
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn groups(&self) -> &[TopicGroup] {
        &self.groups
    }

    #[must_use]
    pub fn topic(&self, title: &str) -> Option<&TopicGroup> {
        self.groups.iter().find(|g| g.title == title)
    }

    /// Global `(topic, subtopic)` order used for gating.
    #[must_use]
    pub fn subtopic_order(&self) -> Vec<(&str, &str)> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.subtopics
                    .iter()
                    .map(move |s| (g.title.as_str(), s.title.as_str()))
            })
            .collect()
    }

    #[must_use]
    pub fn topic_order(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.title.as_str()).collect()
    }

    /// Number of subtopics across all topics.
    #[must_use]
    pub fn subtopic_len(&self) -> usize {
        self.groups.iter().map(|g| g.subtopics.len()).sum()
    }

    /// Whether the catalog has this topic (and subtopic, when given).
    #[must_use]
    pub fn contains(&self, topic: &str, subtopic: Option<&str>) -> bool {
        match (self.topic(topic), subtopic) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(group), Some(sub)) => group.subtopics.iter().any(|s| s.title == sub),
        }
    }

    /// Return a copy of the catalog with question counts applied.
    ///
    /// Subtopics take the count of their exact row, or zero. A topic takes the
    /// sum of rows filed directly under it, falling back to the sum of its
    /// subtopics when that is zero. Rows for other subjects are ignored.
    #[must_use]
    pub fn with_counts(&self, rows: &[QuestionCount]) -> Self {
        let rows: Vec<&QuestionCount> = rows.iter().filter(|r| r.subject == self.subject).collect();

        let groups = self
            .groups
            .iter()
            .map(|group| {
                let direct: u32 = rows
                    .iter()
                    .filter(|r| r.topic == group.title && r.subtopic.is_none())
                    .map(|r| r.count)
                    .sum();
                let subtopics: Vec<Subtopic> = group
                    .subtopics
                    .iter()
                    .map(|sub| {
                        let count = rows
                            .iter()
                            .find(|r| {
                                r.topic == group.title
                                    && r.subtopic.as_deref() == Some(sub.title.as_str())
                            })
                            .map_or(0, |r| r.count);
                        Subtopic {
                            title: sub.title.clone(),
                            count: Some(count),
                        }
                    })
                    .collect();
                let from_subtopics: u32 = subtopics.iter().filter_map(|s| s.count).sum();
                TopicGroup {
                    title: group.title.clone(),
                    count: Some(if direct > 0 { direct } else { from_subtopics }),
                    subtopics,
                }
            })
            .collect();

        Self {
            subject: self.subject,
            groups,
        }
    }

    /// Sum of topic counts; unknown counts add nothing.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.groups
            .iter()
            .map(|g| u64::from(g.count.unwrap_or(0)))
            .sum()
    }
}

//
// ─── BUILT-IN SAT CATALOG ──────────────────────────────────────────────────────
//

type StaticGroup = (&'static str, &'static [&'static str]);

const VERBAL_GROUPS: &[StaticGroup] = &[
    (
        "Craft and Structure",
        &[
            "Cross-Text Connections",
            "Text Structure and Purpose",
            "Words in Context",
        ],
    ),
    ("Expression of Ideas", &["Rhetorical Synthesis", "Transitions"]),
    (
        "Information and Ideas",
        &[
            "Central Ideas and Details",
            "Command of Evidence",
            "Inferences",
        ],
    ),
    (
        "Standard English Conventions",
        &["Boundaries", "Form, Structure, and Sense"],
    ),
];

const MATH_GROUPS: &[StaticGroup] = &[
    (
        "Algebra",
        &[
            "Linear equations in one variable",
            "Linear functions",
            "Linear equations in two variables",
            "Systems of two linear equations in two variables",
            "Linear inequalities in one or two variables",
        ],
    ),
    (
        "Advanced Math",
        &[
            "Equivalent expressions",
            "Nonlinear equations in one variable and systems of equations in two variables",
            "Nonlinear functions",
        ],
    ),
    (
        "Problem Solving & Data Analysis",
        &[
            "Ratios, rates, proportional relationships, and units",
            "Percentages",
            "One-variable data",
            "Two-variable data & scatterplots",
            "Probability & conditional probability",
            "Inference & margin of error",
            "Evaluating statistical claims",
        ],
    ),
    (
        "Geometry & Trigonometry",
        &[
            "Area and volume",
            "Lines, angles, and triangles",
            "Right triangles and trigonometry",
            "Circles",
            "Geometry and trigonometry (mixed)",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn count(topic: &str, subtopic: Option<&str>, n: u32) -> QuestionCount {
        QuestionCount {
            subject: Subject::Math,
            topic: topic.into(),
            subtopic: subtopic.map(Into::into),
            count: n,
        }
    }

    #[test]
    fn builtin_catalogs_have_expected_shape() {
        let math = Catalog::builtin(Subject::Math);
        assert_eq!(math.topic_order().len(), 4);
        assert_eq!(math.subtopic_len(), 20);

        let verbal = Catalog::builtin(Subject::Verbal);
        assert_eq!(verbal.topic_order()[0], "Craft and Structure");
        assert_eq!(verbal.subtopic_len(), 10);
        assert_eq!(
            verbal.subtopic_order()[3],
            ("Expression of Ideas", "Rhetorical Synthesis")
        );
    }

    #[test]
    fn builtin_catalogs_pass_validation() {
        for subject in Subject::ALL {
            let builtin = Catalog::builtin(subject);
            let rebuilt = Catalog::new(subject, builtin.groups().to_vec()).unwrap();
            assert_eq!(rebuilt, builtin);
        }
    }

    #[test]
    fn rejects_duplicate_titles() {
        let err = Catalog::new(
            Subject::Math,
            vec![TopicGroup::new("A", ["x"]), TopicGroup::new("A", ["y"])],
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateTopic("A".into()));

        let err = Catalog::new(Subject::Math, vec![TopicGroup::new("A", ["x", "x"])]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSubtopic { .. }));
    }

    #[test]
    fn rejects_blank_titles() {
        let err = Catalog::new(Subject::Math, vec![TopicGroup::new(" ", ["x"])]).unwrap_err();
        assert_eq!(err, CatalogError::EmptyTopicTitle);
        let err = Catalog::new(Subject::Math, vec![TopicGroup::new("A", [""])]).unwrap_err();
        assert!(matches!(err, CatalogError::EmptySubtopicTitle { .. }));
    }

    #[test]
    fn contains_checks_topic_and_subtopic() {
        let math = Catalog::builtin(Subject::Math);
        assert!(math.contains("Algebra", None));
        assert!(math.contains("Algebra", Some("Linear functions")));
        assert!(!math.contains("Algebra", Some("Circles")));
        assert!(!math.contains("Calculus", None));
    }

    #[test]
    fn counts_fall_back_to_subtopic_sum() {
        let math = Catalog::builtin(Subject::Math).with_counts(&[
            count("Algebra", Some("Linear functions"), 4),
            count("Algebra", Some("Linear equations in one variable"), 2),
        ]);
        let algebra = math.topic("Algebra").unwrap();
        assert_eq!(algebra.count, Some(6));
        assert_eq!(algebra.subtopics[0].count, Some(2));
        assert_eq!(algebra.subtopics[2].count, Some(0));
        assert_eq!(math.total_count(), 6);
    }

    #[test]
    fn direct_topic_rows_take_precedence() {
        let math = Catalog::builtin(Subject::Math).with_counts(&[
            count("Circles", None, 1),
            count("Advanced Math", None, 3),
            count("Advanced Math", Some("Nonlinear functions"), 9),
        ]);
        let advanced = math.topic("Advanced Math").unwrap();
        assert_eq!(advanced.count, Some(3));
        assert_eq!(advanced.subtopics[2].count, Some(9));
    }

    #[test]
    fn counts_for_other_subjects_are_ignored() {
        let mut row = count("Algebra", Some("Linear functions"), 4);
        row.subject = Subject::Verbal;
        let math = Catalog::builtin(Subject::Math).with_counts(&[row]);
        assert_eq!(math.total_count(), 0);
    }
}
