use serde::Serialize;

use crate::model::{Catalog, CompletionKey, CompletionSet, Level, Subject};

//
// ─── OUTPUT ────────────────────────────────────────────────────────────────────
//

/// Derived state of one subtopic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtopicProgress {
    pub title: String,
    /// Position in the subject-wide order (zero-based).
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Recorded in the raw completion set.
    pub explicitly_completed: bool,
    /// Explicitly completed, or covered by the effective level.
    pub completed: bool,
    pub unlocked: bool,
    /// Unlocked, or the next subtopic the learner may attempt.
    pub available: bool,
}

/// What the topic-level quiz button offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicQuiz {
    /// Previous topic is incomplete.
    Locked,
    /// Some subtopics are still outstanding.
    NotReady,
    /// Every subtopic is complete but the topic quiz was never passed.
    Ready,
    /// The topic quiz was already passed.
    Retake,
}

/// Derived state of one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicProgress {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    pub completed: bool,
    pub locked: bool,
    pub quiz_ready: bool,
    pub quiz: TopicQuiz,
    pub subtopics: Vec<SubtopicProgress>,
}

/// Result of [`compute_progress`] for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub subject: Subject,
    pub baseline_level: Level,
    pub effective_level: Level,
    pub gate_enabled: bool,
    pub topics: Vec<TopicProgress>,
    pub next_subtopic: Option<CompletionKey>,
}

impl ProgressState {
    #[must_use]
    pub fn topic(&self, title: &str) -> Option<&TopicProgress> {
        self.topics.iter().find(|t| t.title == title)
    }

    #[must_use]
    pub fn subtopic(&self, topic: &str, subtopic: &str) -> Option<&SubtopicProgress> {
        self.topic(topic)?
            .subtopics
            .iter()
            .find(|s| s.title == subtopic)
    }

    /// Titles of topics eligible for a first topic quiz.
    pub fn quiz_ready_topics(&self) -> impl Iterator<Item = &str> {
        self.topics
            .iter()
            .filter(|t| t.quiz_ready)
            .map(|t| t.title.as_str())
    }

    /// Number of subtopics in the final completed set.
    #[must_use]
    pub fn completed_subtopics(&self) -> usize {
        self.topics
            .iter()
            .flat_map(|t| t.subtopics.iter())
            .filter(|s| s.completed)
            .count()
    }

    #[must_use]
    pub fn total_subtopics(&self) -> usize {
        self.topics.iter().map(|t| t.subtopics.len()).sum()
    }
}

//
// ─── CALCULATOR ────────────────────────────────────────────────────────────────
//

/// Derive completed/locked/unlocked state for every node of a catalog.
///
/// Subtopics are ordered subject-wide by concatenating each topic's list.
/// The effective level is the larger of `baseline` and the number of
/// explicitly completed subtopics present in the catalog; every subtopic
/// whose index falls below it counts as completed. A topic is completed when
/// it has subtopics and all of them are completed, and locked when the topic
/// before it is not completed. With `gate_enabled == false` every subtopic
/// is unlocked.
///
/// Pure and total: unknown keys in `completed` are ignored and `subject`
/// only labels the result.
///
/// # Examples
///
/// ```
/// # use prep_core::model::{Catalog, CompletionSet, Level, Subject, TopicGroup};
/// # use prep_core::progress::compute_progress;
/// let catalog = Catalog::new(
///     Subject::Math,
///     vec![TopicGroup::new("A", ["S1", "S2"]), TopicGroup::new("B", ["S3"])],
/// )?;
/// let state = compute_progress(Subject::Math, &catalog, Level::new(1), &CompletionSet::new(), true);
/// assert_eq!(state.effective_level, Level::new(1));
/// assert!(state.subtopic("A", "S1").unwrap().completed);
/// assert!(state.topic("B").unwrap().locked);
/// # Ok::<(), prep_core::model::CatalogError>(())
/// ```
#[must_use]
pub fn compute_progress(
    subject: Subject,
    catalog: &Catalog,
    baseline: Level,
    completed: &CompletionSet,
    gate_enabled: bool,
) -> ProgressState {
    let explicit = catalog
        .subtopic_order()
        .into_iter()
        .filter(|(topic, sub)| completed.has_subtopic(topic, sub))
        .count();
    let effective_level = baseline.max(Level::new(u32::try_from(explicit).unwrap_or(u32::MAX)));
    let threshold = effective_level.as_usize();

    let mut topics: Vec<TopicProgress> = Vec::with_capacity(catalog.groups().len());
    let mut index = 0usize;
    let mut previous_completed = true;

    for group in catalog.groups() {
        let locked = !topics.is_empty() && !previous_completed;

        let mut subtopics = Vec::with_capacity(group.subtopics.len());
        for sub in &group.subtopics {
            let explicitly_completed = completed.has_subtopic(&group.title, &sub.title);
            let is_completed = explicitly_completed || index < threshold;
            let unlocked = !gate_enabled || is_completed || (!locked && index < threshold);
            subtopics.push(SubtopicProgress {
                title: sub.title.clone(),
                index,
                count: sub.count,
                explicitly_completed,
                completed: is_completed,
                unlocked,
                available: unlocked,
            });
            index += 1;
        }

        let all_done = !subtopics.is_empty() && subtopics.iter().all(|s| s.completed);
        let passed_quiz = completed.has_topic(&group.title);
        let quiz_ready = all_done && !passed_quiz;
        let quiz = if locked && gate_enabled {
            TopicQuiz::Locked
        } else if passed_quiz {
            TopicQuiz::Retake
        } else if quiz_ready {
            TopicQuiz::Ready
        } else {
            TopicQuiz::NotReady
        };

        previous_completed = all_done;
        topics.push(TopicProgress {
            title: group.title.clone(),
            count: group.count,
            completed: all_done,
            locked,
            quiz_ready,
            quiz,
            subtopics,
        });
    }

    let next_subtopic = mark_next_available(&mut topics);

    ProgressState {
        subject,
        baseline_level: baseline,
        effective_level,
        gate_enabled,
        topics,
        next_subtopic,
    }
}

/// Flag the first outstanding subtopic of an unlocked topic as available.
fn mark_next_available(topics: &mut [TopicProgress]) -> Option<CompletionKey> {
    for topic in topics.iter_mut().filter(|t| !t.locked) {
        let topic_title = topic.title.clone();
        if let Some(sub) = topic.subtopics.iter_mut().find(|s| !s.completed) {
            sub.available = true;
            return Some(CompletionKey::subtopic(topic_title, sub.title.clone()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TopicGroup;

    fn small_catalog() -> Catalog {
        Catalog::new(
            Subject::Math,
            vec![
                TopicGroup::new("TopicA", ["S1", "S2"]),
                TopicGroup::new("TopicB", ["S3"]),
            ],
        )
        .unwrap()
    }

    fn keys(raw: &[&str]) -> CompletionSet {
        raw.iter().map(|k| k.parse().unwrap()).collect()
    }

    fn run(catalog: &Catalog, level: u32, done: &CompletionSet) -> ProgressState {
        compute_progress(catalog.subject(), catalog, Level::new(level), done, true)
    }

    #[test]
    fn baseline_level_completes_prefix_only() {
        let state = run(&small_catalog(), 1, &CompletionSet::new());

        assert_eq!(state.effective_level, Level::new(1));
        assert!(state.subtopic("TopicA", "S1").unwrap().completed);
        assert!(!state.subtopic("TopicA", "S2").unwrap().completed);
        assert!(!state.subtopic("TopicB", "S3").unwrap().completed);
        assert!(!state.topic("TopicA").unwrap().completed);
        assert!(state.topic("TopicB").unwrap().locked);
    }

    #[test]
    fn explicit_completions_raise_effective_level_and_unlock_next_topic() {
        let state = run(&small_catalog(), 1, &keys(&["TopicA::S1", "TopicA::S2"]));

        assert_eq!(state.effective_level, Level::new(2));
        assert!(state.topic("TopicA").unwrap().completed);
        assert!(!state.topic("TopicB").unwrap().locked);
    }

    #[test]
    fn effective_level_never_below_baseline() {
        let catalog = Catalog::builtin(Subject::Math);
        for level in [0, 3, 20, 50] {
            let state = run(&catalog, level, &keys(&["Algebra::Linear functions"]));
            assert!(state.effective_level >= Level::new(level));
        }
    }

    #[test]
    fn implicit_completion_follows_index() {
        let catalog = Catalog::builtin(Subject::Verbal);
        let state = run(&catalog, 4, &CompletionSet::new());
        for topic in &state.topics {
            for sub in &topic.subtopics {
                assert_eq!(sub.completed, sub.index < 4, "{}", sub.title);
            }
        }
    }

    #[test]
    fn explicit_completion_counts_regardless_of_index() {
        let state = run(&small_catalog(), 0, &keys(&["TopicB::S3"]));
        let s3 = state.subtopic("TopicB", "S3").unwrap();
        assert!(s3.completed);
        assert!(s3.explicitly_completed);
        assert!(s3.unlocked);
        // one explicit completion lifts the level to 1, which covers S1
        assert!(state.subtopic("TopicA", "S1").unwrap().completed);
        assert!(state.topic("TopicB").unwrap().locked);
    }

    #[test]
    fn topic_lock_tracks_previous_topic_only() {
        let catalog = Catalog::builtin(Subject::Math);
        let state = run(&catalog, 5, &CompletionSet::new());
        assert!(!state.topics[0].locked);
        assert!(state.topics[0].completed);
        assert!(!state.topics[1].locked);
        assert!(state.topics[2].locked);
        assert!(state.topics[3].locked);

        for pair in state.topics.windows(2) {
            assert_eq!(pair[1].locked, !pair[0].completed);
        }
    }

    #[test]
    fn first_topic_is_never_locked() {
        let state = run(&Catalog::builtin(Subject::Verbal), 0, &CompletionSet::new());
        assert!(!state.topics[0].locked);
    }

    #[test]
    fn disabled_gate_unlocks_everything() {
        let catalog = Catalog::builtin(Subject::Math);
        let state = compute_progress(Subject::Math, &catalog, Level::ZERO, &CompletionSet::new(), false);
        assert!(
            state
                .topics
                .iter()
                .flat_map(|t| t.subtopics.iter())
                .all(|s| s.unlocked && s.available)
        );
        assert!(state.topics.iter().all(|t| t.quiz != TopicQuiz::Locked));
        // lock state is still reported
        assert!(state.topics[1].locked);
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let catalog = Catalog::builtin(Subject::Math);
        let done = keys(&["Algebra::Linear functions", "Advanced Math"]);
        let a = compute_progress(Subject::Math, &catalog, Level::new(2), &done, true);
        let b = compute_progress(Subject::Math, &catalog, Level::new(2), &done, true);
        assert_eq!(a, b);
    }

    #[test]
    fn next_subtopic_is_available_for_new_learner() {
        let state = run(&small_catalog(), 0, &CompletionSet::new());
        assert_eq!(state.next_subtopic, Some(CompletionKey::subtopic("TopicA", "S1")));

        let s1 = state.subtopic("TopicA", "S1").unwrap();
        assert!(!s1.unlocked);
        assert!(s1.available);
        assert!(!state.subtopic("TopicA", "S2").unwrap().available);
    }

    #[test]
    fn next_subtopic_skips_locked_topics() {
        // S3 is outstanding but TopicB is locked behind S2
        let state = run(&small_catalog(), 0, &keys(&["TopicB::S3"]));
        assert_eq!(state.next_subtopic, Some(CompletionKey::subtopic("TopicA", "S2")));
    }

    #[test]
    fn next_subtopic_is_none_when_everything_is_done() {
        let state = run(&small_catalog(), 3, &CompletionSet::new());
        assert_eq!(state.next_subtopic, None);
        assert_eq!(state.completed_subtopics(), state.total_subtopics());
    }

    #[test]
    fn quiz_ready_until_topic_quiz_recorded() {
        let catalog = small_catalog();
        let state = run(&catalog, 2, &CompletionSet::new());
        let topic_a = state.topic("TopicA").unwrap();
        assert!(topic_a.quiz_ready);
        assert_eq!(topic_a.quiz, TopicQuiz::Ready);
        assert_eq!(state.quiz_ready_topics().collect::<Vec<_>>(), vec!["TopicA"]);

        let state = run(&catalog, 2, &keys(&["TopicA"]));
        let topic_a = state.topic("TopicA").unwrap();
        assert!(!topic_a.quiz_ready);
        assert_eq!(topic_a.quiz, TopicQuiz::Retake);
        assert_eq!(state.topic("TopicB").unwrap().quiz, TopicQuiz::NotReady);
    }

    #[test]
    fn topic_records_do_not_count_toward_level() {
        let state = run(&small_catalog(), 0, &keys(&["TopicA", "TopicB"]));
        assert_eq!(state.effective_level, Level::ZERO);
    }

    #[test]
    fn keys_outside_catalog_are_ignored() {
        let state = run(&small_catalog(), 0, &keys(&["TopicA::Gone", "Elsewhere::S1"]));
        assert_eq!(state.effective_level, Level::ZERO);
        assert_eq!(state.completed_subtopics(), 0);
    }

    #[test]
    fn empty_topic_is_not_completed_and_keeps_next_locked() {
        let catalog = Catalog::new(
            Subject::Verbal,
            vec![
                TopicGroup::new("A", ["S1"]),
                TopicGroup::new("Empty", Vec::<String>::new()),
                TopicGroup::new("C", ["S2"]),
            ],
        )
        .unwrap();
        let state = run(&catalog, 10, &CompletionSet::new());
        let empty = state.topic("Empty").unwrap();
        assert!(!empty.completed);
        assert!(!empty.quiz_ready);
        assert!(state.topic("C").unwrap().locked);
        // level still completes S2 by index
        assert!(state.subtopic("C", "S2").unwrap().completed);
    }

    #[test]
    fn inserting_subtopic_shifts_later_indexes() {
        let before = small_catalog();
        let after = Catalog::new(
            Subject::Math,
            vec![
                TopicGroup::new("TopicA", ["S0", "S1", "S2"]),
                TopicGroup::new("TopicB", ["S3"]),
            ],
        )
        .unwrap();

        let s = run(&before, 2, &CompletionSet::new());
        assert!(s.topic("TopicA").unwrap().completed);
        assert!(!s.topic("TopicB").unwrap().locked);

        // same level now covers S0/S1 only, so TopicB locks again
        let s = run(&after, 2, &CompletionSet::new());
        assert_eq!(s.subtopic("TopicA", "S2").unwrap().index, 2);
        assert!(!s.subtopic("TopicA", "S2").unwrap().completed);
        assert!(s.topic("TopicB").unwrap().locked);
    }

    #[test]
    fn serializes_quiz_label_in_snake_case() {
        let state = run(&small_catalog(), 0, &CompletionSet::new());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["topics"][0]["quiz"], "not_ready");
        assert_eq!(json["topics"][1]["quiz"], "locked");
        assert_eq!(json["effective_level"], 0);
    }
}
