use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use prep_core::model::{
    CompletionKey, CompletionSet, Level, QuestionCount, QuestionId, Role, Subject, UserId,
};
use prep_core::streak::DailyProgress;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted profile fields relevant to progress and streaks.
///
/// Levels are kept as the free text admins typed; use [`ProfileRecord::level`]
/// to read them as numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub user_id: UserId,
    pub role: String,
    pub is_admin: bool,
    pub math_level: Option<String>,
    pub verbal_level: Option<String>,
    pub streak_offset: i64,
}

impl ProfileRecord {
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role: role.as_str().to_owned(),
            is_admin: role == Role::Admin,
            math_level: None,
            verbal_level: None,
            streak_offset: 0,
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_profile(&self.role, self.is_admin)
    }

    #[must_use]
    pub fn level(&self, subject: Subject) -> Level {
        let raw = match subject {
            Subject::Math => self.math_level.as_deref(),
            Subject::Verbal => self.verbal_level.as_deref(),
        };
        raw.map_or(Level::ZERO, Level::parse_lenient)
    }

    pub fn set_level(&mut self, subject: Subject, level: Level) {
        let text = Some(level.to_string());
        match subject {
            Subject::Math => self.math_level = text,
            Subject::Verbal => self.verbal_level = text,
        }
    }
}

/// One passed subtopic or topic quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub user_id: UserId,
    pub subject: Subject,
    pub key: CompletionKey,
    pub completed_at: DateTime<Utc>,
}

/// Question fields needed for counting and streak attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub subject: Subject,
    pub topic: String,
    pub subtopic: Option<String>,
    pub stem: String,
    pub published: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a question (ID assigned by storage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestionRecord {
    pub subject: Subject,
    pub topic: String,
    pub subtopic: Option<String>,
    pub stem: String,
    pub published: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// What counting one question attempt did to the day's tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    /// `false` when the question was already attempted that day.
    pub counted: bool,
    /// `true` when this attempt completed the day.
    pub completed_day: bool,
    /// Tally after the attempt.
    pub day: DailyProgress,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch a profile.
    ///
    /// Returns `Ok(None)` when the user has no profile yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<ProfileRecord>, StorageError>;

    /// Persist or update a profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &ProfileRecord) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Raw completion keys for one learner and subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_completions(
        &self,
        user_id: UserId,
        subject: Subject,
    ) -> Result<CompletionSet, StorageError>;

    /// Record a completion. Re-recording an existing key keeps the first
    /// timestamp and returns `false`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a question and return its new ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(&self, question: NewQuestionRecord)
    -> Result<QuestionId, StorageError>;

    /// Fetch a question by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<QuestionRecord>, StorageError>;

    /// Question counts grouped by `(subject, topic, subtopic)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn question_counts(&self, published_only: bool)
    -> Result<Vec<QuestionCount>, StorageError>;
}

#[async_trait]
pub trait StreakRepository: Send + Sync {
    /// Fetch the tally for one local day.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyProgress>, StorageError>;

    /// Persist or update a day's tally.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the tally cannot be stored.
    async fn save_day(&self, day: &DailyProgress) -> Result<(), StorageError>;

    /// All completed days for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn completed_days(&self, user_id: UserId) -> Result<Vec<NaiveDate>, StorageError>;

    /// Record an attempt and bump the day's capped counter for `subject`.
    ///
    /// Both writes happen atomically: a question counts at most once per
    /// user and day, and concurrent attempts never lose increments.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn record_attempt(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        subject: Subject,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    profiles: Arc<Mutex<HashMap<UserId, ProfileRecord>>>,
    completions: Arc<Mutex<HashMap<(UserId, Subject, CompletionKey), DateTime<Utc>>>>,
    questions: Arc<Mutex<BTreeMap<QuestionId, QuestionRecord>>>,
    days: Arc<Mutex<HashMap<(UserId, NaiveDate), DailyProgress>>>,
    attempts: Arc<Mutex<HashSet<(UserId, QuestionId, NaiveDate)>>>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<ProfileRecord>, StorageError> {
        Ok(lock(&self.profiles)?.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &ProfileRecord) -> Result<(), StorageError> {
        lock(&self.profiles)?.insert(profile.user_id, profile.clone());
        Ok(())
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn list_completions(
        &self,
        user_id: UserId,
        subject: Subject,
    ) -> Result<CompletionSet, StorageError> {
        let guard = lock(&self.completions)?;
        Ok(guard
            .keys()
            .filter(|(user, subj, _)| *user == user_id && *subj == subject)
            .map(|(_, _, key)| key.clone())
            .collect())
    }

    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool, StorageError> {
        let mut guard = lock(&self.completions)?;
        let key = (record.user_id, record.subject, record.key.clone());
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(key, record.completed_at);
        Ok(true)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(
        &self,
        question: NewQuestionRecord,
    ) -> Result<QuestionId, StorageError> {
        let mut guard = lock(&self.questions)?;
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let id = QuestionId::new(next);
        guard.insert(
            id,
            QuestionRecord {
                id,
                subject: question.subject,
                topic: question.topic,
                subtopic: question.subtopic,
                stem: question.stem,
                published: question.published,
                created_by: question.created_by,
                created_at: question.created_at,
            },
        );
        Ok(id)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<QuestionRecord>, StorageError> {
        Ok(lock(&self.questions)?.get(&id).cloned())
    }

    async fn question_counts(
        &self,
        published_only: bool,
    ) -> Result<Vec<QuestionCount>, StorageError> {
        let guard = lock(&self.questions)?;
        let mut grouped: BTreeMap<(Subject, String, Option<String>), u32> = BTreeMap::new();
        for q in guard.values().filter(|q| q.published || !published_only) {
            *grouped
                .entry((q.subject, q.topic.clone(), q.subtopic.clone()))
                .or_default() += 1;
        }
        Ok(grouped
            .into_iter()
            .map(|((subject, topic, subtopic), count)| QuestionCount {
                subject,
                topic,
                subtopic,
                count,
            })
            .collect())
    }
}

#[async_trait]
impl StreakRepository for InMemoryRepository {
    async fn get_day(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyProgress>, StorageError> {
        Ok(lock(&self.days)?.get(&(user_id, date)).cloned())
    }

    async fn save_day(&self, day: &DailyProgress) -> Result<(), StorageError> {
        lock(&self.days)?.insert((day.user_id, day.date), day.clone());
        Ok(())
    }

    async fn completed_days(&self, user_id: UserId) -> Result<Vec<NaiveDate>, StorageError> {
        let guard = lock(&self.days)?;
        let mut days: Vec<NaiveDate> = guard
            .values()
            .filter(|d| d.user_id == user_id && d.is_completed())
            .map(|d| d.date)
            .collect();
        days.sort_unstable_by(|a, b| b.cmp(a));
        Ok(days)
    }

    async fn record_attempt(
        &self,
        user_id: UserId,
        question_id: QuestionId,
        subject: Subject,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AttemptOutcome, StorageError> {
        let mut attempts = lock(&self.attempts)?;
        let mut days = lock(&self.days)?;
        if !attempts.insert((user_id, question_id, date)) {
            let day = days
                .get(&(user_id, date))
                .cloned()
                .unwrap_or_else(|| DailyProgress::new(user_id, date));
            return Ok(AttemptOutcome {
                counted: false,
                completed_day: false,
                day,
            });
        }
        let day = days
            .entry((user_id, date))
            .or_insert_with(|| DailyProgress::new(user_id, date));
        let completed_day = day.record(subject, at);
        Ok(AttemptOutcome {
            counted: true,
            completed_day,
            day: day.clone(),
        })
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub profiles: Arc<dyn ProfileRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub streaks: Arc<dyn StreakRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Share one repository value across every slot.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: ProfileRepository
            + CompletionRepository
            + QuestionRepository
            + StreakRepository
            + Clone
            + 'static,
    {
        Self {
            profiles: Arc::new(repo.clone()),
            completions: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            streaks: Arc::new(repo),
        }
    }
}
