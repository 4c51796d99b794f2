#![forbid(unsafe_code)]

pub mod repository;
pub mod seed;
pub mod sqlite;

pub use repository::{
    AttemptOutcome, CompletionRecord, CompletionRepository, InMemoryRepository, NewQuestionRecord,
    ProfileRecord, ProfileRepository, QuestionRecord, QuestionRepository, Storage, StorageError,
    StreakRepository,
};
pub use seed::seed_builtin_questions;
pub use sqlite::{SqliteInitError, SqliteRepository};
