use chrono::{DateTime, Utc};
use prep_core::model::{Catalog, Subject, UserId};

use crate::repository::{NewQuestionRecord, QuestionRepository, StorageError};

/// Insert `per_subtopic` published questions under every built-in subtopic.
///
/// Returns the number of questions inserted.
///
/// # Errors
///
/// Returns `StorageError` from the first insert that fails.
pub async fn seed_builtin_questions(
    questions: &dyn QuestionRepository,
    created_by: UserId,
    per_subtopic: u32,
    at: DateTime<Utc>,
) -> Result<u32, StorageError> {
    let mut inserted = 0;
    for subject in Subject::ALL {
        let catalog = Catalog::builtin(subject);
        for (topic, subtopic) in catalog.subtopic_order() {
            for n in 1..=per_subtopic {
                questions
                    .insert_question(NewQuestionRecord {
                        subject,
                        topic: topic.to_owned(),
                        subtopic: Some(subtopic.to_owned()),
                        stem: format!("{subtopic} practice #{n}"),
                        published: true,
                        created_by,
                        created_at: at,
                    })
                    .await?;
                inserted += 1;
            }
        }
    }
    tracing::debug!(inserted, per_subtopic, "seeded built-in questions");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use prep_core::time::fixed_now;

    #[tokio::test]
    async fn seeds_every_builtin_subtopic() {
        let repo = InMemoryRepository::new();
        let inserted = seed_builtin_questions(&repo, UserId::new(1), 2, fixed_now())
            .await
            .unwrap();

        let subtopics: usize = Subject::ALL
            .iter()
            .map(|s| Catalog::builtin(*s).subtopic_len())
            .sum();
        assert_eq!(inserted as usize, subtopics * 2);

        let counts = repo.question_counts(true).await.unwrap();
        assert_eq!(counts.len(), subtopics);
        assert!(counts.iter().all(|c| c.count == 2 && c.subtopic.is_some()));
    }

    #[tokio::test]
    async fn zero_per_subtopic_inserts_nothing() {
        let repo = InMemoryRepository::new();
        let inserted = seed_builtin_questions(&repo, UserId::new(1), 0, fixed_now())
            .await
            .unwrap();
        assert_eq!(inserted, 0);
        assert!(repo.question_counts(false).await.unwrap().is_empty());
    }
}
