use std::sync::Arc;

use prep_core::model::{Catalog, RequestContext, Subject};
use storage::repository::QuestionRepository;

/// Serves the topic catalog with live question counts.
#[derive(Clone)]
pub struct CatalogService {
    questions: Arc<dyn QuestionRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self { questions }
    }

    /// Built-in catalog for `subject` with question counts applied.
    ///
    /// Staff see counts that include unpublished questions. If counts cannot
    /// be loaded the catalog is returned with its zero defaults.
    pub async fn catalog(&self, ctx: &RequestContext, subject: Subject) -> Catalog {
        let base = Catalog::builtin(subject);
        match self.questions.question_counts(!ctx.is_staff()).await {
            Ok(rows) => base.with_counts(&rows),
            Err(err) => {
                tracing::warn!(%subject, error = %err, "question counts unavailable, using defaults");
                base
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use prep_core::model::{QuestionCount, QuestionId, Role, UserId};
    use prep_core::time::fixed_now;
    use storage::repository::{
        InMemoryRepository, NewQuestionRecord, QuestionRecord, StorageError,
    };

    struct Offline;

    #[async_trait]
    impl QuestionRepository for Offline {
        async fn insert_question(
            &self,
            _question: NewQuestionRecord,
        ) -> Result<QuestionId, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn get_question(
            &self,
            _id: QuestionId,
        ) -> Result<Option<QuestionRecord>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn question_counts(
            &self,
            _published_only: bool,
        ) -> Result<Vec<QuestionCount>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    async fn seed(repo: &InMemoryRepository, published: bool) {
        repo.insert_question(NewQuestionRecord {
            subject: Subject::Verbal,
            topic: "Expression of Ideas".into(),
            subtopic: Some("Transitions".into()),
            stem: "Which transition fits best?".into(),
            published,
            created_by: UserId::new(1),
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn staff_counts_include_unpublished() {
        let repo = InMemoryRepository::new();
        seed(&repo, true).await;
        seed(&repo, false).await;
        let svc = CatalogService::new(Arc::new(repo));

        let student = RequestContext::student(UserId::new(2));
        let teacher = RequestContext::new(UserId::new(3), Role::Teacher);
        assert_eq!(svc.catalog(&student, Subject::Verbal).await.total_count(), 1);
        assert_eq!(svc.catalog(&teacher, Subject::Verbal).await.total_count(), 2);
    }

    #[tokio::test]
    async fn storage_failure_falls_back_to_builtin() {
        let svc = CatalogService::new(Arc::new(Offline));
        let ctx = RequestContext::student(UserId::new(1));
        let catalog = svc.catalog(&ctx, Subject::Math).await;
        assert_eq!(catalog, Catalog::builtin(Subject::Math));
    }
}
