use std::sync::Arc;

use prep_core::model::{QuestionId, RequestContext, Subject};
use prep_core::streak::{DailyProgress, DayStatus, StreakStatus, streak_base, streak_count};
use prep_core::time::seconds_until_midnight;
use storage::repository::{ProfileRepository, QuestionRepository, StreakRepository};

use crate::Clock;
use crate::error::StreakServiceError;

/// Tracks daily question attempts and the resulting streak.
#[derive(Clone)]
pub struct StreakService {
    clock: Clock,
    profiles: Arc<dyn ProfileRepository>,
    questions: Arc<dyn QuestionRepository>,
    streaks: Arc<dyn StreakRepository>,
}

impl StreakService {
    #[must_use]
    pub fn new(
        clock: Clock,
        profiles: Arc<dyn ProfileRepository>,
        questions: Arc<dyn QuestionRepository>,
        streaks: Arc<dyn StreakRepository>,
    ) -> Self {
        Self {
            clock,
            profiles,
            questions,
            streaks,
        }
    }

    /// Current streak and today's tally for the caller.
    ///
    /// # Errors
    ///
    /// Returns `StreakServiceError::Storage` if repository access fails.
    pub async fn status(&self, ctx: &RequestContext) -> Result<StreakStatus, StreakServiceError> {
        let today = self.clock.today();
        let day = self
            .streaks
            .get_day(ctx.user_id(), today)
            .await?
            .unwrap_or_else(|| DailyProgress::new(ctx.user_id(), today));
        self.build_status(ctx, &day).await
    }

    /// Count an attempt at `question_id` toward today's tally.
    ///
    /// Repeat attempts at the same question on the same day are not counted.
    /// `subject` defaults to the question's own subject.
    ///
    /// # Errors
    ///
    /// Returns `QuestionNotFound`, `Unpublished` (students only), or
    /// `Storage` on repository failures.
    pub async fn record_attempt(
        &self,
        ctx: &RequestContext,
        question_id: QuestionId,
        subject: Option<Subject>,
    ) -> Result<StreakStatus, StreakServiceError> {
        let question = self
            .questions
            .get_question(question_id)
            .await?
            .ok_or(StreakServiceError::QuestionNotFound(question_id))?;
        if !question.published && !ctx.is_staff() {
            return Err(StreakServiceError::Unpublished(question_id));
        }
        let subject = subject.unwrap_or(question.subject);

        let now = self.clock.now();
        let today = self.clock.today();
        let outcome = self
            .streaks
            .record_attempt(ctx.user_id(), question_id, subject, today, now)
            .await?;
        if outcome.completed_day {
            tracing::info!(user = %ctx.user_id(), date = %today, "daily goal completed");
        } else if !outcome.counted {
            tracing::debug!(user = %ctx.user_id(), question = %question_id, "repeat attempt not counted");
        }

        self.build_status(ctx, &outcome.day).await
    }

    async fn build_status(
        &self,
        ctx: &RequestContext,
        day: &DailyProgress,
    ) -> Result<StreakStatus, StreakServiceError> {
        let completed = self.streaks.completed_days(ctx.user_id()).await?;
        let offset = self
            .profiles
            .get_profile(ctx.user_id())
            .await?
            .map_or(0, |p| p.streak_offset);
        let now = self.clock.now();
        Ok(StreakStatus {
            streak_count: streak_count(streak_base(&completed, day.date), offset),
            today: DayStatus::from(day),
            time_left_seconds: seconds_until_midnight(now),
        })
    }
}
