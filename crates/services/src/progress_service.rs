use std::sync::Arc;

use prep_core::model::{CompletionKey, Level, RequestContext, Role, Subject, UserId};
use prep_core::progress::{ProgressState, TopicQuiz, compute_progress};
use storage::repository::{
    CompletionRecord, CompletionRepository, ProfileRecord, ProfileRepository,
};

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::ProgressServiceError;

/// Result of recording a passed quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// `false` when the pass was already on record.
    pub recorded: bool,
    pub progress: ProgressState,
}

/// Loads learner progress and records quiz passes.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: CatalogService,
    profiles: Arc<dyn ProfileRepository>,
    completions: Arc<dyn CompletionRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: CatalogService,
        profiles: Arc<dyn ProfileRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            profiles,
            completions,
        }
    }

    /// Progress of the calling user. Gating is off for staff.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress(
        &self,
        ctx: &RequestContext,
        subject: Subject,
    ) -> Result<ProgressState, ProgressServiceError> {
        self.compute(ctx, ctx.user_id(), subject, !ctx.is_staff())
            .await
    }

    /// Progress of another user as that user would see it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Access` unless the caller is staff, or
    /// `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        subject: Subject,
    ) -> Result<ProgressState, ProgressServiceError> {
        ctx.require_role(Role::Teacher)?;
        let gate = match self.profiles.get_profile(user_id).await? {
            Some(profile) => !profile.role().is_staff(),
            None => true,
        };
        self.compute(ctx, user_id, subject, gate).await
    }

    /// Record that the caller passed a subtopic quiz.
    ///
    /// Students may only pass subtopics that are currently available.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for keys outside the catalog, `Locked` for
    /// unavailable subtopics, or `Storage` on repository failures.
    pub async fn record_subtopic_pass(
        &self,
        ctx: &RequestContext,
        subject: Subject,
        topic: &str,
        subtopic: &str,
    ) -> Result<PassOutcome, ProgressServiceError> {
        let key = CompletionKey::subtopic(topic, subtopic);
        let state = self.progress(ctx, subject).await?;
        let node = state
            .subtopic(topic, subtopic)
            .ok_or_else(|| ProgressServiceError::UnknownNode {
                subject,
                key: key.clone(),
            })?;
        if state.gate_enabled && !node.available {
            return Err(ProgressServiceError::Locked(key));
        }
        self.record(ctx, subject, key).await
    }

    /// Record that the caller passed a topic-level quiz.
    ///
    /// Under gating the topic must be ready or already passed (a retake).
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for unknown topics, `TopicNotReady` when
    /// subtopics are outstanding, or `Storage` on repository failures.
    pub async fn record_topic_pass(
        &self,
        ctx: &RequestContext,
        subject: Subject,
        topic: &str,
    ) -> Result<PassOutcome, ProgressServiceError> {
        let key = CompletionKey::topic(topic);
        let state = self.progress(ctx, subject).await?;
        let node = state
            .topic(topic)
            .ok_or_else(|| ProgressServiceError::UnknownNode {
                subject,
                key: key.clone(),
            })?;
        let allowed = matches!(node.quiz, TopicQuiz::Ready | TopicQuiz::Retake);
        if state.gate_enabled && !allowed {
            return Err(ProgressServiceError::TopicNotReady(topic.to_owned()));
        }
        self.record(ctx, subject, key).await
    }

    /// Set a user's baseline level for one subject.
    ///
    /// Creates a student profile if the user has none.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Access` unless the caller is an admin,
    /// or `ProgressServiceError::Storage` if persistence fails.
    pub async fn set_level(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        subject: Subject,
        level: Level,
    ) -> Result<ProfileRecord, ProgressServiceError> {
        ctx.require_role(Role::Admin)?;
        let mut profile = self
            .profiles
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| ProfileRecord::new(user_id, Role::Student));
        profile.set_level(subject, level);
        self.profiles.upsert_profile(&profile).await?;
        tracing::info!(user = %user_id, %subject, %level, by = %ctx.user_id(), "level updated");
        Ok(profile)
    }

    async fn compute(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        subject: Subject,
        gate_enabled: bool,
    ) -> Result<ProgressState, ProgressServiceError> {
        let level = self
            .profiles
            .get_profile(user_id)
            .await?
            .map_or(Level::ZERO, |p| p.level(subject));
        let completed = self.completions.list_completions(user_id, subject).await?;
        let catalog = self.catalog.catalog(ctx, subject).await;
        Ok(compute_progress(
            subject,
            &catalog,
            level,
            &completed,
            gate_enabled,
        ))
    }

    async fn record(
        &self,
        ctx: &RequestContext,
        subject: Subject,
        key: CompletionKey,
    ) -> Result<PassOutcome, ProgressServiceError> {
        let recorded = self
            .completions
            .record_completion(&CompletionRecord {
                user_id: ctx.user_id(),
                subject,
                key: key.clone(),
                completed_at: self.clock.now(),
            })
            .await?;
        if recorded {
            tracing::info!(user = %ctx.user_id(), %subject, %key, "completion recorded");
        } else {
            tracing::debug!(user = %ctx.user_id(), %subject, %key, "completion already on record");
        }
        let progress = self.progress(ctx, subject).await?;
        Ok(PassOutcome { recorded, progress })
    }
}
