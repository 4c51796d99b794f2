use chrono::{Duration, NaiveDate};
use prep_core::model::{QuestionId, RequestContext, Role, Subject, UserId};
use prep_core::streak::DailyProgress;
use prep_core::time::{fixed_clock, fixed_now};
use services::{AppServices, StreakServiceError};
use storage::repository::{
    NewQuestionRecord, ProfileRecord, ProfileRepository, QuestionRepository, StreakRepository,
};

async fn seed_question(app: &AppServices, subject: Subject, published: bool) -> QuestionId {
    let (topic, subtopic) = match subject {
        Subject::Math => ("Algebra", "Linear functions"),
        Subject::Verbal => ("Expression of Ideas", "Transitions"),
    };
    app.storage()
        .questions
        .insert_question(NewQuestionRecord {
            subject,
            topic: topic.into(),
            subtopic: Some(subtopic.into()),
            stem: "Pick the best answer.".into(),
            published,
            created_by: UserId::new(1),
            created_at: fixed_now(),
        })
        .await
        .unwrap()
}

fn student() -> RequestContext {
    RequestContext::student(UserId::new(10))
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 11, 15).unwrap()
}

#[tokio::test]
async fn empty_status_reports_time_left() {
    let app = AppServices::in_memory(fixed_clock());
    let status = app.streaks().status(&student()).await.unwrap();

    assert_eq!(status.streak_count, 0);
    assert_eq!(status.today.date, today());
    assert_eq!(status.today.math_count, 0);
    assert!(!status.today.completed);
    assert_eq!(status.time_left_seconds, 21 * 3600 + 46 * 60 + 40);
}

#[tokio::test]
async fn five_per_subject_completes_the_day() {
    let app = AppServices::in_memory(fixed_clock());
    let streaks = app.streaks();
    let ctx = student();

    for _ in 0..5 {
        let math = seed_question(&app, Subject::Math, true).await;
        let verbal = seed_question(&app, Subject::Verbal, true).await;
        streaks.record_attempt(&ctx, math, None).await.unwrap();
        streaks.record_attempt(&ctx, verbal, None).await.unwrap();
    }

    let status = streaks.status(&ctx).await.unwrap();
    assert_eq!(status.today.math_count, 5);
    assert_eq!(status.today.verbal_count, 5);
    assert!(status.today.completed);
    assert_eq!(status.streak_count, 1);
}

#[tokio::test]
async fn repeat_attempts_count_once() {
    let app = AppServices::in_memory(fixed_clock());
    let streaks = app.streaks();
    let question = seed_question(&app, Subject::Math, true).await;

    streaks.record_attempt(&student(), question, None).await.unwrap();
    let status = streaks
        .record_attempt(&student(), question, None)
        .await
        .unwrap();
    assert_eq!(status.today.math_count, 1);
}

#[tokio::test]
async fn explicit_subject_overrides_question_subject() {
    let app = AppServices::in_memory(fixed_clock());
    let question = seed_question(&app, Subject::Math, true).await;

    let status = app
        .streaks()
        .record_attempt(&student(), question, Some(Subject::Verbal))
        .await
        .unwrap();
    assert_eq!(status.today.math_count, 0);
    assert_eq!(status.today.verbal_count, 1);
}

#[tokio::test]
async fn unpublished_and_missing_questions() {
    let app = AppServices::in_memory(fixed_clock());
    let streaks = app.streaks();
    let draft = seed_question(&app, Subject::Verbal, false).await;

    let err = streaks
        .record_attempt(&student(), draft, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StreakServiceError::Unpublished(_)));

    let teacher = RequestContext::new(UserId::new(2), Role::Teacher);
    let status = streaks.record_attempt(&teacher, draft, None).await.unwrap();
    assert_eq!(status.today.verbal_count, 1);

    let err = streaks
        .record_attempt(&student(), QuestionId::new(999), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StreakServiceError::QuestionNotFound(_)));
}

#[tokio::test]
async fn yesterday_and_offset_carry_the_streak() {
    let app = AppServices::in_memory(fixed_clock());
    let ctx = student();
    let yesterday = today().pred_opt().unwrap();

    let mut day = DailyProgress::new(ctx.user_id(), yesterday);
    day.math_count = 5;
    day.verbal_count = 5;
    day.completed_at = Some(fixed_now());
    app.storage().streaks.save_day(&day).await.unwrap();

    let mut profile = ProfileRecord::new(ctx.user_id(), Role::Student);
    profile.streak_offset = 3;
    app.storage().profiles.upsert_profile(&profile).await.unwrap();

    let status = app.streaks().status(&ctx).await.unwrap();
    assert_eq!(status.streak_count, 4);
    assert!(!status.today.completed);
}

#[tokio::test]
async fn next_day_starts_a_fresh_tally() {
    let app = AppServices::in_memory(fixed_clock());
    let ctx = student();
    for _ in 0..5 {
        let math = seed_question(&app, Subject::Math, true).await;
        let verbal = seed_question(&app, Subject::Verbal, true).await;
        app.streaks().record_attempt(&ctx, math, None).await.unwrap();
        app.streaks().record_attempt(&ctx, verbal, None).await.unwrap();
    }

    let mut tomorrow = fixed_clock();
    tomorrow.advance(Duration::days(1));
    let next = AppServices::from_storage(app.storage().clone(), tomorrow);

    let status = next.streaks().status(&ctx).await.unwrap();
    assert_eq!(status.today.date, today().succ_opt().unwrap());
    assert_eq!(status.today.math_count, 0);
    assert_eq!(status.streak_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_on_sqlite_count_each_question_once() {
    let dir = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("streaks.sqlite3").display());
    let app = AppServices::new_sqlite(&url, fixed_clock()).await.unwrap();

    let mut questions = Vec::new();
    for _ in 0..5 {
        questions.push(seed_question(&app, Subject::Math, true).await);
        questions.push(seed_question(&app, Subject::Verbal, true).await);
    }

    for round in 0..10 {
        let ctx = RequestContext::student(UserId::new(100 + round));
        // every question twice, all in flight at once
        let handles: Vec<_> = questions
            .iter()
            .chain(questions.iter())
            .map(|&question| {
                let streaks = app.streaks();
                tokio::spawn(async move { streaks.record_attempt(&ctx, question, None).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let status = app.streaks().status(&ctx).await.unwrap();
        assert_eq!(
            (status.today.math_count, status.today.verbal_count),
            (5, 5),
            "round {round}"
        );
        assert!(status.today.completed);
        assert_eq!(status.streak_count, 1);
    }
}
