use chrono::Duration;
use quiz_core::model::{
    Attempt, DisplayName, EndReason, Level, Question, QuizMode, QuizSettings, SessionId,
    SessionState, SessionSummary, UserId,
};
use quiz_core::time::fixed_now;
use storage::repository::{
    AttemptRecord, NewSession, NewUser, QuestionRecord, QuizRecordSink, SessionRepository,
    SettingsRepository, StorageError, UserRepository,
};
use storage::sqlite::{DatabaseLocation, SqliteRepository};

async fn connect(name: &str) -> SqliteRepository {
    SqliteRepository::open(&DatabaseLocation::SharedMemory(name.into()))
        .await
        .expect("open")
}

fn new_user(name: &str) -> NewUser {
    NewUser {
        display_name: DisplayName::new(name).unwrap(),
        created_at: fixed_now(),
    }
}

fn new_session(user: u64, offset_secs: i64) -> NewSession {
    NewSession {
        user_id: Some(UserId::new(user)),
        mode: QuizMode::SingleOp,
        total_questions: 5,
        timer_seconds: 60,
        started_at: fixed_now() + Duration::seconds(offset_secs),
    }
}

fn summary(score: u32, correct: u32, wrong: u32, reason: EndReason) -> SessionSummary {
    let state = SessionState {
        question_index: correct + wrong,
        score,
        current_streak: correct,
        max_streak: correct,
        current_level: Level::new(2).unwrap(),
        correct_count: correct,
        wrong_count: wrong,
        consecutive_wrong: 0,
    };
    SessionSummary::from_state(
        &state,
        Level::new(3).unwrap(),
        5,
        reason,
        fixed_now(),
        fixed_now() + Duration::seconds(90),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_completed_session() {
    let repo = connect("memdb_session_roundtrip").await;

    let id = repo.create_session(new_session(7, 0)).await.unwrap();
    let open = repo.get_session(id).await.unwrap();
    assert!(!open.is_completed());
    assert_eq!(open.mode, QuizMode::SingleOp);
    assert_eq!(open.user_id, Some(UserId::new(7)));

    let done = summary(64, 4, 1, EndReason::TimeExpired);
    repo.complete_session(id, &done).await.unwrap();

    let fetched = repo.get_session(id).await.unwrap();
    assert_eq!(fetched.summary.as_ref(), Some(&done));
    assert_eq!(fetched.score(), 64);

    let again = repo.complete_session(id, &done).await.unwrap_err();
    assert!(matches!(again, StorageError::Conflict));
    let missing = repo
        .complete_session(SessionId::new(999), &done)
        .await
        .unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_leaderboard_orders_by_score_then_accuracy() {
    let repo = connect("memdb_leaderboard").await;

    let a = repo.create_session(new_session(1, 0)).await.unwrap();
    let b = repo.create_session(new_session(2, 1)).await.unwrap();
    let c = repo.create_session(new_session(1, 2)).await.unwrap();
    let open = repo.create_session(new_session(1, 3)).await.unwrap();

    repo.complete_session(a, &summary(40, 3, 2, EndReason::Completed))
        .await
        .unwrap();
    repo.complete_session(b, &summary(40, 4, 0, EndReason::Completed))
        .await
        .unwrap();
    repo.complete_session(c, &summary(90, 5, 0, EndReason::Completed))
        .await
        .unwrap();

    let top: Vec<_> = repo
        .top_sessions(10, None)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(top, vec![c, b, a]);

    let mine: Vec<_> = repo
        .top_sessions(10, Some(UserId::new(1)))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(mine, vec![c, a]);

    let recent = repo.list_sessions(Some(UserId::new(1)), 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, open);
    assert_eq!(recent[1].id, c);
}

#[tokio::test]
async fn sqlite_records_questions_and_attempts() {
    let repo = connect("memdb_records").await;
    let id = repo.create_session(new_session(3, 0)).await.unwrap();

    let question = Question::new(id, Level::MIN, "7 - 2", 5, [6, 5, 4, 3], 1).unwrap();
    let record = QuestionRecord::from_question(&question, 1, fixed_now());
    repo.record_question(&record).await.unwrap();
    let duplicate = repo.record_question(&record).await.unwrap_err();
    assert!(matches!(duplicate, StorageError::Conflict));

    let attempt = Attempt::grade(&question, 1, 2_400).unwrap();
    let attempt = AttemptRecord::from_attempt(id, 1, &attempt, fixed_now());
    repo.record_attempt(&attempt).await.unwrap();

    let orphan = AttemptRecord {
        question_index: 2,
        ..attempt.clone()
    };
    assert!(repo.record_attempt(&orphan).await.is_err());

    let stored = repo.attempts_for_session(id).await.unwrap();
    assert_eq!(stored, vec![attempt]);
    assert!(stored[0].correct);
}

#[tokio::test]
async fn sqlite_settings_upsert() {
    let repo = connect("memdb_settings").await;
    let user = UserId::new(11);
    assert!(repo.get_settings(user).await.unwrap().is_none());

    let first = QuizSettings::from_persisted(QuizMode::SingleOp, 5, 0, 1500).unwrap();
    repo.save_settings(user, &first).await.unwrap();
    let second = QuizSettings::from_persisted(QuizMode::RandomMix, 20, 90, 0).unwrap();
    repo.save_settings(user, &second).await.unwrap();

    assert_eq!(repo.get_settings(user).await.unwrap(), Some(second));
}

#[tokio::test]
async fn reopening_keeps_schema_and_data() {
    let first = connect("memdb_reopen").await;
    let id = first.create_session(new_session(1, 0)).await.unwrap();
    assert_eq!(id, SessionId::new(1));

    let second = connect("memdb_reopen").await;
    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(second.pool())
        .await
        .unwrap();
    assert_eq!(versions, 2);
    assert_eq!(second.get_session(id).await.unwrap().id, id);
}

#[tokio::test]
async fn file_location_creates_missing_directories() {
    let dir = std::env::temp_dir().join(format!("quiz-storage-{}", std::process::id()));
    let path = dir.join("nested").join("quiz.sqlite3");
    let _ = std::fs::remove_dir_all(&dir);

    let location = DatabaseLocation::parse(&format!("sqlite://{}", path.display())).unwrap();
    let repo = SqliteRepository::open(&location).await.expect("open file");
    repo.create_session(new_session(1, 0)).await.unwrap();
    assert!(path.exists());

    repo.pool().close().await;
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn unknown_stored_mode_labels_read_as_mixed() {
    let repo = connect("memdb_mode_labels").await;
    sqlx::query(
        r"
            INSERT INTO settings (
                user_id, mode, questions_per_session, timer_seconds, auto_advance_ms, updated_at
            )
            VALUES (5, 'Chain Mix', 8, 0, 0, '2024-01-01T00:00:00Z')
        ",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let settings = repo.get_settings(UserId::new(5)).await.unwrap().unwrap();
    assert_eq!(settings.mode(), QuizMode::RandomMix);
    assert_eq!(settings.questions_per_session(), 8);
}

#[tokio::test]
async fn sqlite_users_roundtrip_and_rename() {
    let repo = connect("memdb_users").await;
    let ada = repo.create_user(new_user("Ada")).await.unwrap();
    let bob = repo.create_user(new_user("Quick Solver 1234")).await.unwrap();
    assert_eq!(ada.id(), UserId::new(1));
    assert_eq!(repo.get_user(bob.id()).await.unwrap(), bob);

    let renamed = repo
        .rename_user(ada.id(), &DisplayName::new("Ada L.").unwrap())
        .await
        .unwrap();
    assert_eq!(renamed.display_name().as_str(), "Ada L.");
    assert_eq!(renamed.created_at(), fixed_now());

    let listed = repo.list_users().await.unwrap();
    assert_eq!(listed, vec![renamed, bob]);

    let missing = repo.get_user(UserId::new(42)).await.unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_delete_user_cascades_history() {
    let repo = connect("memdb_delete_user").await;
    let ada = repo.create_user(new_user("Ada")).await.unwrap();
    let bob = repo.create_user(new_user("Bob")).await.unwrap();

    let mine = repo
        .create_session(new_session(ada.id().value(), 0))
        .await
        .unwrap();
    let theirs = repo
        .create_session(new_session(bob.id().value(), 1))
        .await
        .unwrap();
    let question = Question::new(mine, Level::MIN, "1 + 1", 2, [1, 2, 3, 4], 1).unwrap();
    repo.record_question(&QuestionRecord::from_question(&question, 1, fixed_now()))
        .await
        .unwrap();
    let attempt = Attempt::grade(&question, 1, 900).unwrap();
    repo.record_attempt(&AttemptRecord::from_attempt(mine, 1, &attempt, fixed_now()))
        .await
        .unwrap();
    let settings = QuizSettings::from_persisted(QuizMode::SingleOp, 5, 0, 0).unwrap();
    repo.save_settings(ada.id(), &settings).await.unwrap();

    repo.delete_user(ada.id()).await.unwrap();

    assert!(matches!(
        repo.get_session(mine).await,
        Err(StorageError::NotFound)
    ));
    assert!(repo.attempts_for_session(mine).await.unwrap().is_empty());
    assert!(repo.get_settings(ada.id()).await.unwrap().is_none());
    assert!(repo.get_session(theirs).await.is_ok());
    assert!(matches!(
        repo.delete_user(ada.id()).await,
        Err(StorageError::NotFound)
    ));
}
