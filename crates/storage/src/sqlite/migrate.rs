use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use super::SqliteInitError;

/// Brings the schema up to the latest version.
///
/// 1. sessions, questions, attempts, per-user settings and the leaderboard
///    indexes.
/// 2. player profiles.
pub(super) async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        debug!(version = 1, "schema already applied");
    } else {
        create_quiz_tables(pool).await?;
    }
    if is_applied(pool, 2).await? {
        debug!(version = 2, "schema already applied");
    } else {
        create_users_table(pool).await?;
    }
    Ok(())
}

async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
        .bind(version)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

async fn finish_version(mut tx: Transaction<'_, Sqlite>, version: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(version)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    debug!(version, "applied schema migration");
    Ok(())
}

#[allow(clippy::too_many_lines)]
async fn create_quiz_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER,
                mode TEXT NOT NULL,
                total_questions INTEGER NOT NULL CHECK (total_questions > 0),
                timer_seconds INTEGER NOT NULL CHECK (timer_seconds >= 0),
                started_at TEXT NOT NULL,
                completed_at TEXT,
                end_reason TEXT,
                score INTEGER CHECK (score >= 0),
                accuracy REAL CHECK (accuracy BETWEEN 0 AND 100),
                max_streak INTEGER CHECK (max_streak >= 0),
                highest_level INTEGER CHECK (highest_level >= 1),
                correct_count INTEGER CHECK (correct_count >= 0),
                wrong_count INTEGER CHECK (wrong_count >= 0)
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY,
                session_id INTEGER NOT NULL,
                question_index INTEGER NOT NULL CHECK (question_index >= 1),
                level INTEGER NOT NULL CHECK (level >= 1),
                expression TEXT NOT NULL,
                correct_answer INTEGER NOT NULL,
                option_a INTEGER NOT NULL,
                option_b INTEGER NOT NULL,
                option_c INTEGER NOT NULL,
                option_d INTEGER NOT NULL,
                correct_index INTEGER NOT NULL CHECK (correct_index BETWEEN 0 AND 3),
                created_at TEXT NOT NULL,
                UNIQUE (session_id, question_index),
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY,
                session_id INTEGER NOT NULL,
                question_index INTEGER NOT NULL,
                selected_index INTEGER NOT NULL CHECK (selected_index BETWEEN 0 AND 3),
                is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                answer_time_ms INTEGER NOT NULL CHECK (answer_time_ms >= 0),
                answered_at TEXT NOT NULL,
                FOREIGN KEY (session_id, question_index)
                    REFERENCES questions(session_id, question_index) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS settings (
                user_id INTEGER PRIMARY KEY,
                mode TEXT NOT NULL,
                questions_per_session INTEGER NOT NULL CHECK (questions_per_session > 0),
                timer_seconds INTEGER NOT NULL CHECK (timer_seconds >= 0),
                auto_advance_ms INTEGER NOT NULL CHECK (auto_advance_ms >= 0),
                updated_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_sessions_leaderboard
                ON sessions (score DESC, accuracy DESC)
                WHERE completed_at IS NOT NULL;
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_sessions_user_started
                ON sessions (user_id, started_at);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_attempts_session
                ON attempts (session_id, question_index);
        ",
    )
    .execute(&mut *tx)
    .await?;

    finish_version(tx, 1).await
}

async fn create_users_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                display_name TEXT NOT NULL CHECK (length(trim(display_name)) > 0),
                created_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    finish_version(tx, 2).await
}
