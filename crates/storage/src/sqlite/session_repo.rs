use async_trait::async_trait;
use quiz_core::model::{SessionId, SessionSummary, UserId};

use super::SqliteRepository;
use super::mapping::{id_i64, map_session_row, session_id_from_i64};
use crate::repository::{NewSession, SessionRecord, SessionRepository, StorageError};

const SESSION_COLUMNS: &str = r"
    id, user_id, mode, total_questions, timer_seconds, started_at,
    completed_at, end_reason, score, accuracy, max_streak, highest_level,
    correct_count, wrong_count
";

fn user_i64(user_id: Option<UserId>) -> Result<Option<i64>, StorageError> {
    user_id.map(|u| id_i64("user_id", u.value())).transpose()
}

impl SqliteRepository {
    async fn fetch_sessions(
        &self,
        filter: &str,
        order: &str,
        user_id: Option<UserId>,
        limit: u32,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE {filter}");
        let mut bind_index = 1;
        if user_id.is_some() {
            sql.push_str(" AND user_id = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql);
        if let Some(user) = user_i64(user_id)? {
            query = query.bind(user);
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(&self, new: NewSession) -> Result<SessionId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO sessions (user_id, mode, total_questions, timer_seconds, started_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(user_i64(new.user_id)?)
        .bind(new.mode.label())
        .bind(i64::from(new.total_questions))
        .bind(i64::from(new.timer_seconds))
        .bind(new.started_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        session_id_from_i64(res.last_insert_rowid())
    }

    async fn complete_session(
        &self,
        id: SessionId,
        summary: &SessionSummary,
    ) -> Result<(), StorageError> {
        let id = id_i64("session_id", id.value())?;
        let res = sqlx::query(
            r"
                UPDATE sessions SET
                    completed_at = ?2,
                    end_reason = ?3,
                    score = ?4,
                    accuracy = ?5,
                    max_streak = ?6,
                    highest_level = ?7,
                    correct_count = ?8,
                    wrong_count = ?9
                WHERE id = ?1 AND completed_at IS NULL
            ",
        )
        .bind(id)
        .bind(summary.completed_at())
        .bind(summary.end_reason().as_str())
        .bind(i64::from(summary.final_score()))
        .bind(summary.accuracy())
        .bind(i64::from(summary.max_streak()))
        .bind(i64::from(summary.highest_level().value()))
        .bind(i64::from(summary.correct_count()))
        .bind(i64::from(summary.wrong_count()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM sessions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Err(if exists.is_some() {
            StorageError::Conflict
        } else {
            StorageError::NotFound
        })
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("session_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_session_row(&row)
    }

    async fn list_sessions(
        &self,
        user_id: Option<UserId>,
        limit: u32,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        self.fetch_sessions("1 = 1", "started_at DESC, id DESC", user_id, limit)
            .await
    }

    async fn top_sessions(
        &self,
        limit: u32,
        user_id: Option<UserId>,
    ) -> Result<Vec<SessionRecord>, StorageError> {
        self.fetch_sessions(
            "completed_at IS NOT NULL",
            "score DESC, accuracy DESC, started_at ASC, id ASC",
            user_id,
            limit,
        )
        .await
    }
}
