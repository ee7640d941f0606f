use async_trait::async_trait;
use quiz_core::model::SessionId;

use super::SqliteRepository;
use super::mapping::{id_i64, map_attempt_row};
use crate::repository::{AttemptRecord, QuestionRecord, QuizRecordSink, StorageError};

fn index_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn write_err(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        other => StorageError::Connection(other.to_string()),
    }
}

#[async_trait]
impl QuizRecordSink for SqliteRepository {
    async fn record_question(&self, question: &QuestionRecord) -> Result<i64, StorageError> {
        let [a, b, c, d] = question.options;
        let res = sqlx::query(
            r"
                INSERT INTO questions (
                    session_id, question_index, level, expression, correct_answer,
                    option_a, option_b, option_c, option_d, correct_index, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(id_i64("session_id", question.session_id.value())?)
        .bind(i64::from(question.question_index))
        .bind(i64::from(question.level.value()))
        .bind(question.expression.as_str())
        .bind(question.correct_answer)
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(index_i64("correct_index", question.correct_index)?)
        .bind(question.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn record_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let answer_time_ms = i64::try_from(attempt.answer_time_ms)
            .map_err(|_| StorageError::Serialization("answer_time_ms overflow".into()))?;
        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    session_id, question_index, selected_index, is_correct,
                    answer_time_ms, answered_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_i64("session_id", attempt.session_id.value())?)
        .bind(i64::from(attempt.question_index))
        .bind(index_i64("selected_index", attempt.selected_index)?)
        .bind(i64::from(attempt.correct))
        .bind(answer_time_ms)
        .bind(attempt.answered_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn attempts_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    session_id, question_index, selected_index, is_correct,
                    answer_time_ms, answered_at
                FROM attempts
                WHERE session_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }
}
