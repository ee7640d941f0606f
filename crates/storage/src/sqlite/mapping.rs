use quiz_core::model::{
    DisplayName, EndReason, Level, QuizMode, QuizSettings, SessionId, SessionSummary, UserId,
    UserProfile,
};
use sqlx::Row;

use crate::repository::{AttemptRecord, SessionRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn level_from_i64(v: i64) -> Result<Level, StorageError> {
    Level::new(u32_from_i64("level", v)?).map_err(ser)
}


pub(crate) fn end_reason_from_str(s: &str) -> Result<EndReason, StorageError> {
    match s {
        "completed" => Ok(EndReason::Completed),
        "time_expired" => Ok(EndReason::TimeExpired),
        _ => Err(StorageError::Serialization(format!("invalid end reason: {s}"))),
    }
}

fn required<T>(field: &'static str, v: Option<T>) -> Result<T, StorageError> {
    v.ok_or_else(|| StorageError::Serialization(format!("completed session missing {field}")))
}

fn u32_col(row: &sqlx::sqlite::SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

fn opt_u32_col(
    row: &sqlx::sqlite::SqliteRow,
    field: &'static str,
) -> Result<u32, StorageError> {
    let v = required(field, row.try_get::<Option<i64>, _>(field).map_err(ser)?)?;
    u32_from_i64(field, v)
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, StorageError> {
    let id = session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let user_id = row
        .try_get::<Option<i64>, _>("user_id")
        .map_err(ser)?
        .map(user_id_from_i64)
        .transpose()?;
    let mode = QuizMode::from_label(&row.try_get::<String, _>("mode").map_err(ser)?);
    let total_questions = u32_col(row, "total_questions")?;
    let timer_seconds = u32_col(row, "timer_seconds")?;
    let started_at = row.try_get("started_at").map_err(ser)?;

    let completed_at: Option<chrono::DateTime<chrono::Utc>> =
        row.try_get("completed_at").map_err(ser)?;
    let summary = match completed_at {
        None => None,
        Some(completed_at) => {
            let end_reason: Option<String> = row.try_get("end_reason").map_err(ser)?;
            let end_reason = end_reason_from_str(&required("end_reason", end_reason)?)?;
            let accuracy: Option<f64> = row.try_get("accuracy").map_err(ser)?;
            let highest_level: Option<i64> = row.try_get("highest_level").map_err(ser)?;
            Some(
                SessionSummary::from_persisted(
                    opt_u32_col(row, "score")?,
                    required("accuracy", accuracy)?,
                    opt_u32_col(row, "max_streak")?,
                    level_from_i64(required("highest_level", highest_level)?)?,
                    opt_u32_col(row, "correct_count")?,
                    opt_u32_col(row, "wrong_count")?,
                    total_questions,
                    end_reason,
                    started_at,
                    completed_at,
                )
                .map_err(ser)?,
            )
        }
    };

    Ok(SessionRecord {
        id,
        user_id,
        mode,
        total_questions,
        timer_seconds,
        started_at,
        summary,
    })
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRecord, StorageError> {
    let selected: i64 = row.try_get("selected_index").map_err(ser)?;
    let answer_time_ms: i64 = row.try_get("answer_time_ms").map_err(ser)?;
    Ok(AttemptRecord {
        session_id: session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
        question_index: u32_col(row, "question_index")?,
        selected_index: usize::try_from(selected)
            .map_err(|_| StorageError::Serialization(format!("invalid selected_index: {selected}")))?,
        correct: row.try_get::<i64, _>("is_correct").map_err(ser)? == 1,
        answer_time_ms: i64_to_u64("answer_time_ms", answer_time_ms)?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
    })
}

pub(crate) fn map_settings_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizSettings, StorageError> {
    let mode = QuizMode::from_label(&row.try_get::<String, _>("mode").map_err(ser)?);
    QuizSettings::from_persisted(
        mode,
        u32_col(row, "questions_per_session")?,
        u32_col(row, "timer_seconds")?,
        u32_col(row, "auto_advance_ms")?,
    )
    .map_err(ser)
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserProfile, StorageError> {
    let id = user_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let display_name =
        DisplayName::new(&row.try_get::<String, _>("display_name").map_err(ser)?).map_err(ser)?;
    Ok(UserProfile::new(
        id,
        display_name,
        row.try_get("created_at").map_err(ser)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_reasons_match_their_labels() {
        for reason in [EndReason::Completed, EndReason::TimeExpired] {
            assert_eq!(end_reason_from_str(reason.as_str()).unwrap(), reason);
        }
        assert!(end_reason_from_str("abandoned").is_err());
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(session_id_from_i64(-1).is_err());
        assert!(level_from_i64(0).is_err());
        assert_eq!(level_from_i64(4).unwrap().value(), 4);
    }
}
