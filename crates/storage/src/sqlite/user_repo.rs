use async_trait::async_trait;
use quiz_core::model::{DisplayName, UserId, UserProfile};

use super::SqliteRepository;
use super::mapping::{id_i64, map_user_row, user_id_from_i64};
use crate::repository::{NewUser, StorageError, UserRepository};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn create_user(&self, new: NewUser) -> Result<UserProfile, StorageError> {
        let res = sqlx::query("INSERT INTO users (display_name, created_at) VALUES (?1, ?2)")
            .bind(new.display_name.as_str())
            .bind(new.created_at)
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

        let id = user_id_from_i64(res.last_insert_rowid())?;
        Ok(UserProfile::new(id, new.display_name, new.created_at))
    }

    async fn get_user(&self, id: UserId) -> Result<UserProfile, StorageError> {
        let row = sqlx::query("SELECT id, display_name, created_at FROM users WHERE id = ?1")
            .bind(id_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn_err)?
            .ok_or(StorageError::NotFound)?;
        map_user_row(&row)
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, StorageError> {
        let rows = sqlx::query("SELECT id, display_name, created_at FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;
        rows.iter().map(map_user_row).collect()
    }

    async fn rename_user(
        &self,
        id: UserId,
        display_name: &DisplayName,
    ) -> Result<UserProfile, StorageError> {
        let res = sqlx::query("UPDATE users SET display_name = ?1 WHERE id = ?2")
            .bind(display_name.as_str())
            .bind(id_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        self.get_user(id).await
    }

    /// Questions and attempts go with their sessions through `ON DELETE CASCADE`.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let user = id_i64("user_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user)
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        for sql in [
            "DELETE FROM sessions WHERE user_id = ?1",
            "DELETE FROM settings WHERE user_id = ?1",
        ] {
            sqlx::query(sql)
                .bind(user)
                .execute(&mut *tx)
                .await
                .map_err(conn_err)?;
        }

        tx.commit().await.map_err(conn_err)
    }
}
