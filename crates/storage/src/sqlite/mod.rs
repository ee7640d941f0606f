use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;

use crate::repository::Storage;

mod mapping;
mod migrate;
mod record_repo;
mod session_repo;
mod settings_repo;
mod user_repo;

const FILE_POOL_SIZE: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("unusable database location: {raw:?}")]
    InvalidLocation { raw: String },
    #[error("cannot prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Where the quiz database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Private to one connection, gone with the process.
    Memory,
    /// Named in-memory database shared by every connection in the process.
    SharedMemory(String),
    /// Database file; missing parent directories are created on open.
    File(PathBuf),
}

impl DatabaseLocation {
    /// Accepts `sqlite::memory:`, `sqlite:file:<name>?mode=memory`,
    /// `sqlite://<path>`, `sqlite:<path>` or a bare path. Query parameters on
    /// file locations are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::InvalidLocation` when no path or name is left.
    pub fn parse(raw: &str) -> Result<Self, SqliteInitError> {
        let invalid = || SqliteInitError::InvalidLocation {
            raw: raw.to_owned(),
        };
        let trimmed = raw.trim();
        let rest = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);
        if rest == ":memory:" {
            return Ok(Self::Memory);
        }

        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        if query.split('&').any(|param| param == "mode=memory") {
            let name = path.strip_prefix("file:").unwrap_or(path);
            if name.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::SharedMemory(name.to_owned()));
        }
        if path.is_empty() {
            return Err(invalid());
        }
        Ok(Self::File(PathBuf::from(path)))
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, SqliteInitError> {
        let options = match self {
            Self::Memory | Self::SharedMemory(_) => SqliteConnectOptions::from_str(&self.to_string())?,
            Self::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
        };
        Ok(options.foreign_keys(true).busy_timeout(BUSY_TIMEOUT))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        match self {
            // every new connection would see an empty database
            Self::Memory => SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
            Self::SharedMemory(_) | Self::File(_) => SqlitePoolOptions::new()
                .max_connections(FILE_POOL_SIZE)
                .acquire_timeout(BUSY_TIMEOUT),
        }
    }

    fn prepare(&self) -> Result<(), SqliteInitError> {
        if let Self::File(path) = self
            && let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("sqlite::memory:"),
            Self::SharedMemory(name) => write!(f, "sqlite:file:{name}?mode=memory&cache=shared"),
            Self::File(path) => write!(f, "sqlite://{}", path.display()),
        }
    }
}

impl FromStr for DatabaseLocation {
    type Err = SqliteInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open the database, creating it if needed, and bring the schema up to
    /// date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the directory cannot be created, the
    /// connection fails or a migration fails.
    pub async fn open(location: &DatabaseLocation) -> Result<Self, SqliteInitError> {
        location.prepare()?;
        let pool = location
            .pool_options()
            .connect_with(location.connect_options()?)
            .await?;
        migrate::run_migrations(&pool).await?;
        info!(%location, "quiz database ready");
        Ok(Self { pool })
    }

    /// Raw pool, for tests and ad-hoc queries.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite` at `location`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened.
    pub async fn sqlite(location: &DatabaseLocation) -> Result<Self, SqliteInitError> {
        Ok(Self::from_backend(SqliteRepository::open(location).await?))
    }
}
