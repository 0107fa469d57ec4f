//! Job storage
//!
//! The job manager talks to storage only through [`JobStore`]. Jobs are written
//! as whole records: readers see either the previous or the new snapshot, never
//! a mix.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryJobStore;
pub use sqlite::SqliteJobStore;

use crate::models::{ConstructRecord, Job, Requirement};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job already exists: {0}")]
    DuplicateJob(Uuid),

    #[error("job not found: {0}")]
    JobNotFound(Uuid),

    #[error(transparent)]
    Backend(#[from] ietl_common::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(ietl_common::Error::Database(e))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for jobs, constructs and requirement sets
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a new job; fails if the id exists
    async fn insert_job(&self, job: &Job) -> StoreResult<()>;

    /// Replace an existing job record as a whole
    async fn put_job(&self, job: &Job) -> StoreResult<()>;

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<Job>>;

    async fn save_construct(&self, record: &ConstructRecord) -> StoreResult<()>;

    async fn get_construct(&self, id: Uuid) -> StoreResult<Option<ConstructRecord>>;

    /// Newest first
    async fn list_constructs(&self) -> StoreResult<Vec<ConstructRecord>>;

    /// Replace the requirement set of a job
    async fn replace_requirements(&self, job_id: Uuid, requirements: &[Requirement]) -> StoreResult<()>;

    /// Stored set, or `None` if never derived
    async fn get_requirements(&self, job_id: Uuid) -> StoreResult<Option<Vec<Requirement>>>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Initialize database connection pool
///
/// Creates the database file (and parent directory) when missing.
pub async fn init_database_pool(db_path: &Path) -> ietl_common::Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    sqlite::init_tables(&pool).await?;

    Ok(pool)
}
