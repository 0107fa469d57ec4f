//! SQLite job store
//!
//! Each job is one row holding the whole record as JSON, so a write replaces
//! the snapshot in a single statement. Writes go through `retry_on_lock`.

use super::{JobStore, StoreError, StoreResult};
use crate::models::{ConstructRecord, Job, Requirement};
use crate::utils::retry_on_lock;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Create tables if missing
pub async fn init_tables(pool: &SqlitePool) -> ietl_common::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            record TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS constructs (
            construct_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            record TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS requirements (
            job_id TEXT PRIMARY KEY,
            record TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub struct SqliteJobStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }

    async fn job_exists(&self, job_id: &str) -> StoreResult<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT job_id FROM jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        let job_id = job.id.to_string();
        let status = job.status.as_str();
        let record = serde_json::to_string(job)?;
        let created_at = job.created_at.to_rfc3339();
        let updated_at = job.updated_at.to_rfc3339();

        let inserted = retry_on_lock("insert_job", self.max_lock_wait_ms, || async {
            let result = sqlx::query(
                r#"
                INSERT INTO jobs (job_id, status, record, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(job_id) DO NOTHING
                "#,
            )
            .bind(&job_id)
            .bind(status)
            .bind(&record)
            .bind(&created_at)
            .bind(&updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, ietl_common::Error>(result.rows_affected())
        })
        .await?;

        if inserted == 0 {
            return Err(StoreError::DuplicateJob(job.id));
        }
        Ok(())
    }

    async fn put_job(&self, job: &Job) -> StoreResult<()> {
        let job_id = job.id.to_string();
        let status = job.status.as_str();
        let record = serde_json::to_string(job)?;
        let updated_at = job.updated_at.to_rfc3339();

        let updated = retry_on_lock("put_job", self.max_lock_wait_ms, || async {
            let result = sqlx::query(
                "UPDATE jobs SET status = ?, record = ?, updated_at = ? WHERE job_id = ?",
            )
            .bind(status)
            .bind(&record)
            .bind(&updated_at)
            .bind(&job_id)
            .execute(&self.pool)
            .await?;
            Ok::<_, ietl_common::Error>(result.rows_affected())
        })
        .await?;

        if updated == 0 {
            return Err(StoreError::JobNotFound(job.id));
        }
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<Job>> {
        let row = sqlx::query("SELECT record FROM jobs WHERE job_id = ?")
            .bind(job_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let record: String = row.get("record");
                Ok(Some(serde_json::from_str(&record)?))
            }
            None => Ok(None),
        }
    }

    async fn save_construct(&self, record: &ConstructRecord) -> StoreResult<()> {
        let construct_id = record.id.to_string();
        let name = record.construct.name().to_string();
        let json = serde_json::to_string(record)?;
        let created_at = record.created_at.to_rfc3339();

        retry_on_lock("save_construct", self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                INSERT INTO constructs (construct_id, name, record, created_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(construct_id) DO UPDATE SET
                    name = excluded.name,
                    record = excluded.record
                "#,
            )
            .bind(&construct_id)
            .bind(&name)
            .bind(&json)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, ietl_common::Error>(())
        })
        .await?;
        Ok(())
    }

    async fn get_construct(&self, id: Uuid) -> StoreResult<Option<ConstructRecord>> {
        let record: Option<String> =
            sqlx::query_scalar("SELECT record FROM constructs WHERE construct_id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        record
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn list_constructs(&self) -> StoreResult<Vec<ConstructRecord>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT record FROM constructs ORDER BY created_at DESC, construct_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    async fn replace_requirements(&self, job_id: Uuid, requirements: &[Requirement]) -> StoreResult<()> {
        let id = job_id.to_string();
        if !self.job_exists(&id).await? {
            return Err(StoreError::JobNotFound(job_id));
        }
        let json = serde_json::to_string(requirements)?;
        let updated_at = chrono::Utc::now().to_rfc3339();

        retry_on_lock("replace_requirements", self.max_lock_wait_ms, || async {
            sqlx::query(
                r#"
                INSERT INTO requirements (job_id, record, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(job_id) DO UPDATE SET
                    record = excluded.record,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&id)
            .bind(&json)
            .bind(&updated_at)
            .execute(&self.pool)
            .await?;
            Ok::<_, ietl_common::Error>(())
        })
        .await?;
        Ok(())
    }

    async fn get_requirements(&self, job_id: Uuid) -> StoreResult<Option<Vec<Requirement>>> {
        let record: Option<String> =
            sqlx::query_scalar("SELECT record FROM requirements WHERE job_id = ?")
                .bind(job_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        record
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
