//! In-memory job store
//!
//! Records are held behind `Arc` and replaced wholesale under a write lock.

use super::{JobStore, StoreError, StoreResult};
use crate::models::{ConstructRecord, Job, Requirement};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Arc<Job>>>,
    constructs: RwLock<HashMap<Uuid, ConstructRecord>>,
    requirements: RwLock<HashMap<Uuid, Arc<Vec<Requirement>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateJob(job.id));
        }
        jobs.insert(job.id, Arc::new(job.clone()));
        Ok(())
    }

    async fn put_job(&self, job: &Job) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = Arc::new(job.clone());
                Ok(())
            }
            None => Err(StoreError::JobNotFound(job.id)),
        }
    }

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<Job>> {
        let snapshot = self.jobs.read().await.get(&job_id).cloned();
        Ok(snapshot.map(|job| (*job).clone()))
    }

    async fn save_construct(&self, record: &ConstructRecord) -> StoreResult<()> {
        self.constructs
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn get_construct(&self, id: Uuid) -> StoreResult<Option<ConstructRecord>> {
        Ok(self.constructs.read().await.get(&id).cloned())
    }

    async fn list_constructs(&self) -> StoreResult<Vec<ConstructRecord>> {
        let mut records: Vec<ConstructRecord> =
            self.constructs.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn replace_requirements(&self, job_id: Uuid, requirements: &[Requirement]) -> StoreResult<()> {
        if !self.jobs.read().await.contains_key(&job_id) {
            return Err(StoreError::JobNotFound(job_id));
        }
        self.requirements
            .write()
            .await
            .insert(job_id, Arc::new(requirements.to_vec()));
        Ok(())
    }

    async fn get_requirements(&self, job_id: Uuid) -> StoreResult<Option<Vec<Requirement>>> {
        let snapshot = self.requirements.read().await.get(&job_id).cloned();
        Ok(snapshot.map(|r| (*r).clone()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Construct, ConstructInput, JobStatus, Transcript};

    fn job() -> Job {
        let construct = Construct::try_from(ConstructInput::default_user_stories()).unwrap();
        Job::new(None, construct, vec![Transcript::new("t1", "", "text")])
    }

    #[tokio::test]
    async fn test_snapshot_is_unaffected_by_later_writes() {
        let store = InMemoryJobStore::new();
        let mut job = job();
        store.insert_job(&job).await.unwrap();

        let snapshot = store.get_job(job.id).await.unwrap().unwrap();
        job.transition_to(JobStatus::Processing).unwrap();
        store.put_job(&job).await.unwrap();

        assert_eq!(snapshot.status, JobStatus::Created);
        assert_eq!(
            store.get_job(job.id).await.unwrap().unwrap().status,
            JobStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_jobs() {
        let store = InMemoryJobStore::new();
        let job = job();
        assert!(matches!(store.put_job(&job).await, Err(StoreError::JobNotFound(_))));
        store.insert_job(&job).await.unwrap();
        assert!(matches!(store.insert_job(&job).await, Err(StoreError::DuplicateJob(_))));
        assert!(matches!(
            store.replace_requirements(Uuid::new_v4(), &[]).await,
            Err(StoreError::JobNotFound(_))
        ));
    }
}
