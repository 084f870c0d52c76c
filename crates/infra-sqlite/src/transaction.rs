// Enqueue transaction over one sqlx transaction

use crate::error::map_sqlx_error;
use crate::job_repository::{insert_job, latest_generation, record_generation, supersede_below};
use async_trait::async_trait;
use hireloop_core::domain::Job;
use hireloop_core::error::Result;
use hireloop_core::port::{JobRepositoryTransaction, TimeProvider, Transaction};
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use std::sync::Arc;

pub struct SqliteJobTransaction<'a> {
    tx: SqlxTransaction<'a, Sqlite>,
    time_provider: Arc<dyn TimeProvider>,
}

impl<'a> SqliteJobTransaction<'a> {
    pub fn new(tx: SqlxTransaction<'a, Sqlite>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { tx, time_provider }
    }
}

#[async_trait]
impl Transaction for SqliteJobTransaction<'_> {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl JobRepositoryTransaction for SqliteJobTransaction<'_> {
    async fn next_generation(&mut self, subject_key: &str) -> Result<i64> {
        Ok(latest_generation(&mut *self.tx, subject_key).await? + 1)
    }

    async fn insert(&mut self, job: &Job) -> Result<()> {
        insert_job(&mut *self.tx, job).await
    }

    async fn supersede_older(&mut self, subject_key: &str, generation: i64) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let count = supersede_below(&mut *self.tx, subject_key, generation, now).await?;
        record_generation(&mut *self.tx, subject_key, generation).await?;
        Ok(count)
    }
}
