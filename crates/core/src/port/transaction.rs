// Unit of work for enqueueing on a subject
//
// A subject (`interview:<id>:reminder`, `connection:<id>:sync`) has one
// live generation. Bumping it, inserting the new job and retiring the
// queued older ones land together or not at all.

use crate::domain::Job;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Transaction: Send {
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Dropping without commit has the same effect
    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait TransactionalJobRepository: Send + Sync {
    async fn begin_transaction(&self) -> Result<Box<dyn JobRepositoryTransaction>>;
}

#[async_trait]
pub trait JobRepositoryTransaction: Transaction {
    /// Generation the next job on `subject_key` takes (1 for a new subject)
    async fn next_generation(&mut self, subject_key: &str) -> Result<i64>;

    async fn insert(&mut self, job: &Job) -> Result<()>;

    /// Queued jobs on `subject_key` older than `generation` become SUPERSEDED
    async fn supersede_older(&mut self, subject_key: &str, generation: i64) -> Result<u64>;
}
