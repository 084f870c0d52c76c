// Hireloop Infrastructure - SQLite Adapter
// Implements the repository ports, the rate-limit counter store and Maintenance

mod availability_repository;
mod connection;
mod connection_repository;
mod counter_store;
mod directory_repository;
mod error;
mod interview_repository;
mod job_repository;
mod maintenance_impl;
mod migration;
mod transaction;

pub use availability_repository::SqliteAvailabilityRepository;
pub use connection::create_pool;
pub use connection_repository::SqliteConnectionRepository;
pub use counter_store::SqliteCounterStore;
pub use directory_repository::SqliteDirectoryRepository;
pub use interview_repository::SqliteInterviewRepository;
pub use job_repository::SqliteJobRepository;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;
pub use transaction::SqliteJobTransaction;

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    pub async fn memory_pool() -> SqlitePool {
        let pool = crate::create_pool("sqlite::memory:").await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }
}
