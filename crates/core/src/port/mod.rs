// Port Layer - Interfaces for external dependencies

pub mod availability_repository;
pub mod calendar_provider;
pub mod connection_repository;
pub mod counter_store;
pub mod directory_repository;
pub mod id_provider; // For deterministic testing
pub mod interview_repository;
pub mod job_repository;
pub mod maintenance;
pub mod notifier;
pub mod task_executor;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use availability_repository::AvailabilityRepository;
pub use calendar_provider::{CalendarProviderClient, ExternalBusy, ProviderError};
pub use connection_repository::ConnectionRepository;
pub use counter_store::{CounterStore, InMemoryCounterStore};
pub use directory_repository::DirectoryRepository;
pub use id_provider::IdProvider;
pub use interview_repository::InterviewRepository;
pub use job_repository::JobRepository;
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceReport, MaintenanceStats};
pub use notifier::{Notification, NotificationKind, Notifier, NotifyError, Recipient};
pub use task_executor::{ExecutionError, ExecutionResult, ExecutionStatus, TaskExecutor};
pub use time_provider::TimeProvider;
pub use transaction::{JobRepositoryTransaction, Transaction, TransactionalJobRepository};
