// Queue Domain Model

/// Queue identifier
pub type QueueId = String;

/// Invitations, reminders and cancellation notices
pub const NOTIFICATIONS_QUEUE: &str = "notifications";

/// External calendar synchronisation
pub const SYNC_QUEUE: &str = "sync";

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: QueueId,
    pub max_workers: usize,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, max_workers: usize) -> Self {
        Self {
            name: name.into(),
            max_workers,
        }
    }

    /// Queues the daemon serves
    pub fn defaults() -> Vec<QueueConfig> {
        vec![
            QueueConfig::new(NOTIFICATIONS_QUEUE, 2),
            QueueConfig::new(SYNC_QUEUE, 1),
        ]
    }
}
