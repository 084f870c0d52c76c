// Availability Repository Port (working hours, busy blocks, scheduling rules)

use crate::domain::{BusyBlock, BusySource, SchedulingRule, TimeRange, WorkingHours};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Replace all working-hour rows of a user
    async fn replace_working_hours(
        &self,
        tenant_id: &str,
        user_id: &str,
        hours: &[WorkingHours],
    ) -> Result<()>;

    async fn working_hours(&self, tenant_id: &str, user_id: &str) -> Result<Vec<WorkingHours>>;

    async fn insert_busy_block(&self, block: &BusyBlock) -> Result<()>;

    /// Returns false if no such block exists in the tenant
    async fn delete_busy_block(&self, tenant_id: &str, block_id: &str) -> Result<bool>;

    /// Busy blocks of a user overlapping `range`, ordered by start
    async fn busy_blocks(
        &self,
        tenant_id: &str,
        user_id: &str,
        range: TimeRange,
    ) -> Result<Vec<BusyBlock>>;

    /// Atomically swap the blocks of `source` overlapping `range` for `blocks`
    ///
    /// # Returns
    /// Number of blocks removed
    async fn replace_external_blocks(
        &self,
        tenant_id: &str,
        user_id: &str,
        source: BusySource,
        range: TimeRange,
        blocks: &[BusyBlock],
    ) -> Result<u64>;

    /// Remove every block of a source for a user (calendar disconnect)
    async fn delete_blocks_by_source(
        &self,
        tenant_id: &str,
        user_id: &str,
        source: BusySource,
    ) -> Result<u64>;

    async fn get_rule(&self, tenant_id: &str) -> Result<Option<SchedulingRule>>;

    async fn save_rule(&self, rule: &SchedulingRule) -> Result<()>;
}
