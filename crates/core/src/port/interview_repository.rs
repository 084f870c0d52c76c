// Interview Repository Port

use crate::domain::{Interview, TimeRange};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait InterviewRepository: Send + Sync {
    async fn insert(&self, interview: &Interview) -> Result<()>;

    async fn update(&self, interview: &Interview) -> Result<()>;

    async fn find_by_id(&self, tenant_id: &str, interview_id: &str) -> Result<Option<Interview>>;

    /// SCHEDULED/CONFIRMED interviews overlapping `range` in which `user_id` takes part
    async fn find_active_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        range: TimeRange,
    ) -> Result<Vec<Interview>>;
}
