// Directory Repository Port (tenants, users, candidates)

use crate::domain::{Candidate, Tenant, User};
use crate::error::Result;
use async_trait::async_trait;

/// Every lookup is scoped by tenant; a row of another tenant reads as absent
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<()>;

    async fn find_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>>;

    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn find_user(&self, tenant_id: &str, user_id: &str) -> Result<Option<User>>;

    async fn list_users(&self, tenant_id: &str) -> Result<Vec<User>>;

    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()>;

    async fn find_candidate(&self, tenant_id: &str, candidate_id: &str)
        -> Result<Option<Candidate>>;
}
