// Directory and availability settings use cases

use crate::application::availability::AvailabilityReader;
use crate::domain::directory::{validate_email, validate_utc_offset};
use crate::domain::{
    BusyBlock, BusySource, Candidate, SchedulingRule, Tenant, TimeRange, User, UserRole,
    WorkingHours,
};
use crate::error::{AppError, Result};
use crate::port::{AvailabilityRepository, DirectoryRepository, IdProvider, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub tenant_id: String,
    pub email: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_role() -> UserRole {
    UserRole::Interviewer
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCandidateRequest {
    pub tenant_id: String,
    pub name: String,
    pub email: String,
}

/// One weekly working window; the offset defaults to the user's own
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHoursEntry {
    pub weekday: u8,
    pub start_minute: u32,
    pub end_minute: u32,
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBusyBlockRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub title: Option<String>,
}

pub struct DirectoryService {
    directory: Arc<dyn DirectoryRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    reader: Arc<AvailabilityReader>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl DirectoryService {
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        reader: Arc<AvailabilityReader>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            directory,
            availability,
            reader,
            id_provider,
            time_provider,
        }
    }

    pub async fn create_tenant(&self, name: &str) -> Result<Tenant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Tenant name cannot be empty".to_string()));
        }
        let tenant = Tenant {
            id: self.id_provider.generate_id(),
            name: name.to_string(),
            created_at: self.time_provider.now_millis(),
        };
        self.directory.insert_tenant(&tenant).await?;
        info!(tenant_id = %tenant.id, "Tenant created");
        Ok(tenant)
    }

    pub async fn get_tenant(&self, tenant_id: &str) -> Result<Tenant> {
        self.directory
            .find_tenant(tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("Tenant", tenant_id))
    }

    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User> {
        self.get_tenant(&req.tenant_id).await?;
        validate_email(&req.email)?;
        validate_utc_offset(req.utc_offset_minutes)?;
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("User name cannot be empty".to_string()));
        }

        let user = User {
            id: self.id_provider.generate_id(),
            tenant_id: req.tenant_id,
            email: req.email.trim().to_lowercase(),
            name: req.name.trim().to_string(),
            role: req.role,
            utc_offset_minutes: req.utc_offset_minutes,
            created_at: self.time_provider.now_millis(),
        };
        self.directory.insert_user(&user).await?;
        info!(tenant_id = %user.tenant_id, user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, tenant_id: &str, user_id: &str) -> Result<User> {
        self.directory
            .find_user(tenant_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }

    pub async fn list_users(&self, tenant_id: &str) -> Result<Vec<User>> {
        self.directory.list_users(tenant_id).await
    }

    pub async fn create_candidate(&self, req: CreateCandidateRequest) -> Result<Candidate> {
        self.get_tenant(&req.tenant_id).await?;
        validate_email(&req.email)?;
        if req.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Candidate name cannot be empty".to_string(),
            ));
        }

        let candidate = Candidate {
            id: self.id_provider.generate_id(),
            tenant_id: req.tenant_id,
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            created_at: self.time_provider.now_millis(),
        };
        self.directory.insert_candidate(&candidate).await?;
        info!(tenant_id = %candidate.tenant_id, candidate_id = %candidate.id, "Candidate created");
        Ok(candidate)
    }

    pub async fn get_candidate(&self, tenant_id: &str, candidate_id: &str) -> Result<Candidate> {
        self.directory
            .find_candidate(tenant_id, candidate_id)
            .await?
            .ok_or_else(|| AppError::not_found("Candidate", candidate_id))
    }

    /// Replace all working hours of a user; an empty list restores the defaults
    pub async fn set_working_hours(
        &self,
        tenant_id: &str,
        user_id: &str,
        entries: Vec<WorkingHoursEntry>,
    ) -> Result<Vec<WorkingHours>> {
        let user = self.get_user(tenant_id, user_id).await?;

        let rows: Vec<WorkingHours> = entries
            .into_iter()
            .map(|e| WorkingHours {
                tenant_id: user.tenant_id.clone(),
                user_id: user.id.clone(),
                weekday: e.weekday,
                start_minute: e.start_minute,
                end_minute: e.end_minute,
                utc_offset_minutes: e.utc_offset_minutes.unwrap_or(user.utc_offset_minutes),
            })
            .collect();
        for row in &rows {
            row.validate()?;
        }

        self.availability
            .replace_working_hours(tenant_id, user_id, &rows)
            .await?;
        info!(tenant_id = %tenant_id, user_id = %user_id, rows = rows.len(), "Working hours replaced");
        Ok(rows)
    }

    /// Effective working hours (configured or default)
    pub async fn working_hours(&self, tenant_id: &str, user_id: &str) -> Result<Vec<WorkingHours>> {
        let user = self.get_user(tenant_id, user_id).await?;
        self.reader.working_hours_for(&user).await
    }

    pub async fn add_busy_block(&self, req: AddBusyBlockRequest) -> Result<BusyBlock> {
        self.get_user(&req.tenant_id, &req.user_id).await?;
        let range = TimeRange::new(req.start, req.end)?;

        let block = BusyBlock {
            id: self.id_provider.generate_id(),
            tenant_id: req.tenant_id,
            user_id: req.user_id,
            range,
            source: BusySource::Manual,
            external_id: None,
            title: req.title,
            created_at: self.time_provider.now_millis(),
        };
        self.availability.insert_busy_block(&block).await?;
        info!(tenant_id = %block.tenant_id, user_id = %block.user_id, block_id = %block.id, "Busy block added");
        Ok(block)
    }

    pub async fn remove_busy_block(&self, tenant_id: &str, block_id: &str) -> Result<()> {
        if !self
            .availability
            .delete_busy_block(tenant_id, block_id)
            .await?
        {
            return Err(AppError::not_found("Busy block", block_id));
        }
        info!(tenant_id = %tenant_id, block_id = %block_id, "Busy block removed");
        Ok(())
    }

    pub async fn list_busy_blocks(
        &self,
        tenant_id: &str,
        user_id: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<BusyBlock>> {
        self.get_user(tenant_id, user_id).await?;
        let range = TimeRange::new(start, end)?;
        self.availability.busy_blocks(tenant_id, user_id, range).await
    }

    pub async fn get_rule(&self, tenant_id: &str) -> Result<SchedulingRule> {
        self.get_tenant(tenant_id).await?;
        self.reader.rule(tenant_id).await
    }

    pub async fn set_rule(&self, rule: SchedulingRule) -> Result<SchedulingRule> {
        self.get_tenant(&rule.tenant_id).await?;
        rule.validate()?;
        self.availability.save_rule(&rule).await?;
        info!(tenant_id = %rule.tenant_id, "Scheduling rule saved");
        Ok(rule)
    }
}
