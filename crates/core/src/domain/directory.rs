// Directory Domain Model (tenants, users, candidates)

use serde::{Deserialize, Serialize};

/// Tenant ID (UUID v4)
pub type TenantId = String;

/// User ID (UUID v4)
pub type UserId = String;

/// Candidate ID (UUID v4)
pub type CandidateId = String;

/// Largest UTC offset in use anywhere (UTC+14:00 / UTC-12:00 rounded up)
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// A customer organization; every other row is scoped by its ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Recruiter,
    Interviewer,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "ADMIN"),
            UserRole::Recruiter => write!(f, "RECRUITER"),
            UserRole::Interviewer => write!(f, "INTERVIEWER"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = crate::domain::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(UserRole::Admin),
            "RECRUITER" => Ok(UserRole::Recruiter),
            "INTERVIEWER" => Ok(UserRole::Interviewer),
            other => Err(crate::domain::DomainError::ValidationError(format!(
                "Unknown user role: {}",
                other
            ))),
        }
    }
}

/// Staff member who can take part in interviews
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Offset of the user's local time from UTC, used for default working hours
    pub utc_offset_minutes: i32,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub created_at: i64,
}

pub fn validate_utc_offset(offset_minutes: i32) -> crate::domain::error::Result<()> {
    if offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(crate::domain::DomainError::ValidationError(format!(
            "UTC offset {} minutes is out of range (±{})",
            offset_minutes, MAX_UTC_OFFSET_MINUTES
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> crate::domain::error::Result<()> {
    let trimmed = email.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid {
        return Err(crate::domain::DomainError::ValidationError(format!(
            "Invalid email address: {}",
            email
        )));
    }
    Ok(())
}
