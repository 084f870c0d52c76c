// SQLite DirectoryRepository Implementation (tenants, users, candidates)

use crate::error::{map_sqlx_error, parse_column};
use async_trait::async_trait;
use hireloop_core::domain::{Candidate, Tenant, User};
use hireloop_core::error::Result;
use hireloop_core::port::DirectoryRepository;
use sqlx::SqlitePool;

pub struct SqliteDirectoryRepository {
    pool: SqlitePool,
}

impl SqliteDirectoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryRepository for SqliteDirectoryRepository {
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<()> {
        sqlx::query("INSERT INTO tenants (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&tenant.id)
            .bind(&tenant.name)
            .bind(tenant.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>> {
        let row: Option<(String, String, i64)> =
            sqlx::query_as("SELECT id, name, created_at FROM tenants WHERE id = ?")
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(|(id, name, created_at)| Tenant {
            id,
            name,
            created_at,
        }))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, tenant_id, email, name, role, utc_offset_minutes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.tenant_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.to_string())
        .bind(user.utc_offset_minutes)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_user(&self, tenant_id: &str, user_id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT * FROM users WHERE tenant_id = ? AND id = ?")
                .bind(tenant_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(UserRow::into_user).transpose()
    }

    async fn list_users(&self, tenant_id: &str) -> Result<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT * FROM users WHERE tenant_id = ? ORDER BY created_at, id")
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn insert_candidate(&self, candidate: &Candidate) -> Result<()> {
        sqlx::query(
            "INSERT INTO candidates (id, tenant_id, name, email, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&candidate.id)
        .bind(&candidate.tenant_id)
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_candidate(
        &self,
        tenant_id: &str,
        candidate_id: &str,
    ) -> Result<Option<Candidate>> {
        let row: Option<CandidateRow> =
            sqlx::query_as("SELECT * FROM candidates WHERE tenant_id = ? AND id = ?")
                .bind(tenant_id)
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(|r| Candidate {
            id: r.id,
            tenant_id: r.tenant_id,
            name: r.name,
            email: r.email,
            created_at: r.created_at,
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    tenant_id: String,
    email: String,
    name: String,
    role: String,
    utc_offset_minutes: i32,
    created_at: i64,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        Ok(User {
            role: parse_column("users.role", &self.role)?,
            id: self.id,
            tenant_id: self.tenant_id,
            email: self.email,
            name: self.name,
            utc_offset_minutes: self.utc_offset_minutes,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: String,
    tenant_id: String,
    name: String,
    email: String,
    created_at: i64,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::memory_pool;
    use hireloop_core::domain::UserRole;
    use hireloop_core::error::AppError;

    pub(crate) async fn seed_tenant_with_user(pool: &SqlitePool, tenant: &str, user: &str) {
        let repo = SqliteDirectoryRepository::new(pool.clone());
        if repo.find_tenant(tenant).await.unwrap().is_none() {
            repo.insert_tenant(&Tenant {
                id: tenant.to_string(),
                name: format!("{} inc", tenant),
                created_at: 0,
            })
            .await
            .unwrap();
        }
        repo.insert_user(&User {
            id: user.to_string(),
            tenant_id: tenant.to_string(),
            email: format!("{}@{}.example.com", user, tenant),
            name: user.to_string(),
            role: UserRole::Interviewer,
            utc_offset_minutes: 60,
            created_at: 1,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_user_lookup_is_tenant_scoped() {
        let pool = memory_pool().await;
        seed_tenant_with_user(&pool, "acme", "u-1").await;
        seed_tenant_with_user(&pool, "globex", "u-2").await;
        let repo = SqliteDirectoryRepository::new(pool);

        let user = repo.find_user("acme", "u-1").await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Interviewer);
        assert_eq!(user.utc_offset_minutes, 60);

        assert!(repo.find_user("globex", "u-1").await.unwrap().is_none());
        assert_eq!(repo.list_users("acme").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let pool = memory_pool().await;
        seed_tenant_with_user(&pool, "acme", "u-1").await;
        let repo = SqliteDirectoryRepository::new(pool);

        let mut dup = repo.find_user("acme", "u-1").await.unwrap().unwrap();
        dup.id = "u-9".to_string();
        let err = repo.insert_user(&dup).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_candidate_round_trip() {
        let pool = memory_pool().await;
        seed_tenant_with_user(&pool, "acme", "u-1").await;
        let repo = SqliteDirectoryRepository::new(pool);

        let candidate = Candidate {
            id: "c-1".to_string(),
            tenant_id: "acme".to_string(),
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            created_at: 5,
        };
        repo.insert_candidate(&candidate).await.unwrap();

        assert_eq!(
            repo.find_candidate("acme", "c-1").await.unwrap(),
            Some(candidate)
        );
        assert!(repo.find_candidate("globex", "c-1").await.unwrap().is_none());
    }
}
