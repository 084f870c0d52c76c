// SQLite InterviewRepository Implementation
// Interviewers live in interview_participants, ordered by position

use crate::error::{map_sqlx_error, parse_column};
use async_trait::async_trait;
use hireloop_core::domain::{Interview, InterviewState, TimeRange};
use hireloop_core::error::Result;
use hireloop_core::port::InterviewRepository;
use sqlx::SqlitePool;

pub struct SqliteInterviewRepository {
    pool: SqlitePool,
}

impl SqliteInterviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn participants(&self, interview_id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT user_id FROM interview_participants WHERE interview_id = ? ORDER BY position",
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn hydrate(&self, rows: Vec<InterviewRow>) -> Result<Vec<Interview>> {
        let mut interviews = Vec::with_capacity(rows.len());
        for row in rows {
            let interviewer_ids = self.participants(&row.id).await?;
            interviews.push(row.into_interview(interviewer_ids)?);
        }
        Ok(interviews)
    }
}

#[async_trait]
impl InterviewRepository for SqliteInterviewRepository {
    async fn insert(&self, interview: &Interview) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO interviews (
                id, tenant_id, candidate_id, start_at, end_at, title, state, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&interview.id)
        .bind(&interview.tenant_id)
        .bind(&interview.candidate_id)
        .bind(interview.range.start)
        .bind(interview.range.end)
        .bind(&interview.title)
        .bind(interview.state.to_string())
        .bind(interview.created_at)
        .bind(interview.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for (position, user_id) in interview.interviewer_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO interview_participants (interview_id, user_id, position) VALUES (?, ?, ?)",
            )
            .bind(&interview.id)
            .bind(user_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn update(&self, interview: &Interview) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE interviews
            SET start_at = ?, end_at = ?, title = ?, state = ?, updated_at = ?
            WHERE tenant_id = ? AND id = ?
            "#,
        )
        .bind(interview.range.start)
        .bind(interview.range.end)
        .bind(&interview.title)
        .bind(interview.state.to_string())
        .bind(interview.updated_at)
        .bind(&interview.tenant_id)
        .bind(&interview.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(hireloop_core::error::AppError::not_found(
                "Interview",
                &interview.id,
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, tenant_id: &str, interview_id: &str) -> Result<Option<Interview>> {
        let row: Option<InterviewRow> =
            sqlx::query_as("SELECT * FROM interviews WHERE tenant_id = ? AND id = ?")
                .bind(tenant_id)
                .bind(interview_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_active_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        range: TimeRange,
    ) -> Result<Vec<Interview>> {
        let rows: Vec<InterviewRow> = sqlx::query_as(
            r#"
            SELECT i.* FROM interviews i
            JOIN interview_participants p ON p.interview_id = i.id
            WHERE i.tenant_id = ? AND p.user_id = ?
              AND i.state IN (?, ?)
              AND i.start_at < ? AND i.end_at > ?
            ORDER BY i.start_at ASC, i.id ASC
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(InterviewState::Scheduled.to_string())
        .bind(InterviewState::Confirmed.to_string())
        .bind(range.end)
        .bind(range.start)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.hydrate(rows).await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InterviewRow {
    id: String,
    tenant_id: String,
    candidate_id: String,
    start_at: i64,
    end_at: i64,
    title: String,
    state: String,
    created_at: i64,
    updated_at: i64,
}

impl InterviewRow {
    fn into_interview(self, interviewer_ids: Vec<String>) -> Result<Interview> {
        Ok(Interview {
            state: parse_column("interviews.state", &self.state)?,
            range: TimeRange::from_bounds(self.start_at, self.end_at),
            id: self.id,
            tenant_id: self.tenant_id,
            candidate_id: self.candidate_id,
            interviewer_ids,
            title: self.title,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
