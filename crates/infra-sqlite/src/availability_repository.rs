// SQLite AvailabilityRepository Implementation

use crate::error::{map_sqlx_error, parse_column};
use async_trait::async_trait;
use hireloop_core::domain::{BusyBlock, BusySource, SchedulingRule, TimeRange, WorkingHours};
use hireloop_core::error::Result;
use hireloop_core::port::AvailabilityRepository;
use sqlx::{Sqlite, SqlitePool};

pub struct SqliteAvailabilityRepository {
    pool: SqlitePool,
}

impl SqliteAvailabilityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn insert_block<'e, E>(executor: E, block: &BusyBlock) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO busy_blocks (
            id, tenant_id, user_id, start_at, end_at, source, external_id, title, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&block.id)
    .bind(&block.tenant_id)
    .bind(&block.user_id)
    .bind(block.range.start)
    .bind(block.range.end)
    .bind(block.source.to_string())
    .bind(&block.external_id)
    .bind(&block.title)
    .bind(block.created_at)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl AvailabilityRepository for SqliteAvailabilityRepository {
    async fn replace_working_hours(
        &self,
        tenant_id: &str,
        user_id: &str,
        hours: &[WorkingHours],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM working_hours WHERE tenant_id = ? AND user_id = ?")
            .bind(tenant_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for row in hours {
            sqlx::query(
                r#"
                INSERT INTO working_hours (
                    tenant_id, user_id, weekday, start_minute, end_minute, utc_offset_minutes
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(tenant_id)
            .bind(user_id)
            .bind(row.weekday as i64)
            .bind(row.start_minute as i64)
            .bind(row.end_minute as i64)
            .bind(row.utc_offset_minutes)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn working_hours(&self, tenant_id: &str, user_id: &str) -> Result<Vec<WorkingHours>> {
        let rows: Vec<(i64, i64, i64, i32)> = sqlx::query_as(
            r#"
            SELECT weekday, start_minute, end_minute, utc_offset_minutes
            FROM working_hours
            WHERE tenant_id = ? AND user_id = ?
            ORDER BY weekday, start_minute
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(weekday, start_minute, end_minute, offset)| WorkingHours {
                tenant_id: tenant_id.to_string(),
                user_id: user_id.to_string(),
                weekday: weekday as u8,
                start_minute: start_minute as u32,
                end_minute: end_minute as u32,
                utc_offset_minutes: offset,
            })
            .collect())
    }

    async fn insert_busy_block(&self, block: &BusyBlock) -> Result<()> {
        insert_block(&self.pool, block).await
    }

    async fn delete_busy_block(&self, tenant_id: &str, block_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM busy_blocks WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id)
            .bind(block_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn busy_blocks(
        &self,
        tenant_id: &str,
        user_id: &str,
        range: TimeRange,
    ) -> Result<Vec<BusyBlock>> {
        let rows: Vec<BusyBlockRow> = sqlx::query_as(
            r#"
            SELECT * FROM busy_blocks
            WHERE tenant_id = ? AND user_id = ? AND start_at < ? AND end_at > ?
            ORDER BY start_at ASC, end_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(range.end)
        .bind(range.start)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(BusyBlockRow::into_block).collect()
    }

    async fn replace_external_blocks(
        &self,
        tenant_id: &str,
        user_id: &str,
        source: BusySource,
        range: TimeRange,
        blocks: &[BusyBlock],
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let removed = sqlx::query(
            r#"
            DELETE FROM busy_blocks
            WHERE tenant_id = ? AND user_id = ? AND source = ? AND start_at < ? AND end_at > ?
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(source.to_string())
        .bind(range.end)
        .bind(range.start)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        for block in blocks {
            insert_block(&mut *tx, block).await?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(removed)
    }

    async fn delete_blocks_by_source(
        &self,
        tenant_id: &str,
        user_id: &str,
        source: BusySource,
    ) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM busy_blocks WHERE tenant_id = ? AND user_id = ? AND source = ?")
                .bind(tenant_id)
                .bind(user_id)
                .bind(source.to_string())
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn get_rule(&self, tenant_id: &str) -> Result<Option<SchedulingRule>> {
        let row: Option<RuleRow> =
            sqlx::query_as("SELECT * FROM scheduling_rules WHERE tenant_id = ?")
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(RuleRow::into_rule))
    }

    async fn save_rule(&self, rule: &SchedulingRule) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduling_rules (
                tenant_id, min_notice_minutes, buffer_before_minutes, buffer_after_minutes,
                slot_increment_minutes, max_days_ahead, max_interviews_per_day,
                max_suggestions, max_slots_per_day, reminder_lead_minutes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tenant_id) DO UPDATE SET
                min_notice_minutes = excluded.min_notice_minutes,
                buffer_before_minutes = excluded.buffer_before_minutes,
                buffer_after_minutes = excluded.buffer_after_minutes,
                slot_increment_minutes = excluded.slot_increment_minutes,
                max_days_ahead = excluded.max_days_ahead,
                max_interviews_per_day = excluded.max_interviews_per_day,
                max_suggestions = excluded.max_suggestions,
                max_slots_per_day = excluded.max_slots_per_day,
                reminder_lead_minutes = excluded.reminder_lead_minutes
            "#,
        )
        .bind(&rule.tenant_id)
        .bind(rule.min_notice_minutes as i64)
        .bind(rule.buffer_before_minutes as i64)
        .bind(rule.buffer_after_minutes as i64)
        .bind(rule.slot_increment_minutes as i64)
        .bind(rule.max_days_ahead as i64)
        .bind(rule.max_interviews_per_day as i64)
        .bind(rule.max_suggestions as i64)
        .bind(rule.max_slots_per_day as i64)
        .bind(rule.reminder_lead_minutes as i64)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BusyBlockRow {
    id: String,
    tenant_id: String,
    user_id: String,
    start_at: i64,
    end_at: i64,
    source: String,
    external_id: Option<String>,
    title: Option<String>,
    created_at: i64,
}

impl BusyBlockRow {
    fn into_block(self) -> Result<BusyBlock> {
        Ok(BusyBlock {
            source: parse_column("busy_blocks.source", &self.source)?,
            range: TimeRange::from_bounds(self.start_at, self.end_at),
            id: self.id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            external_id: self.external_id,
            title: self.title,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    tenant_id: String,
    min_notice_minutes: i64,
    buffer_before_minutes: i64,
    buffer_after_minutes: i64,
    slot_increment_minutes: i64,
    max_days_ahead: i64,
    max_interviews_per_day: i64,
    max_suggestions: i64,
    max_slots_per_day: i64,
    reminder_lead_minutes: i64,
}

impl RuleRow {
    fn into_rule(self) -> SchedulingRule {
        SchedulingRule {
            tenant_id: self.tenant_id,
            min_notice_minutes: self.min_notice_minutes as u32,
            buffer_before_minutes: self.buffer_before_minutes as u32,
            buffer_after_minutes: self.buffer_after_minutes as u32,
            slot_increment_minutes: self.slot_increment_minutes as u32,
            max_days_ahead: self.max_days_ahead as u32,
            max_interviews_per_day: self.max_interviews_per_day as u32,
            max_suggestions: self.max_suggestions as u32,
            max_slots_per_day: self.max_slots_per_day as u32,
            reminder_lead_minutes: self.reminder_lead_minutes as u32,
        }
    }
}
