use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::quota_postgres::{from_db, to_db};
use crate::domain::entity::{Usage, UsageCounter};
use crate::domain::repository::{ConsumeOutcome, UsageRepository};

const USAGE_COLUMNS: &str = "tenant_id, storage_used, document_count, user_count, api_calls_today, \
     bandwidth_month, last_api_call_at, last_daily_reset_at, last_monthly_reset_at, updated_at";

pub struct UsagePostgresRepository {
    pool: Arc<PgPool>,
}

impl UsagePostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UsageRow {
    tenant_id: String,
    storage_used: i64,
    document_count: i64,
    user_count: i64,
    api_calls_today: i64,
    bandwidth_month: i64,
    last_api_call_at: Option<DateTime<Utc>>,
    last_daily_reset_at: DateTime<Utc>,
    last_monthly_reset_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UsageRow> for Usage {
    fn from(r: UsageRow) -> Self {
        Usage {
            tenant_id: r.tenant_id,
            storage_used: from_db(r.storage_used),
            document_count: from_db(r.document_count),
            user_count: from_db(r.user_count),
            api_calls_today: from_db(r.api_calls_today),
            bandwidth_month: from_db(r.bandwidth_month),
            last_api_call_at: r.last_api_call_at,
            last_daily_reset_at: r.last_daily_reset_at,
            last_monthly_reset_at: r.last_monthly_reset_at,
            updated_at: r.updated_at,
        }
    }
}

/// api_calls を加算する場合は最終呼び出し時刻も更新する。
fn touch_clause(counter: UsageCounter) -> &'static str {
    if counter == UsageCounter::ApiCallsToday {
        ", last_api_call_at = $3"
    } else {
        ""
    }
}

#[async_trait]
impl UsageRepository for UsagePostgresRepository {
    async fn create_initial(&self, tenant_id: &str, now: DateTime<Utc>) -> anyhow::Result<Usage> {
        let initial = Usage::initial(tenant_id.to_string(), now);
        sqlx::query(
            "INSERT INTO quota.tenant_usage \
             (tenant_id, storage_used, document_count, user_count, api_calls_today, \
              bandwidth_month, last_daily_reset_at, last_monthly_reset_at, updated_at) \
             VALUES ($1, 0, 0, $2, 0, 0, $3, $3, $3) \
             ON CONFLICT (tenant_id) DO NOTHING",
        )
        .bind(tenant_id)
        .bind(to_db(initial.user_count)?)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        self.find_by_tenant(tenant_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("usage row missing after insert: {}", tenant_id))
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Usage>> {
        let row: Option<UsageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM quota.tenant_usage WHERE tenant_id = $1",
            USAGE_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn increment(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Usage>> {
        let col = counter.column();
        let row: Option<UsageRow> = sqlx::query_as(&format!(
            "UPDATE quota.tenant_usage SET {col} = {col} + $2, updated_at = $3{touch} \
             WHERE tenant_id = $1 RETURNING {cols}",
            col = col,
            touch = touch_clause(counter),
            cols = USAGE_COLUMNS
        ))
        .bind(tenant_id)
        .bind(to_db(amount)?)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn decrement(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Usage>> {
        let col = counter.column();
        let row: Option<UsageRow> = sqlx::query_as(&format!(
            "UPDATE quota.tenant_usage SET {col} = GREATEST({col} - $2, 0), updated_at = $3 \
             WHERE tenant_id = $1 RETURNING {cols}",
            col = col,
            cols = USAGE_COLUMNS
        ))
        .bind(tenant_id)
        .bind(to_db(amount)?)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn try_consume(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        max: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ConsumeOutcome>> {
        let col = counter.column();
        // 上限判定と加算を1文で行う。条件を満たさない場合は行が返らない
        let row: Option<UsageRow> = sqlx::query_as(&format!(
            "UPDATE quota.tenant_usage SET {col} = {col} + $2, updated_at = $3{touch} \
             WHERE tenant_id = $1 AND {col} + $2 <= $4 RETURNING {cols}",
            col = col,
            touch = touch_clause(counter),
            cols = USAGE_COLUMNS
        ))
        .bind(tenant_id)
        .bind(to_db(amount)?)
        .bind(now)
        .bind(to_db(max)?)
        .fetch_optional(self.pool.as_ref())
        .await?;

        if let Some(row) = row {
            return Ok(Some(ConsumeOutcome {
                allowed: true,
                usage: row.into(),
            }));
        }

        Ok(self.find_by_tenant(tenant_id).await?.map(|usage| ConsumeOutcome {
            allowed: false,
            usage,
        }))
    }

    async fn reset_daily(
        &self,
        tenant_id: &str,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE quota.tenant_usage \
             SET api_calls_today = 0, last_daily_reset_at = $3, updated_at = $3 \
             WHERE tenant_id = $1 AND last_daily_reset_at < $2",
        )
        .bind(tenant_id)
        .bind(day_start)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_monthly(
        &self,
        tenant_id: &str,
        month_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE quota.tenant_usage \
             SET bandwidth_month = 0, last_monthly_reset_at = $3, updated_at = $3 \
             WHERE tenant_id = $1 AND last_monthly_reset_at < $2",
        )
        .bind(tenant_id)
        .bind(month_start)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_tenant_ids(&self, offset: u64, limit: u32) -> anyhow::Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT tenant_id FROM quota.tenant_usage ORDER BY tenant_id LIMIT $1 OFFSET $2",
        )
        .bind(limit as i64)
        .bind(to_db(offset)?)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
