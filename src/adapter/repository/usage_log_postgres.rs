use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::quota_postgres::from_db;
use crate::domain::entity::{ResourceType, UsageAction, UsageLog, UsageLogQuery, UsageStatEntry};
use crate::domain::repository::UsageLogRepository;

pub struct UsageLogPostgresRepository {
    pool: Arc<PgPool>,
}

impl UsageLogPostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UsageLogRow {
    id: uuid::Uuid,
    tenant_id: String,
    user_id: Option<String>,
    action: String,
    resource: String,
    amount: i64,
    metadata: Option<Json<serde_json::Value>>,
    created_at: DateTime<Utc>,
}

fn parse_action(raw: &str) -> anyhow::Result<UsageAction> {
    UsageAction::from_str(raw).ok_or_else(|| anyhow::anyhow!("unknown usage action: {}", raw))
}

fn parse_resource(raw: &str) -> anyhow::Result<ResourceType> {
    ResourceType::from_str(raw).ok_or_else(|| anyhow::anyhow!("unknown resource type: {}", raw))
}

impl TryFrom<UsageLogRow> for UsageLog {
    type Error = anyhow::Error;

    fn try_from(r: UsageLogRow) -> Result<Self, Self::Error> {
        Ok(UsageLog {
            id: r.id,
            tenant_id: r.tenant_id,
            user_id: r.user_id,
            action: parse_action(&r.action)?,
            resource: parse_resource(&r.resource)?,
            amount: r.amount,
            metadata: r.metadata.map(|Json(v)| v),
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatRow {
    resource: String,
    action: String,
    total_amount: i64,
    count: i64,
}

#[async_trait]
impl UsageLogRepository for UsageLogPostgresRepository {
    async fn append(&self, log: &UsageLog) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO quota.usage_log \
             (id, tenant_id, user_id, action, resource, amount, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(log.id)
        .bind(&log.tenant_id)
        .bind(&log.user_id)
        .bind(log.action.as_str())
        .bind(log.resource.as_str())
        .bind(log.amount)
        .bind(log.metadata.as_ref().map(Json))
        .bind(log.created_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn find(&self, tenant_id: &str, query: &UsageLogQuery) -> anyhow::Result<Vec<UsageLog>> {
        let rows: Vec<UsageLogRow> = sqlx::query_as(
            "SELECT id, tenant_id, user_id, action, resource, amount, metadata, created_at \
             FROM quota.usage_log \
             WHERE tenant_id = $1 AND created_at >= $2 AND created_at < $3 \
               AND ($4::TEXT IS NULL OR resource = $4) \
               AND ($5::TEXT IS NULL OR action = $5) \
             ORDER BY created_at DESC LIMIT $6",
        )
        .bind(tenant_id)
        .bind(query.from)
        .bind(query.to)
        .bind(query.resource.map(|r| r.as_str().to_string()))
        .bind(query.action.map(|a| a.as_str().to_string()))
        .bind(query.limit as i64)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(UsageLog::try_from).collect()
    }

    async fn aggregate(
        &self,
        tenant_id: &str,
        query: &UsageLogQuery,
    ) -> anyhow::Result<Vec<UsageStatEntry>> {
        let rows: Vec<StatRow> = sqlx::query_as(
            "SELECT resource, action, COALESCE(SUM(amount), 0)::BIGINT AS total_amount, \
                    COUNT(*) AS count \
             FROM quota.usage_log \
             WHERE tenant_id = $1 AND created_at >= $2 AND created_at < $3 \
               AND ($4::TEXT IS NULL OR resource = $4) \
               AND ($5::TEXT IS NULL OR action = $5) \
             GROUP BY resource, action",
        )
        .bind(tenant_id)
        .bind(query.from)
        .bind(query.to)
        .bind(query.resource.map(|r| r.as_str().to_string()))
        .bind(query.action.map(|a| a.as_str().to_string()))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(UsageStatEntry {
                    resource: parse_resource(&r.resource)?,
                    action: parse_action(&r.action)?,
                    total_amount: r.total_amount,
                    count: from_db(r.count),
                })
            })
            .collect()
    }
}
