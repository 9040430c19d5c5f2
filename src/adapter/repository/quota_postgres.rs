use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::entity::{PlanName, Quota, QuotaLimits, QuotaPatch};
use crate::domain::repository::QuotaRepository;

const QUOTA_COLUMNS: &str = "id, tenant_id, plan, max_storage_bytes, max_documents, max_users, \
     max_api_calls_per_day, max_file_size_bytes, max_bandwidth_bytes_per_month, \
     features, is_active, valid_from, valid_until, created_at, updated_at";

pub struct QuotaPostgresRepository {
    pool: Arc<PgPool>,
}

impl QuotaPostgresRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// BIGINT 列に u64 を格納する。i64 の範囲を超える値は丸めずにエラーとする。
pub(crate) fn to_db(v: u64) -> anyhow::Result<i64> {
    i64::try_from(v).map_err(|_| anyhow::anyhow!("value {} exceeds BIGINT range", v))
}

pub(crate) fn from_db(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

#[derive(sqlx::FromRow)]
struct QuotaRow {
    id: uuid::Uuid,
    tenant_id: String,
    plan: String,
    max_storage_bytes: i64,
    max_documents: i64,
    max_users: i64,
    max_api_calls_per_day: i64,
    max_file_size_bytes: i64,
    max_bandwidth_bytes_per_month: i64,
    features: Option<Json<Vec<String>>>,
    is_active: bool,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QuotaRow> for Quota {
    type Error = anyhow::Error;

    fn try_from(r: QuotaRow) -> Result<Self, Self::Error> {
        let plan = PlanName::from_str(&r.plan)
            .ok_or_else(|| anyhow::anyhow!("unknown plan stored for tenant {}: {}", r.tenant_id, r.plan))?;
        Ok(Quota {
            id: r.id,
            tenant_id: r.tenant_id,
            plan,
            limits: QuotaLimits {
                max_storage_bytes: from_db(r.max_storage_bytes),
                max_documents: from_db(r.max_documents),
                max_users: from_db(r.max_users),
                max_api_calls_per_day: from_db(r.max_api_calls_per_day),
                max_file_size_bytes: from_db(r.max_file_size_bytes),
                max_bandwidth_bytes_per_month: from_db(r.max_bandwidth_bytes_per_month),
            },
            features: r.features.map(|Json(f)| f),
            is_active: r.is_active,
            valid_from: r.valid_from,
            valid_until: r.valid_until,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[async_trait]
impl QuotaRepository for QuotaPostgresRepository {
    async fn create(&self, quota: &Quota) -> anyhow::Result<bool> {
        // 有効なクォータはテナントごとに1件（部分ユニークインデックス）
        let result = sqlx::query(
            "INSERT INTO quota.quotas \
             (id, tenant_id, plan, max_storage_bytes, max_documents, max_users, \
              max_api_calls_per_day, max_file_size_bytes, max_bandwidth_bytes_per_month, \
              features, is_active, valid_from, valid_until, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (tenant_id) WHERE is_active DO NOTHING",
        )
        .bind(quota.id)
        .bind(&quota.tenant_id)
        .bind(quota.plan.as_str())
        .bind(to_db(quota.limits.max_storage_bytes)?)
        .bind(to_db(quota.limits.max_documents)?)
        .bind(to_db(quota.limits.max_users)?)
        .bind(to_db(quota.limits.max_api_calls_per_day)?)
        .bind(to_db(quota.limits.max_file_size_bytes)?)
        .bind(to_db(quota.limits.max_bandwidth_bytes_per_month)?)
        .bind(quota.features.as_ref().map(Json))
        .bind(quota.is_active)
        .bind(quota.valid_from)
        .bind(quota.valid_until)
        .bind(quota.created_at)
        .bind(quota.updated_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Quota>> {
        let row: Option<QuotaRow> = sqlx::query_as(&format!(
            "SELECT {} FROM quota.quotas WHERE tenant_id = $1 \
             ORDER BY is_active DESC, created_at DESC LIMIT 1",
            QUOTA_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Quota::try_from).transpose()
    }

    async fn update(&self, tenant_id: &str, patch: &QuotaPatch) -> anyhow::Result<Option<Quota>> {
        let row: Option<QuotaRow> = sqlx::query_as(&format!(
            "UPDATE quota.quotas SET \
                plan = COALESCE($2, plan), \
                max_storage_bytes = COALESCE($3, max_storage_bytes), \
                max_documents = COALESCE($4, max_documents), \
                max_users = COALESCE($5, max_users), \
                max_api_calls_per_day = COALESCE($6, max_api_calls_per_day), \
                max_file_size_bytes = COALESCE($7, max_file_size_bytes), \
                max_bandwidth_bytes_per_month = COALESCE($8, max_bandwidth_bytes_per_month), \
                features = COALESCE($9, features), \
                is_active = COALESCE($10, is_active), \
                valid_until = COALESCE($11, valid_until), \
                updated_at = NOW() \
             WHERE id = (SELECT id FROM quota.quotas WHERE tenant_id = $1 \
                         ORDER BY is_active DESC, created_at DESC LIMIT 1) \
             RETURNING {}",
            QUOTA_COLUMNS
        ))
        .bind(tenant_id)
        .bind(patch.plan.map(|p| p.as_str().to_string()))
        .bind(patch.max_storage_bytes.map(to_db).transpose()?)
        .bind(patch.max_documents.map(to_db).transpose()?)
        .bind(patch.max_users.map(to_db).transpose()?)
        .bind(patch.max_api_calls_per_day.map(to_db).transpose()?)
        .bind(patch.max_file_size_bytes.map(to_db).transpose()?)
        .bind(patch.max_bandwidth_bytes_per_month.map(to_db).transpose()?)
        .bind(patch.features.as_ref().map(Json))
        .bind(patch.is_active)
        .bind(patch.valid_until)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Quota::try_from).transpose()
    }
}
