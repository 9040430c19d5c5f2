use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::QuotaError;
use super::AppState;
use crate::domain::entity::{Usage, UsageLog, UsageStats};
use crate::usecase::decrement_usage::DecrementUsageInput;
use crate::usecase::get_usage_logs::UsageLogParams;
use crate::usecase::increment_usage::IncrementUsageInput;

// --- Request / Response DTOs ---

#[derive(Debug, Deserialize)]
pub struct IncrementRequest {
    pub resource: String,
    pub amount: u64,
    pub user_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct DecrementRequest {
    pub resource: String,
    pub amount: u64,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsageLogQueryParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub limit: Option<u32>,
}

impl From<UsageLogQueryParams> for UsageLogParams {
    fn from(q: UsageLogQueryParams) -> Self {
        Self {
            from: q.from,
            to: q.to,
            resource: q.resource,
            action: q.action,
            limit: q.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsageLogsResponse {
    pub logs: Vec<UsageLog>,
    pub count: usize,
}

// --- Handlers ---

pub async fn get_usage(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Usage>, QuotaError> {
    let usage = state.get_usage_uc.execute(&tenant_id).await?;
    Ok(Json(usage))
}

pub async fn increment_usage(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<IncrementRequest>,
) -> Result<Json<Usage>, QuotaError> {
    let input = IncrementUsageInput {
        tenant_id,
        resource: req.resource,
        amount: req.amount,
        user_id: req.user_id,
        metadata: req.metadata,
    };

    let usage = state.increment_usage_uc.execute(&input).await?;
    Ok(Json(usage))
}

pub async fn decrement_usage(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<DecrementRequest>,
) -> Result<Json<Usage>, QuotaError> {
    let input = DecrementUsageInput {
        tenant_id,
        resource: req.resource,
        amount: req.amount,
        user_id: req.user_id,
    };

    let usage = state.decrement_usage_uc.execute(&input).await?;
    Ok(Json(usage))
}

pub async fn get_usage_stats(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<UsageLogQueryParams>,
) -> Result<Json<UsageStats>, QuotaError> {
    let params = UsageLogParams::from(query);
    let stats = state
        .get_usage_stats_uc
        .execute(&tenant_id, &params)
        .await?;
    Ok(Json(stats))
}

pub async fn get_usage_logs(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<UsageLogQueryParams>,
) -> Result<Json<UsageLogsResponse>, QuotaError> {
    let params = UsageLogParams::from(query);
    let logs = state.get_usage_logs_uc.execute(&tenant_id, &params).await?;
    let count = logs.len();
    Ok(Json(UsageLogsResponse { logs, count }))
}
