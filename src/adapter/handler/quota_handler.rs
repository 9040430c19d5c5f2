use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::error::QuotaError;
use super::AppState;
use crate::domain::entity::{CheckQuotaResult, Quota, QuotaPlan, QuotaUsageOverview};
use crate::usecase::check_quota::CheckQuotaInput;
use crate::usecase::create_quota::CreateQuotaInput;
use crate::usecase::try_consume::TryConsumeInput;
use crate::usecase::update_quota::UpdateQuotaInput;

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
pub struct CreateQuotaRequest {
    pub plan: String,
    pub max_storage_bytes: Option<u64>,
    pub max_documents: Option<u64>,
    pub max_users: Option<u64>,
    pub max_api_calls_per_day: Option<u64>,
    pub max_file_size_bytes: Option<u64>,
    pub max_bandwidth_bytes_per_month: Option<u64>,
    pub features: Option<Vec<String>>,
    pub valid_until: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuotaRequest {
    pub plan: Option<String>,
    pub max_storage_bytes: Option<u64>,
    pub max_documents: Option<u64>,
    pub max_users: Option<u64>,
    pub max_api_calls_per_day: Option<u64>,
    pub max_file_size_bytes: Option<u64>,
    pub max_bandwidth_bytes_per_month: Option<u64>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub valid_until: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuotaRequest {
    pub resource: String,
    #[serde(default)]
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    pub resource: String,
    pub amount: u64,
    pub user_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// --- Handlers ---

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn readyz() -> &'static str {
    "ok"
}

pub async fn list_plans(State(state): State<AppState>) -> Json<Vec<QuotaPlan>> {
    Json(state.list_plans_uc.execute())
}

pub async fn create_quota(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<CreateQuotaRequest>,
) -> Result<(StatusCode, Json<Quota>), QuotaError> {
    let input = CreateQuotaInput {
        tenant_id,
        plan: req.plan,
        max_storage_bytes: req.max_storage_bytes,
        max_documents: req.max_documents,
        max_users: req.max_users,
        max_api_calls_per_day: req.max_api_calls_per_day,
        max_file_size_bytes: req.max_file_size_bytes,
        max_bandwidth_bytes_per_month: req.max_bandwidth_bytes_per_month,
        features: req.features,
        valid_until: req.valid_until,
    };

    let quota = state.create_quota_uc.execute(&input).await?;
    Ok((StatusCode::CREATED, Json(quota)))
}

pub async fn get_quota(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Quota>, QuotaError> {
    let quota = state.get_quota_uc.execute(&tenant_id).await?;
    Ok(Json(quota))
}

pub async fn update_quota(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<UpdateQuotaRequest>,
) -> Result<StatusCode, QuotaError> {
    let input = UpdateQuotaInput {
        tenant_id,
        plan: req.plan,
        max_storage_bytes: req.max_storage_bytes,
        max_documents: req.max_documents,
        max_users: req.max_users,
        max_api_calls_per_day: req.max_api_calls_per_day,
        max_file_size_bytes: req.max_file_size_bytes,
        max_bandwidth_bytes_per_month: req.max_bandwidth_bytes_per_month,
        features: req.features,
        is_active: req.is_active,
        valid_until: req.valid_until,
    };

    state.update_quota_uc.execute(&input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 使用量を変更しない判定。拒否も 200 で返し、allowed=false で表す。
pub async fn check_quota(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<CheckQuotaRequest>,
) -> Result<Json<CheckQuotaResult>, QuotaError> {
    let input = CheckQuotaInput {
        tenant_id,
        resource: req.resource,
        amount: req.amount,
    };

    let result = state.check_quota_uc.execute(&input).await?;
    Ok(Json(result))
}

pub async fn try_consume(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<ConsumeRequest>,
) -> Result<Json<CheckQuotaResult>, QuotaError> {
    let input = TryConsumeInput {
        tenant_id,
        resource: req.resource,
        amount: req.amount,
        user_id: req.user_id,
        metadata: req.metadata,
    };

    let result = state.try_consume_uc.execute(&input).await?;
    Ok(Json(result))
}

pub async fn get_overview(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<QuotaUsageOverview>, QuotaError> {
    let overview = state.get_overview_uc.execute(&tenant_id).await?;
    Ok(Json(overview))
}
