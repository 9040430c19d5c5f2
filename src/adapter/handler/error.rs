use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ErrorResponse;
use crate::usecase::check_quota::CheckQuotaError;
use crate::usecase::create_quota::CreateQuotaError;
use crate::usecase::decrement_usage::DecrementUsageError;
use crate::usecase::get_overview::GetOverviewError;
use crate::usecase::get_quota::GetQuotaError;
use crate::usecase::get_usage::GetUsageError;
use crate::usecase::get_usage_logs::GetUsageLogsError;
use crate::usecase::get_usage_stats::GetUsageStatsError;
use crate::usecase::increment_usage::IncrementUsageError;
use crate::usecase::try_consume::TryConsumeError;
use crate::usecase::update_quota::UpdateQuotaError;

/// QuotaError は REST 層のエラー型。ユースケースのエラーをステータスコードに対応付ける。
/// クォータ超過による拒否はエラーではないため、ここには現れない。
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for QuotaError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            QuotaError::NotFound(msg) => (StatusCode::NOT_FOUND, "SYS_QUOTA_NOT_FOUND", msg.as_str()),
            QuotaError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "SYS_QUOTA_VALIDATION_ERROR",
                msg.as_str(),
            ),
            QuotaError::Conflict(msg) => (StatusCode::CONFLICT, "SYS_QUOTA_ALREADY_EXISTS", msg.as_str()),
            QuotaError::Internal(msg) => {
                tracing::error!(error = %msg, "quota request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SYS_QUOTA_INTERNAL_ERROR",
                    msg.as_str(),
                )
            }
        };

        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}

impl From<CreateQuotaError> for QuotaError {
    fn from(e: CreateQuotaError) -> Self {
        match e {
            CreateQuotaError::Validation(_) => QuotaError::Validation(e.to_string()),
            CreateQuotaError::AlreadyExists(_) => QuotaError::Conflict(e.to_string()),
            CreateQuotaError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<GetQuotaError> for QuotaError {
    fn from(e: GetQuotaError) -> Self {
        match e {
            GetQuotaError::NotFound(_) => QuotaError::NotFound(e.to_string()),
            GetQuotaError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<UpdateQuotaError> for QuotaError {
    fn from(e: UpdateQuotaError) -> Self {
        match e {
            UpdateQuotaError::Validation(_) => QuotaError::Validation(e.to_string()),
            UpdateQuotaError::NotFound(_) => QuotaError::NotFound(e.to_string()),
            UpdateQuotaError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<GetUsageError> for QuotaError {
    fn from(e: GetUsageError) -> Self {
        match e {
            GetUsageError::NotFound(_) => QuotaError::NotFound(e.to_string()),
            GetUsageError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<GetOverviewError> for QuotaError {
    fn from(e: GetOverviewError) -> Self {
        match e {
            GetOverviewError::NotFound(_) => QuotaError::NotFound(e.to_string()),
            GetOverviewError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<CheckQuotaError> for QuotaError {
    fn from(e: CheckQuotaError) -> Self {
        match e {
            CheckQuotaError::Validation(_) => QuotaError::Validation(e.to_string()),
            CheckQuotaError::NotFound(_) => QuotaError::NotFound(e.to_string()),
            CheckQuotaError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<TryConsumeError> for QuotaError {
    fn from(e: TryConsumeError) -> Self {
        match e {
            TryConsumeError::Validation(_) => QuotaError::Validation(e.to_string()),
            TryConsumeError::NotFound(_) => QuotaError::NotFound(e.to_string()),
            TryConsumeError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<IncrementUsageError> for QuotaError {
    fn from(e: IncrementUsageError) -> Self {
        match e {
            IncrementUsageError::Validation(_) => QuotaError::Validation(e.to_string()),
            IncrementUsageError::NotFound(_) => QuotaError::NotFound(e.to_string()),
            IncrementUsageError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<DecrementUsageError> for QuotaError {
    fn from(e: DecrementUsageError) -> Self {
        match e {
            DecrementUsageError::Validation(_) => QuotaError::Validation(e.to_string()),
            DecrementUsageError::NotFound(_) => QuotaError::NotFound(e.to_string()),
            DecrementUsageError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<GetUsageLogsError> for QuotaError {
    fn from(e: GetUsageLogsError) -> Self {
        match e {
            GetUsageLogsError::Validation(_) => QuotaError::Validation(e.to_string()),
            GetUsageLogsError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}

impl From<GetUsageStatsError> for QuotaError {
    fn from(e: GetUsageStatsError) -> Self {
        match e {
            GetUsageStatsError::Validation(_) => QuotaError::Validation(e.to_string()),
            GetUsageStatsError::Internal(_) => QuotaError::Internal(e.to_string()),
        }
    }
}
