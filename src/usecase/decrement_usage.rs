use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::entity::{Usage, UsageLog};
use crate::domain::repository::{UsageLogRepository, UsageRepository};
use crate::domain::service::quota_validation::validate_amount;
use crate::usecase::check_quota::parse_resource;
use crate::usecase::reset_usage_windows::{ResetUsageWindowsError, ResetUsageWindowsUseCase};

#[derive(Debug, Clone)]
pub struct DecrementUsageInput {
    pub tenant_id: String,
    pub resource: String,
    pub amount: u64,
    pub user_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecrementUsageError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("usage not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResetUsageWindowsError> for DecrementUsageError {
    fn from(e: ResetUsageWindowsError) -> Self {
        match e {
            ResetUsageWindowsError::NotFound(t) => DecrementUsageError::NotFound(t),
            ResetUsageWindowsError::Internal(msg) => DecrementUsageError::Internal(msg),
        }
    }
}

/// DecrementUsageUseCase は使用量を減算する。カウンターは 0 で止まるが、
/// 監査ログにはクランプ前の要求量を負値で記録する。
pub struct DecrementUsageUseCase {
    usage_repo: Arc<dyn UsageRepository>,
    log_repo: Arc<dyn UsageLogRepository>,
    reset_uc: Arc<ResetUsageWindowsUseCase>,
}

impl DecrementUsageUseCase {
    pub fn new(
        usage_repo: Arc<dyn UsageRepository>,
        log_repo: Arc<dyn UsageLogRepository>,
        reset_uc: Arc<ResetUsageWindowsUseCase>,
    ) -> Self {
        Self {
            usage_repo,
            log_repo,
            reset_uc,
        }
    }

    pub async fn execute(&self, input: &DecrementUsageInput) -> Result<Usage, DecrementUsageError> {
        let resource = parse_resource(&input.resource).map_err(DecrementUsageError::Validation)?;
        let counter = resource.decrementable_counter().ok_or_else(|| {
            DecrementUsageError::Validation(format!(
                "resource {} cannot be decremented (allowed: storage, documents, bandwidth)",
                resource
            ))
        })?;
        validate_amount(input.amount).map_err(DecrementUsageError::Validation)?;

        let now = Utc::now();
        if counter.is_windowed() {
            self.reset_uc.execute_at(&input.tenant_id, now).await?;
        }

        let usage = self
            .usage_repo
            .decrement(&input.tenant_id, counter, input.amount, now)
            .await
            .map_err(|e| DecrementUsageError::Internal(e.to_string()))?
            .ok_or_else(|| DecrementUsageError::NotFound(input.tenant_id.clone()))?;

        let log = UsageLog::decrement(&input.tenant_id, resource, input.amount, input.user_id.clone());
        if let Err(e) = self.log_repo.append(&log).await {
            warn!(
                tenant_id = %input.tenant_id,
                resource = resource.as_str(),
                error = %e,
                "failed to append usage log"
            );
        }

        info!(
            tenant_id = %input.tenant_id,
            resource = resource.as_str(),
            amount = input.amount,
            current = usage.counter(counter),
            "usage decremented"
        );

        Ok(usage)
    }
}
