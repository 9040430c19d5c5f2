use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::entity::{Usage, UsageLog};
use crate::domain::repository::{UsageLogRepository, UsageRepository};
use crate::domain::service::quota_validation::validate_amount;
use crate::usecase::check_quota::parse_resource;
use crate::usecase::reset_usage_windows::{ResetUsageWindowsError, ResetUsageWindowsUseCase};

#[derive(Debug, Clone)]
pub struct IncrementUsageInput {
    pub tenant_id: String,
    pub resource: String,
    pub amount: u64,
    pub user_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum IncrementUsageError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("usage not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResetUsageWindowsError> for IncrementUsageError {
    fn from(e: ResetUsageWindowsError) -> Self {
        match e {
            ResetUsageWindowsError::NotFound(t) => IncrementUsageError::NotFound(t),
            ResetUsageWindowsError::Internal(msg) => IncrementUsageError::Internal(msg),
        }
    }
}

/// IncrementUsageUseCase は使用量を加算し、監査ログを追記する。
/// 上限チェックは行わない（呼び出し元が事前に check_quota を呼ぶ前提）。
pub struct IncrementUsageUseCase {
    usage_repo: Arc<dyn UsageRepository>,
    log_repo: Arc<dyn UsageLogRepository>,
    reset_uc: Arc<ResetUsageWindowsUseCase>,
}

impl IncrementUsageUseCase {
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

    pub async fn execute(&self, input: &IncrementUsageInput) -> Result<Usage, IncrementUsageError> {
        let resource = parse_resource(&input.resource).map_err(IncrementUsageError::Validation)?;
        let counter = resource.incrementable_counter().ok_or_else(|| {
            IncrementUsageError::Validation(format!(
                "resource {} cannot be incremented (allowed: storage, documents, api_calls, bandwidth)",
                resource
            ))
        })?;
        validate_amount(input.amount).map_err(IncrementUsageError::Validation)?;

        let now = Utc::now();
        // 窓をまたいだ古いカウンターに加算しないよう、先にリセット判定を行う
        if counter.is_windowed() {
            self.reset_uc.execute_at(&input.tenant_id, now).await?;
        }

        let usage = self
            .usage_repo
            .increment(&input.tenant_id, counter, input.amount, now)
            .await
            .map_err(|e| IncrementUsageError::Internal(e.to_string()))?
            .ok_or_else(|| IncrementUsageError::NotFound(input.tenant_id.clone()))?;

        let log = UsageLog::increment(
            &input.tenant_id,
            resource,
            input.amount,
            input.user_id.clone(),
            input.metadata.clone(),
        );
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
            "usage incremented"
        );

        Ok(usage)
    }
}
