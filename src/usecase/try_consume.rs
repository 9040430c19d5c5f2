use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::entity::{CheckQuotaResult, ResourceType, UsageLog};
use crate::domain::repository::{UsageLogRepository, UsageRepository};
use crate::domain::service::quota_validation::validate_amount;
use crate::usecase::check_quota::parse_resource;
use crate::usecase::get_quota::{GetQuotaError, GetQuotaUseCase};
use crate::usecase::reset_usage_windows::{ResetUsageWindowsError, ResetUsageWindowsUseCase};

#[derive(Debug, Clone)]
pub struct TryConsumeInput {
    pub tenant_id: String,
    pub resource: String,
    pub amount: u64,
    pub user_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum TryConsumeError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GetQuotaError> for TryConsumeError {
    fn from(e: GetQuotaError) -> Self {
        match e {
            GetQuotaError::NotFound(t) => TryConsumeError::NotFound(t),
            GetQuotaError::Internal(msg) => TryConsumeError::Internal(msg),
        }
    }
}

impl From<ResetUsageWindowsError> for TryConsumeError {
    fn from(e: ResetUsageWindowsError) -> Self {
        match e {
            ResetUsageWindowsError::NotFound(t) => TryConsumeError::NotFound(t),
            ResetUsageWindowsError::Internal(msg) => TryConsumeError::Internal(msg),
        }
    }
}

/// TryConsumeUseCase は上限判定と加算を1回の条件付き更新で行う。
///
/// 許可された場合、結果の current_usage は加算後の値になる。
/// 拒否された場合は使用量を変更せず、監査ログも書かない。
pub struct TryConsumeUseCase {
    get_quota: Arc<GetQuotaUseCase>,
    usage_repo: Arc<dyn UsageRepository>,
    log_repo: Arc<dyn UsageLogRepository>,
    reset_uc: Arc<ResetUsageWindowsUseCase>,
}

impl TryConsumeUseCase {
    pub fn new(
        get_quota: Arc<GetQuotaUseCase>,
        usage_repo: Arc<dyn UsageRepository>,
        log_repo: Arc<dyn UsageLogRepository>,
        reset_uc: Arc<ResetUsageWindowsUseCase>,
    ) -> Self {
        Self {
            get_quota,
            usage_repo,
            log_repo,
            reset_uc,
        }
    }

    pub async fn execute(&self, input: &TryConsumeInput) -> Result<CheckQuotaResult, TryConsumeError> {
        let resource = parse_resource(&input.resource).map_err(TryConsumeError::Validation)?;
        if resource == ResourceType::Users {
            return Err(TryConsumeError::Validation(
                "resource users cannot be consumed".to_string(),
            ));
        }
        validate_amount(input.amount).map_err(TryConsumeError::Validation)?;

        let quota = self.get_quota.execute(&input.tenant_id).await?;
        let max = quota.limits.max_for(resource);

        let counter = match resource.incrementable_counter() {
            Some(counter) => counter,
            None => return Ok(CheckQuotaResult::file_size(max, input.amount)),
        };

        let now = Utc::now();
        if counter.is_windowed() {
            self.reset_uc.execute_at(&input.tenant_id, now).await?;
        }

        let outcome = self
            .usage_repo
            .try_consume(&input.tenant_id, counter, input.amount, max, now)
            .await
            .map_err(|e| TryConsumeError::Internal(e.to_string()))?
            .ok_or_else(|| TryConsumeError::NotFound(input.tenant_id.clone()))?;

        let current = outcome.usage.counter(counter);
        if !outcome.allowed {
            return Ok(CheckQuotaResult::cumulative(resource, current, max, input.amount));
        }

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
            current = current,
            "usage consumed"
        );

        Ok(CheckQuotaResult::cumulative(resource, current, max, 0))
    }
}
