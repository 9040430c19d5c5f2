use std::sync::Arc;

use crate::domain::entity::QuotaUsageOverview;
use crate::usecase::get_quota::{GetQuotaError, GetQuotaUseCase};
use crate::usecase::get_usage::{GetUsageError, GetUsageUseCase};

#[derive(Debug, thiserror::Error)]
pub enum GetOverviewError {
    #[error("not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GetQuotaError> for GetOverviewError {
    fn from(e: GetQuotaError) -> Self {
        match e {
            GetQuotaError::NotFound(t) => GetOverviewError::NotFound(t),
            GetQuotaError::Internal(msg) => GetOverviewError::Internal(msg),
        }
    }
}

impl From<GetUsageError> for GetOverviewError {
    fn from(e: GetUsageError) -> Self {
        match e {
            GetUsageError::NotFound(t) => GetOverviewError::NotFound(t),
            GetUsageError::Internal(msg) => GetOverviewError::Internal(msg),
        }
    }
}

/// GetOverviewUseCase はクォータと使用量を合成し、使用率と超過フラグを付与する。
pub struct GetOverviewUseCase {
    get_quota: Arc<GetQuotaUseCase>,
    get_usage: Arc<GetUsageUseCase>,
}

impl GetOverviewUseCase {
    pub fn new(get_quota: Arc<GetQuotaUseCase>, get_usage: Arc<GetUsageUseCase>) -> Self {
        Self {
            get_quota,
            get_usage,
        }
    }

    pub async fn execute(&self, tenant_id: &str) -> Result<QuotaUsageOverview, GetOverviewError> {
        let quota = self.get_quota.execute(tenant_id).await?;
        let usage = self.get_usage.execute(tenant_id).await?;
        Ok(QuotaUsageOverview::new(quota, usage))
    }
}
