use std::sync::Arc;

use chrono::Utc;

use crate::domain::entity::UsageStats;
use crate::domain::repository::UsageLogRepository;
use crate::usecase::get_usage_logs::{UsageLogParams, MAX_LOG_LIMIT};

#[derive(Debug, thiserror::Error)]
pub enum GetUsageStatsError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// GetUsageStatsUseCase は期間内の監査ログをリソース × アクションで集計する。
/// 集計は件数制限の影響を受けない。
pub struct GetUsageStatsUseCase {
    repo: Arc<dyn UsageLogRepository>,
}

impl GetUsageStatsUseCase {
    pub fn new(repo: Arc<dyn UsageLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        tenant_id: &str,
        params: &UsageLogParams,
    ) -> Result<UsageStats, GetUsageStatsError> {
        let query = params
            .to_query(Utc::now(), MAX_LOG_LIMIT)
            .map_err(GetUsageStatsError::Validation)?;

        let entries = self
            .repo
            .aggregate(tenant_id, &query)
            .await
            .map_err(|e| GetUsageStatsError::Internal(e.to_string()))?;

        Ok(UsageStats::from_entries(tenant_id, query.from, query.to, entries))
    }
}
