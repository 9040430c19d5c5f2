use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::entity::{UsageAction, UsageLog, UsageLogQuery};
use crate::domain::repository::UsageLogRepository;
use crate::domain::service::quota_validation::parse_timestamp;
use crate::usecase::check_quota::parse_resource;

pub const DEFAULT_RANGE_DAYS: i64 = 30;
pub const DEFAULT_LOG_LIMIT: u32 = 100;
pub const MAX_LOG_LIMIT: u32 = 1000;

/// UsageLogParams は監査ログの検索・集計に共通する絞り込み条件。
/// 期間を省略した場合は直近30日になる。
#[derive(Debug, Clone, Default)]
pub struct UsageLogParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub limit: Option<u32>,
}

impl UsageLogParams {
    /// 検索条件を UsageLogQuery に変換する。limit は 1..=max_limit に丸める。
    pub fn to_query(&self, now: DateTime<Utc>, max_limit: u32) -> Result<UsageLogQuery, String> {
        let to = self
            .to
            .as_deref()
            .map(|raw| parse_timestamp("to", raw))
            .transpose()?
            .unwrap_or(now);
        let from = self
            .from
            .as_deref()
            .map(|raw| parse_timestamp("from", raw))
            .transpose()?
            .unwrap_or(to - Duration::days(DEFAULT_RANGE_DAYS));
        if from >= to {
            return Err("from must be before to".to_string());
        }

        let resource = self.resource.as_deref().map(parse_resource).transpose()?;
        let action = self
            .action
            .as_deref()
            .map(|raw| {
                UsageAction::from_str(raw).ok_or_else(|| {
                    format!("action must be one of: increment, decrement, got: {}", raw)
                })
            })
            .transpose()?;

        let limit = self
            .limit
            .unwrap_or(DEFAULT_LOG_LIMIT)
            .clamp(1, max_limit.max(1));

        Ok(UsageLogQuery {
            from,
            to,
            resource,
            action,
            limit,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetUsageLogsError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub struct GetUsageLogsUseCase {
    repo: Arc<dyn UsageLogRepository>,
    max_limit: u32,
}

impl GetUsageLogsUseCase {
    pub fn new(repo: Arc<dyn UsageLogRepository>) -> Self {
        Self::with_max_limit(repo, MAX_LOG_LIMIT)
    }

    pub fn with_max_limit(repo: Arc<dyn UsageLogRepository>, max_limit: u32) -> Self {
        Self { repo, max_limit }
    }

    pub async fn execute(
        &self,
        tenant_id: &str,
        params: &UsageLogParams,
    ) -> Result<Vec<UsageLog>, GetUsageLogsError> {
        let query = params
            .to_query(Utc::now(), self.max_limit)
            .map_err(GetUsageLogsError::Validation)?;

        self.repo
            .find(tenant_id, &query)
            .await
            .map_err(|e| GetUsageLogsError::Internal(e.to_string()))
    }
}
