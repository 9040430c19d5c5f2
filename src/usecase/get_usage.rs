use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::entity::Usage;
use crate::domain::repository::UsageRepository;
use crate::usecase::reset_usage_windows::{ResetUsageWindowsError, ResetUsageWindowsUseCase};

#[derive(Debug, thiserror::Error)]
pub enum GetUsageError {
    #[error("usage not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResetUsageWindowsError> for GetUsageError {
    fn from(e: ResetUsageWindowsError) -> Self {
        match e {
            ResetUsageWindowsError::NotFound(t) => GetUsageError::NotFound(t),
            ResetUsageWindowsError::Internal(msg) => GetUsageError::Internal(msg),
        }
    }
}

/// GetUsageUseCase はテナントの使用量を取得する。
/// 返却前に必ずリセット状態機械を通すため、窓をまたいだ古いカウンターは観測されない。
pub struct GetUsageUseCase {
    usage_repo: Arc<dyn UsageRepository>,
    reset_uc: Arc<ResetUsageWindowsUseCase>,
}

impl GetUsageUseCase {
    pub fn new(usage_repo: Arc<dyn UsageRepository>, reset_uc: Arc<ResetUsageWindowsUseCase>) -> Self {
        Self {
            usage_repo,
            reset_uc,
        }
    }

    pub async fn execute(&self, tenant_id: &str) -> Result<Usage, GetUsageError> {
        self.execute_at(tenant_id, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Usage, GetUsageError> {
        let usage = self
            .usage_repo
            .find_by_tenant(tenant_id)
            .await
            .map_err(|e| GetUsageError::Internal(e.to_string()))?
            .ok_or_else(|| GetUsageError::NotFound(tenant_id.to_string()))?;

        let outcome = self.reset_uc.apply(usage, now).await?;
        Ok(outcome.usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::quota_repository::MockUsageRepository;

    fn make_uc(mock: MockUsageRepository) -> GetUsageUseCase {
        let repo: Arc<dyn UsageRepository> = Arc::new(mock);
        GetUsageUseCase::new(repo.clone(), Arc::new(ResetUsageWindowsUseCase::new(repo)))
    }

    #[tokio::test]
    async fn success() {
        let mut mock = MockUsageRepository::new();
        let now = Utc::now();
        mock.expect_find_by_tenant()
            .withf(|id| id == "tenant-1")
            .returning(move |id| {
                let mut usage = Usage::initial(id.to_string(), now);
                usage.storage_used = 4096;
                Ok(Some(usage))
            });

        let uc = make_uc(mock);
        let usage = uc.execute_at("tenant-1", now).await.unwrap();
        assert_eq!(usage.storage_used, 4096);
    }

    #[tokio::test]
    async fn not_found() {
        let mut mock = MockUsageRepository::new();
        mock.expect_find_by_tenant().returning(|_| Ok(None));

        let uc = make_uc(mock);
        match uc.execute("nonexistent").await.unwrap_err() {
            GetUsageError::NotFound(id) => assert_eq!(id, "nonexistent"),
            e => unreachable!("unexpected error: {:?}", e),
        }
    }

    #[tokio::test]
    async fn internal_error() {
        let mut mock = MockUsageRepository::new();
        mock.expect_find_by_tenant()
            .returning(|_| Err(anyhow::anyhow!("db error")));

        let uc = make_uc(mock);
        match uc.execute("tenant-1").await.unwrap_err() {
            GetUsageError::Internal(msg) => assert!(msg.contains("db error")),
            e => unreachable!("unexpected error: {:?}", e),
        }
    }

    #[tokio::test]
    async fn stale_daily_counter_is_reset_before_return() {
        let mut mock = MockUsageRepository::new();
        let yesterday = Utc::now() - chrono::Duration::days(1);
        let mut seq = mockall::Sequence::new();

        mock.expect_find_by_tenant()
            .once()
            .in_sequence(&mut seq)
            .returning(move |id| {
                let mut usage = Usage::initial(id.to_string(), yesterday);
                usage.api_calls_today = 999;
                usage.last_monthly_reset_at = Utc::now();
                Ok(Some(usage))
            });
        mock.expect_reset_daily()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(true));
        mock.expect_find_by_tenant()
            .once()
            .in_sequence(&mut seq)
            .returning(|id| Ok(Some(Usage::initial(id.to_string(), Utc::now()))));

        let uc = make_uc(mock);
        let usage = uc.execute("tenant-1").await.unwrap();
        assert_eq!(usage.api_calls_today, 0);
    }
}
