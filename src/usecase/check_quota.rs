use std::sync::Arc;

use crate::domain::entity::{CheckQuotaResult, ResourceType};
use crate::usecase::get_quota::{GetQuotaError, GetQuotaUseCase};
use crate::usecase::get_usage::{GetUsageError, GetUsageUseCase};

#[derive(Debug, Clone)]
pub struct CheckQuotaInput {
    pub tenant_id: String,
    pub resource: String,
    pub amount: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckQuotaError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GetQuotaError> for CheckQuotaError {
    fn from(e: GetQuotaError) -> Self {
        match e {
            GetQuotaError::NotFound(t) => CheckQuotaError::NotFound(t),
            GetQuotaError::Internal(msg) => CheckQuotaError::Internal(msg),
        }
    }
}

impl From<GetUsageError> for CheckQuotaError {
    fn from(e: GetUsageError) -> Self {
        match e {
            GetUsageError::NotFound(t) => CheckQuotaError::NotFound(t),
            GetUsageError::Internal(msg) => CheckQuotaError::Internal(msg),
        }
    }
}

pub(crate) fn parse_resource(raw: &str) -> Result<ResourceType, String> {
    ResourceType::from_str(raw).ok_or_else(|| {
        format!(
            "resource must be one of: storage, documents, users, api_calls, bandwidth, file_size, got: {}",
            raw
        )
    })
}

/// CheckQuotaUseCase は使用量を変更せずにアドミッション判定を行う。
///
/// 判定と後続の increment_usage はアトミックではない。
/// 上限を厳密に守る必要がある呼び出し元は TryConsumeUseCase を使う。
pub struct CheckQuotaUseCase {
    get_quota: Arc<GetQuotaUseCase>,
    get_usage: Arc<GetUsageUseCase>,
}

impl CheckQuotaUseCase {
    pub fn new(get_quota: Arc<GetQuotaUseCase>, get_usage: Arc<GetUsageUseCase>) -> Self {
        Self {
            get_quota,
            get_usage,
        }
    }

    pub async fn execute(&self, input: &CheckQuotaInput) -> Result<CheckQuotaResult, CheckQuotaError> {
        let resource = parse_resource(&input.resource).map_err(CheckQuotaError::Validation)?;

        let quota = self.get_quota.execute(&input.tenant_id).await?;
        let max = quota.limits.max_for(resource);

        let result = match resource.counter() {
            None => CheckQuotaResult::file_size(max, input.amount),
            Some(counter) => {
                let usage = self.get_usage.execute(&input.tenant_id).await?;
                CheckQuotaResult::cumulative(resource, usage.counter(counter), max, input.amount)
            }
        };

        if !result.allowed {
            tracing::debug!(
                tenant_id = %input.tenant_id,
                resource = resource.as_str(),
                amount = input.amount,
                "quota check denied"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{PlanName, Quota, QuotaLimits, Usage};
    use crate::domain::repository::quota_repository::{MockQuotaRepository, MockUsageRepository};
    use crate::domain::repository::UsageRepository;
    use crate::usecase::reset_usage_windows::ResetUsageWindowsUseCase;
    use chrono::Utc;

    fn sample_quota() -> Quota {
        Quota::new(
            "tenant-1".to_string(),
            PlanName::Basic,
            QuotaLimits {
                max_storage_bytes: 1_000,
                max_documents: 100,
                max_users: 10,
                max_api_calls_per_day: 100,
                max_file_size_bytes: 50,
                max_bandwidth_bytes_per_month: 1_000,
            },
            None,
            None,
        )
    }

    fn make_uc(quota_mock: MockQuotaRepository, usage_mock: MockUsageRepository) -> CheckQuotaUseCase {
        let usage_repo: Arc<dyn UsageRepository> = Arc::new(usage_mock);
        let reset = Arc::new(ResetUsageWindowsUseCase::new(usage_repo.clone()));
        CheckQuotaUseCase::new(
            Arc::new(GetQuotaUseCase::new(Arc::new(quota_mock))),
            Arc::new(GetUsageUseCase::new(usage_repo, reset)),
        )
    }

    fn quota_mock() -> MockQuotaRepository {
        let mut mock = MockQuotaRepository::new();
        mock.expect_find_by_tenant()
            .returning(|_| Ok(Some(sample_quota())));
        mock
    }

    fn usage_mock(documents: u64) -> MockUsageRepository {
        let mut mock = MockUsageRepository::new();
        mock.expect_find_by_tenant().returning(move |id| {
            let mut usage = Usage::initial(id.to_string(), Utc::now());
            usage.document_count = documents;
            Ok(Some(usage))
        });
        mock
    }

    fn input(resource: &str, amount: u64) -> CheckQuotaInput {
        CheckQuotaInput {
            tenant_id: "tenant-1".to_string(),
            resource: resource.to_string(),
            amount,
        }
    }

    #[tokio::test]
    async fn allowed_under_limit() {
        let uc = make_uc(quota_mock(), usage_mock(40));
        let result = uc.execute(&input("documents", 10)).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.current_usage, 40);
        assert_eq!(result.max_allowed, 100);
        assert_eq!(result.remaining, 60);
        assert!(result.message.is_none());
    }

    #[tokio::test]
    async fn denied_at_limit_is_not_an_error() {
        let uc = make_uc(quota_mock(), usage_mock(100));
        let result = uc.execute(&input("documents", 1)).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert!(result.message.is_some());
    }

    #[tokio::test]
    async fn file_size_does_not_read_usage() {
        let mut usage = MockUsageRepository::new();
        usage.expect_find_by_tenant().never();

        let uc = make_uc(quota_mock(), usage);
        let allowed = uc.execute(&input("file_size", 50)).await.unwrap();
        assert!(allowed.allowed);
        assert_eq!(allowed.current_usage, 0);

        let denied = uc.execute(&input("file_size", 51)).await.unwrap();
        assert!(!denied.allowed);
    }

    #[tokio::test]
    async fn users_is_checkable() {
        let uc = make_uc(quota_mock(), usage_mock(0));
        let result = uc.execute(&input("users", 9)).await.unwrap();
        assert!(result.allowed);
        assert_eq!(result.current_usage, 1);
    }

    #[tokio::test]
    async fn invalid_resource() {
        let mut quota = MockQuotaRepository::new();
        quota.expect_find_by_tenant().never();

        let uc = make_uc(quota, MockUsageRepository::new());
        match uc.execute(&input("invalid_resource", 1)).await.unwrap_err() {
            CheckQuotaError::Validation(msg) => assert!(msg.contains("invalid_resource")),
            e => unreachable!("unexpected error: {:?}", e),
        }
    }

    #[tokio::test]
    async fn quota_not_found() {
        let mut quota = MockQuotaRepository::new();
        quota.expect_find_by_tenant().returning(|_| Ok(None));

        let uc = make_uc(quota, MockUsageRepository::new());
        assert!(matches!(
            uc.execute(&input("storage", 1)).await,
            Err(CheckQuotaError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn internal_error() {
        let mut usage = MockUsageRepository::new();
        usage
            .expect_find_by_tenant()
            .returning(|_| Err(anyhow::anyhow!("db error")));

        let uc = make_uc(quota_mock(), usage);
        match uc.execute(&input("storage", 1)).await.unwrap_err() {
            CheckQuotaError::Internal(msg) => assert!(msg.contains("db error")),
            e => unreachable!("unexpected error: {:?}", e),
        }
    }
}
