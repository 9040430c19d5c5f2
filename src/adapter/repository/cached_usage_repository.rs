use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entity::{Usage, UsageCounter};
use crate::domain::repository::{ConsumeOutcome, UsageRepository};
use crate::infrastructure::tenant_cache::TenantCache;

/// CachedUsageRepository は UsageRepository をキャッシュでラップする。
/// 読み取りはキャッシュ優先、台帳を変更する操作はすべて返却前にキャッシュを削除する。
pub struct CachedUsageRepository {
    inner: Arc<dyn UsageRepository>,
    cache: TenantCache,
}

impl CachedUsageRepository {
    pub fn new(inner: Arc<dyn UsageRepository>, cache: TenantCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl UsageRepository for CachedUsageRepository {
    async fn create_initial(&self, tenant_id: &str, now: DateTime<Utc>) -> anyhow::Result<Usage> {
        let usage = self.inner.create_initial(tenant_id, now).await?;
        self.cache.invalidate_usage(tenant_id).await;
        Ok(usage)
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Usage>> {
        if let Some(cached) = self.cache.get_usage(tenant_id).await {
            return Ok(Some(cached));
        }

        let result = self.inner.find_by_tenant(tenant_id).await?;
        if let Some(ref usage) = result {
            self.cache.set_usage(usage).await;
        }
        Ok(result)
    }

    async fn increment(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Usage>> {
        let result = self.inner.increment(tenant_id, counter, amount, now).await?;
        self.cache.invalidate_usage(tenant_id).await;
        Ok(result)
    }

    async fn decrement(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Usage>> {
        let result = self.inner.decrement(tenant_id, counter, amount, now).await?;
        self.cache.invalidate_usage(tenant_id).await;
        Ok(result)
    }

    async fn try_consume(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        max: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ConsumeOutcome>> {
        let result = self
            .inner
            .try_consume(tenant_id, counter, amount, max, now)
            .await?;
        self.cache.invalidate_usage(tenant_id).await;
        Ok(result)
    }

    async fn reset_daily(
        &self,
        tenant_id: &str,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let reset = self.inner.reset_daily(tenant_id, day_start, now).await?;
        // 他インスタンスが先にリセットした場合もキャッシュは古いので常に削除する
        self.cache.invalidate_usage(tenant_id).await;
        Ok(reset)
    }

    async fn reset_monthly(
        &self,
        tenant_id: &str,
        month_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let reset = self.inner.reset_monthly(tenant_id, month_start, now).await?;
        self.cache.invalidate_usage(tenant_id).await;
        Ok(reset)
    }

    async fn list_tenant_ids(&self, offset: u64, limit: u32) -> anyhow::Result<Vec<String>> {
        self.inner.list_tenant_ids(offset, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::quota_repository::MockUsageRepository;
    use crate::infrastructure::cache::MokaCacheStore;

    fn make_cache() -> TenantCache {
        TenantCache::with_default_ttls(Arc::new(MokaCacheStore::new(100)))
    }

    #[tokio::test]
    async fn test_find_cache_hit_skips_store() {
        let mut mock = MockUsageRepository::new();
        mock.expect_find_by_tenant().never();

        let cache = make_cache();
        let usage = Usage::initial("tenant-1".to_string(), Utc::now());
        cache.set_usage(&usage).await;

        let repo = CachedUsageRepository::new(Arc::new(mock), cache);
        assert_eq!(repo.find_by_tenant("tenant-1").await.unwrap(), Some(usage));
    }

    #[tokio::test]
    async fn test_increment_invalidates_cache() {
        let mut mock = MockUsageRepository::new();
        mock.expect_increment().once().returning(|id, counter, amount, now| {
            let mut usage = Usage::initial(id.to_string(), now);
            *usage.counter_mut(counter) += amount;
            Ok(Some(usage))
        });

        let cache = make_cache();
        cache
            .set_usage(&Usage::initial("tenant-1".to_string(), Utc::now()))
            .await;

        let repo = CachedUsageRepository::new(Arc::new(mock), cache.clone());
        let usage = repo
            .increment("tenant-1", UsageCounter::StorageUsed, 10, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.storage_used, 10);
        assert!(cache.get_usage("tenant-1").await.is_none());
    }

    #[tokio::test]
    async fn test_lost_reset_race_still_invalidates() {
        let mut mock = MockUsageRepository::new();
        mock.expect_reset_daily().returning(|_, _, _| Ok(false));

        let cache = make_cache();
        cache
            .set_usage(&Usage::initial("tenant-1".to_string(), Utc::now()))
            .await;

        let repo = CachedUsageRepository::new(Arc::new(mock), cache.clone());
        let now = Utc::now();
        assert!(!repo.reset_daily("tenant-1", now, now).await.unwrap());
        assert!(cache.get_usage("tenant-1").await.is_none());
    }

    #[tokio::test]
    async fn test_store_error_is_propagated() {
        let mut mock = MockUsageRepository::new();
        mock.expect_decrement()
            .returning(|_, _, _, _| Err(anyhow::anyhow!("db error")));

        let repo = CachedUsageRepository::new(Arc::new(mock), make_cache());
        let result = repo
            .decrement("tenant-1", UsageCounter::StorageUsed, 1, Utc::now())
            .await;
        assert!(result.is_err());
    }
}
