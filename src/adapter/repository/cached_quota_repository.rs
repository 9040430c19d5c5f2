use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entity::{Quota, QuotaPatch};
use crate::domain::repository::QuotaRepository;
use crate::infrastructure::tenant_cache::TenantCache;

/// CachedQuotaRepository は QuotaRepository をキャッシュでラップする。
/// find_by_tenant でキャッシュヒット時はストアへのアクセスをスキップする。
/// create / update 時は返却前にキャッシュを削除する。
pub struct CachedQuotaRepository {
    inner: Arc<dyn QuotaRepository>,
    cache: TenantCache,
}

impl CachedQuotaRepository {
    pub fn new(inner: Arc<dyn QuotaRepository>, cache: TenantCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl QuotaRepository for CachedQuotaRepository {
    async fn create(&self, quota: &Quota) -> anyhow::Result<bool> {
        let created = self.inner.create(quota).await?;
        self.cache.invalidate_quota(&quota.tenant_id).await;
        Ok(created)
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Quota>> {
        if let Some(cached) = self.cache.get_quota(tenant_id).await {
            return Ok(Some(cached));
        }

        // キャッシュミス: ストアから取得
        let result = self.inner.find_by_tenant(tenant_id).await?;
        if let Some(ref quota) = result {
            self.cache.set_quota(quota).await;
        }
        Ok(result)
    }

    async fn update(&self, tenant_id: &str, patch: &QuotaPatch) -> anyhow::Result<Option<Quota>> {
        let updated = self.inner.update(tenant_id, patch).await?;
        self.cache.invalidate_quota(tenant_id).await;
        Ok(updated)
    }
}
