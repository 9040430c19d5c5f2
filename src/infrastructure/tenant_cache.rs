use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::cache::CacheStore;
use crate::domain::entity::{Quota, Usage};

pub const DEFAULT_QUOTA_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_USAGE_TTL: Duration = Duration::from_secs(300);

pub fn quota_key(tenant_id: &str) -> String {
    format!("tenant:{}:quota", tenant_id)
}

pub fn usage_key(tenant_id: &str) -> String {
    format!("tenant:{}:usage", tenant_id)
}

/// TenantCache はテナント単位の Quota / Usage を JSON でキャッシュする。
///
/// キャッシュ障害はリクエストを失敗させない:
/// 読み取りエラーはミス扱い、書き込み・削除エラーはログ出力のみ。
#[derive(Clone)]
pub struct TenantCache {
    store: Arc<dyn CacheStore>,
    quota_ttl: Duration,
    usage_ttl: Duration,
}

impl TenantCache {
    pub fn new(store: Arc<dyn CacheStore>, quota_ttl: Duration, usage_ttl: Duration) -> Self {
        Self {
            store,
            quota_ttl,
            usage_ttl,
        }
    }

    pub fn with_default_ttls(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store, DEFAULT_QUOTA_TTL, DEFAULT_USAGE_TTL)
    }

    pub async fn get_quota(&self, tenant_id: &str) -> Option<Quota> {
        self.get_json(&quota_key(tenant_id)).await
    }

    pub async fn set_quota(&self, quota: &Quota) {
        self.set_json(&quota_key(&quota.tenant_id), quota, self.quota_ttl)
            .await;
    }

    pub async fn invalidate_quota(&self, tenant_id: &str) {
        self.delete(&quota_key(tenant_id)).await;
    }

    pub async fn get_usage(&self, tenant_id: &str) -> Option<Usage> {
        self.get_json(&usage_key(tenant_id)).await
    }

    pub async fn set_usage(&self, usage: &Usage) {
        self.set_json(&usage_key(&usage.tenant_id), usage, self.usage_ttl)
            .await;
    }

    pub async fn invalidate_usage(&self, tenant_id: &str) {
        self.delete(&usage_key(tenant_id)).await;
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache entry could not be decoded, treating as miss");
                None
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set(key, &raw, ttl).await {
            tracing::warn!(key = %key, error = %e, "cache write failed, ignoring");
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!(key = %key, error = %e, "cache invalidation failed, ignoring");
        }
    }
}
