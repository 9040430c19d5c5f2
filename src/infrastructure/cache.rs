/// 読み取りキャッシュのストア抽象とインメモリ実装。
/// MokaCacheStore は moka::future::Cache を使用し、エントリごとの TTL を持つ。
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;

/// CacheStore はキー・値（シリアライズ済み文字列）・TTL を扱うキャッシュの抽象。
/// キャッシュは参考情報に過ぎないため、呼び出し側はエラーを致命的に扱わない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    ttl: Duration,
}

/// エントリ自身が保持する TTL をそのまま有効期間として使う。
struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// MokaCacheStore はプロセス内キャッシュ。
pub struct MokaCacheStore {
    inner: Cache<String, CacheEntry>,
}

impl MokaCacheStore {
    /// # Arguments
    /// * `max_capacity` - キャッシュに保持する最大エントリ数
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.inner.get(key).await.map(|e| e.payload))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        self.inner
            .insert(
                key.to_string(),
                CacheEntry {
                    payload: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.inner.invalidate(key).await;
        Ok(())
    }
}

/// NoopCacheStore は常にミスを返す。キャッシュ無効時やテストで使用する。
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MokaCacheStore::new(100);
        cache
            .set("tenant:t1:quota", "{\"a\":1}", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("tenant:t1:quota").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
    }

    #[tokio::test]
    async fn test_get_miss_returns_none() {
        let cache = MokaCacheStore::new(100);
        assert!(cache.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MokaCacheStore::new(100);
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_does_not_affect_other_keys() {
        let cache = MokaCacheStore::new(100);
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        cache.set("b", "2", Duration::from_secs(60)).await.unwrap();
        cache.delete("a").await.unwrap();
        assert!(cache.get("a").await.unwrap().is_none());
        assert_eq!(cache.get("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_per_entry_ttl_expiry() {
        let cache = MokaCacheStore::new(100);
        cache.set("short", "1", Duration::from_millis(500)).await.unwrap();
        cache.set("long", "2", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert!(cache.get("short").await.unwrap().is_none());
        assert!(cache.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_noop_always_misses() {
        let cache = NoopCacheStore;
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }
}
