use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::cache::CacheStore;

/// RedisCacheStore は Redis ベースの読み取りキャッシュ。
///
/// 複数インスタンス間でキャッシュと無効化を共有する場合に使用する。
/// TTL は SET の EX オプションで付与する。
pub struct RedisCacheStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisCacheStore {
    pub fn new(conn: ConnectionManager, key_prefix: String) -> Self {
        Self { conn, key_prefix }
    }

    fn make_key(&self, key: &str) -> String {
        build_key(&self.key_prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();
        let result: Option<String> = redis::cmd("GET")
            .arg(&key)
            .query_async(&mut conn)
            .await?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let key = self.make_key(key);
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(&key)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// キープレフィックスとキャッシュキーから Redis キーを生成するヘルパー。
fn build_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

/// EX は秒単位かつ 0 を受け付けないため、最低 1 秒に切り上げる。
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
