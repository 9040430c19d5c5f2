use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::entity::{Usage, UsageCounter};
use crate::domain::repository::{ConsumeOutcome, UsageRepository};

/// インメモリの使用量台帳。各操作は書き込みロックの内側で完結するため、
/// Postgres 実装の単一 UPDATE 文と同じくアトミックに振る舞う。
pub struct InMemoryUsageRepository {
    usage: RwLock<BTreeMap<String, Usage>>,
}

impl InMemoryUsageRepository {
    pub fn new() -> Self {
        Self {
            usage: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryUsageRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn touch(usage: &mut Usage, counter: UsageCounter, now: DateTime<Utc>) {
    usage.updated_at = now;
    if counter == UsageCounter::ApiCallsToday {
        usage.last_api_call_at = Some(now);
    }
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn create_initial(&self, tenant_id: &str, now: DateTime<Utc>) -> anyhow::Result<Usage> {
        let mut usage = self.usage.write().await;
        Ok(usage
            .entry(tenant_id.to_string())
            .or_insert_with(|| Usage::initial(tenant_id.to_string(), now))
            .clone())
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Usage>> {
        let usage = self.usage.read().await;
        Ok(usage.get(tenant_id).cloned())
    }

    async fn increment(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Usage>> {
        let mut usage = self.usage.write().await;
        let Some(entry) = usage.get_mut(tenant_id) else {
            return Ok(None);
        };
        let value = entry.counter_mut(counter);
        *value = value
            .checked_add(amount)
            .ok_or_else(|| anyhow::anyhow!("{} overflow for tenant {}", counter.column(), tenant_id))?;
        touch(entry, counter, now);
        Ok(Some(entry.clone()))
    }

    async fn decrement(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Usage>> {
        let mut usage = self.usage.write().await;
        let Some(entry) = usage.get_mut(tenant_id) else {
            return Ok(None);
        };
        let value = entry.counter_mut(counter);
        *value = value.saturating_sub(amount);
        entry.updated_at = now;
        Ok(Some(entry.clone()))
    }

    async fn try_consume(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        max: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ConsumeOutcome>> {
        let mut usage = self.usage.write().await;
        let Some(entry) = usage.get_mut(tenant_id) else {
            return Ok(None);
        };
        let allowed = entry
            .counter(counter)
            .checked_add(amount)
            .map_or(false, |total| total <= max);
        if allowed {
            *entry.counter_mut(counter) += amount;
            touch(entry, counter, now);
        }
        Ok(Some(ConsumeOutcome {
            allowed,
            usage: entry.clone(),
        }))
    }

    async fn reset_daily(
        &self,
        tenant_id: &str,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut usage = self.usage.write().await;
        match usage.get_mut(tenant_id) {
            Some(entry) if entry.last_daily_reset_at < day_start => {
                entry.api_calls_today = 0;
                entry.last_daily_reset_at = now;
                entry.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_monthly(
        &self,
        tenant_id: &str,
        month_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut usage = self.usage.write().await;
        match usage.get_mut(tenant_id) {
            Some(entry) if entry.last_monthly_reset_at < month_start => {
                entry.bandwidth_month = 0;
                entry.last_monthly_reset_at = now;
                entry.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_tenant_ids(&self, offset: u64, limit: u32) -> anyhow::Result<Vec<String>> {
        let usage = self.usage.read().await;
        Ok(usage
            .keys()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_create_initial_is_idempotent() {
        let repo = InMemoryUsageRepository::new();
        let now = Utc::now();
        repo.create_initial("t-1", now).await.unwrap();
        repo.increment("t-1", UsageCounter::StorageUsed, 10, now)
            .await
            .unwrap();

        let again = repo.create_initial("t-1", now).await.unwrap();
        assert_eq!(again.storage_used, 10);
    }

    #[tokio::test]
    async fn test_decrement_clamps_at_zero() {
        let repo = InMemoryUsageRepository::new();
        let now = Utc::now();
        repo.create_initial("t-1", now).await.unwrap();
        repo.increment("t-1", UsageCounter::StorageUsed, 100, now)
            .await
            .unwrap();
        let usage = repo
            .decrement("t-1", UsageCounter::StorageUsed, 500, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.storage_used, 0);
    }

    #[tokio::test]
    async fn test_api_call_increment_sets_last_call() {
        let repo = InMemoryUsageRepository::new();
        let now = Utc::now();
        repo.create_initial("t-1", now).await.unwrap();
        let usage = repo
            .increment("t-1", UsageCounter::ApiCallsToday, 1, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.last_api_call_at, Some(now));
    }

    #[tokio::test]
    async fn test_missing_tenant() {
        let repo = InMemoryUsageRepository::new();
        let now = Utc::now();
        assert!(repo
            .increment("missing", UsageCounter::StorageUsed, 1, now)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .try_consume("missing", UsageCounter::StorageUsed, 1, 10, now)
            .await
            .unwrap()
            .is_none());
        assert!(!repo.reset_daily("missing", now, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_try_consume_respects_bound() {
        let repo = InMemoryUsageRepository::new();
        let now = Utc::now();
        repo.create_initial("t-1", now).await.unwrap();

        let ok = repo
            .try_consume("t-1", UsageCounter::DocumentCount, 10, 10, now)
            .await
            .unwrap()
            .unwrap();
        assert!(ok.allowed);
        assert_eq!(ok.usage.document_count, 10);

        let denied = repo
            .try_consume("t-1", UsageCounter::DocumentCount, 1, 10, now)
            .await
            .unwrap()
            .unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.usage.document_count, 10);
    }

    #[tokio::test]
    async fn test_conditional_resets() {
        let repo = InMemoryUsageRepository::new();
        let created = Utc.with_ymd_and_hms(2024, 3, 31, 10, 0, 0).unwrap();
        repo.create_initial("t-1", created).await.unwrap();
        repo.increment("t-1", UsageCounter::ApiCallsToday, 5, created)
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 4, 1, 0, 30, 0).unwrap();
        let day_start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        assert!(repo.reset_daily("t-1", day_start, now).await.unwrap());
        assert!(!repo.reset_daily("t-1", day_start, now).await.unwrap());
        assert!(repo.reset_monthly("t-1", day_start, now).await.unwrap());

        let usage = repo.find_by_tenant("t-1").await.unwrap().unwrap();
        assert_eq!(usage.api_calls_today, 0);
        assert_eq!(usage.last_daily_reset_at, now);
    }

    #[tokio::test]
    async fn test_list_tenant_ids_pages_in_order() {
        let repo = InMemoryUsageRepository::new();
        let now = Utc::now();
        for id in ["c", "a", "b"] {
            repo.create_initial(id, now).await.unwrap();
        }
        assert_eq!(repo.list_tenant_ids(0, 2).await.unwrap(), vec!["a", "b"]);
        assert_eq!(repo.list_tenant_ids(2, 2).await.unwrap(), vec!["c"]);
    }
}
