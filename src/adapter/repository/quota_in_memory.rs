use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::entity::{Quota, QuotaPatch};
use crate::domain::repository::QuotaRepository;

/// テナントIDごとにクォータの履歴を保持するインメモリ実装。
/// データベース設定がない場合とテストで使用する。
pub struct InMemoryQuotaRepository {
    quotas: RwLock<HashMap<String, Vec<Quota>>>,
}

impl InMemoryQuotaRepository {
    pub fn new() -> Self {
        Self {
            quotas: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryQuotaRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// 有効なものを優先し、同順位なら作成日時が新しいものを選ぶ。
fn preferred_index(history: &[Quota]) -> Option<usize> {
    history
        .iter()
        .enumerate()
        .max_by_key(|(_, q)| (q.is_active, q.created_at))
        .map(|(i, _)| i)
}

#[async_trait]
impl QuotaRepository for InMemoryQuotaRepository {
    async fn create(&self, quota: &Quota) -> anyhow::Result<bool> {
        let mut quotas = self.quotas.write().await;
        let history = quotas.entry(quota.tenant_id.clone()).or_default();
        if quota.is_active && history.iter().any(|q| q.is_active) {
            return Ok(false);
        }
        history.push(quota.clone());
        Ok(true)
    }

    async fn find_by_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Quota>> {
        let quotas = self.quotas.read().await;
        Ok(quotas
            .get(tenant_id)
            .and_then(|history| preferred_index(history).map(|i| history[i].clone())))
    }

    async fn update(&self, tenant_id: &str, patch: &QuotaPatch) -> anyhow::Result<Option<Quota>> {
        let mut quotas = self.quotas.write().await;
        let Some(history) = quotas.get_mut(tenant_id) else {
            return Ok(None);
        };
        let Some(i) = preferred_index(history) else {
            return Ok(None);
        };
        let quota = &mut history[i];
        quota.apply(patch);
        quota.updated_at = Utc::now();
        Ok(Some(quota.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::plan::find_plan;
    use crate::domain::entity::PlanName;

    fn quota(tenant: &str) -> Quota {
        Quota::new(
            tenant.to_string(),
            PlanName::Free,
            find_plan(PlanName::Free).limits,
            None,
            None,
        )
    }

    #[tokio::test]
    async fn test_duplicate_active_quota_is_rejected() {
        let repo = InMemoryQuotaRepository::new();
        assert!(repo.create(&quota("t-1")).await.unwrap());
        assert!(!repo.create(&quota("t-1")).await.unwrap());
        assert!(repo.create(&quota("t-2")).await.unwrap());
    }

    #[tokio::test]
    async fn test_deactivated_quota_allows_new_one() {
        let repo = InMemoryQuotaRepository::new();
        repo.create(&quota("t-1")).await.unwrap();
        repo.update(
            "t-1",
            &QuotaPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut replacement = quota("t-1");
        replacement.plan = PlanName::Pro;
        assert!(repo.create(&replacement).await.unwrap());

        let found = repo.find_by_tenant("t-1").await.unwrap().unwrap();
        assert_eq!(found.plan, PlanName::Pro);
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn test_inactive_quota_is_still_returned() {
        let repo = InMemoryQuotaRepository::new();
        repo.create(&quota("t-1")).await.unwrap();
        repo.update(
            "t-1",
            &QuotaPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let found = repo.find_by_tenant("t-1").await.unwrap().unwrap();
        assert!(!found.is_active);
    }

    #[tokio::test]
    async fn test_update_missing_tenant() {
        let repo = InMemoryQuotaRepository::new();
        let patch = QuotaPatch {
            max_users: Some(5),
            ..Default::default()
        };
        assert!(repo.update("missing", &patch).await.unwrap().is_none());
    }
}
