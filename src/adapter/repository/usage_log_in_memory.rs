use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entity::{UsageLog, UsageLogQuery, UsageStatEntry};
use crate::domain::repository::UsageLogRepository;

pub struct InMemoryUsageLogRepository {
    logs: RwLock<Vec<UsageLog>>,
}

impl InMemoryUsageLogRepository {
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryUsageLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageLogRepository for InMemoryUsageLogRepository {
    async fn append(&self, log: &UsageLog) -> anyhow::Result<()> {
        self.logs.write().await.push(log.clone());
        Ok(())
    }

    async fn find(&self, tenant_id: &str, query: &UsageLogQuery) -> anyhow::Result<Vec<UsageLog>> {
        let logs = self.logs.read().await;
        let mut matched: Vec<UsageLog> = logs
            .iter()
            .filter(|l| l.tenant_id == tenant_id && query.matches(l))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(query.limit as usize);
        Ok(matched)
    }

    async fn aggregate(
        &self,
        tenant_id: &str,
        query: &UsageLogQuery,
    ) -> anyhow::Result<Vec<UsageStatEntry>> {
        let logs = self.logs.read().await;
        let mut grouped: HashMap<_, UsageStatEntry> = HashMap::new();
        for log in logs.iter().filter(|l| l.tenant_id == tenant_id && query.matches(l)) {
            let entry = grouped
                .entry((log.resource, log.action))
                .or_insert_with(|| UsageStatEntry {
                    resource: log.resource,
                    action: log.action,
                    total_amount: 0,
                    count: 0,
                });
            entry.total_amount = entry.total_amount.saturating_add(log.amount);
            entry.count += 1;
        }
        Ok(grouped.into_values().collect())
    }
}
