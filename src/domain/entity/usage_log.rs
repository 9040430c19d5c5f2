use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::ResourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageAction {
    Increment,
    Decrement,
}

impl UsageAction {
    pub fn as_str(&self) -> &str {
        match self {
            UsageAction::Increment => "increment",
            UsageAction::Decrement => "decrement",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "increment" => Some(UsageAction::Increment),
            "decrement" => Some(UsageAction::Decrement),
            _ => None,
        }
    }
}

/// UsageLog は消費量変更の追記専用監査ログ。
/// amount は符号付きで、decrement の場合はクランプ前の要求量を負値で記録する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: uuid::Uuid,
    pub tenant_id: String,
    pub user_id: Option<String>,
    pub action: UsageAction,
    pub resource: ResourceType,
    pub amount: i64,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl UsageLog {
    pub fn increment(
        tenant_id: &str,
        resource: ResourceType,
        amount: u64,
        user_id: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self::new(
            tenant_id,
            UsageAction::Increment,
            resource,
            saturating_i64(amount),
            user_id,
            metadata,
        )
    }

    pub fn decrement(tenant_id: &str, resource: ResourceType, amount: u64, user_id: Option<String>) -> Self {
        Self::new(
            tenant_id,
            UsageAction::Decrement,
            resource,
            -saturating_i64(amount),
            user_id,
            None,
        )
    }

    fn new(
        tenant_id: &str,
        action: UsageAction,
        resource: ResourceType,
        amount: i64,
        user_id: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            user_id,
            action,
            resource,
            amount,
            metadata,
            created_at: Utc::now(),
        }
    }
}

fn saturating_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// UsageLogQuery は監査ログ検索条件。期間は [from, to) の半開区間。
#[derive(Debug, Clone, PartialEq)]
pub struct UsageLogQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub resource: Option<ResourceType>,
    pub action: Option<UsageAction>,
    pub limit: u32,
}

impl UsageLogQuery {
    pub fn matches(&self, log: &UsageLog) -> bool {
        log.created_at >= self.from
            && log.created_at < self.to
            && self.resource.map_or(true, |r| r == log.resource)
            && self.action.map_or(true, |a| a == log.action)
    }
}

/// リソース × アクションごとの集計値。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatEntry {
    pub resource: ResourceType,
    pub action: UsageAction,
    pub total_amount: i64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub tenant_id: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_entries: u64,
    pub net_by_resource: Vec<ResourceNet>,
    pub entries: Vec<UsageStatEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNet {
    pub resource: ResourceType,
    pub net_amount: i64,
}

impl UsageStats {
    /// 集計行からリソースごとの正味変化量を導出して UsageStats を組み立てる。
    pub fn from_entries(
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        mut entries: Vec<UsageStatEntry>,
    ) -> Self {
        entries.sort_by(|a, b| {
            (a.resource.as_str(), a.action.as_str()).cmp(&(b.resource.as_str(), b.action.as_str()))
        });
        let total_entries = entries.iter().map(|e| e.count).sum();
        let net_by_resource = ResourceType::ALL
            .iter()
            .filter(|r| entries.iter().any(|e| e.resource == **r))
            .map(|r| ResourceNet {
                resource: *r,
                net_amount: entries
                    .iter()
                    .filter(|e| e.resource == *r)
                    .map(|e| e.total_amount)
                    .fold(0i64, i64::saturating_add),
            })
            .collect();
        Self {
            tenant_id: tenant_id.to_string(),
            from,
            to,
            total_entries,
            net_by_resource,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_roundtrip() {
        assert_eq!(UsageAction::from_str("increment"), Some(UsageAction::Increment));
        assert_eq!(UsageAction::from_str("decrement"), Some(UsageAction::Decrement));
        assert_eq!(UsageAction::from_str("reset"), None);
        assert_eq!(UsageAction::Decrement.as_str(), "decrement");
    }

    #[test]
    fn test_decrement_log_is_negative() {
        let log = UsageLog::decrement("tenant-1", ResourceType::Storage, 500, None);
        assert_eq!(log.amount, -500);
        assert_eq!(log.action, UsageAction::Decrement);
    }

    #[test]
    fn test_increment_log_keeps_metadata() {
        let meta = serde_json::json!({"document_id": "doc-1"});
        let log = UsageLog::increment(
            "tenant-1",
            ResourceType::Documents,
            1,
            Some("user-1".to_string()),
            Some(meta.clone()),
        );
        assert_eq!(log.amount, 1);
        assert_eq!(log.metadata, Some(meta));
        assert_eq!(log.user_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_query_matches_filters() {
        let log = UsageLog::increment("tenant-1", ResourceType::Bandwidth, 10, None, None);
        let base = UsageLogQuery {
            from: log.created_at - chrono::Duration::hours(1),
            to: log.created_at + chrono::Duration::hours(1),
            resource: None,
            action: None,
            limit: 100,
        };
        assert!(base.matches(&log));

        let wrong_resource = UsageLogQuery {
            resource: Some(ResourceType::Storage),
            ..base.clone()
        };
        assert!(!wrong_resource.matches(&log));

        let wrong_action = UsageLogQuery {
            action: Some(UsageAction::Decrement),
            ..base.clone()
        };
        assert!(!wrong_action.matches(&log));

        let out_of_range = UsageLogQuery {
            to: log.created_at,
            ..base
        };
        assert!(!out_of_range.matches(&log));
    }

    #[test]
    fn test_stats_from_entries() {
        let now = Utc::now();
        let stats = UsageStats::from_entries(
            "tenant-1",
            now,
            now,
            vec![
                UsageStatEntry {
                    resource: ResourceType::Storage,
                    action: UsageAction::Increment,
                    total_amount: 400,
                    count: 2,
                },
                UsageStatEntry {
                    resource: ResourceType::Storage,
                    action: UsageAction::Decrement,
                    total_amount: -100,
                    count: 1,
                },
            ],
        );
        assert_eq!(stats.total_entries, 3);
        assert_eq!(
            stats.net_by_resource,
            vec![ResourceNet {
                resource: ResourceType::Storage,
                net_amount: 300
            }]
        );
        assert_eq!(stats.entries[0].action, UsageAction::Decrement);
    }
}
