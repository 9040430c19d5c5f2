use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quota::{Quota, QuotaLimits};
use super::resource::{ResourceType, UsageCounter};

/// Usage はテナントごとの現在の消費量カウンター。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub tenant_id: String,
    pub storage_used: u64,
    pub document_count: u64,
    pub user_count: u64,
    pub api_calls_today: u64,
    pub bandwidth_month: u64,
    pub last_api_call_at: Option<DateTime<Utc>>,
    pub last_daily_reset_at: DateTime<Utc>,
    pub last_monthly_reset_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Usage {
    /// 初期状態の Usage。作成者自身を数えるため user_count は 1 から始まる。
    pub fn initial(tenant_id: String, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            storage_used: 0,
            document_count: 0,
            user_count: 1,
            api_calls_today: 0,
            bandwidth_month: 0,
            last_api_call_at: None,
            last_daily_reset_at: now,
            last_monthly_reset_at: now,
            updated_at: now,
        }
    }

    pub fn counter(&self, counter: UsageCounter) -> u64 {
        match counter {
            UsageCounter::StorageUsed => self.storage_used,
            UsageCounter::DocumentCount => self.document_count,
            UsageCounter::UserCount => self.user_count,
            UsageCounter::ApiCallsToday => self.api_calls_today,
            UsageCounter::BandwidthMonth => self.bandwidth_month,
        }
    }

    pub fn counter_mut(&mut self, counter: UsageCounter) -> &mut u64 {
        match counter {
            UsageCounter::StorageUsed => &mut self.storage_used,
            UsageCounter::DocumentCount => &mut self.document_count,
            UsageCounter::UserCount => &mut self.user_count,
            UsageCounter::ApiCallsToday => &mut self.api_calls_today,
            UsageCounter::BandwidthMonth => &mut self.bandwidth_month,
        }
    }
}

/// CheckQuotaResult は非破壊のアドミッション判定結果。
/// allowed == false はエラーではなく通常の応答である。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckQuotaResult {
    pub resource: ResourceType,
    pub allowed: bool,
    pub current_usage: u64,
    pub max_allowed: u64,
    pub remaining: u64,
    pub message: Option<String>,
}

impl CheckQuotaResult {
    /// 累積リソースの判定: current + amount <= max。
    pub fn cumulative(resource: ResourceType, current_usage: u64, max_allowed: u64, amount: u64) -> Self {
        let allowed = current_usage
            .checked_add(amount)
            .map(|total| total <= max_allowed)
            .unwrap_or(false);
        let remaining = max_allowed.saturating_sub(current_usage);
        let message = if allowed {
            None
        } else {
            Some(format!(
                "{} quota exceeded: requested {}, used {} of {} ({} remaining)",
                resource, amount, current_usage, max_allowed, remaining
            ))
        };
        Self {
            resource,
            allowed,
            current_usage,
            max_allowed,
            remaining,
            message,
        }
    }

    /// file_size の判定: 累積ではなく単一ファイルの上限との比較のみ。
    pub fn file_size(max_file_size: u64, amount: u64) -> Self {
        let allowed = amount <= max_file_size;
        let message = if allowed {
            None
        } else {
            Some(format!(
                "file size {} bytes exceeds the maximum of {} bytes",
                amount, max_file_size
            ))
        };
        Self {
            resource: ResourceType::FileSize,
            allowed,
            current_usage: 0,
            max_allowed: max_file_size,
            remaining: max_file_size,
            message,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsagePercentages {
    pub storage: f64,
    pub documents: f64,
    pub users: f64,
    pub api_calls: f64,
    pub bandwidth: f64,
}

/// QuotaUsageOverview はクォータと使用量、使用率、超過フラグをまとめたビュー。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaUsageOverview {
    pub quota: Quota,
    pub usage: Usage,
    pub percentages: UsagePercentages,
    pub is_storage_exceeded: bool,
    pub is_limit_reached: bool,
}

impl QuotaUsageOverview {
    pub fn new(quota: Quota, usage: Usage) -> Self {
        let l: &QuotaLimits = &quota.limits;
        let percentages = UsagePercentages {
            storage: percent(usage.storage_used, l.max_storage_bytes),
            documents: percent(usage.document_count, l.max_documents),
            users: percent(usage.user_count, l.max_users),
            api_calls: percent(usage.api_calls_today, l.max_api_calls_per_day),
            bandwidth: percent(usage.bandwidth_month, l.max_bandwidth_bytes_per_month),
        };
        let is_storage_exceeded = usage.storage_used >= l.max_storage_bytes;
        let is_limit_reached = usage.document_count >= l.max_documents
            || usage.user_count >= l.max_users
            || usage.api_calls_today >= l.max_api_calls_per_day
            || usage.bandwidth_month >= l.max_bandwidth_bytes_per_month;
        Self {
            quota,
            usage,
            percentages,
            is_storage_exceeded,
            is_limit_reached,
        }
    }
}

/// max が 0 の場合はゼロ除算を避けて 0 とする。
fn percent(used: u64, max: u64) -> f64 {
    if max == 0 {
        0.0
    } else {
        (used as f64 / max as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::plan::PlanName;

    fn sample_quota() -> Quota {
        Quota::new(
            "tenant-1".to_string(),
            PlanName::Basic,
            QuotaLimits {
                max_storage_bytes: 1_000,
                max_documents: 100,
                max_users: 10,
                max_api_calls_per_day: 200,
                max_file_size_bytes: 50,
                max_bandwidth_bytes_per_month: 4_000,
            },
            None,
            None,
        )
    }

    #[test]
    fn test_usage_initial() {
        let now = Utc::now();
        let usage = Usage::initial("tenant-1".to_string(), now);
        assert_eq!(usage.storage_used, 0);
        assert_eq!(usage.user_count, 1);
        assert_eq!(usage.last_daily_reset_at, now);
        assert_eq!(usage.last_monthly_reset_at, now);
        assert!(usage.last_api_call_at.is_none());
    }

    #[test]
    fn test_counter_accessors() {
        let mut usage = Usage::initial("t".to_string(), Utc::now());
        *usage.counter_mut(UsageCounter::BandwidthMonth) += 42;
        assert_eq!(usage.counter(UsageCounter::BandwidthMonth), 42);
        assert_eq!(usage.bandwidth_month, 42);
    }

    #[test]
    fn test_cumulative_allowed_at_exact_limit() {
        let r = CheckQuotaResult::cumulative(ResourceType::Documents, 99, 100, 1);
        assert!(r.allowed);
        assert_eq!(r.remaining, 1);
        assert!(r.message.is_none());
    }

    #[test]
    fn test_cumulative_denied_when_full() {
        let r = CheckQuotaResult::cumulative(ResourceType::Documents, 100, 100, 1);
        assert!(!r.allowed);
        assert_eq!(r.remaining, 0);
        assert!(r.message.unwrap().contains("documents"));
    }

    #[test]
    fn test_cumulative_over_limit_remaining_saturates() {
        let r = CheckQuotaResult::cumulative(ResourceType::Storage, 150, 100, 0);
        assert!(!r.allowed);
        assert_eq!(r.remaining, 0);
    }

    #[test]
    fn test_cumulative_overflow_is_denied() {
        let r = CheckQuotaResult::cumulative(ResourceType::Storage, 10, u64::MAX, u64::MAX);
        assert!(!r.allowed);
    }

    #[test]
    fn test_file_size_check() {
        assert!(CheckQuotaResult::file_size(50, 50).allowed);
        let denied = CheckQuotaResult::file_size(50, 51);
        assert!(!denied.allowed);
        assert_eq!(denied.current_usage, 0);
        assert_eq!(denied.max_allowed, 50);
    }

    #[test]
    fn test_overview_percentages_and_flags() {
        let mut usage = Usage::initial("tenant-1".to_string(), Utc::now());
        usage.storage_used = 500;
        usage.document_count = 25;
        usage.api_calls_today = 200;

        let overview = QuotaUsageOverview::new(sample_quota(), usage);
        assert!((overview.percentages.storage - 50.0).abs() < f64::EPSILON);
        assert!((overview.percentages.documents - 25.0).abs() < f64::EPSILON);
        assert!((overview.percentages.users - 10.0).abs() < f64::EPSILON);
        assert!((overview.percentages.api_calls - 100.0).abs() < f64::EPSILON);
        assert!(!overview.is_storage_exceeded);
        assert!(overview.is_limit_reached);
    }

    #[test]
    fn test_overview_storage_exceeded_does_not_set_limit_reached() {
        let mut usage = Usage::initial("tenant-1".to_string(), Utc::now());
        usage.storage_used = 1_000;
        let overview = QuotaUsageOverview::new(sample_quota(), usage);
        assert!(overview.is_storage_exceeded);
        assert!(!overview.is_limit_reached);
    }

    #[test]
    fn test_percent_zero_max() {
        assert_eq!(percent(10, 0), 0.0);
    }
}
