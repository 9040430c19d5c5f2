use serde::{Deserialize, Serialize};

use super::quota::QuotaLimits;

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

/// PlanName はサブスクリプションプランの閉じた列挙。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanName {
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl PlanName {
    pub fn as_str(&self) -> &str {
        match self {
            PlanName::Free => "free",
            PlanName::Basic => "basic",
            PlanName::Pro => "pro",
            PlanName::Enterprise => "enterprise",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(PlanName::Free),
            "basic" => Some(PlanName::Basic),
            "pro" => Some(PlanName::Pro),
            "enterprise" => Some(PlanName::Enterprise),
            _ => None,
        }
    }
}

/// QuotaPlan はクォータ作成時のテンプレートとなる静的なプラン定義。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaPlan {
    pub name: PlanName,
    pub display_name: String,
    #[serde(flatten)]
    pub limits: QuotaLimits,
    pub features: Vec<String>,
    pub monthly_price_cents: u64,
}

/// プランカタログ全体を返す。
pub fn plan_catalog() -> Vec<QuotaPlan> {
    [
        PlanName::Free,
        PlanName::Basic,
        PlanName::Pro,
        PlanName::Enterprise,
    ]
    .into_iter()
    .map(find_plan)
    .collect()
}

/// プラン名に対応するカタログエントリを返す。
pub fn find_plan(name: PlanName) -> QuotaPlan {
    match name {
        PlanName::Free => QuotaPlan {
            name,
            display_name: "Free".to_string(),
            limits: QuotaLimits {
                max_storage_bytes: GIB,
                max_documents: 100,
                max_users: 3,
                max_api_calls_per_day: 1_000,
                max_file_size_bytes: 10 * MIB,
                max_bandwidth_bytes_per_month: 5 * GIB,
            },
            features: features(&["basic_search"]),
            monthly_price_cents: 0,
        },
        PlanName::Basic => QuotaPlan {
            name,
            display_name: "Basic".to_string(),
            limits: QuotaLimits {
                max_storage_bytes: 10 * GIB,
                max_documents: 1_000,
                max_users: 10,
                max_api_calls_per_day: 10_000,
                max_file_size_bytes: 50 * MIB,
                max_bandwidth_bytes_per_month: 50 * GIB,
            },
            features: features(&["basic_search", "sharing", "versioning"]),
            monthly_price_cents: 900,
        },
        PlanName::Pro => QuotaPlan {
            name,
            display_name: "Pro".to_string(),
            limits: QuotaLimits {
                max_storage_bytes: 100 * GIB,
                max_documents: 10_000,
                max_users: 50,
                max_api_calls_per_day: 100_000,
                max_file_size_bytes: 500 * MIB,
                max_bandwidth_bytes_per_month: 500 * GIB,
            },
            features: features(&[
                "basic_search",
                "full_text_search",
                "sharing",
                "versioning",
                "audit_log",
            ]),
            monthly_price_cents: 2_900,
        },
        PlanName::Enterprise => QuotaPlan {
            name,
            display_name: "Enterprise".to_string(),
            limits: QuotaLimits {
                max_storage_bytes: 1024 * GIB,
                max_documents: 1_000_000,
                max_users: 1_000,
                max_api_calls_per_day: 1_000_000,
                max_file_size_bytes: 5 * GIB,
                max_bandwidth_bytes_per_month: 10 * 1024 * GIB,
            },
            features: features(&[
                "basic_search",
                "full_text_search",
                "sharing",
                "versioning",
                "audit_log",
                "encryption",
                "sso",
            ]),
            monthly_price_cents: 9_900,
        },
    }
}

fn features(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
