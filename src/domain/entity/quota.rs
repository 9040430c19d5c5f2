use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::PlanName;
use super::resource::ResourceType;

/// QuotaLimits はテナントに割り当てられる6つの上限値。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub max_storage_bytes: u64,
    pub max_documents: u64,
    pub max_users: u64,
    pub max_api_calls_per_day: u64,
    pub max_file_size_bytes: u64,
    pub max_bandwidth_bytes_per_month: u64,
}

impl QuotaLimits {
    /// リソース種別に対応する上限値を返す。
    pub fn max_for(&self, resource: ResourceType) -> u64 {
        match resource {
            ResourceType::Storage => self.max_storage_bytes,
            ResourceType::Documents => self.max_documents,
            ResourceType::Users => self.max_users,
            ResourceType::ApiCalls => self.max_api_calls_per_day,
            ResourceType::Bandwidth => self.max_bandwidth_bytes_per_month,
            ResourceType::FileSize => self.max_file_size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub id: uuid::Uuid,
    pub tenant_id: String,
    pub plan: PlanName,
    #[serde(flatten)]
    pub limits: QuotaLimits,
    pub features: Option<Vec<String>>,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quota {
    pub fn new(
        tenant_id: String,
        plan: PlanName,
        limits: QuotaLimits,
        features: Option<Vec<String>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            tenant_id,
            plan,
            limits,
            features,
            is_active: true,
            valid_from: now,
            valid_until,
            created_at: now,
            updated_at: now,
        }
    }

    /// パッチの指定フィールドだけを上書きする。未指定フィールドは変更しない。
    pub fn apply(&mut self, patch: &QuotaPatch) {
        if let Some(plan) = patch.plan {
            self.plan = plan;
        }
        if let Some(v) = patch.max_storage_bytes {
            self.limits.max_storage_bytes = v;
        }
        if let Some(v) = patch.max_documents {
            self.limits.max_documents = v;
        }
        if let Some(v) = patch.max_users {
            self.limits.max_users = v;
        }
        if let Some(v) = patch.max_api_calls_per_day {
            self.limits.max_api_calls_per_day = v;
        }
        if let Some(v) = patch.max_file_size_bytes {
            self.limits.max_file_size_bytes = v;
        }
        if let Some(v) = patch.max_bandwidth_bytes_per_month {
            self.limits.max_bandwidth_bytes_per_month = v;
        }
        if let Some(ref features) = patch.features {
            self.features = Some(features.clone());
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(until) = patch.valid_until {
            self.valid_until = Some(until);
        }
    }
}

/// QuotaPatch は部分更新用の値オブジェクト。None のフィールドは変更しない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaPatch {
    pub plan: Option<PlanName>,
    pub max_storage_bytes: Option<u64>,
    pub max_documents: Option<u64>,
    pub max_users: Option<u64>,
    pub max_api_calls_per_day: Option<u64>,
    pub max_file_size_bytes: Option<u64>,
    pub max_bandwidth_bytes_per_month: Option<u64>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl QuotaPatch {
    pub fn is_empty(&self) -> bool {
        *self == QuotaPatch::default()
    }
}
