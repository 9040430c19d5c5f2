use serde::{Deserialize, Serialize};

/// ResourceType はクォータで管理される6種類のリソースを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Storage,
    Documents,
    Users,
    ApiCalls,
    Bandwidth,
    FileSize,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Storage,
        ResourceType::Documents,
        ResourceType::Users,
        ResourceType::ApiCalls,
        ResourceType::Bandwidth,
        ResourceType::FileSize,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Storage => "storage",
            ResourceType::Documents => "documents",
            ResourceType::Users => "users",
            ResourceType::ApiCalls => "api_calls",
            ResourceType::Bandwidth => "bandwidth",
            ResourceType::FileSize => "file_size",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "storage" => Some(ResourceType::Storage),
            "documents" => Some(ResourceType::Documents),
            "users" => Some(ResourceType::Users),
            "api_calls" => Some(ResourceType::ApiCalls),
            "bandwidth" => Some(ResourceType::Bandwidth),
            "file_size" => Some(ResourceType::FileSize),
            _ => None,
        }
    }

    /// 累積カウンターを持つリソースの場合、対応するカウンターを返す。
    /// file_size は単一ファイルの上限なのでカウンターを持たない。
    pub fn counter(&self) -> Option<UsageCounter> {
        match self {
            ResourceType::Storage => Some(UsageCounter::StorageUsed),
            ResourceType::Documents => Some(UsageCounter::DocumentCount),
            ResourceType::Users => Some(UsageCounter::UserCount),
            ResourceType::ApiCalls => Some(UsageCounter::ApiCallsToday),
            ResourceType::Bandwidth => Some(UsageCounter::BandwidthMonth),
            ResourceType::FileSize => None,
        }
    }

    /// increment_usage で加算できるリソース。
    /// users はRBAC側のコラボレーターが管理するため対象外。
    pub fn incrementable_counter(&self) -> Option<UsageCounter> {
        match self {
            ResourceType::Storage
            | ResourceType::Documents
            | ResourceType::ApiCalls
            | ResourceType::Bandwidth => self.counter(),
            ResourceType::Users | ResourceType::FileSize => None,
        }
    }

    /// decrement_usage で減算できるリソース。
    pub fn decrementable_counter(&self) -> Option<UsageCounter> {
        match self {
            ResourceType::Storage | ResourceType::Documents | ResourceType::Bandwidth => {
                self.counter()
            }
            ResourceType::Users | ResourceType::ApiCalls | ResourceType::FileSize => None,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UsageCounter は Usage レコード上の個々のカウンター列を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageCounter {
    StorageUsed,
    DocumentCount,
    UserCount,
    ApiCallsToday,
    BandwidthMonth,
}

impl UsageCounter {
    /// tenant_usage テーブルの列名。SQL に直接埋め込むため固定文字列のみを返す。
    pub fn column(&self) -> &'static str {
        match self {
            UsageCounter::StorageUsed => "storage_used",
            UsageCounter::DocumentCount => "document_count",
            UsageCounter::UserCount => "user_count",
            UsageCounter::ApiCallsToday => "api_calls_today",
            UsageCounter::BandwidthMonth => "bandwidth_month",
        }
    }

    /// 日次・月次でリセットされるカウンターかどうか。
    pub fn is_windowed(&self) -> bool {
        matches!(self, UsageCounter::ApiCallsToday | UsageCounter::BandwidthMonth)
    }
}
