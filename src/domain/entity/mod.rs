pub mod plan;
pub mod quota;
pub mod resource;
pub mod usage;
pub mod usage_log;

pub use plan::{PlanName, QuotaPlan};
pub use quota::{Quota, QuotaLimits, QuotaPatch};
pub use resource::{ResourceType, UsageCounter};
pub use usage::{CheckQuotaResult, QuotaUsageOverview, Usage, UsagePercentages};
pub use usage_log::{UsageAction, UsageLog, UsageLogQuery, UsageStatEntry, UsageStats};
