pub mod check_quota;
pub mod create_quota;
pub mod decrement_usage;
pub mod get_overview;
pub mod get_quota;
pub mod get_usage;
pub mod get_usage_logs;
pub mod get_usage_stats;
pub mod increment_usage;
pub mod list_plans;
pub mod reset_usage_windows;
pub mod try_consume;
pub mod update_quota;

pub use check_quota::CheckQuotaUseCase;
pub use create_quota::CreateQuotaUseCase;
pub use decrement_usage::DecrementUsageUseCase;
pub use get_overview::GetOverviewUseCase;
pub use get_quota::GetQuotaUseCase;
pub use get_usage::GetUsageUseCase;
pub use get_usage_logs::GetUsageLogsUseCase;
pub use get_usage_stats::GetUsageStatsUseCase;
pub use increment_usage::IncrementUsageUseCase;
pub use list_plans::ListPlansUseCase;
pub use reset_usage_windows::ResetUsageWindowsUseCase;
pub use try_consume::TryConsumeUseCase;
pub use update_quota::UpdateQuotaUseCase;
