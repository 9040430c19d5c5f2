pub mod cached_quota_repository;
pub mod cached_usage_repository;
pub mod quota_in_memory;
pub mod quota_postgres;
pub mod usage_in_memory;
pub mod usage_log_in_memory;
pub mod usage_log_postgres;
pub mod usage_postgres;

pub use cached_quota_repository::CachedQuotaRepository;
pub use cached_usage_repository::CachedUsageRepository;
pub use quota_in_memory::InMemoryQuotaRepository;
pub use quota_postgres::QuotaPostgresRepository;
pub use usage_in_memory::InMemoryUsageRepository;
pub use usage_log_in_memory::InMemoryUsageLogRepository;
pub use usage_log_postgres::UsageLogPostgresRepository;
pub use usage_postgres::UsagePostgresRepository;
