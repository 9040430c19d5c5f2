pub mod quota_repository;

pub use quota_repository::ConsumeOutcome;
pub use quota_repository::QuotaRepository;
pub use quota_repository::UsageLogRepository;
pub use quota_repository::UsageRepository;
