//! テスト用のアプリケーション状態ヘルパー。
//! 統合テスト（tests/integration_test.rs, tests/quota_engine_test.rs）から利用する。

use std::sync::Arc;

use crate::adapter::handler::AppState;
use crate::adapter::repository::{
    CachedQuotaRepository, CachedUsageRepository, InMemoryQuotaRepository,
    InMemoryUsageLogRepository, InMemoryUsageRepository,
};
use crate::domain::repository::{QuotaRepository, UsageLogRepository, UsageRepository};
use crate::infrastructure::cache::MokaCacheStore;
use crate::infrastructure::tenant_cache::TenantCache;
use crate::usecase::get_usage_logs::MAX_LOG_LIMIT;

/// TestRepositories はテストから直接操作できるよう、状態の裏にあるリポジトリを保持する。
pub struct TestRepositories {
    pub quota_repo: Arc<dyn QuotaRepository>,
    pub usage_repo: Arc<dyn UsageRepository>,
    pub log_repo: Arc<dyn UsageLogRepository>,
}

/// インメモリリポジトリを Moka キャッシュ付きデコレーターで包んだ構成を返す。
/// 本番と同じくキャッシュ経由で読み書きする。
pub fn make_test_repositories() -> TestRepositories {
    let cache = TenantCache::with_default_ttls(Arc::new(MokaCacheStore::new(1_000)));
    TestRepositories {
        quota_repo: Arc::new(CachedQuotaRepository::new(
            Arc::new(InMemoryQuotaRepository::new()),
            cache.clone(),
        )),
        usage_repo: Arc::new(CachedUsageRepository::new(
            Arc::new(InMemoryUsageRepository::new()),
            cache,
        )),
        log_repo: Arc::new(InMemoryUsageLogRepository::new()),
    }
}

pub fn make_test_app_state_with(repos: &TestRepositories) -> AppState {
    AppState::new(
        repos.quota_repo.clone(),
        repos.usage_repo.clone(),
        repos.log_repo.clone(),
        MAX_LOG_LIMIT,
    )
}

pub fn make_test_app_state() -> AppState {
    make_test_app_state_with(&make_test_repositories())
}
