pub mod error;
pub mod quota_handler;
pub mod usage_handler;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::domain::repository::{QuotaRepository, UsageLogRepository, UsageRepository};
use crate::usecase::{
    CheckQuotaUseCase, CreateQuotaUseCase, DecrementUsageUseCase, GetOverviewUseCase,
    GetQuotaUseCase, GetUsageLogsUseCase, GetUsageStatsUseCase, GetUsageUseCase,
    IncrementUsageUseCase, ListPlansUseCase, ResetUsageWindowsUseCase, TryConsumeUseCase,
    UpdateQuotaUseCase,
};

/// AppState はアプリケーション全体の共有状態を表す。
#[derive(Clone)]
pub struct AppState {
    pub create_quota_uc: Arc<CreateQuotaUseCase>,
    pub get_quota_uc: Arc<GetQuotaUseCase>,
    pub update_quota_uc: Arc<UpdateQuotaUseCase>,
    pub get_usage_uc: Arc<GetUsageUseCase>,
    pub get_overview_uc: Arc<GetOverviewUseCase>,
    pub check_quota_uc: Arc<CheckQuotaUseCase>,
    pub try_consume_uc: Arc<TryConsumeUseCase>,
    pub increment_usage_uc: Arc<IncrementUsageUseCase>,
    pub decrement_usage_uc: Arc<DecrementUsageUseCase>,
    pub get_usage_stats_uc: Arc<GetUsageStatsUseCase>,
    pub get_usage_logs_uc: Arc<GetUsageLogsUseCase>,
    pub list_plans_uc: Arc<ListPlansUseCase>,
    pub reset_usage_windows_uc: Arc<ResetUsageWindowsUseCase>,
}

impl AppState {
    /// リポジトリからユースケースを組み立てる。キャッシュを使う場合は
    /// キャッシュ付きリポジトリを渡す。
    pub fn new(
        quota_repo: Arc<dyn QuotaRepository>,
        usage_repo: Arc<dyn UsageRepository>,
        log_repo: Arc<dyn UsageLogRepository>,
        log_max_page_size: u32,
    ) -> Self {
        let reset_uc = Arc::new(ResetUsageWindowsUseCase::new(usage_repo.clone()));
        let get_quota_uc = Arc::new(GetQuotaUseCase::new(quota_repo.clone()));
        let get_usage_uc = Arc::new(GetUsageUseCase::new(usage_repo.clone(), reset_uc.clone()));

        Self {
            create_quota_uc: Arc::new(CreateQuotaUseCase::new(
                quota_repo.clone(),
                usage_repo.clone(),
            )),
            update_quota_uc: Arc::new(UpdateQuotaUseCase::new(quota_repo)),
            get_overview_uc: Arc::new(GetOverviewUseCase::new(
                get_quota_uc.clone(),
                get_usage_uc.clone(),
            )),
            check_quota_uc: Arc::new(CheckQuotaUseCase::new(
                get_quota_uc.clone(),
                get_usage_uc.clone(),
            )),
            try_consume_uc: Arc::new(TryConsumeUseCase::new(
                get_quota_uc.clone(),
                usage_repo.clone(),
                log_repo.clone(),
                reset_uc.clone(),
            )),
            increment_usage_uc: Arc::new(IncrementUsageUseCase::new(
                usage_repo.clone(),
                log_repo.clone(),
                reset_uc.clone(),
            )),
            decrement_usage_uc: Arc::new(DecrementUsageUseCase::new(
                usage_repo,
                log_repo.clone(),
                reset_uc.clone(),
            )),
            get_usage_stats_uc: Arc::new(GetUsageStatsUseCase::new(log_repo.clone())),
            get_usage_logs_uc: Arc::new(GetUsageLogsUseCase::with_max_limit(
                log_repo,
                log_max_page_size,
            )),
            list_plans_uc: Arc::new(ListPlansUseCase::new()),
            get_quota_uc,
            get_usage_uc,
            reset_usage_windows_uc: reset_uc,
        }
    }
}

/// REST API ルーターを構築する。
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health / Readiness
        .route("/healthz", get(quota_handler::healthz))
        .route("/readyz", get(quota_handler::readyz))
        // Plan catalog
        .route("/api/v1/plans", get(quota_handler::list_plans))
        // Quota endpoints
        .route(
            "/api/v1/tenants/:tenant_id/quota",
            post(quota_handler::create_quota)
                .get(quota_handler::get_quota)
                .patch(quota_handler::update_quota),
        )
        .route(
            "/api/v1/tenants/:tenant_id/quota/check",
            post(quota_handler::check_quota),
        )
        .route(
            "/api/v1/tenants/:tenant_id/quota/consume",
            post(quota_handler::try_consume),
        )
        .route(
            "/api/v1/tenants/:tenant_id/overview",
            get(quota_handler::get_overview),
        )
        // Usage endpoints
        .route(
            "/api/v1/tenants/:tenant_id/usage",
            get(usage_handler::get_usage),
        )
        .route(
            "/api/v1/tenants/:tenant_id/usage/increment",
            post(usage_handler::increment_usage),
        )
        .route(
            "/api/v1/tenants/:tenant_id/usage/decrement",
            post(usage_handler::decrement_usage),
        )
        .route(
            "/api/v1/tenants/:tenant_id/usage/stats",
            get(usage_handler::get_usage_stats),
        )
        .route(
            "/api/v1/tenants/:tenant_id/usage/logs",
            get(usage_handler::get_usage_logs),
        )
        .with_state(state)
}

/// ErrorResponse は統一エラーレスポンス。
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
                request_id: uuid::Uuid::new_v4().to_string(),
            },
        }
    }
}
