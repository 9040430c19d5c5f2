use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use k1s0_tenant_quota_server::adapter::handler::{self, AppState};
use k1s0_tenant_quota_server::adapter::repository::{
    CachedQuotaRepository, CachedUsageRepository, InMemoryQuotaRepository,
    InMemoryUsageLogRepository, InMemoryUsageRepository, QuotaPostgresRepository,
    UsageLogPostgresRepository, UsagePostgresRepository,
};
use k1s0_tenant_quota_server::domain::repository::{
    QuotaRepository, UsageLogRepository, UsageRepository,
};
use k1s0_tenant_quota_server::infrastructure::cache::{CacheStore, MokaCacheStore, NoopCacheStore};
use k1s0_tenant_quota_server::infrastructure::config::{CacheBackend, Config};
use k1s0_tenant_quota_server::infrastructure::database;
use k1s0_tenant_quota_server::infrastructure::redis_store::RedisCacheStore;
use k1s0_tenant_quota_server::infrastructure::reset_scheduler::ResetScheduler;
use k1s0_tenant_quota_server::infrastructure::tenant_cache::TenantCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting tenant quota server"
    );

    // Repositories
    let (quota_repo, usage_repo, log_repo): (
        Arc<dyn QuotaRepository>,
        Arc<dyn UsageRepository>,
        Arc<dyn UsageLogRepository>,
    ) = if let Some(ref db_cfg) = cfg.database {
        info!("connecting to database");
        let pool = database::create_pool(db_cfg).await?;
        if db_cfg.run_migrations {
            database::run_migrations(&pool).await?;
            info!("database migrations applied");
        }
        let pool = Arc::new(pool);
        info!("database connection pool established");
        (
            Arc::new(QuotaPostgresRepository::new(pool.clone())),
            Arc::new(UsagePostgresRepository::new(pool.clone())),
            Arc::new(UsageLogPostgresRepository::new(pool)),
        )
    } else {
        tracing::warn!("no database configured, using in-memory repositories");
        (
            Arc::new(InMemoryQuotaRepository::new()),
            Arc::new(InMemoryUsageRepository::new()),
            Arc::new(InMemoryUsageLogRepository::new()),
        )
    };

    // Cache
    let cache_store = build_cache_store(&cfg).await;
    let tenant_cache = TenantCache::new(
        cache_store,
        Duration::from_secs(cfg.cache.quota_ttl_secs),
        Duration::from_secs(cfg.cache.usage_ttl_secs),
    );
    let quota_repo: Arc<dyn QuotaRepository> =
        Arc::new(CachedQuotaRepository::new(quota_repo, tenant_cache.clone()));
    let usage_repo: Arc<dyn UsageRepository> =
        Arc::new(CachedUsageRepository::new(usage_repo, tenant_cache));

    // Use cases
    let state = AppState::new(
        quota_repo,
        usage_repo,
        log_repo,
        cfg.quota.log_max_page_size,
    );

    // Reset scheduler
    if cfg.quota.reset_schedule.enabled {
        let scheduler = ResetScheduler::new(
            &cfg.quota.reset_schedule,
            state.reset_usage_windows_uc.clone(),
        );
        tokio::spawn(scheduler.run());
        info!("usage reset scheduler started");
    } else {
        info!("usage reset scheduler disabled, windows reset on access only");
    }

    // Router
    let app = handler::router(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            cfg.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // REST server
    let host: std::net::IpAddr = cfg.server.host.parse()?;
    let rest_addr = SocketAddr::new(host, cfg.server.port);
    info!("REST server starting on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// 設定に従ってキャッシュストアを選ぶ。Redis に接続できない場合はプロセス内キャッシュで続行する。
async fn build_cache_store(cfg: &Config) -> Arc<dyn CacheStore> {
    match cfg.cache.backend {
        CacheBackend::None => {
            info!("read cache disabled");
            Arc::new(NoopCacheStore)
        }
        CacheBackend::Memory => {
            info!(max_capacity = cfg.cache.max_capacity, "using in-process read cache");
            Arc::new(MokaCacheStore::new(cfg.cache.max_capacity))
        }
        CacheBackend::Redis => {
            let Some(ref redis_cfg) = cfg.redis else {
                tracing::warn!("cache backend is redis but no redis configured, falling back to in-process cache");
                return Arc::new(MokaCacheStore::new(cfg.cache.max_capacity));
            };
            match connect_redis(&redis_cfg.url, redis_cfg.connect_timeout_seconds).await {
                Ok(conn) => {
                    info!("redis cache connected");
                    Arc::new(RedisCacheStore::new(conn, redis_cfg.key_prefix.clone()))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to connect to redis, falling back to in-process cache");
                    Arc::new(MokaCacheStore::new(cfg.cache.max_capacity))
                }
            }
        }
    }
}

async fn connect_redis(
    url: &str,
    timeout_secs: u64,
) -> anyhow::Result<redis::aio::ConnectionManager> {
    let client = redis::Client::open(url)?;
    let conn = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        redis::aio::ConnectionManager::new(client),
    )
    .await??;
    Ok(conn)
}
