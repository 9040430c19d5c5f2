use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::entity::Usage;
use crate::domain::repository::UsageRepository;
use crate::domain::service::ResetWindow;

#[derive(Debug, Clone, PartialEq)]
pub struct ResetOutcome {
    pub usage: Usage,
    pub daily_reset: bool,
    pub monthly_reset: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub scanned: u64,
    pub daily_resets: u64,
    pub monthly_resets: u64,
    pub failures: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ResetUsageWindowsError {
    #[error("usage not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// ResetUsageWindowsUseCase は日次・月次のリセット状態機械を実行する。
///
/// 判定は保存済みの最終リセット時刻と現在の窓の開始時刻の比較で行い、
/// 実際のリセットはストア側の条件付き更新に委ねるため、同一窓内で何度呼んでも
/// 2回目以降は何もしない。
pub struct ResetUsageWindowsUseCase {
    usage_repo: Arc<dyn UsageRepository>,
}

impl ResetUsageWindowsUseCase {
    pub fn new(usage_repo: Arc<dyn UsageRepository>) -> Self {
        Self { usage_repo }
    }

    /// 読み取り済みの Usage に対してリセット判定を行う。
    /// リセット対象の窓があった場合はストアから読み直した値を返す。
    pub async fn apply(
        &self,
        usage: Usage,
        now: DateTime<Utc>,
    ) -> Result<ResetOutcome, ResetUsageWindowsError> {
        let daily_due = ResetWindow::Daily.is_due(usage.last_daily_reset_at, now);
        let monthly_due = ResetWindow::Monthly.is_due(usage.last_monthly_reset_at, now);

        if !daily_due && !monthly_due {
            return Ok(ResetOutcome {
                usage,
                daily_reset: false,
                monthly_reset: false,
            });
        }

        let tenant_id = usage.tenant_id.clone();
        let mut daily_reset = false;
        let mut monthly_reset = false;

        if daily_due {
            daily_reset = self
                .usage_repo
                .reset_daily(&tenant_id, ResetWindow::Daily.start_of(now), now)
                .await
                .map_err(|e| ResetUsageWindowsError::Internal(e.to_string()))?;
            if daily_reset {
                info!(tenant_id = %tenant_id, window = ResetWindow::Daily.as_str(), "api call counter reset");
            }
        }

        if monthly_due {
            monthly_reset = self
                .usage_repo
                .reset_monthly(&tenant_id, ResetWindow::Monthly.start_of(now), now)
                .await
                .map_err(|e| ResetUsageWindowsError::Internal(e.to_string()))?;
            if monthly_reset {
                info!(tenant_id = %tenant_id, window = ResetWindow::Monthly.as_str(), "bandwidth counter reset");
            }
        }

        // 他のリクエストが先にリセットした場合もあるため、判定が真なら常に読み直す
        let usage = self
            .usage_repo
            .find_by_tenant(&tenant_id)
            .await
            .map_err(|e| ResetUsageWindowsError::Internal(e.to_string()))?
            .ok_or_else(|| ResetUsageWindowsError::NotFound(tenant_id.clone()))?;

        Ok(ResetOutcome {
            usage,
            daily_reset,
            monthly_reset,
        })
    }

    pub async fn execute_at(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetOutcome, ResetUsageWindowsError> {
        let usage = self
            .usage_repo
            .find_by_tenant(tenant_id)
            .await
            .map_err(|e| ResetUsageWindowsError::Internal(e.to_string()))?
            .ok_or_else(|| ResetUsageWindowsError::NotFound(tenant_id.to_string()))?;
        self.apply(usage, now).await
    }

    /// 全テナントをページングで走査してリセット判定を行う。
    /// 個々のテナントの失敗はログに残して続行する。
    pub async fn sweep_at(
        &self,
        now: DateTime<Utc>,
        page_size: u32,
    ) -> Result<SweepSummary, ResetUsageWindowsError> {
        let page_size = page_size.max(1);
        let mut offset = 0u64;
        let mut summary = SweepSummary::default();

        loop {
            let tenant_ids = self
                .usage_repo
                .list_tenant_ids(offset, page_size)
                .await
                .map_err(|e| ResetUsageWindowsError::Internal(e.to_string()))?;
            let fetched = tenant_ids.len();

            for tenant_id in &tenant_ids {
                summary.scanned += 1;
                match self.execute_at(tenant_id, now).await {
                    Ok(outcome) => {
                        summary.daily_resets += outcome.daily_reset as u64;
                        summary.monthly_resets += outcome.monthly_reset as u64;
                    }
                    Err(e) => {
                        summary.failures += 1;
                        tracing::warn!(tenant_id = %tenant_id, error = %e, "failed to reset usage windows");
                    }
                }
            }

            if fetched < page_size as usize {
                break;
            }
            offset += fetched as u64;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::quota_repository::MockUsageRepository;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn usage_reset_at(daily: DateTime<Utc>, monthly: DateTime<Utc>) -> Usage {
        let mut usage = Usage::initial("tenant-1".to_string(), daily);
        usage.last_monthly_reset_at = monthly;
        usage.api_calls_today = 50;
        usage.bandwidth_month = 700;
        usage
    }

    #[tokio::test]
    async fn no_reset_inside_window_touches_nothing() {
        let mut mock = MockUsageRepository::new();
        mock.expect_reset_daily().never();
        mock.expect_reset_monthly().never();
        mock.expect_find_by_tenant().never();

        let uc = ResetUsageWindowsUseCase::new(Arc::new(mock));
        let usage = usage_reset_at(at(2024, 3, 15, 1), at(2024, 3, 1, 0));
        let outcome = uc.apply(usage.clone(), at(2024, 3, 15, 22)).await.unwrap();

        assert!(!outcome.daily_reset);
        assert!(!outcome.monthly_reset);
        assert_eq!(outcome.usage, usage);
    }

    #[tokio::test]
    async fn daily_boundary_triggers_daily_reset_only() {
        let mut mock = MockUsageRepository::new();
        mock.expect_reset_daily()
            .withf(|tenant, day_start, _| {
                tenant == "tenant-1" && *day_start == Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap()
            })
            .once()
            .returning(|_, _, _| Ok(true));
        mock.expect_reset_monthly().never();
        mock.expect_find_by_tenant().once().returning(|_| {
            let mut fresh = Usage::initial("tenant-1".to_string(), Utc::now());
            fresh.bandwidth_month = 700;
            Ok(Some(fresh))
        });

        let uc = ResetUsageWindowsUseCase::new(Arc::new(mock));
        let usage = usage_reset_at(at(2024, 3, 15, 1), at(2024, 3, 1, 0));
        let outcome = uc.apply(usage, at(2024, 3, 16, 0)).await.unwrap();

        assert!(outcome.daily_reset);
        assert!(!outcome.monthly_reset);
        assert_eq!(outcome.usage.api_calls_today, 0);
        assert_eq!(outcome.usage.bandwidth_month, 700);
    }

    #[tokio::test]
    async fn month_boundary_fires_both_windows() {
        let mut mock = MockUsageRepository::new();
        mock.expect_reset_daily().once().returning(|_, _, _| Ok(true));
        mock.expect_reset_monthly().once().returning(|_, _, _| Ok(true));
        mock.expect_find_by_tenant()
            .once()
            .returning(|_| Ok(Some(Usage::initial("tenant-1".to_string(), Utc::now()))));

        let uc = ResetUsageWindowsUseCase::new(Arc::new(mock));
        let usage = usage_reset_at(at(2024, 3, 31, 12), at(2024, 3, 1, 0));
        let outcome = uc.apply(usage, at(2024, 4, 1, 9)).await.unwrap();

        assert!(outcome.daily_reset);
        assert!(outcome.monthly_reset);
    }

    #[tokio::test]
    async fn lost_race_still_rereads() {
        let mut mock = MockUsageRepository::new();
        mock.expect_reset_daily().once().returning(|_, _, _| Ok(false));
        mock.expect_find_by_tenant()
            .once()
            .returning(|_| Ok(Some(Usage::initial("tenant-1".to_string(), Utc::now()))));

        let uc = ResetUsageWindowsUseCase::new(Arc::new(mock));
        let usage = usage_reset_at(at(2024, 3, 15, 1), at(2024, 3, 1, 0));
        let outcome = uc.apply(usage, at(2024, 3, 16, 3)).await.unwrap();

        assert!(!outcome.daily_reset);
        assert_eq!(outcome.usage.api_calls_today, 0);
    }

    #[tokio::test]
    async fn internal_error() {
        let mut mock = MockUsageRepository::new();
        mock.expect_reset_daily()
            .returning(|_, _, _| Err(anyhow::anyhow!("db error")));

        let uc = ResetUsageWindowsUseCase::new(Arc::new(mock));
        let usage = usage_reset_at(at(2024, 3, 15, 1), at(2024, 3, 1, 0));
        match uc.apply(usage, at(2024, 3, 16, 3)).await.unwrap_err() {
            ResetUsageWindowsError::Internal(msg) => assert!(msg.contains("db error")),
            e => unreachable!("unexpected error: {:?}", e),
        }
    }

    #[tokio::test]
    async fn sweep_pages_and_counts_failures() {
        let mut mock = MockUsageRepository::new();
        mock.expect_list_tenant_ids()
            .withf(|offset, _| *offset == 0)
            .returning(|_, _| Ok(vec!["t-1".to_string(), "t-2".to_string()]));
        mock.expect_list_tenant_ids()
            .withf(|offset, _| *offset == 2)
            .returning(|_, _| Ok(vec!["t-3".to_string()]));
        mock.expect_find_by_tenant()
            .withf(|id| id == "t-2")
            .returning(|_| Err(anyhow::anyhow!("db error")));
        mock.expect_find_by_tenant().withf(|id| id != "t-2").returning(|id| {
            Ok(Some(Usage::initial(
                id.to_string(),
                Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(),
            )))
        });

        let uc = ResetUsageWindowsUseCase::new(Arc::new(mock));
        let summary = uc.sweep_at(at(2024, 3, 15, 12), 2).await.unwrap();

        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.daily_resets, 0);
    }
}
