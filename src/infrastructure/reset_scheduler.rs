use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use croner::Cron;
use tracing::info;

use super::config::ResetScheduleConfig;
use crate::usecase::ResetUsageWindowsUseCase;

const SWEEP_PAGE_SIZE: u32 = 100;

/// ResetScheduler は cron 式に従って全テナントのリセットスイープを実行する。
/// 読み取り時のリセットと同じ条件付き更新を使うため、重複実行しても安全。
pub struct ResetScheduler {
    schedules: Vec<(&'static str, Cron)>,
    reset_uc: Arc<ResetUsageWindowsUseCase>,
}

/// cron 式を解析する。不正な式はログに残してスキップする。
pub fn parse_schedules(daily: &str, monthly: &str) -> Vec<(&'static str, Cron)> {
    [("daily", daily), ("monthly", monthly)]
        .into_iter()
        .filter_map(|(label, expr)| match Cron::from_str(expr) {
            Ok(cron) => {
                info!(schedule = label, expression = expr, "cron schedule registered");
                Some((label, cron))
            }
            Err(e) => {
                tracing::error!(
                    schedule = label,
                    expression = expr,
                    error = %e,
                    "failed to parse cron expression, skipping"
                );
                None
            }
        })
        .collect()
}

/// 最も早く到来するスケジュールとその時刻を返す。
pub fn next_fire(
    schedules: &[(&'static str, Cron)],
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, &'static str)> {
    schedules
        .iter()
        .filter_map(|(label, cron)| {
            cron.find_next_occurrence(&now, false)
                .ok()
                .map(|next| (next, *label))
        })
        .min_by_key(|(next, _)| *next)
}

impl ResetScheduler {
    pub fn new(cfg: &ResetScheduleConfig, reset_uc: Arc<ResetUsageWindowsUseCase>) -> Self {
        Self {
            schedules: parse_schedules(&cfg.daily, &cfg.monthly),
            reset_uc,
        }
    }

    pub async fn run(self) {
        if self.schedules.is_empty() {
            tracing::warn!("no valid cron schedules, reset scheduler exiting");
            return;
        }

        loop {
            let (fire_at, label) = match next_fire(&self.schedules, Utc::now()) {
                Some(v) => v,
                None => {
                    tracing::error!("no next cron occurrence found, reset scheduler exiting");
                    return;
                }
            };

            let wait = (fire_at - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(1));

            info!(
                schedule = label,
                next_run = %fire_at,
                wait_secs = wait.as_secs(),
                "sleeping until next usage reset sweep"
            );

            tokio::time::sleep(wait).await;

            info!(schedule = label, "running usage reset sweep");
            match self.reset_uc.sweep_at(Utc::now(), SWEEP_PAGE_SIZE).await {
                Ok(summary) => info!(
                    schedule = label,
                    scanned = summary.scanned,
                    daily_resets = summary.daily_resets,
                    monthly_resets = summary.monthly_resets,
                    failures = summary.failures,
                    "usage reset sweep completed"
                ),
                Err(e) => tracing::error!(
                    schedule = label,
                    error = %e,
                    "usage reset sweep aborted"
                ),
            }
        }
    }
}
