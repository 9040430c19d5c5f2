use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entity::{Quota, QuotaPatch, Usage, UsageCounter, UsageLog, UsageLogQuery, UsageStatEntry};

/// QuotaRepository はテナントのクォータ（上限値）の永続化を担当する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuotaRepository: Send + Sync {
    /// クォータを作成する。同じテナントに有効なクォータが既にある場合は false を返す。
    async fn create(&self, quota: &Quota) -> anyhow::Result<bool>;

    /// テナントのクォータを取得する。有効なものを優先し、なければ最新のものを返す。
    async fn find_by_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Quota>>;

    /// パッチの指定フィールドだけを更新し、更新後のクォータを返す。
    async fn update(&self, tenant_id: &str, patch: &QuotaPatch) -> anyhow::Result<Option<Quota>>;
}

/// ConsumeOutcome は try_consume の結果。allowed == false の場合 usage は変更前の値。
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumeOutcome {
    pub allowed: bool,
    pub usage: Usage,
}

/// UsageRepository は使用量台帳の永続化を担当する。
/// increment / decrement / try_consume はストア側の単一のアトミック操作として実装すること。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// 初期使用量を作成する。既に存在する場合は既存のレコードをそのまま返す。
    async fn create_initial(&self, tenant_id: &str, now: DateTime<Utc>) -> anyhow::Result<Usage>;

    async fn find_by_tenant(&self, tenant_id: &str) -> anyhow::Result<Option<Usage>>;

    async fn increment(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Usage>>;

    /// 減算する。0 を下回る場合は 0 で止める。
    async fn decrement(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Usage>>;

    /// 加算後の値が max 以下の場合のみ加算する。
    async fn try_consume(
        &self,
        tenant_id: &str,
        counter: UsageCounter,
        amount: u64,
        max: u64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<ConsumeOutcome>>;

    /// last_daily_reset_at が day_start より前の場合のみ api_calls_today を 0 にする。
    /// リセットが実行された場合 true を返す。
    async fn reset_daily(
        &self,
        tenant_id: &str,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// last_monthly_reset_at が month_start より前の場合のみ bandwidth_month を 0 にする。
    async fn reset_monthly(
        &self,
        tenant_id: &str,
        month_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// リセットスイープ用にテナントIDをページングで列挙する。
    async fn list_tenant_ids(&self, offset: u64, limit: u32) -> anyhow::Result<Vec<String>>;
}

/// UsageLogRepository は追記専用の監査ログを担当する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageLogRepository: Send + Sync {
    async fn append(&self, log: &UsageLog) -> anyhow::Result<()>;

    /// 条件に一致するログを新しい順に最大 query.limit 件返す。
    async fn find(&self, tenant_id: &str, query: &UsageLogQuery) -> anyhow::Result<Vec<UsageLog>>;

    /// 条件に一致するログをリソース × アクションで集計する（limit は無視する）。
    async fn aggregate(
        &self,
        tenant_id: &str,
        query: &UsageLogQuery,
    ) -> anyhow::Result<Vec<UsageStatEntry>>;
}
