use chrono::{DateTime, Datelike, TimeZone, Utc};

/// ResetWindow は使用量カウンターがリセットされる時間窓。
/// 境界はテナントのローカル時刻ではなく UTC 固定で計算する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetWindow {
    Daily,
    Monthly,
}

impl ResetWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetWindow::Daily => "daily",
            ResetWindow::Monthly => "monthly",
        }
    }

    /// now を含む窓の開始時刻。Daily は当日 00:00、Monthly は当月1日 00:00。
    pub fn start_of(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let (year, month, day) = match self {
            ResetWindow::Daily => (now.year(), now.month(), now.day()),
            ResetWindow::Monthly => (now.year(), now.month(), 1),
        };
        // UTC では曖昧な時刻が存在しないため single() は常に Some になる
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .unwrap_or(now)
    }

    /// 最終リセット時刻が現在の窓より前であればリセットが必要。
    pub fn is_due(&self, last_reset_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        last_reset_at < self.start_of(now)
    }
}
