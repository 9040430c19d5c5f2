use chrono::{DateTime, Utc};

use crate::domain::entity::{QuotaLimits, QuotaPatch};

/// FieldViolation は単一フィールドのバリデーション違反。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// ValidationReport はバリデーション結果。違反がなければ is_valid() が true。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<FieldViolation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    /// 違反を "field: message; ..." 形式の1行にまとめる。
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn into_result(self) -> Result<(), String> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.summary())
        }
    }
}

/// 上限値・使用量として保存できる最大値（BIGINT 列の上限）。
pub const MAX_STORABLE_VALUE: u64 = i64::MAX as u64;

fn check_limit(report: &mut ValidationReport, field: &'static str, value: Option<u64>) {
    match value {
        Some(0) => report.push(field, "must be greater than 0"),
        Some(v) if v > MAX_STORABLE_VALUE => {
            report.push(field, format!("must not exceed {}", MAX_STORABLE_VALUE))
        }
        _ => {}
    }
}

/// 使用量の変更量を検証する。0 と保存可能な範囲を超える値は受け付けない。
pub fn validate_amount(amount: u64) -> Result<(), String> {
    if amount == 0 {
        return Err("amount must be greater than 0".to_string());
    }
    if amount > MAX_STORABLE_VALUE {
        return Err(format!("amount must not exceed {}", MAX_STORABLE_VALUE));
    }
    Ok(())
}

/// 6つの上限値がすべて正で、保存可能な範囲に収まることを検証する。
pub fn validate_limits(limits: &QuotaLimits) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_limit(&mut report, "max_storage_bytes", Some(limits.max_storage_bytes));
    check_limit(&mut report, "max_documents", Some(limits.max_documents));
    check_limit(&mut report, "max_users", Some(limits.max_users));
    check_limit(&mut report, "max_api_calls_per_day", Some(limits.max_api_calls_per_day));
    check_limit(&mut report, "max_file_size_bytes", Some(limits.max_file_size_bytes));
    check_limit(
        &mut report,
        "max_bandwidth_bytes_per_month",
        Some(limits.max_bandwidth_bytes_per_month),
    );
    report
}

/// パッチで指定された上限値だけを検証する。
pub fn validate_patch(patch: &QuotaPatch) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_limit(&mut report, "max_storage_bytes", patch.max_storage_bytes);
    check_limit(&mut report, "max_documents", patch.max_documents);
    check_limit(&mut report, "max_users", patch.max_users);
    check_limit(&mut report, "max_api_calls_per_day", patch.max_api_calls_per_day);
    check_limit(&mut report, "max_file_size_bytes", patch.max_file_size_bytes);
    check_limit(
        &mut report,
        "max_bandwidth_bytes_per_month",
        patch.max_bandwidth_bytes_per_month,
    );
    report
}

/// RFC 3339 形式のタイムスタンプを解析する。
/// valid_from より前かどうかはこの層では検証しない。
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("{}: invalid RFC 3339 timestamp '{}': {}", field, raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_limits() -> QuotaLimits {
        QuotaLimits {
            max_storage_bytes: 1,
            max_documents: 1,
            max_users: 1,
            max_api_calls_per_day: 1,
            max_file_size_bytes: 1,
            max_bandwidth_bytes_per_month: 1,
        }
    }

    #[test]
    fn test_valid_limits() {
        assert!(validate_limits(&valid_limits()).is_valid());
    }

    #[test]
    fn test_zero_limits_reported_per_field() {
        let limits = QuotaLimits {
            max_documents: 0,
            max_users: 0,
            ..valid_limits()
        };
        let report = validate_limits(&limits);
        assert!(!report.is_valid());
        let fields: Vec<&str> = report.violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["max_documents", "max_users"]);
        assert!(report.summary().contains("max_documents: must be greater than 0"));
    }

    #[test]
    fn test_patch_only_checks_supplied_fields() {
        let patch = QuotaPatch {
            max_storage_bytes: Some(10),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_valid());

        let patch = QuotaPatch {
            max_bandwidth_bytes_per_month: Some(0),
            ..Default::default()
        };
        let err = validate_patch(&patch).into_result().unwrap_err();
        assert!(err.contains("max_bandwidth_bytes_per_month"));
    }

    #[test]
    fn test_limits_beyond_storable_range_are_reported() {
        let limits = QuotaLimits {
            max_storage_bytes: u64::MAX,
            max_api_calls_per_day: MAX_STORABLE_VALUE + 1,
            max_documents: MAX_STORABLE_VALUE,
            ..valid_limits()
        };
        let report = validate_limits(&limits);
        let fields: Vec<&str> = report.violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["max_storage_bytes", "max_api_calls_per_day"]);
        assert!(report
            .summary()
            .contains("max_storage_bytes: must not exceed 9223372036854775807"));

        let patch = QuotaPatch {
            max_file_size_bytes: Some(u64::MAX),
            ..Default::default()
        };
        let err = validate_patch(&patch).into_result().unwrap_err();
        assert!(err.contains("max_file_size_bytes"));
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(1).is_ok());
        assert!(validate_amount(MAX_STORABLE_VALUE).is_ok());
        assert!(validate_amount(0).unwrap_err().contains("greater than 0"));
        assert!(validate_amount(MAX_STORABLE_VALUE + 1)
            .unwrap_err()
            .contains("must not exceed"));
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("valid_until", "2030-01-01T00:00:00+09:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2029-12-31T15:00:00+00:00");

        let err = parse_timestamp("valid_until", "next tuesday").unwrap_err();
        assert!(err.contains("valid_until"));
    }
}
