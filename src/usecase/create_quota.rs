use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::entity::plan::find_plan;
use crate::domain::entity::{PlanName, Quota, QuotaLimits};
use crate::domain::repository::{QuotaRepository, UsageRepository};
use crate::domain::service::quota_validation::{parse_timestamp, validate_limits};

/// CreateQuotaInput は新規テナントのクォータ作成要求。
/// 上限値・機能フラグが未指定の場合はプランカタログの値を使う。
#[derive(Debug, Clone, Default)]
pub struct CreateQuotaInput {
    pub tenant_id: String,
    pub plan: String,
    pub max_storage_bytes: Option<u64>,
    pub max_documents: Option<u64>,
    pub max_users: Option<u64>,
    pub max_api_calls_per_day: Option<u64>,
    pub max_file_size_bytes: Option<u64>,
    pub max_bandwidth_bytes_per_month: Option<u64>,
    pub features: Option<Vec<String>>,
    pub valid_until: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateQuotaError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("quota already exists for tenant: {0}")]
    AlreadyExists(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub struct CreateQuotaUseCase {
    quota_repo: Arc<dyn QuotaRepository>,
    usage_repo: Arc<dyn UsageRepository>,
}

impl CreateQuotaUseCase {
    pub fn new(quota_repo: Arc<dyn QuotaRepository>, usage_repo: Arc<dyn UsageRepository>) -> Self {
        Self {
            quota_repo,
            usage_repo,
        }
    }

    pub async fn execute(&self, input: &CreateQuotaInput) -> Result<Quota, CreateQuotaError> {
        if input.tenant_id.trim().is_empty() {
            return Err(CreateQuotaError::Validation(
                "tenant_id is required".to_string(),
            ));
        }

        let plan = PlanName::from_str(&input.plan).ok_or_else(|| {
            CreateQuotaError::Validation(format!(
                "plan must be one of: free, basic, pro, enterprise, got: {}",
                input.plan
            ))
        })?;
        let template = find_plan(plan);

        let limits = QuotaLimits {
            max_storage_bytes: input
                .max_storage_bytes
                .unwrap_or(template.limits.max_storage_bytes),
            max_documents: input.max_documents.unwrap_or(template.limits.max_documents),
            max_users: input.max_users.unwrap_or(template.limits.max_users),
            max_api_calls_per_day: input
                .max_api_calls_per_day
                .unwrap_or(template.limits.max_api_calls_per_day),
            max_file_size_bytes: input
                .max_file_size_bytes
                .unwrap_or(template.limits.max_file_size_bytes),
            max_bandwidth_bytes_per_month: input
                .max_bandwidth_bytes_per_month
                .unwrap_or(template.limits.max_bandwidth_bytes_per_month),
        };
        validate_limits(&limits)
            .into_result()
            .map_err(CreateQuotaError::Validation)?;

        let valid_until = input
            .valid_until
            .as_deref()
            .map(|raw| parse_timestamp("valid_until", raw))
            .transpose()
            .map_err(CreateQuotaError::Validation)?;

        let features = input.features.clone().or(Some(template.features));
        let quota = Quota::new(input.tenant_id.clone(), plan, limits, features, valid_until);

        // 使用量行はクォータより先に作成する（create_initial は冪等）
        self.usage_repo
            .create_initial(&quota.tenant_id, Utc::now())
            .await
            .map_err(|e| CreateQuotaError::Internal(e.to_string()))?;

        let created = self
            .quota_repo
            .create(&quota)
            .await
            .map_err(|e| CreateQuotaError::Internal(e.to_string()))?;
        if !created {
            return Err(CreateQuotaError::AlreadyExists(input.tenant_id.clone()));
        }

        info!(
            tenant_id = %quota.tenant_id,
            plan = plan.as_str(),
            quota_id = %quota.id,
            "quota created"
        );

        Ok(quota)
    }
}
