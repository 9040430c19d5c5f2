use std::sync::Arc;

use tracing::info;

use crate::domain::entity::{PlanName, QuotaPatch};
use crate::domain::repository::QuotaRepository;
use crate::domain::service::quota_validation::{parse_timestamp, validate_patch};

#[derive(Debug, Clone, Default)]
pub struct UpdateQuotaInput {
    pub tenant_id: String,
    pub plan: Option<String>,
    pub max_storage_bytes: Option<u64>,
    pub max_documents: Option<u64>,
    pub max_users: Option<u64>,
    pub max_api_calls_per_day: Option<u64>,
    pub max_file_size_bytes: Option<u64>,
    pub max_bandwidth_bytes_per_month: Option<u64>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub valid_until: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateQuotaError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("quota not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub struct UpdateQuotaUseCase {
    repo: Arc<dyn QuotaRepository>,
}

impl UpdateQuotaUseCase {
    pub fn new(repo: Arc<dyn QuotaRepository>) -> Self {
        Self { repo }
    }

    /// 入力を QuotaPatch に変換する。文字列フィールドの解析エラーは Validation とする。
    fn to_patch(input: &UpdateQuotaInput) -> Result<QuotaPatch, UpdateQuotaError> {
        let plan = input
            .plan
            .as_deref()
            .map(|raw| {
                PlanName::from_str(raw).ok_or_else(|| {
                    UpdateQuotaError::Validation(format!(
                        "plan must be one of: free, basic, pro, enterprise, got: {}",
                        raw
                    ))
                })
            })
            .transpose()?;
        let valid_until = input
            .valid_until
            .as_deref()
            .map(|raw| parse_timestamp("valid_until", raw))
            .transpose()
            .map_err(UpdateQuotaError::Validation)?;

        Ok(QuotaPatch {
            plan,
            max_storage_bytes: input.max_storage_bytes,
            max_documents: input.max_documents,
            max_users: input.max_users,
            max_api_calls_per_day: input.max_api_calls_per_day,
            max_file_size_bytes: input.max_file_size_bytes,
            max_bandwidth_bytes_per_month: input.max_bandwidth_bytes_per_month,
            features: input.features.clone(),
            is_active: input.is_active,
            valid_until,
        })
    }

    pub async fn execute(&self, input: &UpdateQuotaInput) -> Result<(), UpdateQuotaError> {
        let patch = Self::to_patch(input)?;

        // 変更なしのパッチはストアにもキャッシュにも触れない
        if patch.is_empty() {
            return Ok(());
        }

        validate_patch(&patch)
            .into_result()
            .map_err(UpdateQuotaError::Validation)?;

        self.repo
            .update(&input.tenant_id, &patch)
            .await
            .map_err(|e| UpdateQuotaError::Internal(e.to_string()))?
            .ok_or_else(|| UpdateQuotaError::NotFound(input.tenant_id.clone()))?;

        info!(tenant_id = %input.tenant_id, "quota updated");
        Ok(())
    }
}
