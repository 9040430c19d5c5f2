use std::sync::Arc;

use crate::domain::entity::Quota;
use crate::domain::repository::QuotaRepository;

#[derive(Debug, thiserror::Error)]
pub enum GetQuotaError {
    #[error("quota not found for tenant: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub struct GetQuotaUseCase {
    repo: Arc<dyn QuotaRepository>,
}

impl GetQuotaUseCase {
    pub fn new(repo: Arc<dyn QuotaRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, tenant_id: &str) -> Result<Quota, GetQuotaError> {
        self.repo
            .find_by_tenant(tenant_id)
            .await
            .map_err(|e| GetQuotaError::Internal(e.to_string()))?
            .ok_or_else(|| GetQuotaError::NotFound(tenant_id.to_string()))
    }
}
