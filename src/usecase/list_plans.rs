use crate::domain::entity::plan::plan_catalog;
use crate::domain::entity::QuotaPlan;

/// ListPlansUseCase は静的なプランカタログを返す。
pub struct ListPlansUseCase;

impl ListPlansUseCase {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self) -> Vec<QuotaPlan> {
        plan_catalog()
    }
}

impl Default for ListPlansUseCase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::PlanName;

    #[test]
    fn test_lists_all_plans_in_order() {
        let plans = ListPlansUseCase::new().execute();
        let names: Vec<PlanName> = plans.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![PlanName::Free, PlanName::Basic, PlanName::Pro, PlanName::Enterprise]
        );
    }
}
