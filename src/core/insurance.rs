use serde::Serialize;

use super::types::{InsurancePlan, PolicyType, RetirementInputs, SurrenderMode};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCashFlow {
    pub surrender: f64,
    pub maturity: f64,
    pub cash_back: f64,
    pub pension: f64,
    pub death_benefit: f64,
}

impl PlanCashFlow {
    pub fn inflow(&self) -> f64 {
        self.surrender + self.maturity + self.cash_back + self.pension
    }

    pub fn event_inflow(&self) -> f64 {
        self.surrender + self.maturity + self.cash_back
    }

    fn accumulate(mut self, other: PlanCashFlow) -> Self {
        self.surrender += other.surrender;
        self.maturity += other.maturity;
        self.cash_back += other.cash_back;
        self.pension += other.pension;
        self.death_benefit += other.death_benefit;
        self
    }
}

// Term policies carry no cash value.
fn surrender_enabled(plan: &InsurancePlan) -> bool {
    plan.use_surrender && plan.policy_type != PolicyType::Term && plan.surrender_age > 0.0
}

pub fn surrender_value(plan: &InsurancePlan) -> f64 {
    match plan.surrender_mode {
        SurrenderMode::Table => plan
            .surrender_table
            .iter()
            .find(|row| row.age == plan.surrender_age)
            .map(|row| row.value)
            .unwrap_or(0.0),
        SurrenderMode::Flat => plan.surrender_value,
    }
}

fn uses_tiers(plan: &InsurancePlan) -> bool {
    plan.unequal_pension && !plan.pension_tiers.is_empty()
}

fn flat_pension_amount(plan: &InsurancePlan) -> f64 {
    if plan.pension_percent > 0.0 {
        plan.sum_assured * plan.pension_percent / 100.0
    } else {
        plan.pension_amount
    }
}

pub fn pension_for_age(plan: &InsurancePlan, age: f64) -> f64 {
    if plan.policy_type != PolicyType::Annuity {
        return 0.0;
    }
    if plan.unequal_pension {
        return plan
            .pension_tiers
            .iter()
            .filter(|tier| tier.start_age <= age && age <= tier.end_age)
            .map(|tier| tier.amount)
            .sum();
    }
    if plan.pension_start_age <= age && age <= plan.pension_end_age {
        flat_pension_amount(plan)
    } else {
        0.0
    }
}

fn first_pension_age(plan: &InsurancePlan) -> Option<f64> {
    if plan.policy_type != PolicyType::Annuity {
        return None;
    }
    if uses_tiers(plan) {
        plan.pension_tiers
            .iter()
            .map(|tier| tier.start_age)
            .min_by(|a, b| a.total_cmp(b))
    } else if !plan.unequal_pension && flat_pension_amount(plan) > 0.0 {
        Some(plan.pension_start_age)
    } else {
        None
    }
}

fn death_benefit(plan: &InsurancePlan, age: f64) -> f64 {
    if age > plan.coverage_age {
        return 0.0;
    }
    if plan.policy_type != PolicyType::Annuity {
        return plan.sum_assured;
    }

    let pre_start = if plan.death_benefit_pre_pension != 0.0 {
        plan.death_benefit_pre_pension
    } else {
        plan.sum_assured
    };

    match first_pension_age(plan) {
        Some(first) if age >= first => {
            let paid: f64 = RetirementInputs::age_range(first, age)
                .map(|a| pension_for_age(plan, a))
                .sum();
            (pre_start - paid).max(0.0)
        }
        _ => pre_start,
    }
}

fn cash_back_due(plan: &InsurancePlan, age: f64, policy_start_age: f64) -> bool {
    if plan.cash_back_amount <= 0.0 || age > plan.coverage_age {
        return false;
    }
    let frequency = (plan.cash_back_frequency.round() as i64).max(1);
    let policy_year = (age - policy_start_age).round() as i64;
    policy_year > 0 && policy_year % frequency == 0
}

pub fn cash_flow_and_death_benefit(
    plan: &InsurancePlan,
    age: f64,
    policy_start_age: f64,
) -> PlanCashFlow {
    if !plan.active {
        return PlanCashFlow::default();
    }

    if surrender_enabled(plan) {
        if age > plan.surrender_age {
            return PlanCashFlow::default();
        }
        if age == plan.surrender_age {
            return PlanCashFlow {
                surrender: surrender_value(plan),
                death_benefit: death_benefit(plan, age),
                ..Default::default()
            };
        }
    }

    let maturity = if plan.policy_type == PolicyType::Endowment && age == plan.coverage_age {
        plan.maturity_amount
    } else {
        0.0
    };
    let cash_back = if cash_back_due(plan, age, policy_start_age) {
        plan.cash_back_amount
    } else {
        0.0
    };

    PlanCashFlow {
        surrender: 0.0,
        maturity,
        cash_back,
        pension: pension_for_age(plan, age),
        death_benefit: death_benefit(plan, age),
    }
}

pub fn total_cash_flow(
    plans: &[InsurancePlan],
    age: f64,
    policy_start_age: f64,
) -> PlanCashFlow {
    plans
        .iter()
        .map(|plan| cash_flow_and_death_benefit(plan, age, policy_start_age))
        .fold(PlanCashFlow::default(), PlanCashFlow::accumulate)
}
