use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavingMode {
    #[default]
    Flat,
    Step5,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnMode {
    #[default]
    Simple,
    Custom,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyType {
    #[default]
    #[serde(alias = "wholeLife", alias = "whole_life")]
    WholeLife,
    Endowment,
    #[serde(alias = "pension")]
    Annuity,
    Term,
    #[serde(alias = "unitLinked", alias = "unit_linked")]
    UnitLinked,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurrenderMode {
    #[default]
    Flat,
    Table,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Enough,
    Short,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingStep {
    pub age: f64,
    pub monthly_saving: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnAllocation {
    pub weight: f64,
    pub expected_return: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionTier {
    pub start_age: f64,
    pub end_age: f64,
    pub amount: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurrenderPoint {
    pub age: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsurancePlan {
    pub id: String,
    pub policy_type: PolicyType,
    pub active: bool,
    pub coverage_age: f64,
    pub sum_assured: f64,

    pub use_surrender: bool,
    pub surrender_mode: SurrenderMode,
    pub surrender_age: f64,
    pub surrender_value: f64,
    pub surrender_table: Vec<SurrenderPoint>,

    // Endowment
    pub maturity_amount: f64,
    pub cash_back_amount: f64,
    pub cash_back_frequency: f64,

    // Annuity / pension
    pub pension_amount: f64,
    pub pension_percent: f64,
    pub pension_start_age: f64,
    pub pension_end_age: f64,
    pub unequal_pension: bool,
    pub pension_tiers: Vec<PensionTier>,
    pub death_benefit_pre_pension: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementInputs {
    pub gender: Gender,
    pub current_age: f64,
    pub retire_age: f64,
    pub life_expectancy: f64,
    pub plan_start_age: f64,

    pub current_savings: f64,
    pub monthly_saving: f64,
    pub saving_mode: SavingMode,
    pub saving_steps: Vec<SavingStep>,

    pub expected_return: f64,
    pub expected_return_post: f64,
    pub inflation: f64,
    pub return_mode: ReturnMode,
    pub return_allocations: Vec<ReturnAllocation>,

    pub retire_extra_expense: f64,
    pub retire_monthly_income: f64,
    pub retire_special_annual: f64,
    pub retire_fund_other: f64,
    pub legacy_fund: f64,

    pub insurance_plans: Vec<InsurancePlan>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRow {
    pub age: f64,
    pub monthly: f64,
    pub yearly: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub target_fund: f64,
    pub projected_fund: f64,
    pub gap: f64,
    pub years_to_retire: f64,
    pub years_in_retirement: f64,
    pub monthly_expense_at_retire: f64,
    pub total_lifetime_expense: f64,
    pub nominal_pre_return: f64,
    pub nominal_post_return: f64,
    pub status: Status,
    pub monthly_needed: f64,
    pub expense_schedule: Vec<ExpenseRow>,
    pub fv_lump_sum: f64,
    pub fv_annuity: f64,
    pub fv_insurance: f64,
    pub total_insurance_inflow: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationTrial {
    pub balance: f64,
    pub pass: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub probability: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub median_retirement_balance: f64,
    pub simulations: Vec<SimulationTrial>,
    pub ages: Vec<f64>,
    pub p5_series: Vec<f64>,
    pub p50_series: Vec<f64>,
    pub p95_series: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSeries {
    pub labels: Vec<String>,
    pub actual: Vec<f64>,
    pub required: Vec<f64>,
}

impl RetirementInputs {
    pub fn years_to_retire(&self) -> f64 {
        (self.retire_age - self.current_age).max(0.0)
    }

    pub fn years_in_retirement(&self) -> f64 {
        (self.life_expectancy - self.retire_age).max(0.0)
    }

    pub fn pre_retirement_rate(&self) -> f64 {
        if self.return_mode == ReturnMode::Custom {
            let total_weight: f64 = self.return_allocations.iter().map(|a| a.weight).sum();
            if total_weight > 0.0 {
                let weighted: f64 = self
                    .return_allocations
                    .iter()
                    .map(|a| a.weight * a.expected_return)
                    .sum();
                return weighted / total_weight / 100.0;
            }
        }
        self.expected_return / 100.0
    }

    pub fn post_retirement_rate(&self) -> f64 {
        self.expected_return_post / 100.0
    }

    pub fn inflation_rate(&self) -> f64 {
        self.inflation / 100.0
    }

    // Later checkpoints override earlier ones.
    pub fn monthly_saving_at(&self, age: f64) -> f64 {
        let mut monthly = self.monthly_saving;
        if self.saving_mode == SavingMode::Step5 {
            let mut steps = self.saving_steps.clone();
            steps.sort_by(|a, b| a.age.total_cmp(&b.age));
            for step in steps {
                if step.monthly_saving > 0.0 && age >= step.age {
                    monthly = step.monthly_saving;
                }
            }
        }
        monthly
    }

    /// First simulated age counted as retired. Already-retired scenarios
    /// start retirement at the current age.
    pub fn retirement_start_age(&self) -> f64 {
        self.retire_age.ceil().max(self.current_age.floor())
    }

    pub fn annual_saving_at(&self, age: f64) -> f64 {
        self.monthly_saving_at(age) * 12.0
    }

    pub fn annual_income(&self) -> f64 {
        self.retire_monthly_income * 12.0
    }

    pub fn inflated_expense_at(&self, age: f64) -> f64 {
        self.retire_extra_expense
            * 12.0
            * (1.0 + self.inflation_rate()).powf(age - self.current_age)
    }

    pub fn inflated_special_at(&self, age: f64) -> f64 {
        self.retire_special_annual * (1.0 + self.inflation_rate()).powf(age - self.current_age)
    }

    pub fn age_range(from: f64, to: f64) -> impl Iterator<Item = f64> {
        let start = from.floor() as i64;
        let end = to.floor() as i64;
        (start..end.max(start)).map(|age| age as f64)
    }
}

pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.is_finite() { rounded } else { 0.0 }
}
