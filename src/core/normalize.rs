use serde::{Deserialize, Serialize};

use super::types::{
    Gender, InsurancePlan, PensionTier, PolicyType, RetirementInputs, ReturnAllocation,
    ReturnMode, SavingMode, SavingStep, SurrenderMode, SurrenderPoint,
};

pub const STEP_AGES: [u32; 5] = [35, 40, 45, 50, 55];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl RawValue {
    pub fn to_number(&self) -> f64 {
        match self {
            RawValue::Number(n) => finite_or_zero(*n),
            RawValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            RawValue::Text(s) => parse_number(s),
        }
    }

    pub fn to_flag(&self) -> bool {
        match self {
            RawValue::Bool(b) => *b,
            RawValue::Number(n) => n.is_finite() && *n != 0.0,
            RawValue::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModeFlags {
    pub gender: Gender,
    pub saving_mode: SavingMode,
    pub return_mode: ReturnMode,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAllocation {
    pub weight: Option<RawValue>,
    pub expected_return: Option<RawValue>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTier {
    pub start_age: Option<RawValue>,
    pub end_age: Option<RawValue>,
    pub amount: Option<RawValue>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSurrenderPoint {
    pub age: Option<RawValue>,
    pub value: Option<RawValue>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawInsurancePlan {
    pub id: Option<RawValue>,
    #[serde(rename = "type")]
    pub policy_type: Option<String>,
    pub active: Option<RawValue>,
    pub coverage_age: Option<RawValue>,
    pub sum_assured: Option<RawValue>,

    pub use_surrender: Option<RawValue>,
    pub surrender_mode: Option<String>,
    pub surrender_age: Option<RawValue>,
    pub surrender_value: Option<RawValue>,
    pub surrender_table: Vec<RawSurrenderPoint>,

    pub maturity_amount: Option<RawValue>,
    pub cash_back_amount: Option<RawValue>,
    pub cash_back_frequency: Option<RawValue>,

    pub pension_amount: Option<RawValue>,
    pub pension_percent: Option<RawValue>,
    pub pension_start_age: Option<RawValue>,
    pub pension_end_age: Option<RawValue>,
    pub unequal_pension: Option<RawValue>,
    pub pension_tiers: Vec<RawTier>,
    pub death_benefit_pre_pension: Option<RawValue>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawForm {
    pub current_age: Option<RawValue>,
    pub retire_age: Option<RawValue>,
    pub life_expectancy: Option<RawValue>,
    pub start_age: Option<RawValue>,

    pub current_savings: Option<RawValue>,
    pub monthly_saving: Option<RawValue>,
    pub step35: Option<RawValue>,
    pub step40: Option<RawValue>,
    pub step45: Option<RawValue>,
    pub step50: Option<RawValue>,
    pub step55: Option<RawValue>,

    pub expected_return: Option<RawValue>,
    pub expected_return_post: Option<RawValue>,
    pub inflation: Option<RawValue>,
    pub return_allocations: Vec<RawAllocation>,

    pub retire_extra_expense: Option<RawValue>,
    pub retire_monthly_income: Option<RawValue>,
    pub retire_special_annual: Option<RawValue>,
    pub retire_fund_other: Option<RawValue>,
    pub legacy_fund: Option<RawValue>,

    pub insurance_plans: Vec<RawInsurancePlan>,
}

pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().map(finite_or_zero).unwrap_or(0.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn num(value: &Option<RawValue>) -> f64 {
    value.as_ref().map(RawValue::to_number).unwrap_or(0.0)
}

fn flag(value: &Option<RawValue>) -> bool {
    value.as_ref().map(RawValue::to_flag).unwrap_or(false)
}

fn parse_policy_type(raw: Option<&str>) -> PolicyType {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("endowment") => PolicyType::Endowment,
        Some("annuity") | Some("pension") => PolicyType::Annuity,
        Some("term") => PolicyType::Term,
        Some("unit-linked") | Some("unitlinked") | Some("unit_linked") => PolicyType::UnitLinked,
        _ => PolicyType::WholeLife,
    }
}

fn parse_surrender_mode(raw: Option<&str>) -> SurrenderMode {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("table") => SurrenderMode::Table,
        _ => SurrenderMode::Flat,
    }
}

fn normalize_plan(raw: &RawInsurancePlan, index: usize) -> InsurancePlan {
    let id = raw
        .id
        .as_ref()
        .map(RawValue::to_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("plan-{}", index + 1));

    InsurancePlan {
        id,
        policy_type: parse_policy_type(raw.policy_type.as_deref()),
        active: flag(&raw.active),
        coverage_age: num(&raw.coverage_age),
        sum_assured: num(&raw.sum_assured),
        use_surrender: flag(&raw.use_surrender),
        surrender_mode: parse_surrender_mode(raw.surrender_mode.as_deref()),
        surrender_age: num(&raw.surrender_age),
        surrender_value: num(&raw.surrender_value),
        surrender_table: raw
            .surrender_table
            .iter()
            .map(|row| SurrenderPoint {
                age: num(&row.age),
                value: num(&row.value),
            })
            .collect(),
        maturity_amount: num(&raw.maturity_amount),
        cash_back_amount: num(&raw.cash_back_amount),
        cash_back_frequency: num(&raw.cash_back_frequency),
        pension_amount: num(&raw.pension_amount),
        pension_percent: num(&raw.pension_percent),
        pension_start_age: num(&raw.pension_start_age),
        pension_end_age: num(&raw.pension_end_age),
        unequal_pension: flag(&raw.unequal_pension),
        pension_tiers: raw
            .pension_tiers
            .iter()
            .map(|tier| PensionTier {
                start_age: num(&tier.start_age),
                end_age: num(&tier.end_age),
                amount: num(&tier.amount),
            })
            .collect(),
        death_benefit_pre_pension: num(&raw.death_benefit_pre_pension),
    }
}

pub fn normalize(form: &RawForm, modes: ModeFlags) -> RetirementInputs {
    let current_age = num(&form.current_age);
    let start_age = num(&form.start_age);

    let saving_steps = match modes.saving_mode {
        SavingMode::Step5 => STEP_AGES
            .iter()
            .zip([
                &form.step35,
                &form.step40,
                &form.step45,
                &form.step50,
                &form.step55,
            ])
            .map(|(age, value)| SavingStep {
                age: *age as f64,
                monthly_saving: num(value),
            })
            .collect(),
        SavingMode::Flat => Vec::new(),
    };

    let return_allocations = match modes.return_mode {
        ReturnMode::Custom => form
            .return_allocations
            .iter()
            .map(|a| ReturnAllocation {
                weight: num(&a.weight),
                expected_return: num(&a.expected_return),
            })
            .collect(),
        ReturnMode::Simple => Vec::new(),
    };

    RetirementInputs {
        gender: modes.gender,
        current_age,
        retire_age: num(&form.retire_age),
        life_expectancy: num(&form.life_expectancy),
        plan_start_age: if start_age > 0.0 { start_age } else { current_age },
        current_savings: num(&form.current_savings),
        monthly_saving: num(&form.monthly_saving),
        saving_mode: modes.saving_mode,
        saving_steps,
        expected_return: num(&form.expected_return),
        expected_return_post: num(&form.expected_return_post),
        inflation: num(&form.inflation),
        return_mode: modes.return_mode,
        return_allocations,
        retire_extra_expense: num(&form.retire_extra_expense),
        retire_monthly_income: num(&form.retire_monthly_income),
        retire_special_annual: num(&form.retire_special_annual),
        retire_fund_other: num(&form.retire_fund_other),
        legacy_fund: num(&form.legacy_fund),
        insurance_plans: form
            .insurance_plans
            .iter()
            .enumerate()
            .map(|(i, p)| normalize_plan(p, i))
            .collect(),
    }
}
