use log::debug;

use super::insurance::total_cash_flow;
use super::types::{CalculationResult, ExpenseRow, RetirementInputs, Status, round2};

pub const RATE_EPSILON: f64 = 1e-9;

pub const GAP_TOLERANCE: f64 = -1.0;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulation {
    wealth: f64,
    lump_sum: f64,
    annuity: f64,
    insurance: f64,
    insurance_nominal: f64,
}

fn accumulate_to_retirement(inputs: &RetirementInputs, rate: f64) -> Accumulation {
    let start = Accumulation {
        wealth: inputs.current_savings,
        lump_sum: inputs.current_savings,
        ..Default::default()
    };

    let mut acc = RetirementInputs::age_range(inputs.current_age, inputs.retire_age).fold(
        start,
        |acc, age| {
            let saving = inputs.annual_saving_at(age);
            let inflow = total_cash_flow(&inputs.insurance_plans, age, inputs.current_age).inflow();
            Accumulation {
                wealth: acc.wealth + acc.wealth * rate + saving + inflow,
                lump_sum: acc.lump_sum * (1.0 + rate),
                annuity: acc.annuity * (1.0 + rate) + saving,
                insurance: acc.insurance * (1.0 + rate) + inflow,
                insurance_nominal: acc.insurance_nominal + inflow,
            }
        },
    );

    let at_retirement = total_cash_flow(
        &inputs.insurance_plans,
        inputs.retire_age,
        inputs.current_age,
    )
    .inflow();
    acc.wealth += at_retirement + inputs.retire_fund_other;
    acc.insurance += at_retirement;
    acc.insurance_nominal += at_retirement;
    acc
}

/// One row per retirement year. Each year compounds on the previous
/// *rounded* monthly figure.
pub fn expense_schedule(inputs: &RetirementInputs) -> Vec<ExpenseRow> {
    let inflation = inputs.inflation_rate();
    let first_monthly =
        round2(inputs.retire_extra_expense * (1.0 + inflation).powf(inputs.years_to_retire()));

    let mut rows: Vec<ExpenseRow> = Vec::new();
    for age in RetirementInputs::age_range(inputs.retire_age, inputs.life_expectancy) {
        let monthly = match rows.last() {
            Some(prev) => round2(prev.monthly * (1.0 + inflation)),
            None => first_monthly,
        };
        rows.push(ExpenseRow {
            age,
            monthly,
            yearly: round2(monthly * 12.0),
        });
    }
    rows
}

fn required_capital(inputs: &RetirementInputs, schedule: &[ExpenseRow]) -> f64 {
    let post = inputs.post_retirement_rate();
    let income = inputs.annual_income();
    schedule.iter().rev().fold(inputs.legacy_fund, |needed, row| {
        let inflow = total_cash_flow(&inputs.insurance_plans, row.age, inputs.current_age).inflow();
        (needed + row.yearly - income - inflow) / (1.0 + post)
    })
}

// Early-starting pensions are not counted here.
fn funded_without_saving(inputs: &RetirementInputs, rate: f64) -> f64 {
    let years = inputs.years_to_retire();
    let lump = inputs.current_savings * (1.0 + rate).powf(years);
    let events: f64 = RetirementInputs::age_range(inputs.current_age, inputs.retire_age)
        .map(|age| {
            let event =
                total_cash_flow(&inputs.insurance_plans, age, inputs.current_age).event_inflow();
            event * (1.0 + rate).powf(inputs.retire_age - 1.0 - age)
        })
        .sum();
    lump + events
}

pub fn annuity_payment(future_value: f64, rate: f64, years: f64) -> f64 {
    if years <= 0.0 {
        return 0.0;
    }
    if rate.abs() < RATE_EPSILON {
        return future_value / years;
    }
    future_value * rate / ((1.0 + rate).powf(years) - 1.0)
}

fn monthly_needed(inputs: &RetirementInputs, target_fund: f64, rate: f64) -> f64 {
    let years = inputs.years_to_retire();
    if years <= 0.0 {
        return 0.0;
    }
    let funded = funded_without_saving(inputs, rate);
    if target_fund <= funded {
        return 0.0;
    }
    finite_or_zero(annuity_payment(target_fund - funded, rate, years) / 12.0).max(0.0)
}

pub fn project(inputs: &RetirementInputs) -> CalculationResult {
    let pre = inputs.pre_retirement_rate();
    let post = inputs.post_retirement_rate();

    let acc = accumulate_to_retirement(inputs, pre);
    let schedule = expense_schedule(inputs);

    let projected_fund = finite_or_zero(acc.wealth);
    let target_fund = finite_or_zero(required_capital(inputs, &schedule));
    let gap = projected_fund - target_fund;
    let status = if gap >= GAP_TOLERANCE {
        Status::Enough
    } else {
        Status::Short
    };

    let monthly_expense_at_retire = match schedule.first() {
        Some(row) => row.monthly,
        None => round2(
            inputs.retire_extra_expense
                * (1.0 + inputs.inflation_rate()).powf(inputs.years_to_retire()),
        ),
    };
    let total_lifetime_expense = schedule.iter().map(|row| row.yearly).sum();

    debug!(
        "projection: {} years to retire, {} in retirement, target {:.2}, projected {:.2}",
        inputs.years_to_retire(),
        inputs.years_in_retirement(),
        target_fund,
        projected_fund
    );

    CalculationResult {
        target_fund,
        projected_fund,
        gap,
        years_to_retire: inputs.years_to_retire(),
        years_in_retirement: inputs.years_in_retirement(),
        monthly_expense_at_retire,
        total_lifetime_expense,
        nominal_pre_return: pre,
        nominal_post_return: post,
        status,
        monthly_needed: monthly_needed(inputs, target_fund, pre),
        expense_schedule: schedule,
        fv_lump_sum: finite_or_zero(acc.lump_sum),
        fv_annuity: finite_or_zero(acc.annuity),
        fv_insurance: finite_or_zero(acc.insurance),
        total_insurance_inflow: finite_or_zero(acc.insurance_nominal),
    }
}
