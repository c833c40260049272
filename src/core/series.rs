use std::io::Write;

use log::debug;

use super::insurance::total_cash_flow;
use super::types::{CalculationResult, ProjectionSeries, RetirementInputs};
use crate::error::PlanError;

pub const CSV_HEADER: [&str; 3] = ["age", "actual", "required"];

fn next_balance(inputs: &RetirementInputs, balance: f64, age: f64, retirement_start: bool) -> f64 {
    let inflow = total_cash_flow(&inputs.insurance_plans, age, inputs.plan_start_age).inflow();

    let next = if age < inputs.retire_age {
        balance * (1.0 + inputs.pre_retirement_rate()) + inputs.annual_saving_at(age) + inflow
    } else {
        let lump_sum = if retirement_start {
            inputs.retire_fund_other
        } else {
            0.0
        };
        let spending = inputs.inflated_expense_at(age) + inputs.inflated_special_at(age)
            - inputs.annual_income();
        (balance * (1.0 + inputs.post_retirement_rate()) + lump_sum - spending.max(0.0) + inflow)
            .max(0.0)
    };

    if next.is_finite() { next } else { 0.0 }
}

pub fn build_series(inputs: &RetirementInputs, result: &CalculationResult) -> ProjectionSeries {
    let mut labels = vec![format!("{:.0}", inputs.current_age.floor())];
    let mut actual = vec![inputs.current_savings];

    let retirement_start = inputs.retirement_start_age();
    let mut balance = inputs.current_savings;
    for age in RetirementInputs::age_range(inputs.current_age, inputs.life_expectancy) {
        balance = next_balance(inputs, balance, age, age == retirement_start);
        labels.push(format!("{:.0}", age + 1.0));
        actual.push(balance);
    }

    debug!(
        "series: {} points, closing balance {:.2}",
        actual.len(),
        balance
    );

    ProjectionSeries {
        required: vec![result.target_fund; actual.len()],
        labels,
        actual,
    }
}

pub fn write_series_csv<W: Write>(series: &ProjectionSeries, writer: W) -> Result<(), PlanError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for ((label, actual), required) in series
        .labels
        .iter()
        .zip(&series.actual)
        .zip(&series.required)
    {
        let actual = format!("{:.0}", actual.round());
        let required = format!("{:.0}", required.round());
        wtr.write_record([label.as_str(), actual.as_str(), required.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn series_csv_string(series: &ProjectionSeries) -> Result<String, PlanError> {
    let mut buf = Vec::new();
    write_series_csv(series, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
