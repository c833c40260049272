use std::f64::consts::PI;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::insurance::total_cash_flow;
use super::types::{MonteCarloResult, RetirementInputs, SimulationTrial};

pub const DEFAULT_SIMULATIONS: u32 = 1_000;
pub const DEFAULT_VOLATILITY_PCT: f64 = 6.0;

pub const PERCENTILE_LOW: f64 = 0.05;
pub const PERCENTILE_MID: f64 = 0.50;
pub const PERCENTILE_HIGH: f64 = 0.95;

pub struct NormalSampler<R> {
    rng: R,
    cached_normal: Option<f64>,
}

impl<R: Rng> NormalSampler<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            cached_normal: None,
        }
    }

    pub fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1: f64 = self.rng.gen_range(0.0..1.0_f64).max(1e-12);
        let u2: f64 = self.rng.gen_range(0.0..1.0_f64);
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached_normal = Some(r * theta.sin());
        r * theta.cos()
    }

    pub fn sample(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard_normal()
    }
}

#[derive(Debug, Clone, Copy)]
struct YearPlan {
    age: f64,
    retired: bool,
    retirement_start: bool,
    saving: f64,
    inflow: f64,
    withdrawal: f64,
}

fn year_plans(inputs: &RetirementInputs) -> Vec<YearPlan> {
    let income = inputs.annual_income();
    let retirement_start = inputs.retirement_start_age();
    RetirementInputs::age_range(inputs.current_age, inputs.life_expectancy)
        .map(|age| {
            let retired = age >= inputs.retire_age;
            YearPlan {
                age,
                retired,
                retirement_start: age == retirement_start,
                saving: if retired {
                    0.0
                } else {
                    inputs.annual_saving_at(age)
                },
                inflow: total_cash_flow(&inputs.insurance_plans, age, inputs.current_age).inflow(),
                withdrawal: if retired {
                    (inputs.inflated_expense_at(age) - income).max(0.0)
                } else {
                    0.0
                },
            }
        })
        .collect()
}

struct TrialPath {
    balances: Vec<f64>,
    retirement_balance: f64,
    final_balance: f64,
    pass: bool,
}

fn run_trial<R: Rng>(
    inputs: &RetirementInputs,
    years: &[YearPlan],
    volatility: f64,
    sampler: &mut NormalSampler<R>,
) -> TrialPath {
    let pre = inputs.pre_retirement_rate();
    let post = inputs.post_retirement_rate();

    let mut balance = inputs.current_savings;
    let mut retirement_balance = if balance.is_finite() { balance } else { 0.0 };
    let mut depleted = false;
    let mut balances = Vec::with_capacity(years.len());

    for year in years {
        let mean = if year.retired { post } else { pre };
        let annual_return = sampler.sample(mean, volatility);

        if !year.retired {
            balance = balance * (1.0 + annual_return) + year.saving + year.inflow;
        } else if year.retirement_start {
            retirement_balance = balance + inputs.retire_fund_other + year.inflow;
            balance = balance * (1.0 + annual_return) + inputs.retire_fund_other + year.inflow
                - year.withdrawal;
        } else {
            balance = balance * (1.0 + annual_return) - year.withdrawal + year.inflow;
        }

        if !balance.is_finite() {
            balance = 0.0;
        }
        if year.retired && balance <= 0.0 {
            depleted = true;
            balance = 0.0;
        }
        balances.push(balance.max(0.0));
    }

    let final_balance = balances.last().copied().unwrap_or(balance.max(0.0));
    TrialPath {
        balances,
        retirement_balance,
        final_balance,
        pass: !depleted && final_balance >= inputs.legacy_fund,
    }
}

/// Nearest-rank percentile of an ascending slice: the element at
/// `floor((n - 1) * p)`.
pub fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() - 1) as f64 * p).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

fn percentiles(values: &mut [f64]) -> (f64, f64, f64) {
    values.sort_by(|a, b| a.total_cmp(b));
    (
        nearest_rank(values, PERCENTILE_LOW),
        nearest_rank(values, PERCENTILE_MID),
        nearest_rank(values, PERCENTILE_HIGH),
    )
}

pub fn simulate_with_rng<R: Rng>(
    inputs: &RetirementInputs,
    trials: u32,
    volatility: f64,
    rng: &mut R,
) -> MonteCarloResult {
    let years = year_plans(inputs);
    let std_dev = volatility.max(0.0) / 100.0;
    let mut sampler = NormalSampler::new(rng);

    let mut columns: Vec<Vec<f64>> = (0..years.len())
        .map(|_| Vec::with_capacity(trials as usize))
        .collect();
    let mut finals = Vec::with_capacity(trials as usize);
    let mut retirement_balances = Vec::with_capacity(trials as usize);
    let mut simulations = Vec::with_capacity(trials as usize);
    let mut passes = 0_u32;

    for _ in 0..trials {
        let path = run_trial(inputs, &years, std_dev, &mut sampler);
        for (column, balance) in columns.iter_mut().zip(&path.balances) {
            column.push(*balance);
        }
        if path.pass {
            passes += 1;
        }
        finals.push(path.final_balance);
        retirement_balances.push(path.retirement_balance);
        simulations.push(SimulationTrial {
            balance: path.final_balance,
            pass: path.pass,
        });
    }

    let probability = if trials > 0 {
        passes as f64 / trials as f64
    } else {
        0.0
    };

    let mut p5_series = Vec::with_capacity(columns.len());
    let mut p50_series = Vec::with_capacity(columns.len());
    let mut p95_series = Vec::with_capacity(columns.len());
    for column in &mut columns {
        let (low, mid, high) = percentiles(column);
        p5_series.push(low);
        p50_series.push(mid);
        p95_series.push(high);
    }

    let (p5, p50, p95) = percentiles(&mut finals);
    retirement_balances.sort_by(|a, b| a.total_cmp(b));
    let median_retirement_balance = nearest_rank(&retirement_balances, PERCENTILE_MID);

    debug!(
        "simulation: {trials} trials over {} years, success {:.3}, median final {:.2}",
        years.len(),
        probability,
        p50
    );

    MonteCarloResult {
        probability,
        p5,
        p50,
        p95,
        median_retirement_balance,
        simulations,
        ages: years.iter().map(|y| y.age).collect(),
        p5_series,
        p50_series,
        p95_series,
    }
}

pub fn simulate_seeded(
    inputs: &RetirementInputs,
    trials: u32,
    volatility: f64,
    seed: u64,
) -> MonteCarloResult {
    let mut rng = StdRng::seed_from_u64(seed);
    simulate_with_rng(inputs, trials, volatility, &mut rng)
}

pub fn simulate(inputs: &RetirementInputs, trials: u32, volatility: f64) -> MonteCarloResult {
    let mut rng = StdRng::from_entropy();
    simulate_with_rng(inputs, trials, volatility, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::project;
    use proptest::prelude::{any, prop_assert, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_inputs() -> RetirementInputs {
        RetirementInputs {
            current_age: 30.0,
            retire_age: 60.0,
            life_expectancy: 85.0,
            plan_start_age: 30.0,
            current_savings: 200_000.0,
            monthly_saving: 10_000.0,
            expected_return: 7.0,
            expected_return_post: 4.0,
            inflation: 3.0,
            retire_extra_expense: 12_000.0,
            retire_monthly_income: 6_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn nearest_rank_does_not_interpolate() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        assert_eq!(nearest_rank(&values, 0.05), 1.0);
        assert_eq!(nearest_rank(&values, 0.50), 5.0);
        assert_eq!(nearest_rank(&values, 0.95), 9.0);
        assert_eq!(nearest_rank(&[], 0.5), 0.0);
    }

    #[test]
    fn box_muller_draws_are_standard_normal() {
        let mut sampler = NormalSampler::new(StdRng::seed_from_u64(11));
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| sampler.standard_normal()).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n as f64;
        assert_approx_tol(mean, 0.0, 0.05);
        assert_approx_tol(var.sqrt(), 1.0, 0.05);
    }

    #[test]
    fn retirement_year_grows_before_lump_sum_arrives() {
        let inputs = RetirementInputs {
            current_age: 58.0,
            retire_age: 60.0,
            life_expectancy: 62.0,
            plan_start_age: 58.0,
            current_savings: 100_000.0,
            expected_return_post: 10.0,
            retire_extra_expense: 1_000.0,
            retire_fund_other: 1_000_000.0,
            ..Default::default()
        };
        let result = simulate_seeded(&inputs, 3, 0.0, 1);

        assert_eq!(result.ages, vec![58.0, 59.0, 60.0, 61.0]);
        // 100_000 * 1.1 + 1_000_000 - 12_000, then 1_098_000 * 1.1 - 12_000
        let expected = [100_000.0, 100_000.0, 1_098_000.0, 1_195_800.0];
        for (actual, expected) in result.p50_series.iter().zip(expected) {
            assert_approx_tol(*actual, expected, 1e-6);
        }
        assert_approx_tol(result.p50, 1_195_800.0, 1e-6);
        // Reported separately, before the retirement year's growth.
        assert_approx_tol(result.median_retirement_balance, 1_100_000.0, 1e-6);
        assert_approx_tol(
            result.median_retirement_balance,
            project(&inputs).projected_fund,
            1e-6,
        );
        assert_eq!(result.probability, 1.0);
    }

    #[test]
    fn zero_volatility_paths_are_identical() {
        let inputs = sample_inputs();
        let deterministic = project(&inputs);
        let result = simulate_seeded(&inputs, 5, 0.0, 3);

        let first = result.simulations[0];
        assert!(result.simulations.iter().all(|t| *t == first));
        for y in 0..result.ages.len() {
            assert_eq!(result.p5_series[y], result.p95_series[y]);
        }
        assert_approx_tol(
            result.median_retirement_balance,
            deterministic.projected_fund,
            1e-6 * deterministic.projected_fund,
        );
    }

    #[test]
    fn already_retired_scenario_still_receives_other_fund() {
        let inputs = RetirementInputs {
            current_age: 65.0,
            retire_age: 60.0,
            life_expectancy: 70.0,
            plan_start_age: 65.0,
            current_savings: 100_000.0,
            retire_fund_other: 1_000_000.0,
            ..Default::default()
        };
        let result = simulate_seeded(&inputs, 3, 0.0, 1);

        assert_eq!(result.ages.first(), Some(&65.0));
        assert!(result.p50_series.iter().all(|b| (*b - 1_100_000.0).abs() < 1e-6));
        assert_approx_tol(result.median_retirement_balance, 1_100_000.0, 1e-6);
        assert_approx_tol(project(&inputs).projected_fund, 1_100_000.0, 1e-6);
    }

    #[test]
    fn non_finite_balances_are_clamped_to_zero() {
        for savings in [f64::NAN, f64::INFINITY] {
            let mut inputs = sample_inputs();
            inputs.current_savings = savings;
            let result = simulate_seeded(&inputs, 20, 6.0, 13);

            for series in [&result.p5_series, &result.p50_series, &result.p95_series] {
                assert!(series.iter().all(|b| b.is_finite() && *b >= 0.0));
            }
            assert!(result.median_retirement_balance.is_finite());
            assert!(result.simulations.iter().all(|t| t.balance.is_finite()));
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let inputs = sample_inputs();
        let a = simulate_seeded(&inputs, 200, 6.0, 42);
        let b = simulate_seeded(&inputs, 200, 6.0, 42);
        assert_eq!(a, b);

        let c = simulate_seeded(&inputs, 200, 6.0, 43);
        assert_ne!(a.simulations, c.simulations);
    }

    #[test]
    fn series_cover_every_simulated_year() {
        let result = simulate_seeded(&sample_inputs(), 50, 6.0, 1);
        assert_eq!(result.ages.len(), 55);
        assert_eq!(result.ages[0], 30.0);
        assert_eq!(result.ages[54], 84.0);
        assert_eq!(result.p50_series.len(), 55);
        assert_eq!(result.simulations.len(), 50);
        assert_eq!(result.p50, *result.p50_series.last().expect("series"));
    }

    #[test]
    fn running_out_of_money_fails_every_trial() {
        let mut inputs = sample_inputs();
        inputs.current_savings = 0.0;
        inputs.monthly_saving = 0.0;
        inputs.retire_monthly_income = 0.0;

        let result = simulate_seeded(&inputs, 100, 6.0, 9);
        assert_eq!(result.probability, 0.0);
        assert!(result.simulations.iter().all(|t| !t.pass && t.balance == 0.0));
        assert!(result.p95_series.iter().all(|b| *b >= 0.0));
    }

    #[test]
    fn ample_funds_pass_without_volatility() {
        let mut inputs = sample_inputs();
        inputs.current_savings = 50_000_000.0;
        let result = simulate_seeded(&inputs, 10, 0.0, 5);
        assert_eq!(result.probability, 1.0);
    }

    #[test]
    fn unmet_legacy_fails_even_when_money_lasts() {
        let mut inputs = sample_inputs();
        inputs.legacy_fund = 1e12;
        let result = simulate_seeded(&inputs, 10, 0.0, 5);
        assert!(result.simulations[0].balance > 0.0);
        assert_eq!(result.probability, 0.0);
    }

    #[test]
    fn zero_trials_yield_empty_result() {
        let result = simulate_seeded(&sample_inputs(), 0, 6.0, 5);
        assert_eq!(result.probability, 0.0);
        assert!(result.simulations.is_empty());
        assert!(result.p50_series.iter().all(|b| *b == 0.0));
    }

    #[test]
    fn unseeded_entry_point_runs() {
        let result = simulate(&sample_inputs(), 20, DEFAULT_VOLATILITY_PCT);
        assert!((0.0..=1.0).contains(&result.probability));
        assert_eq!(result.simulations.len(), 20);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_percentiles_are_ordered_and_probability_bounded(
            seed in any::<u64>(),
            volatility in 0.0f64..30.0,
            savings in 0.0f64..3_000_000.0,
            expense in 0.0f64..40_000.0,
        ) {
            let mut inputs = sample_inputs();
            inputs.current_savings = savings;
            inputs.retire_extra_expense = expense;

            let result = simulate_seeded(&inputs, 40, volatility, seed);
            prop_assert!((0.0..=1.0).contains(&result.probability));
            for y in 0..result.ages.len() {
                prop_assert!(result.p5_series[y] <= result.p50_series[y]);
                prop_assert!(result.p50_series[y] <= result.p95_series[y]);
                prop_assert!(result.p5_series[y] >= 0.0);
            }
            prop_assert!(result.p5 <= result.p50 && result.p50 <= result.p95);
        }
    }
}
