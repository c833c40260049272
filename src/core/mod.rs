mod insurance;
mod normalize;
mod projector;
mod series;
mod simulator;
pub mod types;

pub use insurance::{
    PlanCashFlow, cash_flow_and_death_benefit, pension_for_age, surrender_value, total_cash_flow,
};
pub use normalize::{ModeFlags, RawForm, RawInsurancePlan, RawValue, normalize, parse_number};
pub use projector::{annuity_payment, expense_schedule, project};
pub use series::{build_series, series_csv_string, write_series_csv};
pub use simulator::{
    DEFAULT_SIMULATIONS, DEFAULT_VOLATILITY_PCT, NormalSampler, simulate, simulate_seeded,
    simulate_with_rng,
};
pub use types::{
    CalculationResult, InsurancePlan, MonteCarloResult, PolicyType, ProjectionSeries,
    RetirementInputs, Status,
};
