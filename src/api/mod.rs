use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;

use crate::core::{
    CalculationResult, DEFAULT_SIMULATIONS, DEFAULT_VOLATILITY_PCT, ModeFlags, MonteCarloResult,
    ProjectionSeries, RawForm, RetirementInputs, build_series, normalize, project,
    series_csv_string, simulate, simulate_seeded, write_series_csv,
};
use crate::error::PlanError;

pub const DEFAULT_PORT: u16 = 8080;
pub const MAX_SIMULATIONS: u32 = 100_000;

#[derive(Debug, Parser)]
#[command(
    name = "retireplan",
    about = "Retirement funding projections with insurance cash flows"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP API.
    Serve {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Project a scenario file and print the results as JSON.
    Project {
        /// Scenario document: `{ "form": {...}, "modes": {...} }`.
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SIMULATIONS)]
        trials: u32,
        /// Annual return volatility in percent.
        #[arg(long, default_value_t = DEFAULT_VOLATILITY_PCT)]
        volatility: f64,
        #[arg(long)]
        seed: Option<u64>,
        /// Also write the chart series here.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanRequest {
    pub form: RawForm,
    pub modes: ModeFlags,
}

impl PlanRequest {
    pub fn inputs(&self) -> RetirementInputs {
        normalize(&self.form, self.modes)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    form: RawForm,
    modes: ModeFlags,
    trials: Option<u32>,
    volatility: Option<f64>,
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub trials: u32,
    pub volatility: f64,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            trials: DEFAULT_SIMULATIONS,
            volatility: DEFAULT_VOLATILITY_PCT,
            seed: None,
        }
    }
}

impl SimulationSettings {
    pub fn validate(self) -> Result<Self, PlanError> {
        if self.trials > MAX_SIMULATIONS {
            return Err(PlanError::InvalidRequest(format!(
                "trials must be <= {MAX_SIMULATIONS}"
            )));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(PlanError::InvalidRequest(
                "volatility must be a non-negative percentage".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn run(&self, inputs: &RetirementInputs) -> MonteCarloResult {
        match self.seed {
            Some(seed) => simulate_seeded(inputs, self.trials, self.volatility, seed),
            None => simulate(inputs, self.trials, self.volatility),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub inputs: RetirementInputs,
    pub result: CalculationResult,
    pub series: ProjectionSeries,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReport {
    pub result: CalculationResult,
    pub monte_carlo: MonteCarloResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn plan_request_from_json(json: &str) -> Result<PlanRequest, PlanError> {
    Ok(serde_json::from_str(json)?)
}

fn simulate_request_from_json(
    json: &str,
) -> Result<(RetirementInputs, SimulationSettings), PlanError> {
    let payload: SimulatePayload = serde_json::from_str(json)?;
    let defaults = SimulationSettings::default();
    let settings = SimulationSettings {
        trials: payload.trials.unwrap_or(defaults.trials),
        volatility: payload.volatility.unwrap_or(defaults.volatility),
        seed: payload.seed,
    }
    .validate()?;
    Ok((normalize(&payload.form, payload.modes), settings))
}

pub fn build_plan_response(request: &PlanRequest) -> PlanResponse {
    let inputs = request.inputs();
    let result = project(&inputs);
    let series = build_series(&inputs, &result);
    PlanResponse {
        inputs,
        result,
        series,
    }
}

pub fn run_project(
    input: &Path,
    settings: SimulationSettings,
    csv_out: Option<&Path>,
) -> Result<String, PlanError> {
    let settings = settings.validate()?;
    let request = plan_request_from_json(&fs::read_to_string(input)?)?;
    let inputs = request.inputs();
    let result = project(&inputs);

    if let Some(path) = csv_out {
        let series = build_series(&inputs, &result);
        write_series_csv(&series, fs::File::create(path)?)?;
        info!("Wrote series CSV to {}", path.display());
    }

    let report = ProjectReport {
        monte_carlo: settings.run(&inputs),
        result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/plan", post(plan_handler))
        .route("/api/simulate", post(simulate_handler))
        .route("/api/series.csv", post(series_csv_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("Retirement plan API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/health");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_handler(body: String) -> Response {
    match plan_request_from_json(&body) {
        Ok(request) => json_response(StatusCode::OK, build_plan_response(&request)),
        Err(err) => plan_error_response(&err),
    }
}

async fn simulate_handler(body: String) -> Response {
    match simulate_request_from_json(&body) {
        Ok((inputs, settings)) => json_response(StatusCode::OK, settings.run(&inputs)),
        Err(err) => plan_error_response(&err),
    }
}

async fn series_csv_handler(body: String) -> Response {
    let csv = plan_request_from_json(&body).and_then(|request| {
        let inputs = request.inputs();
        let result = project(&inputs);
        series_csv_string(&build_series(&inputs, &result))
    });
    match csv {
        Ok(csv) => with_cache_control(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv)),
        Err(err) => plan_error_response(&err),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn plan_error_response(err: &PlanError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    warn!("Rejected request ({status}): {err}");
    error_response(status, &err.to_string())
}
