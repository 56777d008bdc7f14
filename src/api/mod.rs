use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    AmortizationYear, BreakEvenConfig, BreakEvenResult, GoalType, Inputs, Projection, SolveError,
    amortization_schedule, break_even_year, project, solve_break_even,
};

const MAX_YEARS_TO_COMPARE: u32 = 100;
const DEFAULT_TOLERANCE: f64 = 1.0;
const DEFAULT_MAX_ITERATIONS: u32 = 60;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    #[error("--home-price must be >= 0")]
    NegativeHomePrice,
    #[error("--down-payment-percent must be between 0 and 100")]
    DownPaymentOutOfRange,
    #[error("--interest-rate must be >= 0")]
    NegativeInterestRate,
    #[error("--loan-term must be >= 1")]
    LoanTermTooShort,
    #[error("--monthly-rent must be >= 0")]
    NegativeRent,
    #[error("--ownership-costs-rate must be >= 0")]
    NegativeOwnershipCosts,
    #[error("--market-growth-rate must be > -100")]
    MarketGrowthTooLow,
    #[error("--investment-return must be > -100")]
    InvestmentReturnTooLow,
    #[error("--years-to-compare must be <= {}", MAX_YEARS_TO_COMPARE)]
    HorizonTooLong,
    #[error("goal is required to solve for break-even")]
    MissingGoal,
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGoal {
    MaxHomePrice,
    MinMonthlyRent,
}

impl From<CliGoal> for GoalType {
    fn from(value: CliGoal) -> Self {
        match value {
            CliGoal::MaxHomePrice => GoalType::MaxHomePrice,
            CliGoal::MinMonthlyRent => GoalType::MinMonthlyRent,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoal {
    #[serde(alias = "maxHomePrice", alias = "max_home_price", alias = "price")]
    MaxHomePrice,
    #[serde(alias = "minMonthlyRent", alias = "min_monthly_rent", alias = "rent")]
    MinMonthlyRent,
}

impl From<ApiGoal> for CliGoal {
    fn from(value: ApiGoal) -> Self {
        match value {
            ApiGoal::MaxHomePrice => CliGoal::MaxHomePrice,
            ApiGoal::MinMonthlyRent => CliGoal::MinMonthlyRent,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    home_price: Option<f64>,
    down_payment_percent: Option<f64>,
    interest_rate: Option<f64>,
    loan_term: Option<u32>,
    monthly_rent: Option<f64>,
    ownership_costs_rate: Option<f64>,
    market_growth_rate: Option<f64>,
    investment_return: Option<f64>,
    years_to_compare: Option<u32>,

    goal: Option<ApiGoal>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "homecost",
    about = "Projects the cost of buying a home versus renting and investing the down payment"
)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Log at debug level unless RUST_LOG is set")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(default_value_t = 8080)]
        port: u16,
    },
    /// Run a single projection and print it as JSON
    Project(ProjectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, default_value_t = 400_000.0, help = "Purchase price at year 0")]
    home_price: f64,
    #[arg(long, default_value_t = 20.0, help = "Down payment in percent of the price")]
    down_payment_percent: f64,
    #[arg(long, default_value_t = 6.5, help = "Nominal annual mortgage rate in percent")]
    interest_rate: f64,
    #[arg(long, default_value_t = 30, help = "Mortgage term in years")]
    loan_term: u32,
    #[arg(long, default_value_t = 2_000.0, help = "Starting monthly rent")]
    monthly_rent: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Tax, HOA, insurance and maintenance in percent of current home value per year"
    )]
    ownership_costs_rate: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Annual home appreciation and rent inflation in percent"
    )]
    market_growth_rate: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        help = "Annual return on the renter's invested down payment in percent"
    )]
    investment_return: f64,
    #[arg(long, default_value_t = 20)]
    years_to_compare: u32,
    #[arg(long, value_enum, help = "Solve for the break-even value of one input")]
    solve: Option<CliGoal>,
    #[arg(long, help = "Lower solver bound; defaults to 0")]
    search_min: Option<f64>,
    #[arg(long, help = "Upper solver bound; defaults depend on the goal")]
    search_max: Option<f64>,
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    solve: Option<BreakEvenConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    #[serde(flatten)]
    projection: Projection,
    break_even_year: Option<u32>,
    amortization: Vec<AmortizationYear>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(args: &ProjectArgs) -> Result<Inputs, ApiError> {
    let finite = [
        ("--home-price", args.home_price),
        ("--down-payment-percent", args.down_payment_percent),
        ("--interest-rate", args.interest_rate),
        ("--monthly-rent", args.monthly_rent),
        ("--ownership-costs-rate", args.ownership_costs_rate),
        ("--market-growth-rate", args.market_growth_rate),
        ("--investment-return", args.investment_return),
    ];
    if let Some((flag, _)) = finite.iter().find(|(_, value)| !value.is_finite()) {
        return Err(ApiError::NonFinite(*flag));
    }

    if args.home_price < 0.0 {
        return Err(ApiError::NegativeHomePrice);
    }

    if !(0.0..=100.0).contains(&args.down_payment_percent) {
        return Err(ApiError::DownPaymentOutOfRange);
    }

    if args.interest_rate < 0.0 {
        return Err(ApiError::NegativeInterestRate);
    }

    if args.loan_term == 0 {
        return Err(ApiError::LoanTermTooShort);
    }

    if args.monthly_rent < 0.0 {
        return Err(ApiError::NegativeRent);
    }

    if args.ownership_costs_rate < 0.0 {
        return Err(ApiError::NegativeOwnershipCosts);
    }

    if args.market_growth_rate <= -100.0 {
        return Err(ApiError::MarketGrowthTooLow);
    }

    if args.investment_return <= -100.0 {
        return Err(ApiError::InvestmentReturnTooLow);
    }

    if args.years_to_compare > MAX_YEARS_TO_COMPARE {
        return Err(ApiError::HorizonTooLong);
    }

    Ok(Inputs {
        home_price: args.home_price,
        down_payment_percent: args.down_payment_percent,
        interest_rate: args.interest_rate,
        loan_term: args.loan_term,
        monthly_rent: args.monthly_rent,
        ownership_costs_rate: args.ownership_costs_rate,
        market_growth_rate: args.market_growth_rate,
        investment_return: args.investment_return,
        years_to_compare: args.years_to_compare,
    })
}

fn build_solve_config(args: &ProjectArgs) -> Option<BreakEvenConfig> {
    let goal_type: GoalType = args.solve?.into();
    let default_max = match goal_type {
        GoalType::MaxHomePrice => 10_000_000.0,
        GoalType::MinMonthlyRent => 50_000.0,
    };

    Some(BreakEvenConfig {
        goal_type,
        search_min: args.search_min.unwrap_or(0.0),
        search_max: args.search_max.unwrap_or(default_max),
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
    })
}

fn build_request(args: ProjectArgs) -> Result<ApiRequest, ApiError> {
    let inputs = build_inputs(&args)?;
    let solve = build_solve_config(&args);
    Ok(ApiRequest { inputs, solve })
}

fn build_project_response(inputs: &Inputs) -> ProjectResponse {
    let projection = project(inputs);
    let break_even_year = break_even_year(&projection);
    ProjectResponse {
        projection,
        break_even_year,
        amortization: amortization_schedule(inputs),
    }
}

fn solve_request(request: &ApiRequest) -> Result<BreakEvenResult, ApiError> {
    let config = request.solve.ok_or(ApiError::MissingGoal)?;
    Ok(solve_break_even(&request.inputs, config)?)
}

/// Runs the `project` subcommand and returns pretty-printed JSON.
pub fn run_project_command(args: ProjectArgs) -> Result<String, ApiError> {
    let request = build_request(args)?;
    let json = if request.solve.is_some() {
        serde_json::to_string_pretty(&solve_request(&request)?)?
    } else {
        serde_json::to_string_pretty(&build_project_response(&request.inputs))?
    };
    Ok(json)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/solve", get(solve_get_handler).post(solve_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "homecost HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn solve_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    solve_handler_impl(payload)
}

async fn solve_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    solve_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => return rejected(err),
    };

    debug!(
        years = request.inputs.years_to_compare,
        home_price = request.inputs.home_price,
        "projecting"
    );
    json_response(StatusCode::OK, build_project_response(&request.inputs))
}

fn solve_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => return rejected(err),
    };

    debug!(goal = ?request.solve.map(|c| c.goal_type), "solving break-even");
    match solve_request(&request) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => rejected(err),
    }
}

fn rejected(err: ApiError) -> Response {
    warn!(error = %err, "rejected request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, ApiError> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.home_price {
        args.home_price = v;
    }
    if let Some(v) = payload.down_payment_percent {
        args.down_payment_percent = v;
    }
    if let Some(v) = payload.interest_rate {
        args.interest_rate = v;
    }
    if let Some(v) = payload.loan_term {
        args.loan_term = v;
    }
    if let Some(v) = payload.monthly_rent {
        args.monthly_rent = v;
    }
    if let Some(v) = payload.ownership_costs_rate {
        args.ownership_costs_rate = v;
    }
    if let Some(v) = payload.market_growth_rate {
        args.market_growth_rate = v;
    }
    if let Some(v) = payload.investment_return {
        args.investment_return = v;
    }
    if let Some(v) = payload.years_to_compare {
        args.years_to_compare = v;
    }

    args.solve = payload.goal.map(Into::into);
    args.search_min = payload.search_min;
    args.search_max = payload.search_max;
    if let Some(v) = payload.tolerance {
        args.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        args.max_iterations = v;
    }

    build_request(args)
}

fn default_args_for_api() -> ProjectArgs {
    ProjectArgs {
        home_price: 400_000.0,
        down_payment_percent: 20.0,
        interest_rate: 6.5,
        loan_term: 30,
        monthly_rent: 2_000.0,
        ownership_costs_rate: 2.0,
        market_growth_rate: 3.0,
        investment_return: 7.0,
        years_to_compare: 20,
        solve: None,
        search_min: None,
        search_max: None,
        tolerance: DEFAULT_TOLERANCE,
        max_iterations: DEFAULT_MAX_ITERATIONS,
    }
}
