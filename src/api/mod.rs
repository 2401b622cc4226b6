pub mod dataset;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use crate::core::{
    AffordabilityResult, AffordabilitySummary, DEFAULT_DEPOSIT_PERCENT,
    DEFAULT_INTEREST_RATE_PERCENT, DEFAULT_LOAN_TERM_YEARS, DEFAULT_REFERENCE_YEAR,
    DEFAULT_STATISTICS, Deposit, HouseholdSettings, HousingMode, IncomeProfile, InflationSeries,
    LivingCosts, MortgageType, OwnerCosts, PostcodeStats, PriceMode, PricePoints, TaxSchedule,
    household_defaults, recompute_all, summarize,
};

const MAX_LOAN_TERM_YEARS: u32 = 50;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliHousingMode {
    Rent,
    Buy,
}

impl From<CliHousingMode> for HousingMode {
    fn from(value: CliHousingMode) -> Self {
        match value {
            CliHousingMode::Rent => HousingMode::Rent,
            CliHousingMode::Buy => HousingMode::Buy,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDepositMode {
    Percent,
    Amount,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliMortgageType {
    Io,
    Pi,
}

impl From<CliMortgageType> for MortgageType {
    fn from(value: CliMortgageType) -> Self {
        match value {
            CliMortgageType::Io => MortgageType::InterestOnly,
            CliMortgageType::Pi => MortgageType::PrincipalAndInterest,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPriceMode {
    Q1,
    Median,
    Q3,
}

impl From<CliPriceMode> for PriceMode {
    fn from(value: CliPriceMode) -> Self {
        match value {
            CliPriceMode::Q1 => PriceMode::Q1,
            CliPriceMode::Median => PriceMode::Median,
            CliPriceMode::Q3 => PriceMode::Q3,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiHousingMode {
    #[serde(alias = "Rent", alias = "renting")]
    Rent,
    #[serde(alias = "Buy", alias = "buying")]
    Buy,
}

impl From<ApiHousingMode> for CliHousingMode {
    fn from(value: ApiHousingMode) -> Self {
        match value {
            ApiHousingMode::Rent => CliHousingMode::Rent,
            ApiHousingMode::Buy => CliHousingMode::Buy,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiDepositMode {
    #[serde(alias = "Percent", alias = "percentage")]
    Percent,
    #[serde(alias = "Amount", alias = "fixed")]
    Amount,
}

impl From<ApiDepositMode> for CliDepositMode {
    fn from(value: ApiDepositMode) -> Self {
        match value {
            ApiDepositMode::Percent => CliDepositMode::Percent,
            ApiDepositMode::Amount => CliDepositMode::Amount,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
enum ApiMortgageType {
    #[serde(rename = "IO", alias = "io", alias = "interest-only", alias = "interestOnly")]
    InterestOnly,
    #[serde(
        rename = "PI",
        alias = "pi",
        alias = "principal-and-interest",
        alias = "principalAndInterest"
    )]
    PrincipalAndInterest,
}

impl From<ApiMortgageType> for CliMortgageType {
    fn from(value: ApiMortgageType) -> Self {
        match value {
            ApiMortgageType::InterestOnly => CliMortgageType::Io,
            ApiMortgageType::PrincipalAndInterest => CliMortgageType::Pi,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiPriceMode {
    #[serde(alias = "Q1", alias = "p25")]
    Q1,
    #[serde(alias = "Median", alias = "p50")]
    Median,
    #[serde(alias = "Q3", alias = "p75")]
    Q3,
}

impl From<ApiPriceMode> for CliPriceMode {
    fn from(value: ApiPriceMode) -> Self {
        match value {
            ApiPriceMode::Q1 => CliPriceMode::Q1,
            ApiPriceMode::Median => CliPriceMode::Median,
            ApiPriceMode::Q3 => CliPriceMode::Q3,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PostcodePayload {
    postcode: String,
    median_rent: Option<f64>,
    q1_rent: Option<f64>,
    q3_rent: Option<f64>,
    median_sales_price: Option<f64>,
    q1_sales_price: Option<f64>,
    q3_sales_price: Option<f64>,
}

impl From<PostcodePayload> for PostcodeStats {
    fn from(value: PostcodePayload) -> Self {
        PostcodeStats {
            postcode: value.postcode,
            weekly_rent: PricePoints {
                q1: value.q1_rent,
                median: value.median_rent,
                q3: value.q3_rent,
            },
            sales_price_thousands: PricePoints {
                q1: value.q1_sales_price,
                median: value.median_sales_price,
                q3: value.q3_sales_price,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AffordabilityPayload {
    net_income: Option<f64>,
    utilities: Option<f64>,
    food: Option<f64>,
    transport: Option<f64>,
    other: Option<f64>,

    housing_mode: Option<ApiHousingMode>,
    deposit_mode: Option<ApiDepositMode>,
    deposit_percent: Option<f64>,
    deposit_amount: Option<f64>,
    mortgage_type: Option<ApiMortgageType>,
    interest_rate: Option<f64>,
    loan_term: Option<u32>,

    strata: Option<f64>,
    council: Option<f64>,
    water: Option<f64>,
    maintenance: Option<f64>,

    year: Option<i32>,
    price_mode: Option<ApiPriceMode>,
    postcodes: Vec<PostcodePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct TaxQuery {
    net: Option<f64>,
    gross: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsQuery {
    year: Option<i32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "afford",
    about = "Housing affordability by postcode (30% rule + cash leftover after living costs)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Log filter directives, e.g. debug or engine=debug; defaults to RUST_LOG then info"
    )]
    pub log_filter: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute affordability for every postcode in a CSV dataset
    Report(ReportArgs),
    /// Convert between net and gross annual income
    Tax(TaxArgs),
    /// Print the inflation-adjusted default household settings
    Defaults(DefaultsArgs),
    /// Serve the JSON API over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[arg(long, help = "Postcode CSV (sales prices in thousands)")]
    postcodes: PathBuf,
    #[arg(long, value_enum, default_value_t = CliPriceMode::Median)]
    price_mode: CliPriceMode,
    #[arg(long, help = "Print the full report as JSON")]
    json: bool,
    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Args, Debug)]
struct TaxArgs {
    #[arg(long, conflicts_with = "gross", required_unless_present = "gross")]
    net: Option<f64>,
    #[arg(long)]
    gross: Option<f64>,
}

#[derive(Args, Debug)]
struct DefaultsArgs {
    #[arg(long, default_value_t = DEFAULT_REFERENCE_YEAR)]
    year: i32,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[derive(Args, Debug, Clone)]
struct SettingsArgs {
    #[arg(
        long,
        help = "Household net annual income; defaults to the inflation-adjusted median"
    )]
    net_income: Option<f64>,
    #[arg(long, help = "Weekly utilities; defaults to the inflation-adjusted average")]
    utilities: Option<f64>,
    #[arg(long, help = "Weekly food; defaults to the inflation-adjusted average")]
    food: Option<f64>,
    #[arg(long, help = "Weekly transport; defaults to the inflation-adjusted average")]
    transport: Option<f64>,
    #[arg(long, default_value_t = 0.0, help = "Other weekly living costs")]
    other: f64,
    #[arg(long, value_enum, default_value_t = CliHousingMode::Rent)]
    housing_mode: CliHousingMode,
    #[arg(long, value_enum, default_value_t = CliDepositMode::Percent)]
    deposit_mode: CliDepositMode,
    #[arg(
        long,
        default_value_t = DEFAULT_DEPOSIT_PERCENT,
        help = "Deposit as percent of price, used when --deposit-mode=percent"
    )]
    deposit_percent: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Fixed deposit, used when --deposit-mode=amount"
    )]
    deposit_amount: f64,
    #[arg(long, value_enum, default_value_t = CliMortgageType::Pi)]
    mortgage_type: CliMortgageType,
    #[arg(
        long,
        default_value_t = DEFAULT_INTEREST_RATE_PERCENT,
        help = "Annual interest rate in percent"
    )]
    interest_rate: f64,
    #[arg(long, default_value_t = DEFAULT_LOAN_TERM_YEARS, help = "Loan term in years")]
    loan_term: u32,
    #[arg(long, default_value_t = 0.0, help = "Weekly strata levies")]
    strata: f64,
    #[arg(long, default_value_t = 0.0, help = "Weekly council rates")]
    council: f64,
    #[arg(long, default_value_t = 0.0, help = "Weekly water rates")]
    water: f64,
    #[arg(long, default_value_t = 0.0, help = "Weekly maintenance allowance")]
    maintenance: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_REFERENCE_YEAR,
        help = "Year the default income and living costs are inflated to"
    )]
    year: i32,
}

#[derive(Debug)]
struct ApiRequest {
    settings: HouseholdSettings,
    price_mode: PriceMode,
    records: Vec<PostcodeStats>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AffordabilityResponse {
    price_mode: PriceMode,
    settings: HouseholdSettings,
    income: Option<IncomeProfile>,
    summary: AffordabilitySummary,
    results: Vec<AffordabilityResult>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct TaxResponse {
    net: f64,
    gross: f64,
    tax: f64,
    marginal_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdjustedStatistic {
    label: &'static str,
    base: f64,
    base_year: i32,
    value: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DefaultsResponse {
    year: i32,
    settings: HouseholdSettings,
    statistics: Vec<AdjustedStatistic>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_settings(args: SettingsArgs) -> Result<HouseholdSettings, String> {
    let defaults = household_defaults(args.year);
    let net_income = args.net_income.unwrap_or(defaults.net_annual_income);
    let living_costs = LivingCosts {
        utilities: args.utilities.unwrap_or(defaults.living_costs.utilities),
        food: args.food.unwrap_or(defaults.living_costs.food),
        transport: args.transport.unwrap_or(defaults.living_costs.transport),
        other: args.other,
    };
    let owner_costs = OwnerCosts {
        strata: args.strata,
        council: args.council,
        water: args.water,
        maintenance: args.maintenance,
    };

    if !net_income.is_finite() || net_income < 0.0 {
        return Err("--net-income must be >= 0".to_string());
    }

    for (name, value) in [
        ("--utilities", living_costs.utilities),
        ("--food", living_costs.food),
        ("--transport", living_costs.transport),
        ("--other", living_costs.other),
        ("--strata", owner_costs.strata),
        ("--council", owner_costs.council),
        ("--water", owner_costs.water),
        ("--maintenance", owner_costs.maintenance),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !(0.0..=100.0).contains(&args.interest_rate) {
        return Err("--interest-rate must be between 0 and 100".to_string());
    }

    if args.loan_term == 0 || args.loan_term > MAX_LOAN_TERM_YEARS {
        return Err(format!(
            "--loan-term must be between 1 and {MAX_LOAN_TERM_YEARS}"
        ));
    }

    let deposit = match args.deposit_mode {
        CliDepositMode::Percent => {
            if !(0.0..=100.0).contains(&args.deposit_percent) {
                return Err("--deposit-percent must be between 0 and 100".to_string());
            }
            Deposit::Percent(args.deposit_percent)
        }
        CliDepositMode::Amount => {
            if !args.deposit_amount.is_finite() || args.deposit_amount < 0.0 {
                return Err("--deposit-amount must be >= 0".to_string());
            }
            Deposit::Amount(args.deposit_amount)
        }
    };

    Ok(HouseholdSettings {
        net_annual_income: net_income,
        living_costs,
        housing_mode: args.housing_mode.into(),
        deposit,
        mortgage_type: args.mortgage_type.into(),
        interest_rate_percent: args.interest_rate,
        loan_term_years: args.loan_term,
        owner_costs,
    })
}

fn convert_tax(net: Option<f64>, gross: Option<f64>) -> Result<TaxResponse, String> {
    let schedule = TaxSchedule::australia_2024_25();
    let (net, gross) = match (net, gross) {
        (Some(net), None) => {
            let gross = schedule.net_to_gross(net).map_err(|e| e.to_string())?;
            (net.max(0.0), gross)
        }
        (None, Some(gross)) => {
            let net = schedule.gross_to_net(gross).map_err(|e| e.to_string())?;
            (net, gross.max(0.0))
        }
        _ => return Err("exactly one of net or gross is required".to_string()),
    };
    Ok(TaxResponse {
        net,
        gross,
        tax: gross - net,
        marginal_rate: schedule.marginal_rate(gross).map_err(|e| e.to_string())?,
    })
}

fn build_defaults_response(year: i32) -> DefaultsResponse {
    let cpi = InflationSeries::australia_cpi();
    DefaultsResponse {
        year,
        settings: household_defaults(year),
        statistics: DEFAULT_STATISTICS
            .iter()
            .map(|stat| AdjustedStatistic {
                label: stat.label,
                base: stat.base,
                base_year: stat.base_year,
                value: stat.adjusted_to(year, cpi),
            })
            .collect(),
    }
}

fn build_affordability_response(request: ApiRequest) -> AffordabilityResponse {
    let recompute = recompute_all(&request.records, &request.settings, request.price_mode);
    AffordabilityResponse {
        price_mode: request.price_mode,
        summary: summarize(&recompute.results),
        income: recompute.income,
        results: recompute.results,
        settings: request.settings,
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Report(args) => run_report(args),
        Command::Tax(args) => {
            let response = convert_tax(args.net, args.gross).map_err(anyhow::Error::msg)?;
            println!(
                "net {:.2}  gross {:.2}  tax {:.2}  marginal rate {:.0}%",
                response.net,
                response.gross,
                response.tax,
                response.marginal_rate * 100.0
            );
            Ok(())
        }
        Command::Defaults(args) => {
            let response = build_defaults_response(args.year);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Serve(args) => Ok(run_http_server(args.port).await?),
    }
}

fn run_report(args: ReportArgs) -> anyhow::Result<()> {
    use anyhow::Context;

    let file = File::open(&args.postcodes)
        .with_context(|| format!("failed to open {}", args.postcodes.display()))?;
    let records = dataset::read_postcodes(file)
        .with_context(|| format!("failed to read postcodes from {}", args.postcodes.display()))?;
    let settings = build_settings(args.settings).map_err(anyhow::Error::msg)?;
    tracing::info!(target: "api", records = records.len(), "dataset_loaded");

    let response = build_affordability_response(ApiRequest {
        settings,
        price_mode: args.price_mode.into(),
        records,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!(
        "{:<8} {:>10} {:>8} {:>10} {:>10} {:>10}  {}",
        "postcode", "cost/wk", "% gross", "leftover", "q1/wk", "q3/wk", "bucket"
    );
    for result in &response.results {
        println!(
            "{:<8} {:>10.2} {:>8.1} {:>10} {:>10} {:>10}  {:?}",
            result.postcode,
            result.weekly_housing_cost,
            result.affordability_percentage,
            display_optional(result.weekly_money_leftover),
            display_optional(result.q1_weekly_payment),
            display_optional(result.q3_weekly_payment),
            result.bucket,
        );
    }
    let summary = &response.summary;
    println!(
        "{} postcodes, {} with data, {} affordable, {} cash-negative",
        summary.total, summary.with_data, summary.affordable, summary.cash_negative
    );
    Ok(())
}

fn display_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/affordability", post(affordability_handler))
        .route("/api/tax", get(tax_handler))
        .route("/api/defaults", get(defaults_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(target: "api", %addr, "http_api_listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn affordability_handler(Json(payload): Json<AffordabilityPayload>) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let response = build_affordability_response(request);
    tracing::info!(
        target: "api",
        records = response.summary.total,
        affordable = response.summary.affordable,
        "affordability_request"
    );
    json_response(StatusCode::OK, response)
}

async fn tax_handler(Query(query): Query<TaxQuery>) -> Response {
    match convert_tax(query.net, query.gross) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn defaults_handler(Query(query): Query<DefaultsQuery>) -> Response {
    let year = query.year.unwrap_or(DEFAULT_REFERENCE_YEAR);
    json_response(StatusCode::OK, build_defaults_response(year))
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
    let payload = serde_json::from_str::<AffordabilityPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: AffordabilityPayload) -> Result<ApiRequest, String> {
    let mut args = default_settings_args();
    let mut price_mode = CliPriceMode::Median;

    if let Some(v) = payload.net_income {
        args.net_income = Some(v);
    }
    if let Some(v) = payload.utilities {
        args.utilities = Some(v);
    }
    if let Some(v) = payload.food {
        args.food = Some(v);
    }
    if let Some(v) = payload.transport {
        args.transport = Some(v);
    }
    if let Some(v) = payload.other {
        args.other = v;
    }

    if let Some(v) = payload.housing_mode {
        args.housing_mode = v.into();
    }
    if let Some(v) = payload.deposit_mode {
        args.deposit_mode = v.into();
    }
    if let Some(v) = payload.deposit_percent {
        args.deposit_percent = v;
    }
    if let Some(v) = payload.deposit_amount {
        args.deposit_amount = v;
    }
    if let Some(v) = payload.mortgage_type {
        args.mortgage_type = v.into();
    }
    if let Some(v) = payload.interest_rate {
        args.interest_rate = v;
    }
    if let Some(v) = payload.loan_term {
        args.loan_term = v;
    }

    if let Some(v) = payload.strata {
        args.strata = v;
    }
    if let Some(v) = payload.council {
        args.council = v;
    }
    if let Some(v) = payload.water {
        args.water = v;
    }
    if let Some(v) = payload.maintenance {
        args.maintenance = v;
    }

    if let Some(v) = payload.year {
        args.year = v;
    }
    if let Some(v) = payload.price_mode {
        price_mode = v.into();
    }

    let settings = build_settings(args)?;
    Ok(ApiRequest {
        settings,
        price_mode: price_mode.into(),
        records: payload.postcodes.into_iter().map(PostcodeStats::from).collect(),
    })
}

fn default_settings_args() -> SettingsArgs {
    SettingsArgs {
        net_income: None,
        utilities: None,
        food: None,
        transport: None,
        other: 0.0,
        housing_mode: CliHousingMode::Rent,
        deposit_mode: CliDepositMode::Percent,
        deposit_percent: DEFAULT_DEPOSIT_PERCENT,
        deposit_amount: 0.0,
        mortgage_type: CliMortgageType::Pi,
        interest_rate: DEFAULT_INTEREST_RATE_PERCENT,
        loan_term: DEFAULT_LOAN_TERM_YEARS,
        strata: 0.0,
        council: 0.0,
        water: 0.0,
        maintenance: 0.0,
        year: DEFAULT_REFERENCE_YEAR,
    }
}
