mod error;

use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

pub use error::{ApiError, ApiResult};

use crate::core::{
    GeneralPension, LifeExpectancyCategory, ParameterTable, PayoutDuration, PayoutRule,
    PensionAccount, PensionInputs, PensionKind, RunConfig, SimulationInputs, Summary, TaxResult,
    ValidationWarning, WithdrawalPolicy, YearProjection, capital_duration, compute_yearly_tax,
    run_projection, summarize,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CliLifeExpectancy {
    Male,
    Female,
    Unspecified,
}

impl From<CliLifeExpectancy> for LifeExpectancyCategory {
    fn from(value: CliLifeExpectancy) -> Self {
        match value {
            CliLifeExpectancy::Male => LifeExpectancyCategory::Male,
            CliLifeExpectancy::Female => LifeExpectancyCategory::Female,
            CliLifeExpectancy::Unspecified => LifeExpectancyCategory::Unspecified,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPensionKind {
    Occupational,
    Private,
}

impl From<ApiPensionKind> for PensionKind {
    fn from(value: ApiPensionKind) -> Self {
        match value {
            ApiPensionKind::Occupational => PensionKind::Occupational,
            ApiPensionKind::Private => PensionKind::Private,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPayoutDuration {
    #[default]
    Lifelong,
    #[serde(alias = "untilDepleted", alias = "until_depleted")]
    UntilDepleted,
}

impl From<ApiPayoutDuration> for PayoutDuration {
    fn from(value: ApiPayoutDuration) -> Self {
        match value {
            ApiPayoutDuration::Lifelong => PayoutDuration::Lifelong,
            ApiPayoutDuration::UntilDepleted => PayoutDuration::UntilDepleted,
        }
    }
}

fn default_earliest_withdrawal_age() -> u32 {
    55
}

fn default_latest_withdrawal_age() -> u32 {
    75
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPensionAccount {
    name: String,
    kind: ApiPensionKind,
    #[serde(default)]
    current_value: f64,
    #[serde(default)]
    expected_monthly_pension: Option<f64>,
    withdrawal_age: u32,
    #[serde(default = "default_earliest_withdrawal_age")]
    earliest_withdrawal_age: u32,
    #[serde(default = "default_latest_withdrawal_age")]
    latest_withdrawal_age: u32,
    #[serde(default)]
    fixed_monthly_payout: Option<f64>,
    #[serde(default)]
    payout_duration: ApiPayoutDuration,
}

impl From<ApiPensionAccount> for PensionAccount {
    fn from(value: ApiPensionAccount) -> Self {
        PensionAccount {
            name: value.name,
            kind: value.kind.into(),
            current_value: value.current_value,
            expected_monthly_pension: value.expected_monthly_pension,
            withdrawal_age: value.withdrawal_age,
            earliest_withdrawal_age: value.earliest_withdrawal_age,
            latest_withdrawal_age: value.latest_withdrawal_age,
            policy: WithdrawalPolicy {
                payout: value
                    .fixed_monthly_payout
                    .map_or(PayoutRule::CapitalRatio, PayoutRule::FixedMonthly),
                duration: value.payout_duration.into(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    life_expectancy: Option<CliLifeExpectancy>,

    monthly_salary: Option<f64>,
    salary_growth_rate: Option<f64>,
    monthly_expenses: Option<f64>,
    liquid_savings: Option<f64>,
    isk_balance: Option<f64>,
    liquid_return_rate: Option<f64>,
    isk_return_rate: Option<f64>,

    income_pension_capital: Option<f64>,
    premium_pension_capital: Option<f64>,
    general_pension_monthly: Option<f64>,
    general_pension_age: Option<u32>,
    pension_accounts: Option<Vec<ApiPensionAccount>>,

    include_pensions: Option<bool>,
    use_custom_rates: Option<bool>,
    include_tax_details: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "livsplan",
    about = "Year-by-year personal finance projection with Swedish income, ISK and pension rules"
)]
pub struct Cli {
    #[arg(long)]
    current_age: u32,
    #[arg(long)]
    retirement_age: u32,
    #[arg(long, value_enum, default_value_t = CliLifeExpectancy::Unspecified)]
    life_expectancy: CliLifeExpectancy,
    #[arg(long, help = "Gross monthly salary before tax")]
    monthly_salary: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Annual real salary growth in percent"
    )]
    salary_growth_rate: f64,
    #[arg(long)]
    monthly_expenses: f64,
    #[arg(long, default_value_t = 0.0)]
    liquid_savings: f64,
    #[arg(long, default_value_t = 0.0, help = "Investment savings account balance")]
    isk_balance: f64,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Annual real return on liquid savings in percent"
    )]
    liquid_return_rate: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Annual real return on the investment savings account in percent"
    )]
    isk_return_rate: f64,
    #[arg(long, default_value_t = 0.0)]
    income_pension_capital: f64,
    #[arg(long, default_value_t = 0.0)]
    premium_pension_capital: f64,
    #[arg(
        long,
        help = "Estimated monthly general pension; derived from capital when omitted"
    )]
    general_pension_monthly: Option<f64>,
    #[arg(long, default_value_t = 65)]
    general_pension_age: u32,
    #[arg(long, help = "JSON file with an array of pension accounts")]
    pension_accounts: Option<PathBuf>,
    #[arg(long, help = "Ignore all pension data")]
    no_pensions: bool,
    #[arg(long, help = "Use the parameter table's returns instead of the given rates")]
    use_default_rates: bool,
    #[arg(long, help = "Attach itemised tax steps to every year")]
    tax_details: bool,
    #[arg(long, help = "JSON parameter table replacing the built-in one")]
    parameters: Option<PathBuf>,
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug)]
struct ProjectRequest {
    inputs: SimulationInputs,
    config: RunConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    parameter_version: String,
    projections: Vec<YearProjection>,
    summary: Summary,
    capital_duration: u32,
    warnings: Vec<ValidationWarning>,
    coercions: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxQuery {
    gross_income: f64,
    age: u32,
    isk_balance: f64,
    secondary_balance: f64,
    capital_gains: Option<f64>,
}

impl Default for TaxQuery {
    fn default() -> Self {
        Self {
            gross_income: 0.0,
            age: 40,
            isk_balance: 0.0,
            secondary_balance: 0.0,
            capital_gains: None,
        }
    }
}

type SharedParams = Arc<ParameterTable>;

fn build_request(cli: Cli, accounts: Vec<PensionAccount>) -> ApiResult<ProjectRequest> {
    for (flag, value) in [
        ("--monthly-salary", cli.monthly_salary),
        ("--salary-growth-rate", cli.salary_growth_rate),
        ("--monthly-expenses", cli.monthly_expenses),
        ("--liquid-savings", cli.liquid_savings),
        ("--isk-balance", cli.isk_balance),
        ("--liquid-return-rate", cli.liquid_return_rate),
        ("--isk-return-rate", cli.isk_return_rate),
        ("--income-pension-capital", cli.income_pension_capital),
        ("--premium-pension-capital", cli.premium_pension_capital),
    ] {
        if !value.is_finite() {
            return Err(ApiError::invalid(flag, "must be a finite number"));
        }
    }
    if cli.salary_growth_rate <= -100.0 {
        return Err(ApiError::invalid(
            "--salary-growth-rate",
            "must be greater than -100",
        ));
    }

    let has_pension_data = cli.income_pension_capital > 0.0
        || cli.premium_pension_capital > 0.0
        || cli.general_pension_monthly.is_some()
        || !accounts.is_empty();
    let pensions = has_pension_data.then(|| PensionInputs {
        general: GeneralPension {
            income_pension_capital: cli.income_pension_capital,
            premium_pension_capital: cli.premium_pension_capital,
            estimated_monthly: cli.general_pension_monthly,
            withdrawal_age: cli.general_pension_age,
        },
        accounts,
    });

    Ok(ProjectRequest {
        inputs: SimulationInputs {
            current_age: cli.current_age,
            life_expectancy_category: cli.life_expectancy.into(),
            retirement_age: cli.retirement_age,
            monthly_salary: cli.monthly_salary,
            salary_growth_rate: cli.salary_growth_rate / 100.0,
            monthly_expenses: cli.monthly_expenses,
            liquid_savings: cli.liquid_savings,
            isk_balance: cli.isk_balance,
            liquid_return_rate: cli.liquid_return_rate / 100.0,
            isk_return_rate: cli.isk_return_rate / 100.0,
            pensions,
        },
        config: RunConfig {
            include_pensions: !cli.no_pensions,
            use_custom_rates: !cli.use_default_rates,
            include_tax_details: cli.tax_details,
        },
    })
}

fn evaluate(request: &ProjectRequest, params: &ParameterTable) -> ApiResult<ProjectResponse> {
    let run = run_projection(&request.inputs, params, &request.config)?;
    let summary = summarize(&run.projections, &request.inputs, &request.config);
    let duration = capital_duration(&run.projections, request.inputs.retirement_age);
    Ok(ProjectResponse {
        parameter_version: params.version.clone(),
        projections: run.projections,
        summary,
        capital_duration: duration,
        warnings: run.warnings,
        coercions: run.coercions,
    })
}

fn read_file(flag: &str, path: &Path) -> ApiResult<String> {
    fs::read_to_string(path)
        .map_err(|e| ApiError::invalid(flag, format!("cannot read {}: {e}", path.display())))
}

fn load_parameters(path: &Path) -> ApiResult<ParameterTable> {
    let table = serde_json::from_str(&read_file("--parameters", path)?)?;
    debug!(path = %path.display(), "loaded parameter table");
    Ok(table)
}

fn load_pension_accounts(path: &Path) -> ApiResult<Vec<PensionAccount>> {
    let accounts: Vec<ApiPensionAccount> =
        serde_json::from_str(&read_file("--pension-accounts", path)?)?;
    Ok(accounts.into_iter().map(PensionAccount::from).collect())
}

pub fn run_cli(mut cli: Cli) -> ApiResult<String> {
    let params = match cli.parameters.take() {
        Some(path) => load_parameters(&path)?,
        None => ParameterTable::swedish_2025(),
    };
    let accounts = match cli.pension_accounts.take() {
        Some(path) => load_pension_accounts(&path)?,
        None => Vec::new(),
    };
    let pretty = cli.pretty;
    let request = build_request(cli, accounts)?;
    let response = evaluate(&request, &params)?;
    let rendered = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    Ok(rendered)
}

pub async fn run_http_server(port: u16, params: ParameterTable) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(Arc::new(params));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "livsplan HTTP API listening");

    axum::serve(listener, app).await
}

fn router(params: SharedParams) -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/tax", get(tax_handler))
        .route("/api/parameters", get(parameters_handler))
        .fallback(not_found_handler)
        .with_state(params)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    State(params): State<SharedParams>,
    payload: Result<Query<ProjectPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(params, payload).await,
        Err(rejection) => ApiError::invalid("query", rejection.body_text()).into_response(),
    }
}

async fn project_post_handler(
    State(params): State<SharedParams>,
    payload: Result<Json<ProjectPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(params, payload).await,
        Err(rejection) => ApiError::Serialization(rejection.body_text()).into_response(),
    }
}

async fn project_handler_impl(params: SharedParams, payload: ProjectPayload) -> Response {
    let request = match project_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    let outcome = tokio::task::spawn_blocking(move || evaluate(&request, &params))
        .await
        .map_err(ApiError::from)
        .and_then(|result| result);

    match outcome {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => err.into_response(),
    }
}

async fn tax_handler(
    State(params): State<SharedParams>,
    query: Result<Query<TaxQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return ApiError::invalid("query", rejection.body_text()).into_response();
        }
    };
    match compute_tax(&params, &query) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) => err.into_response(),
    }
}

async fn parameters_handler(State(params): State<SharedParams>) -> Response {
    json_response(StatusCode::OK, params.as_ref())
}

fn compute_tax(params: &ParameterTable, query: &TaxQuery) -> ApiResult<TaxResult> {
    for (field, value) in [
        ("grossIncome", query.gross_income),
        ("iskBalance", query.isk_balance),
        ("secondaryBalance", query.secondary_balance),
        ("capitalGains", query.capital_gains.unwrap_or(0.0)),
    ] {
        if !value.is_finite() {
            return Err(ApiError::invalid(field, "must be a finite number"));
        }
    }
    Ok(compute_yearly_tax(
        params,
        query.gross_income,
        query.age,
        query.isk_balance,
        query.secondary_balance,
        query.capital_gains,
    ))
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
    json_response(status, serde_json::json!({ "error": msg }))
}

#[cfg(test)]
fn project_request_from_json(json: &str) -> ApiResult<ProjectRequest> {
    let payload = serde_json::from_str::<ProjectPayload>(json)?;
    project_request_from_payload(payload)
}

fn project_request_from_payload(payload: ProjectPayload) -> ApiResult<ProjectRequest> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.life_expectancy {
        cli.life_expectancy = v;
    }
    if let Some(v) = payload.monthly_salary {
        cli.monthly_salary = v;
    }
    if let Some(v) = payload.salary_growth_rate {
        cli.salary_growth_rate = v;
    }
    if let Some(v) = payload.monthly_expenses {
        cli.monthly_expenses = v;
    }
    if let Some(v) = payload.liquid_savings {
        cli.liquid_savings = v;
    }
    if let Some(v) = payload.isk_balance {
        cli.isk_balance = v;
    }
    if let Some(v) = payload.liquid_return_rate {
        cli.liquid_return_rate = v;
    }
    if let Some(v) = payload.isk_return_rate {
        cli.isk_return_rate = v;
    }
    if let Some(v) = payload.income_pension_capital {
        cli.income_pension_capital = v;
    }
    if let Some(v) = payload.premium_pension_capital {
        cli.premium_pension_capital = v;
    }
    if let Some(v) = payload.general_pension_monthly {
        cli.general_pension_monthly = Some(v);
    }
    if let Some(v) = payload.general_pension_age {
        cli.general_pension_age = v;
    }
    if let Some(v) = payload.include_pensions {
        cli.no_pensions = !v;
    }
    if let Some(v) = payload.use_custom_rates {
        cli.use_default_rates = !v;
    }
    if let Some(v) = payload.include_tax_details {
        cli.tax_details = v;
    }

    let accounts = payload
        .pension_accounts
        .unwrap_or_default()
        .into_iter()
        .map(PensionAccount::from)
        .collect();

    build_request(cli, accounts)
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 35,
        retirement_age: 65,
        life_expectancy: CliLifeExpectancy::Unspecified,
        monthly_salary: 45_000.0,
        salary_growth_rate: 2.0,
        monthly_expenses: 25_000.0,
        liquid_savings: 100_000.0,
        isk_balance: 250_000.0,
        liquid_return_rate: 1.0,
        isk_return_rate: 5.0,
        income_pension_capital: 600_000.0,
        premium_pension_capital: 150_000.0,
        general_pension_monthly: None,
        general_pension_age: 65,
        pension_accounts: None,
        no_pensions: false,
        use_default_rates: false,
        tax_details: false,
        parameters: None,
        pretty: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    fn shared_params() -> SharedParams {
        Arc::new(ParameterTable::swedish_2025())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        serde_json::from_slice(&bytes).expect("JSON body")
    }

    fn assert_no_store(response: &Response) {
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
    }

    #[test]
    fn build_request_converts_percent_rates_to_fractions() {
        let request = build_request(sample_cli(), Vec::new()).expect("valid cli");
        assert_approx(request.inputs.salary_growth_rate, 0.02);
        assert_approx(request.inputs.liquid_return_rate, 0.01);
        assert_approx(request.inputs.isk_return_rate, 0.05);
        assert_eq!(request.config, RunConfig::default());
    }

    #[test]
    fn build_request_rejects_non_finite_amounts() {
        let mut cli = sample_cli();
        cli.monthly_expenses = f64::NAN;
        let err = build_request(cli, Vec::new()).expect_err("NaN must be rejected");
        assert!(err.to_string().contains("--monthly-expenses"));
    }

    #[test]
    fn build_request_rejects_growth_at_or_below_minus_hundred_percent() {
        let mut cli = sample_cli();
        cli.salary_growth_rate = -100.0;
        let err = build_request(cli, Vec::new()).expect_err("must reject");
        assert!(err.to_string().contains("--salary-growth-rate"));
    }

    #[test]
    fn build_request_omits_pensions_when_no_pension_data_given() {
        let mut cli = sample_cli();
        cli.income_pension_capital = 0.0;
        cli.premium_pension_capital = 0.0;
        let request = build_request(cli, Vec::new()).expect("valid cli");
        assert!(request.inputs.pensions.is_none());
    }

    #[test]
    fn build_request_maps_flags_onto_run_config() {
        let mut cli = sample_cli();
        cli.no_pensions = true;
        cli.use_default_rates = true;
        cli.tax_details = true;
        let request = build_request(cli, Vec::new()).expect("valid cli");
        assert_eq!(
            request.config,
            RunConfig {
                include_pensions: false,
                use_custom_rates: false,
                include_tax_details: true,
            }
        );
    }

    #[test]
    fn cli_parses_flags_in_percent() {
        let cli = Cli::try_parse_from([
            "livsplan",
            "--current-age",
            "40",
            "--retirement-age",
            "65",
            "--life-expectancy",
            "female",
            "--monthly-salary",
            "40000",
            "--monthly-expenses",
            "20000",
            "--isk-return-rate",
            "6.5",
            "--tax-details",
        ])
        .expect("valid arguments");
        let request = build_request(cli, Vec::new()).expect("valid cli");
        assert_eq!(request.inputs.current_age, 40);
        assert_eq!(
            request.inputs.life_expectancy_category,
            LifeExpectancyCategory::Female
        );
        assert_approx(request.inputs.isk_return_rate, 0.065);
        assert!(request.config.include_tax_details);
    }

    #[test]
    fn project_request_from_json_parses_web_keys() {
        let request = project_request_from_json(
            r#"{
                "currentAge": 45,
                "retirementAge": 67,
                "lifeExpectancy": "male",
                "monthlySalary": 52000,
                "salaryGrowthRate": 1.5,
                "iskBalance": 10000,
                "includeTaxDetails": true,
                "useCustomRates": false,
                "pensionAccounts": [
                    {
                        "name": "ITP1",
                        "kind": "occupational",
                        "currentValue": 400000,
                        "withdrawalAge": 65
                    },
                    {
                        "name": "IPS",
                        "kind": "private",
                        "currentValue": 90000,
                        "withdrawalAge": 60,
                        "fixedMonthlyPayout": 2500,
                        "payoutDuration": "until-depleted"
                    }
                ]
            }"#,
        )
        .expect("valid payload");

        let inputs = &request.inputs;
        assert_eq!(inputs.current_age, 45);
        assert_eq!(inputs.retirement_age, 67);
        assert_eq!(inputs.life_expectancy_category, LifeExpectancyCategory::Male);
        assert_approx(inputs.monthly_salary, 52_000.0);
        assert_approx(inputs.salary_growth_rate, 0.015);
        assert_approx(inputs.isk_balance, 10_000.0);
        assert_approx(inputs.monthly_expenses, 25_000.0);
        assert!(request.config.include_tax_details);
        assert!(!request.config.use_custom_rates);

        let pensions = inputs.pensions.as_ref().expect("pension data");
        assert_eq!(pensions.accounts.len(), 2);
        let itp = &pensions.accounts[0];
        assert_eq!(itp.kind, PensionKind::Occupational);
        assert_eq!(itp.earliest_withdrawal_age, 55);
        assert_eq!(itp.policy.payout, PayoutRule::CapitalRatio);
        assert_eq!(itp.policy.duration, PayoutDuration::Lifelong);
        let ips = &pensions.accounts[1];
        assert_eq!(ips.policy.payout, PayoutRule::FixedMonthly(2_500.0));
        assert_eq!(ips.policy.duration, PayoutDuration::UntilDepleted);
    }

    #[test]
    fn empty_payload_uses_sample_profile() {
        let request = project_request_from_json("{}").expect("defaults are valid");
        let expected = build_request(default_cli_for_api(), Vec::new()).expect("defaults");
        assert_eq!(request.inputs, expected.inputs);
        assert_eq!(request.config, expected.config);
    }

    #[test]
    fn malformed_payload_is_a_serialization_error() {
        let err = project_request_from_json(r#"{"currentAge": "old"}"#).expect_err("bad type");
        assert!(matches!(err, ApiError::Serialization(_)));
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let request = build_request(sample_cli(), Vec::new()).expect("valid cli");
        let response =
            evaluate(&request, &ParameterTable::swedish_2025()).expect("valid projection");
        let json = serde_json::to_value(&response).expect("serializable");

        assert_eq!(json["parameterVersion"], "SE-2025");
        let projections = json["projections"].as_array().expect("array");
        assert_eq!(projections.len(), (83 - 35 + 1) as usize);
        let first = &projections[0];
        for key in ["year", "age", "salary", "expenses", "savings", "netWorth"] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
        assert!(first["calculations"].get("municipalTax").is_some());
        assert!(first["calculations"].get("taxDetails").is_none());
        assert!(first["pensionIncome"].get("general").is_some());
        assert!(json["summary"].get("maxNetWorth").is_some());
        assert!(json["summary"]["pension"].get("initialPensionCapital").is_some());
        assert!(json.get("capitalDuration").is_some());
        assert!(json["warnings"].as_array().is_some());
        assert_eq!(json["coercions"], 0);
    }

    #[test]
    fn run_cli_rejects_missing_parameter_file() {
        let mut cli = sample_cli();
        cli.parameters = Some(PathBuf::from("/nonexistent/livsplan-params.json"));
        let err = run_cli(cli).expect_err("missing file");
        assert!(matches!(err, ApiError::InvalidParameter { .. }));
    }

    #[test]
    fn run_cli_reports_validation_failure() {
        let mut cli = sample_cli();
        cli.retirement_age = 30;
        let err = run_cli(cli).expect_err("invalid ages");
        match err {
            ApiError::Validation(report) => assert!(!report.errors.is_empty()),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn run_cli_renders_json() {
        let output = run_cli(sample_cli()).expect("valid run");
        let json: Value = serde_json::from_str(&output).expect("JSON output");
        assert!(json["projections"].as_array().is_some_and(|p| !p.is_empty()));
    }

    #[test]
    fn compute_tax_rejects_non_finite_query_values() {
        let query = TaxQuery {
            isk_balance: f64::INFINITY,
            ..TaxQuery::default()
        };
        let err = compute_tax(&ParameterTable::swedish_2025(), &query).expect_err("inf");
        assert!(err.to_string().contains("iskBalance"));
    }

    #[tokio::test]
    async fn project_handler_returns_projections_with_no_store() {
        let response = project_handler_impl(shared_params(), ProjectPayload::default()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_no_store(&response);
        let json = body_json(response).await;
        assert!(json["projections"].as_array().is_some_and(|p| !p.is_empty()));
    }

    #[tokio::test]
    async fn validation_failure_is_unprocessable_with_empty_projections() {
        let payload = ProjectPayload {
            current_age: Some(90),
            monthly_expenses: Some(60_000.0),
            ..ProjectPayload::default()
        };
        let response = project_handler_impl(shared_params(), payload).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_no_store(&response);
        let json = body_json(response).await;
        let errors = json["errors"].as_array().expect("errors");
        assert!(
            errors
                .iter()
                .any(|e| e.as_str().is_some_and(|s| s.contains("between 16 and 80")))
        );
        assert!(json["warnings"].as_array().is_some_and(|w| !w.is_empty()));
        assert_eq!(json["projections"], Value::Array(Vec::new()));
    }

    #[tokio::test]
    async fn tax_handler_returns_itemised_result() {
        let query = TaxQuery {
            gross_income: 480_000.0,
            ..TaxQuery::default()
        };
        let response = tax_handler(State(shared_params()), Ok(Query(query))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_no_store(&response);
        let json = body_json(response).await;
        assert_approx(json["pensionFee"].as_f64().expect("number"), 33_600.0);
        assert_approx(json["municipalTax"].as_f64().expect("number"), 129_996.51);
        assert_eq!(json["breakdown"].as_array().map(Vec::len), Some(9));
    }

    #[tokio::test]
    async fn parameters_handler_exposes_active_table() {
        let response = parameters_handler(State(shared_params())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let table: ParameterTable = serde_json::from_value(json).expect("round trip");
        let builtin = ParameterTable::swedish_2025();
        assert_eq!(table.version, builtin.version);
        assert_eq!(table.senior_age, builtin.senior_age);
        assert_approx(table.municipal_tax_rate, builtin.municipal_tax_rate);
        assert_approx(table.flat_yield.tax_free_allowance, builtin.flat_yield.tax_free_allowance);
    }

    #[tokio::test]
    async fn unknown_routes_are_json_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_no_store(&response);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Not found");
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::Internal.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_no_store(&response);
    }
}
