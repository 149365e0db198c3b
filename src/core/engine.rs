use thiserror::Error;
use tracing::{info, warn};

use super::guard::NumericGuard;
use super::params::ParameterTable;
use super::tax::compute_yearly_tax;
use super::types::{
    PayoutDuration, PayoutRule, PensionAccount, PensionCapital, PensionIncome, PensionKind,
    RunConfig, SimulationInputs, YearCalculations, YearProjection,
};
use super::validation::{ValidationReport, ValidationWarning, validate_inputs};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRun {
    pub projections: Vec<YearProjection>,
    pub warnings: Vec<ValidationWarning>,
    pub coercions: u32,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectionError {
    #[error("input validation failed: {0}")]
    Invalid(ValidationReport),
}

impl ProjectionError {
    pub fn report(&self) -> &ValidationReport {
        match self {
            ProjectionError::Invalid(report) => report,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GrowthRates {
    liquid: f64,
    isk: f64,
    mixed_portfolio: f64,
    bonds: f64,
}

#[derive(Debug, Clone, Copy)]
struct GeneralPensionState {
    income_capital: f64,
    premium_capital: f64,
    estimated_monthly: Option<f64>,
    withdrawal_age: u32,
}

impl GeneralPensionState {
    fn total(&self) -> f64 {
        self.income_capital + self.premium_capital
    }
}

// Per-run copy of an account's balance; the input account is only read.
#[derive(Debug, Clone)]
struct AccountState<'a> {
    account: &'a PensionAccount,
    capital: f64,
}

#[derive(Debug, Clone)]
struct WorkingState<'a> {
    annual_salary: f64,
    liquid: f64,
    isk: f64,
    general: Option<GeneralPensionState>,
    accounts: Vec<AccountState<'a>>,
}

// Monthly payouts for one year; `per_account` is aligned with `WorkingState::accounts`.
#[derive(Debug, Clone, Default)]
struct YearPayouts {
    general: f64,
    occupational: f64,
    private: f64,
    per_account: Vec<f64>,
}

impl YearPayouts {
    fn total(&self) -> f64 {
        self.general + self.occupational + self.private
    }
}

pub fn run_projection(
    inputs: &SimulationInputs,
    params: &ParameterTable,
    config: &RunConfig,
) -> Result<ProjectionRun, ProjectionError> {
    let report = validate_inputs(inputs, config);
    if !report.is_valid() {
        warn!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "projection rejected by validation"
        );
        return Err(ProjectionError::Invalid(report));
    }
    if !report.warnings.is_empty() {
        warn!(warnings = report.warnings.len(), "projection inputs raised warnings");
    }

    let mut guard = NumericGuard::new(params.magnitude_ceiling);
    let projections = project_years(inputs, params, config, &mut guard);
    info!(
        years = projections.len(),
        coercions = guard.coercions(),
        table = %params.version,
        "projection complete"
    );

    Ok(ProjectionRun {
        projections,
        warnings: report.warnings,
        coercions: guard.coercions(),
    })
}

pub fn project_batch(
    scenarios: &[SimulationInputs],
    params: &ParameterTable,
    config: &RunConfig,
) -> Vec<Result<ProjectionRun, ProjectionError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        scenarios
            .par_iter()
            .map(|inputs| run_projection(inputs, params, config))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        scenarios
            .iter()
            .map(|inputs| run_projection(inputs, params, config))
            .collect()
    }
}

pub fn project_years(
    inputs: &SimulationInputs,
    params: &ParameterTable,
    config: &RunConfig,
    guard: &mut NumericGuard,
) -> Vec<YearProjection> {
    let life_expectancy = params
        .life_expectancy
        .for_category(inputs.life_expectancy_category);
    let final_age = life_expectancy.floor().max(0.0) as u32;
    let rates = growth_rates(inputs, params, config);
    let pensions = if config.include_pensions {
        inputs.pensions.as_ref()
    } else {
        None
    };

    let mut state = WorkingState {
        annual_salary: guard.clean("annual_salary", inputs.monthly_salary * 12.0),
        liquid: inputs.liquid_savings,
        isk: inputs.isk_balance,
        general: pensions.map(|p| GeneralPensionState {
            income_capital: p.general.income_pension_capital,
            premium_capital: p.general.premium_pension_capital,
            estimated_monthly: p.general.estimated_monthly,
            withdrawal_age: p.general.withdrawal_age,
        }),
        accounts: pensions
            .map(|p| {
                p.accounts
                    .iter()
                    .map(|account| AccountState {
                        account,
                        capital: account.current_value,
                    })
                    .collect()
            })
            .unwrap_or_default(),
    };

    let yearly_expenses = guard.clean("yearly_expenses", inputs.monthly_expenses * 12.0);
    let mut projections =
        Vec::with_capacity(final_age.saturating_sub(inputs.current_age) as usize + 1);

    for (year, age) in (inputs.current_age..=final_age).enumerate() {
        let retired = age >= inputs.retirement_age;
        let salary = if retired { 0.0 } else { state.annual_salary };
        let remaining_years = (life_expectancy - age as f64).max(1.0);

        let payouts = if pensions.is_some() {
            monthly_payouts(&state, age, remaining_years, params, guard)
        } else {
            YearPayouts::default()
        };

        let gross_income = guard.clean("gross_income", salary + payouts.total() * 12.0);
        let tax = compute_yearly_tax(params, gross_income, age, state.isk, 0.0, None);
        let net_income = guard.clean("net_income", tax.net_income);
        let cash_flow = guard.clean("cash_flow", net_income - yearly_expenses);

        if pensions.is_some() {
            advance_pension_capital(&mut state, age, &payouts, &rates, guard);
        }
        apply_cash_flow(&mut state, cash_flow, &rates, guard);

        let pension_income = pensions.map(|_| PensionIncome {
            general: payouts.general,
            occupational: guard.clean("occupational_pension", payouts.occupational),
            private: guard.clean("private_pension", payouts.private),
            total: guard.clean("pension_income", payouts.total()),
        });
        let pension_capital = pensions.map(|_| pension_capital(&state, guard));
        let pension_total = pension_capital.map(|c| c.total).unwrap_or(0.0);
        let raw_net_worth = state.liquid + state.isk + pension_total;
        let net_worth = guard.clean("net_worth", raw_net_worth).max(0.0);

        projections.push(YearProjection {
            year: year as u32,
            age,
            salary,
            expenses: yearly_expenses,
            savings: cash_flow,
            net_worth,
            liquid_assets: state.liquid,
            isk_balance: state.isk,
            calculations: YearCalculations {
                gross_income,
                pension_fee: guard.clean("pension_fee", tax.pension_fee),
                municipal_tax: guard.clean("municipal_tax", tax.municipal_tax),
                state_tax: guard.clean("state_tax", tax.state_tax),
                isk_tax: guard.clean("isk_tax", tax.isk_tax),
                secondary_account_tax: guard.clean("secondary_tax", tax.secondary_account_tax),
                capital_gains_tax: guard.clean("capital_gains_tax", tax.capital_gains_tax),
                total_tax: guard.clean("total_tax", tax.total_tax),
                net_income,
                cash_flow,
                tax_details: config.include_tax_details.then_some(tax.breakdown),
            },
            pension_income,
            pension_capital,
        });

        if retired {
            state.annual_salary = 0.0;
        } else {
            state.annual_salary = guard.clean(
                "annual_salary",
                state.annual_salary * (1.0 + inputs.salary_growth_rate),
            );
        }
    }

    projections
}

fn growth_rates(
    inputs: &SimulationInputs,
    params: &ParameterTable,
    config: &RunConfig,
) -> GrowthRates {
    let (liquid, isk) = if config.use_custom_rates {
        (inputs.liquid_return_rate, inputs.isk_return_rate)
    } else {
        (params.returns.liquid, params.returns.mixed_portfolio)
    };
    GrowthRates {
        liquid,
        isk,
        mixed_portfolio: params.returns.mixed_portfolio,
        bonds: params.returns.bonds,
    }
}

fn monthly_payouts(
    state: &WorkingState<'_>,
    age: u32,
    remaining_years: f64,
    params: &ParameterTable,
    guard: &mut NumericGuard,
) -> YearPayouts {
    let mut payouts = YearPayouts::default();

    if let Some(general) = &state.general {
        if age >= general.withdrawal_age {
            payouts.general = match general.estimated_monthly {
                Some(amount) => guard.clean("general_pension", amount).max(0.0),
                None => guard.div("general_pension", general.total(), remaining_years * 12.0),
            };
        }
    }

    payouts.per_account.reserve(state.accounts.len());
    for entry in &state.accounts {
        let monthly = account_monthly_payout(entry, age, remaining_years, params, guard);
        match entry.account.kind {
            PensionKind::Occupational => payouts.occupational += monthly,
            PensionKind::Private => payouts.private += monthly,
        }
        payouts.per_account.push(monthly);
    }

    payouts
}

fn account_monthly_payout(
    entry: &AccountState<'_>,
    age: u32,
    remaining_years: f64,
    params: &ParameterTable,
    guard: &mut NumericGuard,
) -> f64 {
    let account = entry.account;
    if age < account.withdrawal_age {
        return 0.0;
    }
    if account.policy.duration == PayoutDuration::UntilDepleted && entry.capital <= 0.0 {
        return 0.0;
    }

    let monthly = match (account.policy.payout, account.expected_monthly_pension) {
        (PayoutRule::FixedMonthly(amount), _) => amount,
        (PayoutRule::CapitalRatio, Some(expected)) => expected,
        (PayoutRule::CapitalRatio, None) => match account.policy.duration {
            PayoutDuration::Lifelong => {
                guard.div("account_pension", entry.capital, remaining_years * 12.0)
            }
            PayoutDuration::UntilDepleted => {
                entry.capital * params.default_drawdown_rate / 12.0
            }
        },
    };
    guard.clean("account_pension", monthly).max(0.0)
}

fn advance_pension_capital(
    state: &mut WorkingState<'_>,
    age: u32,
    payouts: &YearPayouts,
    rates: &GrowthRates,
    guard: &mut NumericGuard,
) {
    if let Some(general) = state.general.as_mut() {
        if age >= general.withdrawal_age {
            let total = general.total();
            if total > 0.0 {
                let share = (payouts.general * 12.0 / total).clamp(0.0, 1.0);
                general.income_capital = guard.clean(
                    "income_pension_capital",
                    general.income_capital * (1.0 - share),
                );
                general.premium_capital = guard.clean(
                    "premium_pension_capital",
                    general.premium_capital * (1.0 - share),
                );
            }
        } else {
            general.income_capital = guard.clean(
                "income_pension_capital",
                general.income_capital * (1.0 + rates.bonds),
            );
            general.premium_capital = guard.clean(
                "premium_pension_capital",
                general.premium_capital * (1.0 + rates.bonds),
            );
        }
    }

    for (entry, monthly) in state.accounts.iter_mut().zip(&payouts.per_account) {
        if age >= entry.account.withdrawal_age {
            entry.capital = guard
                .clean("account_capital", entry.capital - monthly * 12.0)
                .max(0.0);
        } else {
            entry.capital = guard.clean(
                "account_capital",
                entry.capital * (1.0 + rates.mixed_portfolio),
            );
        }
    }
}

fn apply_cash_flow(
    state: &mut WorkingState<'_>,
    cash_flow: f64,
    rates: &GrowthRates,
    guard: &mut NumericGuard,
) {
    if cash_flow < 0.0 {
        let mut deficit = -cash_flow;
        let from_liquid = deficit.min(state.liquid.max(0.0));
        state.liquid -= from_liquid;
        deficit -= from_liquid;
        state.isk = (state.isk - deficit).max(0.0);
        state.liquid = state.liquid.max(0.0);
    } else {
        state.liquid += cash_flow;
    }

    if state.liquid > 0.0 {
        state.liquid = guard.clean("liquid_assets", state.liquid * (1.0 + rates.liquid));
    }
    if state.isk > 0.0 {
        state.isk = guard.clean("isk_balance", state.isk * (1.0 + rates.isk));
    }
    state.liquid = state.liquid.max(0.0);
    state.isk = state.isk.max(0.0);
}

fn pension_capital(state: &WorkingState<'_>, guard: &mut NumericGuard) -> PensionCapital {
    let general = state.general.map(|g| g.total()).unwrap_or(0.0);
    let mut capital = PensionCapital {
        general: guard.clean("general_capital", general),
        ..PensionCapital::default()
    };
    for entry in &state.accounts {
        match entry.account.kind {
            PensionKind::Occupational => capital.occupational += entry.capital,
            PensionKind::Private => capital.private += entry.capital,
        }
    }
    capital.occupational = guard.clean("occupational_capital", capital.occupational);
    capital.private = guard.clean("private_capital", capital.private);
    capital.total = guard.clean(
        "pension_capital",
        capital.general + capital.occupational + capital.private,
    );
    capital
}
