use serde::Serialize;

use super::tax::TaxBreakdown;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LifeExpectancyCategory {
    Male,
    Female,
    Unspecified,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PensionKind {
    Occupational,
    Private,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PayoutRule {
    /// Pays this many currency units per month.
    FixedMonthly(f64),
    /// Derives the monthly payout from remaining capital.
    CapitalRatio,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PayoutDuration {
    Lifelong,
    UntilDepleted,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WithdrawalPolicy {
    pub payout: PayoutRule,
    pub duration: PayoutDuration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PensionAccount {
    pub name: String,
    pub kind: PensionKind,
    pub current_value: f64,
    pub expected_monthly_pension: Option<f64>,
    pub withdrawal_age: u32,
    pub earliest_withdrawal_age: u32,
    pub latest_withdrawal_age: u32,
    pub policy: WithdrawalPolicy,
}

/// State income pension: inkomstpension and premiepension are tracked separately.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralPension {
    pub income_pension_capital: f64,
    pub premium_pension_capital: f64,
    pub estimated_monthly: Option<f64>,
    pub withdrawal_age: u32,
}

impl GeneralPension {
    pub fn total_capital(&self) -> f64 {
        self.income_pension_capital + self.premium_pension_capital
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PensionInputs {
    pub general: GeneralPension,
    pub accounts: Vec<PensionAccount>,
}

/// One person's financial starting point. All rates are real, annual fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInputs {
    pub current_age: u32,
    pub life_expectancy_category: LifeExpectancyCategory,
    pub retirement_age: u32,
    pub monthly_salary: f64,
    pub salary_growth_rate: f64,
    pub monthly_expenses: f64,
    pub liquid_savings: f64,
    pub isk_balance: f64,
    pub liquid_return_rate: f64,
    pub isk_return_rate: f64,
    pub pensions: Option<PensionInputs>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RunConfig {
    pub include_pensions: bool,
    pub use_custom_rates: bool,
    pub include_tax_details: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            include_pensions: true,
            use_custom_rates: true,
            include_tax_details: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCalculations {
    pub gross_income: f64,
    pub pension_fee: f64,
    pub municipal_tax: f64,
    pub state_tax: f64,
    pub isk_tax: f64,
    pub secondary_account_tax: f64,
    pub capital_gains_tax: f64,
    pub total_tax: f64,
    pub net_income: f64,
    pub cash_flow: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_details: Option<Vec<TaxBreakdown>>,
}

/// Monthly pension payouts for one year, by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionIncome {
    pub general: f64,
    pub occupational: f64,
    pub private: f64,
    pub total: f64,
}

/// End-of-year pension capital, by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionCapital {
    pub general: f64,
    pub occupational: f64,
    pub private: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearProjection {
    pub year: u32,
    pub age: u32,
    pub salary: f64,
    pub expenses: f64,
    pub savings: f64,
    pub net_worth: f64,
    pub liquid_assets: f64,
    pub isk_balance: f64,
    pub calculations: YearCalculations,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pension_income: Option<PensionIncome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pension_capital: Option<PensionCapital>,
}
