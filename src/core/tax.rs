use serde::Serialize;

use super::params::{DeductionBand, FlatYieldTable, ParameterTable};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TaxCategory {
    PensionFee,
    BasicDeduction,
    TaxableIncome,
    MunicipalTax,
    StateTax,
    IskTax,
    SecondaryAccountTax,
    CapitalGainsTax,
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedValue {
    pub name: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxStep {
    pub description: String,
    pub formula: &'static str,
    pub inputs: Vec<NamedValue>,
    pub result: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub category: TaxCategory,
    pub steps: Vec<TaxStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResult {
    pub gross_income: f64,
    pub pension_fee: f64,
    pub basic_deduction: f64,
    pub taxable_income: f64,
    pub municipal_tax: f64,
    pub state_tax: f64,
    pub isk_tax: f64,
    pub secondary_account_tax: f64,
    pub capital_gains_tax: f64,
    pub total_tax: f64,
    pub net_income: f64,
    pub breakdown: Vec<TaxBreakdown>,
}

impl TaxResult {
    fn zero(gross_income: f64) -> Self {
        Self {
            gross_income,
            pension_fee: 0.0,
            basic_deduction: 0.0,
            taxable_income: 0.0,
            municipal_tax: 0.0,
            state_tax: 0.0,
            isk_tax: 0.0,
            secondary_account_tax: 0.0,
            capital_gains_tax: 0.0,
            total_tax: 0.0,
            net_income: 0.0,
            breakdown: Vec::new(),
        }
    }

    pub fn steps_for(&self, category: TaxCategory) -> &[TaxStep] {
        self.breakdown
            .iter()
            .find(|b| b.category == category)
            .map(|b| b.steps.as_slice())
            .unwrap_or(&[])
    }
}

fn step(
    description: impl Into<String>,
    formula: &'static str,
    inputs: &[(&'static str, f64)],
    result: f64,
) -> TaxStep {
    TaxStep {
        description: description.into(),
        formula,
        inputs: inputs
            .iter()
            .map(|&(name, value)| NamedValue { name, value })
            .collect(),
        result,
    }
}

/// Computes one year's tax liabilities on employment/pension income and
/// investment holdings.
///
/// A non-positive `gross_salary` short-circuits to an all-zero result, including
/// account and capital-gains taxes. No input is rejected here; range checks
/// belong to [`crate::core::validate_inputs`].
pub fn compute_yearly_tax(
    params: &ParameterTable,
    gross_salary: f64,
    age: u32,
    investment_account_balance: f64,
    secondary_investment_balance: f64,
    capital_gains: Option<f64>,
) -> TaxResult {
    if gross_salary.is_nan() || gross_salary <= 0.0 {
        return TaxResult::zero(gross_salary.max(0.0));
    }

    let mut breakdown = Vec::with_capacity(9);

    let income_cap = params.pension_fee_income_cap();
    let pension_fee = gross_salary.min(income_cap) * params.pension_fee_rate;
    breakdown.push(TaxBreakdown {
        category: TaxCategory::PensionFee,
        steps: vec![
            step(
                "Income cap for the pension fee",
                "incomeBaseAmount × capMultiplier × capFactor",
                &[
                    ("incomeBaseAmount", params.income_base_amount),
                    ("capMultiplier", params.pension_fee_cap_multiplier),
                    ("capFactor", params.pension_fee_cap_factor),
                ],
                income_cap,
            ),
            step(
                "General pension fee",
                "min(grossSalary, incomeCap) × pensionFeeRate",
                &[
                    ("grossSalary", gross_salary),
                    ("incomeCap", income_cap),
                    ("pensionFeeRate", params.pension_fee_rate),
                ],
                pension_fee,
            ),
        ],
    });

    let assessed_income = gross_salary - pension_fee;
    let basic_deduction = basic_deduction(params, assessed_income, age);
    let table = &params.basic_deduction;
    breakdown.push(TaxBreakdown {
        category: TaxCategory::BasicDeduction,
        steps: vec![step(
            format!(
                "Basic deduction ({} tier)",
                if params.is_senior(age) {
                    "senior"
                } else {
                    "standard"
                }
            ),
            "income ≤ lowBound ⇒ minimum; income ≤ midBound ⇒ maximum; else highIncomeMinimum",
            &[
                ("income", assessed_income),
                ("lowBound", table.low_income_bound),
                ("midBound", table.mid_income_bound),
            ],
            basic_deduction,
        )],
    });

    let taxable_income = (gross_salary - pension_fee - basic_deduction).max(0.0);
    breakdown.push(TaxBreakdown {
        category: TaxCategory::TaxableIncome,
        steps: vec![step(
            "Taxable earned income",
            "max(0, grossSalary − pensionFee − basicDeduction)",
            &[
                ("grossSalary", gross_salary),
                ("pensionFee", pension_fee),
                ("basicDeduction", basic_deduction),
            ],
            taxable_income,
        )],
    });

    let municipal_tax = taxable_income * params.municipal_tax_rate;
    breakdown.push(TaxBreakdown {
        category: TaxCategory::MunicipalTax,
        steps: vec![step(
            "Municipal income tax at the national average rate",
            "taxableIncome × municipalRate",
            &[
                ("taxableIncome", taxable_income),
                ("municipalRate", params.municipal_tax_rate),
            ],
            municipal_tax,
        )],
    });

    let state_threshold = if params.is_senior(age) {
        params.state_tax.threshold_senior
    } else {
        params.state_tax.threshold_below_senior
    };
    let state_taxable = (taxable_income - state_threshold).max(0.0);
    let state_tax = state_taxable * params.state_tax.rate;
    breakdown.push(TaxBreakdown {
        category: TaxCategory::StateTax,
        steps: vec![
            step(
                "Income above the state tax breakpoint",
                "max(0, taxableIncome − threshold)",
                &[
                    ("taxableIncome", taxable_income),
                    ("threshold", state_threshold),
                ],
                state_taxable,
            ),
            step(
                "State income tax",
                "incomeAboveThreshold × stateRate",
                &[
                    ("incomeAboveThreshold", state_taxable),
                    ("stateRate", params.state_tax.rate),
                ],
                state_tax,
            ),
        ],
    });

    let (isk_tax, isk_steps) =
        flat_yield_tax(&params.flat_yield, investment_account_balance, "ISK");
    breakdown.push(TaxBreakdown {
        category: TaxCategory::IskTax,
        steps: isk_steps,
    });

    let (secondary_account_tax, secondary_steps) = flat_yield_tax(
        &params.flat_yield,
        secondary_investment_balance,
        "secondary account",
    );
    breakdown.push(TaxBreakdown {
        category: TaxCategory::SecondaryAccountTax,
        steps: secondary_steps,
    });

    let gains = capital_gains.unwrap_or(0.0);
    let capital_gains_tax = gains.max(0.0) * params.capital_gains_rate;
    breakdown.push(TaxBreakdown {
        category: TaxCategory::CapitalGainsTax,
        steps: vec![step(
            "Tax on realised securities gains",
            "max(0, capitalGains) × capitalGainsRate",
            &[
                ("capitalGains", gains),
                ("capitalGainsRate", params.capital_gains_rate),
            ],
            capital_gains_tax,
        )],
    });

    let total_tax = municipal_tax + state_tax + isk_tax + secondary_account_tax + capital_gains_tax;
    let net_income = gross_salary - total_tax;
    breakdown.push(TaxBreakdown {
        category: TaxCategory::Total,
        steps: vec![
            step(
                "Total tax",
                "municipalTax + stateTax + iskTax + secondaryAccountTax + capitalGainsTax",
                &[
                    ("municipalTax", municipal_tax),
                    ("stateTax", state_tax),
                    ("iskTax", isk_tax),
                    ("secondaryAccountTax", secondary_account_tax),
                    ("capitalGainsTax", capital_gains_tax),
                ],
                total_tax,
            ),
            step(
                "Net income",
                "grossSalary − totalTax",
                &[("grossSalary", gross_salary), ("totalTax", total_tax)],
                net_income,
            ),
        ],
    });

    TaxResult {
        gross_income: gross_salary,
        pension_fee,
        basic_deduction,
        taxable_income,
        municipal_tax,
        state_tax,
        isk_tax,
        secondary_account_tax,
        capital_gains_tax,
        total_tax,
        net_income,
        breakdown,
    }
}

// Three-tier approximation of the continuous grundavdrag schedule.
fn basic_deduction(params: &ParameterTable, income: f64, age: u32) -> f64 {
    let table = &params.basic_deduction;
    let band: &DeductionBand = if params.is_senior(age) {
        &table.senior
    } else {
        &table.below_senior
    };

    if income <= table.low_income_bound {
        band.minimum
    } else if income <= table.mid_income_bound {
        band.maximum
    } else {
        band.high_income_minimum
    }
}

fn flat_yield_tax(table: &FlatYieldTable, balance: f64, label: &str) -> (f64, Vec<TaxStep>) {
    let taxable_base = (balance - table.tax_free_allowance).max(0.0);
    let effective_rate = table.effective_rate();
    let tax = taxable_base * effective_rate;

    let steps = vec![
        step(
            format!("Taxable {label} capital base"),
            "max(0, balance − taxFreeAllowance)",
            &[
                ("balance", balance),
                ("taxFreeAllowance", table.tax_free_allowance),
            ],
            taxable_base,
        ),
        step(
            "Effective deemed-yield tax rate",
            "max(referenceRate + supplement, floorRate) × flatTaxRate",
            &[
                ("referenceRate", table.reference_rate),
                ("supplement", table.supplement),
                ("floorRate", table.floor_rate),
                ("flatTaxRate", table.tax_rate),
            ],
            effective_rate,
        ),
        step(
            format!("{label} deemed-yield tax"),
            "taxableBase × effectiveRate",
            &[
                ("taxableBase", taxable_base),
                ("effectiveRate", effective_rate),
            ],
            tax,
        ),
    ];

    (tax, steps)
}
