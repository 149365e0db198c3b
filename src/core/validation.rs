use serde::{Serialize, Serializer};
use thiserror::Error;

use super::types::{PayoutRule, RunConfig, SimulationInputs};

pub const MIN_CURRENT_AGE: u32 = 16;
pub const MAX_CURRENT_AGE: u32 = 80;

/// Issues that stop a projection from running.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("current age must be between 16 and 80, got {0}")]
    CurrentAgeOutOfRange(u32),

    #[error("retirement age ({retirement_age}) must be greater than current age ({current_age})")]
    RetirementNotAfterCurrentAge {
        current_age: u32,
        retirement_age: u32,
    },

    #[error("{field} must be a finite, non-negative amount, got {value}")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("{field} must be a finite rate, got {value}")]
    InvalidRate { field: &'static str, value: f64 },

    #[error("ISK return rate must be between -50% and 50%, got {:.1}%", .0 * 100.0)]
    IskRateOutOfRange(f64),

    #[error("general pension withdrawal age must be at least 62, got {0}")]
    GeneralPensionTooEarly(u32),

    #[error(
        "pension account '{name}' starts withdrawals at {withdrawal_age}, before its earliest allowed age {earliest}"
    )]
    AccountWithdrawalTooEarly {
        name: String,
        withdrawal_age: u32,
        earliest: u32,
    },
}

/// Advisory findings reported alongside a successful run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationWarning {
    #[error("retiring before 61 ({0}) limits access to the general pension")]
    EarlyRetirement(u32),

    #[error("a monthly salary below 10 000 ({0:.0}) accrues very little pension")]
    LowSalary(f64),

    #[error("a monthly salary above 100 000 ({0:.0}) exceeds the pension-qualifying income cap")]
    HighSalary(f64),

    #[error("monthly expenses ({expenses:.0}) leave nothing to save from a salary of {salary:.0}")]
    NoSavingsMargin { salary: f64, expenses: f64 },

    #[error("monthly expenses below 15 000 ({0:.0}) may be missing costs")]
    LowExpenses(f64),

    #[error("liquid savings return of {:.1}% is outside the plausible range -10% to 20%", .0 * 100.0)]
    LiquidRateImplausible(f64),

    #[error("an ISK return above 15% ({:.1}%) is optimistic", .0 * 100.0)]
    IskRateOptimistic(f64),

    #[error("general pension withdrawal after 70 ({0}) is unusual")]
    GeneralPensionLate(u32),

    #[error(
        "pension account '{name}' starts withdrawals at {withdrawal_age}, after its latest allowed age {latest}"
    )]
    AccountWithdrawalLate {
        name: String,
        withdrawal_age: u32,
        latest: u32,
    },

    #[error("pension account '{0}' has no value and no expected monthly pension")]
    EmptyAccount(String),
}

macro_rules! serialize_as_message {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

serialize_as_message!(ValidationError);
serialize_as_message!(ValidationWarning);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        write!(f, "{}", messages.join("; "))
    }
}

/// Checks inputs before a run. Errors and warnings are collected independently;
/// every check runs even after the first error.
pub fn validate_inputs(inputs: &SimulationInputs, config: &RunConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    let errors = &mut report.errors;
    let warnings = &mut report.warnings;

    if !(MIN_CURRENT_AGE..=MAX_CURRENT_AGE).contains(&inputs.current_age) {
        errors.push(ValidationError::CurrentAgeOutOfRange(inputs.current_age));
    }
    if inputs.retirement_age <= inputs.current_age {
        errors.push(ValidationError::RetirementNotAfterCurrentAge {
            current_age: inputs.current_age,
            retirement_age: inputs.retirement_age,
        });
    }
    if inputs.retirement_age < 61 {
        warnings.push(ValidationWarning::EarlyRetirement(inputs.retirement_age));
    }

    for (field, value) in [
        ("monthly salary", inputs.monthly_salary),
        ("monthly expenses", inputs.monthly_expenses),
        ("liquid savings", inputs.liquid_savings),
        ("ISK balance", inputs.isk_balance),
    ] {
        if !value.is_finite() || value < 0.0 {
            errors.push(ValidationError::InvalidAmount { field, value });
        }
    }
    if !inputs.salary_growth_rate.is_finite() {
        errors.push(ValidationError::InvalidRate {
            field: "salary growth rate",
            value: inputs.salary_growth_rate,
        });
    }

    if inputs.monthly_salary < 10_000.0 {
        warnings.push(ValidationWarning::LowSalary(inputs.monthly_salary));
    } else if inputs.monthly_salary > 100_000.0 {
        warnings.push(ValidationWarning::HighSalary(inputs.monthly_salary));
    }
    if inputs.monthly_expenses >= inputs.monthly_salary {
        warnings.push(ValidationWarning::NoSavingsMargin {
            salary: inputs.monthly_salary,
            expenses: inputs.monthly_expenses,
        });
    }
    if inputs.monthly_expenses < 15_000.0 {
        warnings.push(ValidationWarning::LowExpenses(inputs.monthly_expenses));
    }

    if config.use_custom_rates {
        validate_rates(inputs, errors, warnings);
    }

    if config.include_pensions {
        if let Some(pensions) = &inputs.pensions {
            let general = &pensions.general;
            if general.withdrawal_age < 62 {
                errors.push(ValidationError::GeneralPensionTooEarly(general.withdrawal_age));
            } else if general.withdrawal_age > 70 {
                warnings.push(ValidationWarning::GeneralPensionLate(general.withdrawal_age));
            }
            for (field, value) in [
                ("income pension capital", general.income_pension_capital),
                ("premium pension capital", general.premium_pension_capital),
                (
                    "estimated general pension",
                    general.estimated_monthly.unwrap_or(0.0),
                ),
            ] {
                if !value.is_finite() || value < 0.0 {
                    errors.push(ValidationError::InvalidAmount { field, value });
                }
            }

            for account in &pensions.accounts {
                if account.withdrawal_age < account.earliest_withdrawal_age {
                    errors.push(ValidationError::AccountWithdrawalTooEarly {
                        name: account.name.clone(),
                        withdrawal_age: account.withdrawal_age,
                        earliest: account.earliest_withdrawal_age,
                    });
                } else if account.withdrawal_age > account.latest_withdrawal_age {
                    warnings.push(ValidationWarning::AccountWithdrawalLate {
                        name: account.name.clone(),
                        withdrawal_age: account.withdrawal_age,
                        latest: account.latest_withdrawal_age,
                    });
                }
                if !account.current_value.is_finite() || account.current_value < 0.0 {
                    errors.push(ValidationError::InvalidAmount {
                        field: "pension account value",
                        value: account.current_value,
                    });
                }
                let fixed_payout = match account.policy.payout {
                    PayoutRule::FixedMonthly(amount) => Some(amount),
                    PayoutRule::CapitalRatio => None,
                };
                for (field, value) in [
                    ("expected monthly pension", account.expected_monthly_pension),
                    ("fixed monthly payout", fixed_payout),
                ] {
                    if let Some(value) = value.filter(|v| !v.is_finite() || *v < 0.0) {
                        errors.push(ValidationError::InvalidAmount { field, value });
                    }
                }
                if account.current_value == 0.0 && account.expected_monthly_pension.is_none() {
                    warnings.push(ValidationWarning::EmptyAccount(account.name.clone()));
                }
            }
        }
    }

    report
}

fn validate_rates(
    inputs: &SimulationInputs,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<ValidationWarning>,
) {
    let liquid = inputs.liquid_return_rate;
    if !liquid.is_finite() {
        errors.push(ValidationError::InvalidRate {
            field: "liquid savings return",
            value: liquid,
        });
    } else if !(-0.10..=0.20).contains(&liquid) {
        warnings.push(ValidationWarning::LiquidRateImplausible(liquid));
    }

    let isk = inputs.isk_return_rate;
    if !isk.is_finite() {
        errors.push(ValidationError::InvalidRate {
            field: "ISK return",
            value: isk,
        });
    } else if !(-0.50..=0.50).contains(&isk) {
        errors.push(ValidationError::IskRateOutOfRange(isk));
    } else if isk > 0.15 {
        warnings.push(ValidationWarning::IskRateOptimistic(isk));
    }
}
