use serde::{Deserialize, Serialize};

use super::types::LifeExpectancyCategory;

/// Income bands for the basic deduction (grundavdrag) of one age tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionBand {
    pub minimum: f64,
    pub maximum: f64,
    pub high_income_minimum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicDeductionTable {
    pub low_income_bound: f64,
    pub mid_income_bound: f64,
    pub below_senior: DeductionBand,
    pub senior: DeductionBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTaxTable {
    pub threshold_below_senior: f64,
    pub threshold_senior: f64,
    pub rate: f64,
}

/// Deemed-yield (schablon) taxation shared by ISK and endowment accounts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatYieldTable {
    pub reference_rate: f64,
    pub supplement: f64,
    pub floor_rate: f64,
    pub tax_rate: f64,
    pub tax_free_allowance: f64,
}

impl FlatYieldTable {
    pub fn effective_rate(&self) -> f64 {
        (self.reference_rate + self.supplement).max(self.floor_rate) * self.tax_rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnDefaults {
    pub liquid: f64,
    pub mixed_portfolio: f64,
    pub bonds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeExpectancyTable {
    pub male: f64,
    pub female: f64,
    pub unspecified: f64,
}

impl LifeExpectancyTable {
    pub fn for_category(&self, category: LifeExpectancyCategory) -> f64 {
        match category {
            LifeExpectancyCategory::Male => self.male,
            LifeExpectancyCategory::Female => self.female,
            LifeExpectancyCategory::Unspecified => self.unspecified,
        }
    }
}

/// Versioned tax, return and demographic constants for one tax year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterTable {
    pub version: String,
    pub pension_fee_rate: f64,
    pub income_base_amount: f64,
    pub pension_fee_cap_multiplier: f64,
    pub pension_fee_cap_factor: f64,
    pub senior_age: u32,
    pub basic_deduction: BasicDeductionTable,
    pub municipal_tax_rate: f64,
    pub state_tax: StateTaxTable,
    pub flat_yield: FlatYieldTable,
    pub capital_gains_rate: f64,
    pub returns: ReturnDefaults,
    pub life_expectancy: LifeExpectancyTable,
    pub default_drawdown_rate: f64,
    pub magnitude_ceiling: f64,
}

impl ParameterTable {
    pub fn swedish_2025() -> Self {
        Self {
            version: "SE-2025".to_string(),
            pension_fee_rate: 0.07,
            income_base_amount: 80_600.0,
            pension_fee_cap_multiplier: 8.07,
            pension_fee_cap_factor: 0.93,
            senior_age: 66,
            basic_deduction: BasicDeductionTable {
                low_income_bound: 58_800.0,
                mid_income_bound: 463_300.0,
                below_senior: DeductionBand {
                    minimum: 24_300.0,
                    maximum: 45_300.0,
                    high_income_minimum: 17_300.0,
                },
                senior: DeductionBand {
                    minimum: 40_900.0,
                    maximum: 96_100.0,
                    high_income_minimum: 36_900.0,
                },
            },
            municipal_tax_rate: 0.3241,
            state_tax: StateTaxTable {
                threshold_below_senior: 625_800.0,
                threshold_senior: 733_200.0,
                rate: 0.20,
            },
            flat_yield: FlatYieldTable {
                reference_rate: 0.0262,
                supplement: 0.01,
                floor_rate: 0.0125,
                tax_rate: 0.30,
                tax_free_allowance: 150_000.0,
            },
            capital_gains_rate: 0.30,
            returns: ReturnDefaults {
                liquid: 0.01,
                mixed_portfolio: 0.05,
                bonds: 0.02,
            },
            life_expectancy: LifeExpectancyTable {
                male: 81.7,
                female: 84.9,
                unspecified: 83.3,
            },
            default_drawdown_rate: 0.04,
            magnitude_ceiling: 1e12,
        }
    }

    pub fn pension_fee_income_cap(&self) -> f64 {
        self.income_base_amount * self.pension_fee_cap_multiplier * self.pension_fee_cap_factor
    }

    pub fn is_senior(&self, age: u32) -> bool {
        age >= self.senior_age
    }
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self::swedish_2025()
    }
}
