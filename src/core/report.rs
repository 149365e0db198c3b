use serde::Serialize;

use super::types::{RunConfig, SimulationInputs, YearProjection};

// Pension as a share of current salary when no pension data is modeled.
const FALLBACK_COMPENSATION_RATIO: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionSummary {
    pub initial_pension_capital: f64,
    pub average_monthly_pension: f64,
    pub pension_income_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub max_net_worth: f64,
    pub net_worth_at_retirement: f64,
    pub final_net_worth: f64,
    pub average_positive_savings: f64,
    pub positive_savings_years: u32,
    pub first_positive_net_worth_age: Option<u32>,
    pub estimated_monthly_pension: f64,
    pub compensation_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pension: Option<PensionSummary>,
}

/// Years from the retirement-age row until net worth is first exhausted.
///
/// If net worth never reaches zero the span to the last projected row is returned.
/// A sequence without a retirement-age row yields `0`.
pub fn capital_duration(projections: &[YearProjection], retirement_age: u32) -> u32 {
    let Some(start) = projections.iter().position(|p| p.age == retirement_age) else {
        return 0;
    };
    let after_retirement = &projections[start..];
    match after_retirement.iter().find(|p| p.net_worth <= 0.0) {
        Some(exhausted) => exhausted.age - retirement_age,
        None => after_retirement
            .last()
            .map(|p| p.age - retirement_age)
            .unwrap_or(0),
    }
}

pub fn summarize(
    projections: &[YearProjection],
    inputs: &SimulationInputs,
    config: &RunConfig,
) -> Summary {
    let max_net_worth = projections
        .iter()
        .map(|p| p.net_worth)
        .fold(0.0_f64, f64::max);
    let net_worth_at_retirement = projections
        .iter()
        .find(|p| p.age == inputs.retirement_age)
        .map(|p| p.net_worth)
        .unwrap_or(0.0);
    let final_net_worth = projections.last().map(|p| p.net_worth).unwrap_or(0.0);

    let (positive_sum, positive_savings_years) = projections
        .iter()
        .filter(|p| p.savings > 0.0)
        .fold((0.0, 0u32), |(sum, n), p| (sum + p.savings, n + 1));
    let average_positive_savings = if positive_savings_years > 0 {
        positive_sum / positive_savings_years as f64
    } else {
        0.0
    };

    let first_positive_net_worth_age = projections
        .iter()
        .find(|p| p.net_worth > 0.0)
        .map(|p| p.age);

    let modeled = config
        .include_pensions
        .then_some(inputs.pensions.as_ref())
        .flatten();

    let (estimated_monthly_pension, compensation_ratio, pension) = match modeled {
        Some(pensions) => {
            let withdrawal_age = pensions.general.withdrawal_age;
            let paying: Vec<f64> = projections
                .iter()
                .filter(|p| p.age >= withdrawal_age)
                .filter_map(|p| p.pension_income.map(|income| income.total))
                .collect();
            let estimated = paying.first().copied().unwrap_or(0.0);
            let ratio = if inputs.monthly_salary > 0.0 {
                estimated / inputs.monthly_salary
            } else {
                0.0
            };
            let average_monthly_pension = if paying.is_empty() {
                0.0
            } else {
                paying.iter().sum::<f64>() / paying.len() as f64
            };
            let pension_income_years = projections
                .iter()
                .filter(|p| p.pension_income.is_some_and(|income| income.total > 0.0))
                .count() as u32;
            let initial_pension_capital = pensions.general.total_capital()
                + pensions
                    .accounts
                    .iter()
                    .map(|a| a.current_value)
                    .sum::<f64>();
            (
                estimated,
                ratio,
                Some(PensionSummary {
                    initial_pension_capital,
                    average_monthly_pension,
                    pension_income_years,
                }),
            )
        }
        None => (
            inputs.monthly_salary * FALLBACK_COMPENSATION_RATIO,
            FALLBACK_COMPENSATION_RATIO,
            None,
        ),
    };

    Summary {
        max_net_worth,
        net_worth_at_retirement,
        final_net_worth,
        average_positive_savings,
        positive_savings_years,
        first_positive_net_worth_age,
        estimated_monthly_pension,
        compensation_ratio,
        pension,
    }
}
