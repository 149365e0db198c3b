mod engine;
mod guard;
mod params;
mod report;
mod tax;
mod types;
mod validation;

pub use engine::{ProjectionError, ProjectionRun, project_batch, project_years, run_projection};
pub use guard::NumericGuard;
pub use params::{
    BasicDeductionTable, DeductionBand, FlatYieldTable, LifeExpectancyTable, ParameterTable,
    ReturnDefaults, StateTaxTable,
};
pub use report::{PensionSummary, Summary, capital_duration, summarize};
pub use tax::{NamedValue, TaxBreakdown, TaxCategory, TaxResult, TaxStep, compute_yearly_tax};
pub use types::{
    GeneralPension, LifeExpectancyCategory, PayoutDuration, PayoutRule, PensionAccount,
    PensionCapital, PensionIncome, PensionInputs, PensionKind, RunConfig, SimulationInputs,
    WithdrawalPolicy, YearCalculations, YearProjection,
};
pub use validation::{
    MAX_CURRENT_AGE, MIN_CURRENT_AGE, ValidationError, ValidationReport, ValidationWarning,
    validate_inputs,
};
