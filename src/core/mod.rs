mod classify;
mod defaults;
mod engine;
mod error;
mod inflation;
mod mortgage;
mod tax;
mod types;

pub use classify::classify;
pub use defaults::{
    AFFORDABILITY_THRESHOLD_PERCENT, DEFAULT_DEPOSIT_PERCENT, DEFAULT_INTEREST_RATE_PERCENT,
    DEFAULT_LOAN_TERM_YEARS, DEFAULT_REFERENCE_YEAR, DEFAULT_STATISTICS, DefaultStatistic,
    household_defaults,
};
pub use engine::{
    AffordabilitySummary, Recompute, compute_affordability, income_profile, recompute_all,
    recompute_with_schedule, summarize, weekly_purchase_cost,
};
pub use error::CalcError;
pub use inflation::{InflationSeries, adjust_for_inflation};
pub use mortgage::{MortgagePayment, compute_payment, monthly_to_weekly};
pub use tax::{BracketMatch, TaxBracket, TaxSchedule, gross_to_net, net_to_gross};
pub use types::{
    AffordabilityResult, Bucket, Deposit, HouseholdSettings, HousingMode, IncomeProfile,
    LivingCosts, MortgageType, OwnerCosts, PostcodeStats, PriceMode, PricePoints,
};
