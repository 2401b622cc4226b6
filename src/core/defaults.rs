use serde::Serialize;

use super::inflation::{InflationSeries, adjust_for_inflation};
use super::types::{
    Deposit, HouseholdSettings, HousingMode, LivingCosts, MortgageType, OwnerCosts,
};

pub const DEFAULT_REFERENCE_YEAR: i32 = 2025;
pub const DEFAULT_DEPOSIT_PERCENT: f64 = 20.0;
pub const DEFAULT_INTEREST_RATE_PERCENT: f64 = 6.5;
pub const DEFAULT_LOAN_TERM_YEARS: u32 = 30;

/// Weekly housing cost above this share of gross income fails the 30% rule.
pub const AFFORDABILITY_THRESHOLD_PERCENT: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultStatistic {
    pub base: f64,
    pub base_year: i32,
    pub label: &'static str,
}

impl DefaultStatistic {
    pub fn adjusted_to(&self, target_year: i32, series: &InflationSeries) -> f64 {
        adjust_for_inflation(self.base, self.base_year, target_year, series)
    }
}

const fn abs_statistic(base: f64, label: &'static str) -> DefaultStatistic {
    DefaultStatistic {
        base,
        base_year: 2021,
        label,
    }
}

pub const NET_ANNUAL_INCOME: DefaultStatistic =
    abs_statistic(52_470.0, "Median household disposable income (annual)");
pub const WEEKLY_UTILITIES: DefaultStatistic =
    abs_statistic(39.0, "Household energy and water (weekly)");
pub const WEEKLY_FOOD: DefaultStatistic =
    abs_statistic(78.0, "Food and non-alcoholic beverages (weekly)");
pub const WEEKLY_TRANSPORT: DefaultStatistic = abs_statistic(58.0, "Transport (weekly)");

pub const DEFAULT_STATISTICS: [DefaultStatistic; 4] = [
    NET_ANNUAL_INCOME,
    WEEKLY_UTILITIES,
    WEEKLY_FOOD,
    WEEKLY_TRANSPORT,
];

/// Household settings seeded from the base statistics, adjusted to
/// `target_year` using the CPI table.
pub fn household_defaults(target_year: i32) -> HouseholdSettings {
    let cpi = InflationSeries::australia_cpi();
    HouseholdSettings {
        net_annual_income: NET_ANNUAL_INCOME.adjusted_to(target_year, cpi),
        living_costs: LivingCosts {
            utilities: WEEKLY_UTILITIES.adjusted_to(target_year, cpi),
            food: WEEKLY_FOOD.adjusted_to(target_year, cpi),
            transport: WEEKLY_TRANSPORT.adjusted_to(target_year, cpi),
            other: 0.0,
        },
        housing_mode: HousingMode::Rent,
        deposit: Deposit::Percent(DEFAULT_DEPOSIT_PERCENT),
        mortgage_type: MortgageType::PrincipalAndInterest,
        interest_rate_percent: DEFAULT_INTEREST_RATE_PERCENT,
        loan_term_years: DEFAULT_LOAN_TERM_YEARS,
        owner_costs: OwnerCosts::default(),
    }
}
