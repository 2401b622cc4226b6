use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HousingMode {
    Rent,
    Buy,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum MortgageType {
    #[serde(rename = "IO")]
    InterestOnly,
    #[serde(rename = "PI")]
    PrincipalAndInterest,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceMode {
    Q1,
    Median,
    Q3,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum Deposit {
    /// Share of the purchase price, 0-100.
    Percent(f64),
    Amount(f64),
}

impl Deposit {
    pub fn for_price(self, price: f64) -> f64 {
        match self {
            Deposit::Percent(percent) => price * finite_or_zero(percent) / 100.0,
            Deposit::Amount(amount) => finite_or_zero(amount),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivingCosts {
    pub utilities: f64,
    pub food: f64,
    pub transport: f64,
    pub other: f64,
}

impl LivingCosts {
    pub fn weekly_total(&self) -> f64 {
        [self.utilities, self.food, self.transport, self.other]
            .into_iter()
            .map(finite_or_zero)
            .sum()
    }
}

/// Weekly running costs of owning, added on top of loan repayments.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerCosts {
    pub strata: f64,
    pub council: f64,
    pub water: f64,
    pub maintenance: f64,
}

impl OwnerCosts {
    pub fn weekly_total(&self) -> f64 {
        [self.strata, self.council, self.water, self.maintenance]
            .into_iter()
            .map(finite_or_zero)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdSettings {
    pub net_annual_income: f64,
    pub living_costs: LivingCosts,
    pub housing_mode: HousingMode,
    pub deposit: Deposit,
    pub mortgage_type: MortgageType,
    pub interest_rate_percent: f64,
    pub loan_term_years: u32,
    pub owner_costs: OwnerCosts,
}

/// A figure at the 25th, 50th and 75th percentile. `None` means no data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoints {
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
}

impl PricePoints {
    pub fn at(&self, mode: PriceMode) -> Option<f64> {
        match mode {
            PriceMode::Q1 => self.q1,
            PriceMode::Median => self.median,
            PriceMode::Q3 => self.q3,
        }
    }
}

/// Raw per-postcode statistics as loaded from the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostcodeStats {
    pub postcode: String,
    pub weekly_rent: PricePoints,
    pub sales_price_thousands: PricePoints,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    NoData,
    VeryAffordable,
    Affordable,
    Moderate,
    High,
    Severe,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffordabilityResult {
    pub postcode: String,
    pub weekly_housing_cost: f64,
    pub affordability_percentage: f64,
    pub is_affordable: bool,
    /// `None` when the housing cost is unknown.
    pub weekly_money_leftover: Option<f64>,
    pub q1_weekly_payment: Option<f64>,
    pub q3_weekly_payment: Option<f64>,
    pub bucket: Bucket,
}

impl AffordabilityResult {
    pub fn no_data(postcode: &str) -> Self {
        Self {
            postcode: postcode.to_string(),
            weekly_housing_cost: 0.0,
            affordability_percentage: 0.0,
            is_affordable: true,
            weekly_money_leftover: None,
            q1_weekly_payment: None,
            q3_weekly_payment: None,
            bucket: Bucket::NoData,
        }
    }
}

/// Household income shared by every postcode in a recompute pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeProfile {
    pub net_annual: f64,
    pub gross_annual: f64,
    pub weekly_net: f64,
    pub weekly_gross: f64,
    pub weekly_living_costs: f64,
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
