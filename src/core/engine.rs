use std::collections::BTreeMap;

use serde::Serialize;

use super::classify::classify;
use super::defaults::AFFORDABILITY_THRESHOLD_PERCENT;
use super::error::Result;
use super::mortgage::{compute_payment, monthly_to_weekly};
use super::tax::TaxSchedule;
use super::types::{
    AffordabilityResult, Bucket, HouseholdSettings, HousingMode, IncomeProfile, PostcodeStats,
    PriceMode, finite_or_zero,
};

const WEEKS_PER_YEAR: f64 = 52.0;

/// Output of a full recompute pass. `income` is `None` when the household
/// income could not be converted, in which case every result is no-data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recompute {
    pub income: Option<IncomeProfile>,
    pub results: Vec<AffordabilityResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffordabilitySummary {
    pub total: usize,
    pub with_data: usize,
    pub affordable: usize,
    pub cash_negative: usize,
    pub buckets: BTreeMap<Bucket, usize>,
}

pub fn income_profile(
    settings: &HouseholdSettings,
    schedule: &TaxSchedule,
) -> Result<IncomeProfile> {
    let net_annual = settings.net_annual_income;
    let gross_annual = schedule.net_to_gross(net_annual)?;
    let net_annual = net_annual.max(0.0);
    Ok(IncomeProfile {
        net_annual,
        gross_annual,
        weekly_net: net_annual / WEEKS_PER_YEAR,
        weekly_gross: gross_annual / WEEKS_PER_YEAR,
        weekly_living_costs: settings.living_costs.weekly_total(),
    })
}

/// Weekly cost of buying at `price_thousands`: loan repayments plus owner
/// costs. `None` when there is no usable sales price.
pub fn weekly_purchase_cost(
    price_thousands: Option<f64>,
    settings: &HouseholdSettings,
) -> Option<f64> {
    let price = positive(price_thousands)? * 1_000.0;
    let deposit = settings.deposit.for_price(price);
    let loan_amount = (price - deposit).max(0.0);
    let monthly = compute_payment(
        loan_amount,
        finite_or_zero(settings.interest_rate_percent),
        settings.loan_term_years,
        settings.mortgage_type,
    );
    Some(monthly_to_weekly(monthly.payment) + settings.owner_costs.weekly_total())
}

pub fn compute_affordability(
    stats: &PostcodeStats,
    settings: &HouseholdSettings,
    income: &IncomeProfile,
    price_mode: PriceMode,
) -> AffordabilityResult {
    let weekly_housing_cost = match settings.housing_mode {
        HousingMode::Rent => positive(stats.weekly_rent.at(price_mode)),
        HousingMode::Buy => {
            weekly_purchase_cost(stats.sales_price_thousands.at(price_mode), settings)
        }
    }
    .unwrap_or(0.0);

    let has_cost = weekly_housing_cost > 0.0;
    let affordability_percentage = if has_cost && income.weekly_gross > 0.0 {
        weekly_housing_cost / income.weekly_gross * 100.0
    } else {
        0.0
    };
    let weekly_money_leftover = has_cost
        .then(|| income.weekly_net - income.weekly_living_costs - weekly_housing_cost);

    AffordabilityResult {
        postcode: stats.postcode.clone(),
        weekly_housing_cost,
        affordability_percentage,
        is_affordable: affordability_percentage <= AFFORDABILITY_THRESHOLD_PERCENT,
        weekly_money_leftover,
        q1_weekly_payment: weekly_purchase_cost(stats.sales_price_thousands.q1, settings),
        q3_weekly_payment: weekly_purchase_cost(stats.sales_price_thousands.q3, settings),
        bucket: classify(Some(affordability_percentage), weekly_money_leftover),
    }
}

/// Recomputes every record from scratch against the reference tax schedule.
pub fn recompute_all(
    records: &[PostcodeStats],
    settings: &HouseholdSettings,
    price_mode: PriceMode,
) -> Recompute {
    recompute_with_schedule(records, settings, price_mode, TaxSchedule::australia_2024_25())
}

pub fn recompute_with_schedule(
    records: &[PostcodeStats],
    settings: &HouseholdSettings,
    price_mode: PriceMode,
    schedule: &TaxSchedule,
) -> Recompute {
    let income = match income_profile(settings, schedule) {
        Ok(income) => income,
        Err(err) => {
            tracing::warn!(
                target: "engine",
                error = %err,
                records = records.len(),
                "income_conversion_failed_no_data"
            );
            return Recompute {
                income: None,
                results: records
                    .iter()
                    .map(|stats| AffordabilityResult::no_data(&stats.postcode))
                    .collect(),
            };
        }
    };

    let results: Vec<AffordabilityResult> = records
        .iter()
        .map(|stats| compute_affordability(stats, settings, &income, price_mode))
        .collect();

    tracing::debug!(
        target: "engine",
        records = results.len(),
        price_mode = ?price_mode,
        housing_mode = ?settings.housing_mode,
        weekly_gross = income.weekly_gross,
        affordable = results.iter().filter(|r| r.is_affordable).count(),
        "recompute_finished"
    );

    Recompute {
        income: Some(income),
        results,
    }
}

pub fn summarize(results: &[AffordabilityResult]) -> AffordabilitySummary {
    let mut summary = AffordabilitySummary {
        total: results.len(),
        ..AffordabilitySummary::default()
    };
    for result in results {
        if result.bucket != Bucket::NoData {
            summary.with_data += 1;
        }
        if result.is_affordable {
            summary.affordable += 1;
        }
        if result.weekly_money_leftover.is_some_and(|left| left < 0.0) {
            summary.cash_negative += 1;
        }
        *summary.buckets.entry(result.bucket).or_insert(0) += 1;
    }
    summary
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tax::net_to_gross;
    use crate::core::types::{Deposit, LivingCosts, MortgageType, OwnerCosts, PricePoints};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_settings() -> HouseholdSettings {
        HouseholdSettings {
            net_annual_income: 61_984.0,
            living_costs: LivingCosts {
                utilities: 46.0,
                food: 92.0,
                transport: 69.0,
                other: 0.0,
            },
            housing_mode: HousingMode::Rent,
            deposit: Deposit::Percent(20.0),
            mortgage_type: MortgageType::PrincipalAndInterest,
            interest_rate_percent: 6.5,
            loan_term_years: 30,
            owner_costs: OwnerCosts::default(),
        }
    }

    fn postcode(code: &str, rent: PricePoints, sales: PricePoints) -> PostcodeStats {
        PostcodeStats {
            postcode: code.to_string(),
            weekly_rent: rent,
            sales_price_thousands: sales,
        }
    }

    fn points(q1: f64, median: f64, q3: f64) -> PricePoints {
        PricePoints {
            q1: Some(q1),
            median: Some(median),
            q3: Some(q3),
        }
    }

    fn sample_records() -> Vec<PostcodeStats> {
        vec![
            postcode("2000", points(600.0, 750.0, 950.0), points(900.0, 1_300.0, 2_100.0)),
            postcode("2770", points(380.0, 450.0, 520.0), points(560.0, 800.0, 910.0)),
            postcode("2880", points(250.0, 300.0, 330.0), points(210.0, 260.0, 320.0)),
            postcode("0872", PricePoints::default(), PricePoints::default()),
        ]
    }

    #[test]
    fn rent_scenario_matches_hand_calculation() {
        let settings = sample_settings();
        let records = vec![postcode("2770", points(380.0, 450.0, 520.0), PricePoints::default())];
        let recompute = recompute_all(&records, &settings, PriceMode::Median);

        let weekly_gross = net_to_gross(61_984.0).unwrap() / 52.0;
        let weekly_net = 61_984.0 / 52.0;
        let result = &recompute.results[0];

        assert_approx(result.weekly_housing_cost, 450.0);
        assert_approx(result.affordability_percentage, 450.0 / weekly_gross * 100.0);
        assert_approx(
            result.weekly_money_leftover.unwrap(),
            weekly_net - 207.0 - 450.0,
        );
        // 61,984 net grosses up to ~75,389, so 450/week is ~31% of gross.
        assert!(!result.is_affordable);
        assert_eq!(result.bucket, Bucket::Moderate);

        let income = recompute.income.unwrap();
        assert_approx(income.weekly_living_costs, 207.0);
        assert_approx_tol(income.gross_annual, 75_388.571_428, 1e-3);
    }

    #[test]
    fn buy_scenario_uses_annuity_repayment() {
        let mut settings = sample_settings();
        settings.housing_mode = HousingMode::Buy;
        let records = vec![postcode("2770", PricePoints::default(), points(600.0, 800.0, 950.0))];
        let recompute = recompute_all(&records, &settings, PriceMode::Median);
        let result = &recompute.results[0];

        let monthly_rate = 0.065 / 12.0;
        let growth = (1.0_f64 + monthly_rate).powi(360);
        let monthly = 640_000.0 * monthly_rate * growth / (growth - 1.0);
        assert_eq!((monthly * 100.0).round() / 100.0, 4_045.24);
        assert_approx_tol(result.weekly_housing_cost, monthly * 12.0 / 52.0, 1e-6);
        // ~933.52/week against ~1,449.78 weekly gross, still cash-positive.
        assert!(result.weekly_money_leftover.unwrap() > 0.0);
        assert!(!result.is_affordable);
        assert_eq!(result.bucket, Bucket::Severe);
    }

    #[test]
    fn owner_costs_and_fixed_deposit_feed_purchase_cost() {
        let mut settings = sample_settings();
        settings.housing_mode = HousingMode::Buy;
        settings.deposit = Deposit::Amount(100_000.0);
        settings.interest_rate_percent = 0.0;
        settings.loan_term_years = 25;
        settings.owner_costs = OwnerCosts {
            strata: 40.0,
            council: 30.0,
            water: 20.0,
            maintenance: 10.0,
        };

        let weekly = weekly_purchase_cost(Some(400.0), &settings).unwrap();
        assert_approx(weekly, 300_000.0 / 300.0 * 12.0 / 52.0 + 100.0);
    }

    #[test]
    fn deposit_covering_price_leaves_only_owner_costs() {
        let mut settings = sample_settings();
        settings.deposit = Deposit::Amount(1_000_000.0);
        assert_approx(weekly_purchase_cost(Some(500.0), &settings).unwrap(), 0.0);

        settings.owner_costs.council = 35.0;
        assert_approx(weekly_purchase_cost(Some(500.0), &settings).unwrap(), 35.0);
    }

    #[test]
    fn missing_price_point_is_no_data() {
        let settings = sample_settings();
        let records = sample_records();
        let recompute = recompute_all(&records, &settings, PriceMode::Median);
        let result = &recompute.results[3];

        assert_eq!(result.weekly_housing_cost, 0.0);
        assert_eq!(result.affordability_percentage, 0.0);
        assert_eq!(result.weekly_money_leftover, None);
        assert_eq!(result.q1_weekly_payment, None);
        assert_eq!(result.q3_weekly_payment, None);
        // 0% is within the threshold; the bucket carries the no-data signal.
        assert!(result.is_affordable);
        assert_eq!(result.bucket, Bucket::NoData);
    }

    #[test]
    fn zero_and_non_finite_prices_are_not_used() {
        let settings = sample_settings();
        let rent = PricePoints {
            q1: Some(0.0),
            median: Some(f64::NAN),
            q3: Some(-20.0),
        };
        let records = vec![postcode("3000", rent, rent)];
        for mode in [PriceMode::Q1, PriceMode::Median, PriceMode::Q3] {
            let recompute = recompute_all(&records, &settings, mode);
            let result = &recompute.results[0];
            assert_eq!(result.bucket, Bucket::NoData);
            assert_eq!(result.q1_weekly_payment, None);
        }
    }

    #[test]
    fn price_mode_selects_the_percentile() {
        let settings = sample_settings();
        let records = sample_records();
        let q1 = recompute_all(&records, &settings, PriceMode::Q1);
        let q3 = recompute_all(&records, &settings, PriceMode::Q3);
        assert_approx(q1.results[0].weekly_housing_cost, 600.0);
        assert_approx(q3.results[0].weekly_housing_cost, 950.0);
    }

    #[test]
    fn quartile_projections_ignore_price_mode_and_housing_mode() {
        let settings = sample_settings();
        let records = sample_records();
        let recompute = recompute_all(&records, &settings, PriceMode::Median);
        let rent = &recompute.results[1];

        let expected_q1 = weekly_purchase_cost(Some(560.0), &settings).unwrap();
        let expected_q3 = weekly_purchase_cost(Some(910.0), &settings).unwrap();
        assert_approx(rent.q1_weekly_payment.unwrap(), expected_q1);
        assert_approx(rent.q3_weekly_payment.unwrap(), expected_q3);
        assert!(expected_q1 < expected_q3);
    }

    #[test]
    fn zero_income_gives_no_ratio_but_flags_cash_shortfall() {
        let mut settings = sample_settings();
        settings.net_annual_income = 0.0;
        let records = sample_records();
        let recompute = recompute_all(&records, &settings, PriceMode::Median);

        for result in &recompute.results[..3] {
            assert_eq!(result.affordability_percentage, 0.0);
            assert!(result.affordability_percentage.is_finite());
            assert!(result.is_affordable);
            assert_eq!(result.bucket, Bucket::Critical);
        }
    }

    #[test]
    fn zero_income_without_living_costs_is_still_cash_negative() {
        let mut settings = sample_settings();
        settings.net_annual_income = 0.0;
        settings.living_costs = LivingCosts::default();
        let records = vec![postcode("4000", points(300.0, 300.0, 300.0), PricePoints::default())];
        let recompute = recompute_all(&records, &settings, PriceMode::Median);
        let result = &recompute.results[0];
        assert_eq!(result.weekly_money_leftover, Some(-300.0));
        assert_eq!(result.bucket, Bucket::Critical);
    }

    #[test]
    fn non_finite_income_falls_back_to_no_data_for_every_record() {
        let mut settings = sample_settings();
        settings.net_annual_income = f64::NAN;
        let records = sample_records();
        let recompute = recompute_all(&records, &settings, PriceMode::Median);

        assert!(recompute.income.is_none());
        assert_eq!(recompute.results.len(), records.len());
        for (result, stats) in recompute.results.iter().zip(&records) {
            assert_eq!(result, &AffordabilityResult::no_data(&stats.postcode));
        }
    }

    #[test]
    fn non_finite_living_costs_are_treated_as_zero() {
        let mut settings = sample_settings();
        settings.living_costs.other = f64::INFINITY;
        let income = income_profile(&settings, TaxSchedule::australia_2024_25()).unwrap();
        assert_approx(income.weekly_living_costs, 207.0);
    }

    #[test]
    fn affordable_household_lands_in_low_buckets() {
        let mut settings = sample_settings();
        settings.net_annual_income = 150_000.0;
        let records = sample_records();
        let recompute = recompute_all(&records, &settings, PriceMode::Median);
        let result = &recompute.results[2];
        assert!(result.is_affordable);
        assert_eq!(result.bucket, Bucket::VeryAffordable);
    }

    #[test]
    fn summarize_counts_buckets_and_flags() {
        let settings = sample_settings();
        let records = sample_records();
        let recompute = recompute_all(&records, &settings, PriceMode::Median);
        let summary = summarize(&recompute.results);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.with_data, 3);
        assert_eq!(summary.buckets.get(&Bucket::NoData), Some(&1));
        assert_eq!(summary.buckets.values().sum::<usize>(), 4);
        assert_eq!(
            summary.cash_negative,
            recompute
                .results
                .iter()
                .filter(|r| r.bucket == Bucket::Critical)
                .count()
        );
        // 2880 at 300/week plus the no-data 0872 entry.
        assert_eq!(summary.affordable, 2);
    }

    #[test]
    fn affordable_flag_follows_the_threshold_alone() {
        let settings = sample_settings();
        let records = sample_records();
        let recompute = recompute_all(&records, &settings, PriceMode::Median);
        for result in &recompute.results {
            assert_eq!(
                result.is_affordable,
                result.affordability_percentage <= AFFORDABILITY_THRESHOLD_PERCENT
            );
        }
    }

    #[test]
    fn flat_schedule_pass_uses_its_gross_income() {
        let settings = sample_settings();
        let flat = TaxSchedule::new(&[(0.0, 0.5)]).unwrap();
        let records = sample_records();
        let recompute = recompute_with_schedule(&records, &settings, PriceMode::Median, &flat);

        let income = recompute.income.unwrap();
        assert_approx(income.weekly_gross, 123_968.0 / 52.0);
        // 450/week is ~31% of gross under the reference schedule, ~19% here.
        let result = &recompute.results[1];
        assert_approx(result.affordability_percentage, 450.0 / (123_968.0 / 52.0) * 100.0);
        assert!(result.is_affordable);
        assert_eq!(result.bucket, Bucket::VeryAffordable);
    }

    #[test]
    fn huge_loan_term_does_not_abort_the_pass() {
        let mut settings = sample_settings();
        settings.housing_mode = HousingMode::Buy;
        settings.loan_term_years = u32::MAX;
        let records = sample_records();
        let recompute = recompute_all(&records, &settings, PriceMode::Median);

        assert_eq!(recompute.results.len(), records.len());
        let result = &recompute.results[1];
        assert!(result.weekly_housing_cost.is_finite());
        assert!(result.weekly_housing_cost > 0.0);
    }

    #[test]
    fn custom_schedule_changes_gross_income() {
        let settings = sample_settings();
        let flat = TaxSchedule::new(&[(0.0, 0.5)]).unwrap();
        let income = income_profile(&settings, &flat).unwrap();
        assert_approx(income.gross_annual, 123_968.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_recompute_is_idempotent_and_finite(
            income in 0u32..400_000,
            rent in 0u32..3_000,
            price in 0u32..5_000,
            rate_bp in 0u32..1_500,
            term in 1u32..41,
            buy in proptest::bool::ANY,
            interest_only in proptest::bool::ANY
        ) {
            let mut settings = sample_settings();
            settings.net_annual_income = income as f64;
            settings.interest_rate_percent = rate_bp as f64 / 100.0;
            settings.loan_term_years = term;
            settings.housing_mode = if buy { HousingMode::Buy } else { HousingMode::Rent };
            settings.mortgage_type = if interest_only {
                MortgageType::InterestOnly
            } else {
                MortgageType::PrincipalAndInterest
            };
            let records = vec![postcode(
                "5000",
                points(rent as f64, rent as f64, rent as f64),
                points(price as f64, price as f64, price as f64),
            )];

            let first = recompute_all(&records, &settings, PriceMode::Median);
            let second = recompute_all(&records, &settings, PriceMode::Median);
            prop_assert_eq!(&first, &second);

            let result = &first.results[0];
            prop_assert!(result.weekly_housing_cost.is_finite());
            prop_assert!(result.affordability_percentage.is_finite());
            prop_assert!(result.affordability_percentage >= 0.0);
            prop_assert_eq!(result.weekly_money_leftover.is_some(), result.weekly_housing_cost > 0.0);
            if result.weekly_money_leftover.is_some_and(|left| left < 0.0) {
                prop_assert_eq!(result.bucket, Bucket::Critical);
            }
        }
    }
}
