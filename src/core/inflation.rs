use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Annual CPI movement in percent, keyed by calendar year.
const AUSTRALIA_CPI: [(i32, f64); 4] = [(2022, 7.8), (2023, 4.1), (2024, 2.4), (2025, 2.8)];

static CPI_SERIES: LazyLock<InflationSeries> =
    LazyLock::new(|| InflationSeries::from_pairs(AUSTRALIA_CPI));

/// Sparse year -> percentage rate table. Years without an entry contribute no
/// adjustment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InflationSeries {
    rates: BTreeMap<i32, f64>,
}

impl InflationSeries {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i32, f64)>) -> Self {
        Self {
            rates: pairs.into_iter().collect(),
        }
    }

    pub fn australia_cpi() -> &'static InflationSeries {
        &CPI_SERIES
    }

    pub fn rate(&self, year: i32) -> Option<f64> {
        self.rates.get(&year).copied()
    }
}

/// Compounds every rate in `(base_year, target_year]` onto `base` and rounds to
/// the nearest whole unit.
pub fn adjust_for_inflation(
    base: f64,
    base_year: i32,
    target_year: i32,
    series: &InflationSeries,
) -> f64 {
    if target_year <= base_year {
        return base;
    }
    let adjusted = series
        .rates
        .range(base_year + 1..=target_year)
        .fold(base, |value, (_, rate)| value * (1.0 + rate / 100.0));
    adjusted.round()
}
