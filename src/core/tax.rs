use std::sync::LazyLock;

use serde::Serialize;

use super::error::{CalcError, Result};

/// Lower bound and marginal rate of each band in the 2024-25 resident table.
const AUSTRALIA_2024_25: [(f64, f64); 5] = [
    (0.0, 0.0),
    (18_200.0, 0.16),
    (45_000.0, 0.30),
    (135_000.0, 0.37),
    (190_000.0, 0.45),
];

/// Slack applied when testing whether an inverted gross figure lands inside a
/// bracket, so a net amount sitting exactly on a boundary cannot be rejected
/// by both neighbours after rounding.
const BOUNDARY_SLACK: f64 = 1e-6;

static REFERENCE_SCHEDULE: LazyLock<TaxSchedule> =
    LazyLock::new(|| TaxSchedule::from_bands_unchecked(&AUSTRALIA_2024_25));

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBracket {
    pub lower: f64,
    /// `f64::INFINITY` for the top bracket.
    pub upper: f64,
    pub rate: f64,
    /// Tax owed on income up to `lower`.
    pub cumulative_tax_below: f64,
}

impl TaxBracket {
    fn contains(&self, gross: f64) -> bool {
        gross >= self.lower - BOUNDARY_SLACK
            && (self.upper.is_infinite() || gross < self.upper + BOUNDARY_SLACK)
    }
}

/// Outcome of solving for gross income inside the bracket table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BracketMatch {
    Found { index: usize, gross: f64 },
    NotFound,
}

/// Progressive income tax table. Brackets are contiguous, cover `[0, inf)` and
/// carry precomputed cumulative tax so both conversion directions are closed
/// form.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxSchedule {
    brackets: Vec<TaxBracket>,
}

impl TaxSchedule {
    /// Builds a schedule from `(lower, rate)` pairs, deriving each bracket's
    /// upper bound and cumulative tax.
    pub fn new(bands: &[(f64, f64)]) -> Result<Self> {
        let Some(&(first_lower, _)) = bands.first() else {
            return Err(CalcError::InvalidSchedule(
                "at least one bracket is required".to_string(),
            ));
        };
        if first_lower != 0.0 {
            return Err(CalcError::InvalidSchedule(
                "first bracket must start at 0".to_string(),
            ));
        }

        for (lower, rate) in bands {
            if !lower.is_finite() || !rate.is_finite() {
                return Err(CalcError::InvalidSchedule(
                    "bracket bounds and rates must be finite".to_string(),
                ));
            }
            if !(0.0..1.0).contains(rate) {
                return Err(CalcError::InvalidSchedule(format!(
                    "rate {rate} must be in [0, 1)"
                )));
            }
        }

        for pair in bands.windows(2) {
            let ((lower, rate), (next_lower, next_rate)) = (pair[0], pair[1]);
            if next_lower <= lower {
                return Err(CalcError::InvalidSchedule(format!(
                    "bracket lower bounds must ascend, got {lower} then {next_lower}"
                )));
            }
            if next_rate < rate {
                return Err(CalcError::InvalidSchedule(format!(
                    "rates must not decrease, got {rate} then {next_rate}"
                )));
            }
        }

        Ok(Self::from_bands_unchecked(bands))
    }

    /// The 2024-25 Australian resident schedule.
    pub fn australia_2024_25() -> &'static TaxSchedule {
        &REFERENCE_SCHEDULE
    }

    fn from_bands_unchecked(bands: &[(f64, f64)]) -> Self {
        let mut brackets = Vec::with_capacity(bands.len());
        let mut cumulative = 0.0;
        for (i, &(lower, rate)) in bands.iter().enumerate() {
            let upper = bands.get(i + 1).map_or(f64::INFINITY, |&(next, _)| next);
            brackets.push(TaxBracket {
                lower,
                upper,
                rate,
                cumulative_tax_below: cumulative,
            });
            if upper.is_finite() {
                cumulative += (upper - lower) * rate;
            }
        }
        Self { brackets }
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Tax owed on `gross`. Negative income owes nothing.
    pub fn tax_on(&self, gross: f64) -> Result<f64> {
        let gross = require_finite(gross)?.max(0.0);
        Ok(self.tax_on_clamped(gross))
    }

    fn tax_on_clamped(&self, gross: f64) -> f64 {
        self.brackets
            .iter()
            .take_while(|bracket| bracket.lower < gross)
            .map(|bracket| (gross.min(bracket.upper) - bracket.lower) * bracket.rate)
            .sum()
    }

    pub fn gross_to_net(&self, gross: f64) -> Result<f64> {
        let gross = require_finite(gross)?.max(0.0);
        Ok(gross - self.tax_on_clamped(gross))
    }

    pub fn net_to_gross(&self, net: f64) -> Result<f64> {
        let net = require_finite(net)?.max(0.0);
        match self.solve_bracket(net) {
            BracketMatch::Found { gross, .. } => Ok(gross.max(0.0)),
            BracketMatch::NotFound => Err(CalcError::InvalidInput { value: net }),
        }
    }

    /// Linear scan solving `net = gross - tax(gross)` within each bracket and
    /// accepting the first finite candidate that lands inside it. The zero-rate
    /// bracket yields `gross == net`.
    pub fn solve_bracket(&self, net: f64) -> BracketMatch {
        for (index, bracket) in self.brackets.iter().enumerate() {
            let gross = (net + bracket.cumulative_tax_below - bracket.rate * bracket.lower)
                / (1.0 - bracket.rate);
            if gross.is_finite() && bracket.contains(gross) {
                return BracketMatch::Found { index, gross };
            }
        }
        BracketMatch::NotFound
    }

    /// Rate of the bracket containing `gross`; 0 for non-positive income.
    pub fn marginal_rate(&self, gross: f64) -> Result<f64> {
        let gross = require_finite(gross)?;
        Ok(self
            .brackets
            .iter()
            .rev()
            .find(|bracket| bracket.lower <= gross)
            .map_or(0.0, |bracket| bracket.rate))
    }
}

fn require_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::InvalidInput { value })
    }
}

pub fn gross_to_net(gross: f64) -> Result<f64> {
    TaxSchedule::australia_2024_25().gross_to_net(gross)
}

pub fn net_to_gross(net: f64) -> Result<f64> {
    TaxSchedule::australia_2024_25().net_to_gross(net)
}
