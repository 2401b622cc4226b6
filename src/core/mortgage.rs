use super::types::MortgageType;

/// Monthly repayment figures for a loan.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MortgagePayment {
    pub payment: f64,
    /// First-period interest only, not interest over the life of the loan.
    pub interest: f64,
}

pub fn compute_payment(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
    mortgage_type: MortgageType,
) -> MortgagePayment {
    if principal <= 0.0 {
        return MortgagePayment::default();
    }

    let months = f64::from(term_years.max(1)) * 12.0;
    if annual_rate_percent == 0.0 {
        return MortgagePayment {
            payment: principal / months,
            interest: 0.0,
        };
    }

    let monthly_rate = annual_rate_percent / 100.0 / 12.0;
    let monthly_interest = principal * monthly_rate;
    match mortgage_type {
        MortgageType::InterestOnly => MortgagePayment {
            payment: monthly_interest,
            interest: monthly_interest,
        },
        MortgageType::PrincipalAndInterest => {
            let discount = (1.0 + monthly_rate).powf(-months);
            MortgagePayment {
                payment: monthly_interest / (1.0 - discount),
                interest: monthly_interest,
            }
        }
    }
}

/// Converts a monthly amount to its weekly equivalent over a 52-week year.
pub fn monthly_to_weekly(monthly: f64) -> f64 {
    monthly * 12.0 / 52.0
}
