use super::types::Bucket;

/// Maps an affordability percentage to a severity bucket. A negative leftover
/// wins over any ratio.
pub fn classify(percentage: Option<f64>, leftover: Option<f64>) -> Bucket {
    if leftover.is_some_and(|left| left < 0.0) {
        return Bucket::Critical;
    }
    let Some(percentage) = percentage.filter(|p| !p.is_nan() && *p != 0.0) else {
        return Bucket::NoData;
    };
    match percentage {
        p if p <= 20.0 => Bucket::VeryAffordable,
        p if p <= 30.0 => Bucket::Affordable,
        p if p <= 40.0 => Bucket::Moderate,
        p if p <= 50.0 => Bucket::High,
        _ => Bucket::Severe,
    }
}
