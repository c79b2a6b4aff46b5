/// Normalized cumulative distribution of a set of non-negative weights.
///
/// The last bin is pinned to exactly 1.0 to absorb rounding errors. A null (or non-finite) total
/// yields `NaN` bins, which no uniform draw can ever select.
#[must_use]
pub fn cumulative_distribution(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    let mut acc = 0.0;
    let mut cumulative: Vec<f64> = weights.iter().map(|w| {
        acc += w;
        acc / total
    }).collect();

    if total > 0.0 && total.is_finite() {
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
    }
    cumulative
}

/// Index of the first bin whose cumulative probability is strictly greater than `rand`.
///
/// `None` if no bin can be reached.
#[must_use]
pub fn try_choose_from_cumulative(cumulative: &[f64], rand: f64) -> Option<usize> {
    cumulative.iter().position(|p| rand < *p)
}

/// Same as [`try_choose_from_cumulative`], but falls back to the last bin.
#[must_use]
pub fn choose_from_cumulative(cumulative: &[f64], rand: f64) -> usize {
    try_choose_from_cumulative(cumulative, rand).unwrap_or(cumulative.len().saturating_sub(1))
}
