use crate::utils::math::{mean, std_dev};
use itertools::Itertools;

#[derive(Debug, Clone, PartialEq)]
pub struct Smoothed {
    pub mean: Vec<Option<f64>>,
    pub std: Vec<Option<f64>>,
}

/// Rolling mean and population standard deviation of an accuracy series.
///
/// The window for index `i` is `[i - window + window / 2, i + window / 2)`
/// clamped to the series, so near the start it stays pinned at 0 and grows
/// until it first spans `window` samples, then slides.
///
/// Samples that are exactly zero or missing are dropped from each window
/// before the statistics are taken. This shrinks the denominator: a window of
/// `[0.0, 0.5, 0.7]` averages to 0.6, not 0.4. It keeps "no data" placeholders
/// out of the curve at the cost of also ignoring true all-wrong cutoffs.
pub fn rolling_average(series: &[Option<f64>], window: usize) -> Smoothed {
    let lead = window / 2;
    let lag = window - lead;

    let (mean_series, std_series): (Vec<_>, Vec<_>) = (0..series.len())
        .map(|i| {
            let start = i.saturating_sub(lag);
            let end = (i + lead).min(series.len());
            let samples = series[start..end]
                .iter()
                .filter_map(|v| *v)
                .filter(|v| *v != 0.0)
                .collect_vec();
            (mean(&samples), std_dev(&samples))
        })
        .unzip();

    Smoothed {
        mean: mean_series,
        std: std_series,
    }
}
