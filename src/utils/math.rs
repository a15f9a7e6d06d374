/// Arithmetic mean, `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation (denominator `n`), `None` for an empty slice.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let mu = mean(data)?;
    let var = data.iter().map(|&x| (x - mu).powi(2)).sum::<f64>() / data.len() as f64;
    Some(var.sqrt())
}

/// Fraction of `true` values, `None` when there are no indicators at all.
pub fn fraction_true(indicators: &[bool]) -> Option<f64> {
    if indicators.is_empty() {
        return None;
    }
    let hits = indicators.iter().filter(|&&b| b).count();
    Some(hits as f64 / indicators.len() as f64)
}

/// `ln(sum(exp(v)))` without overflow; `-inf` for no finite terms.
pub fn log_sum_exp<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let values = values.into_iter().collect::<Vec<_>>();
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
