//! Daily-rate estimators over a zero-filled demand series.
//!
//! Each estimator returns expected units per day for the forecast horizon; the
//! engine blends them and scales by the horizon length.

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population variance.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let centre = mean(values);
    values.iter().map(|v| (v - centre).powi(2)).sum::<f64>() / values.len() as f64
}

/// Least-squares line over the series index, averaged across the horizon.
pub(crate) fn linear_trend(values: &[f64], horizon_days: u32) -> f64 {
    let n = values.len();
    if n < 2 {
        return mean(values);
    }

    let x_mean = (n as f64 - 1.0) / 2.0;
    let y_mean = mean(values);
    let (covariance, spread) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, spread), (index, y)| {
            let dx = index as f64 - x_mean;
            (cov + dx * (y - y_mean), spread + dx * dx)
        });
    let slope = if spread == 0.0 { 0.0 } else { covariance / spread };
    let intercept = y_mean - slope * x_mean;

    // Mean of the fitted line over x = n..n + horizon.
    let horizon = f64::from(horizon_days.max(1));
    let projected = intercept + slope * (n as f64 + (horizon - 1.0) / 2.0);

    projected.max(0.0)
}

/// Mean of the last five rolling-window means.
pub(crate) fn moving_average(values: &[f64], window: usize) -> f64 {
    if window == 0 || values.len() < window {
        return mean(values);
    }

    let rolling: Vec<f64> = values.windows(window).map(mean).collect();
    let tail = rolling.len().saturating_sub(5);
    mean(&rolling[tail..])
}

/// Day-of-week averages over the last two weeks, projected onto the horizon.
pub(crate) fn seasonal(values: &[f64], horizon_days: u32, min_points: usize) -> f64 {
    let n = values.len();
    if n < min_points.max(14) {
        return mean(values);
    }

    let mut buckets = [(0.0_f64, 0_u32); 7];
    for (index, value) in values.iter().enumerate().skip(n - 14) {
        let slot = &mut buckets[index % 7];
        slot.0 += value;
        slot.1 += 1;
    }

    let averages = buckets.map(|(total, count)| {
        if count == 0 {
            0.0
        } else {
            total / f64::from(count)
        }
    });

    let horizon = horizon_days.max(1);
    let full_weeks = f64::from(horizon / 7);
    let remainder: f64 = (0..(horizon % 7) as usize)
        .map(|offset| averages[(n + offset) % 7])
        .sum();
    (full_weeks * averages.iter().sum::<f64>() + remainder) / f64::from(horizon)
}
