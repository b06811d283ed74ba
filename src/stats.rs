//! Descriptive statistics with numerical stability guarantees.
//!
//! Every function returns `None` instead of a non-finite result, so
//! callers can serialize the outcome directly as `null`.
//!
//! # Algorithms
//!
//! - **Mean**: Kahan compensated summation.
//! - **Variance/StdDev**: Welford's online algorithm, sample (n − 1) form.
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).
//! - **Pearson r**: two-pass centred sums over complete pairs.
//! - **Linear fit**: ordinary least squares for `y = slope·x + intercept`.
//!
//! Sums run on data scaled by a power of two (exact in binary), so finite
//! inputs near `f64::MAX` do not overflow intermediate results.

/// Computes the arithmetic mean using Kahan compensated summation.
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
///
/// ```
/// use u_compare::stats::mean;
/// assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
/// assert_eq!(mean(&[]), None);
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    let scale = unit_scale(data);
    let scaled: Vec<f64> = data.iter().map(|x| x * scale).collect();
    finite(kahan_sum(&scaled) / data.len() as f64 / scale)
}

/// Computes the sample variance (denominator `n − 1`).
///
/// # Returns
/// - `None` if `data.len() < 2` or contains NaN/Inf.
///
/// ```
/// use u_compare::stats::variance;
/// let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((variance(&v).unwrap() - 4.571428571428571).abs() < 1e-10);
/// ```
pub fn variance(data: &[f64]) -> Option<f64> {
    let (m2, scale) = scaled_variance(data)?;
    finite(m2 / (scale * scale))
}

/// Computes the sample standard deviation.
///
/// A single observation has no sample standard deviation and yields `None`.
///
/// ```
/// use u_compare::stats::std_dev;
/// assert_eq!(std_dev(&[10.0]), None);
/// assert!((std_dev(&[10.0, 20.0]).unwrap() - 7.0710678118654755).abs() < 1e-12);
/// ```
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let (m2, scale) = scaled_variance(data)?;
    finite(m2.sqrt() / scale)
}

/// Welford variance of `data · scale`, returned with the scale applied.
fn scaled_variance(data: &[f64]) -> Option<(f64, f64)> {
    if data.len() < 2 || !data.iter().all(|x| x.is_finite()) {
        return None;
    }
    let scale = unit_scale(data);
    let mut count = 0.0;
    let mut running_mean = 0.0;
    let mut m2 = 0.0;
    for &x in data {
        let x = x * scale;
        count += 1.0;
        let delta = x - running_mean;
        running_mean += delta / count;
        m2 += delta * (x - running_mean);
    }
    Some((m2 / (count - 1.0), scale))
}

/// Returns the minimum value, or `None` if empty or any value is NaN.
pub fn min(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.iter()
        .copied()
        .try_fold(f64::INFINITY, |acc, x| (!x.is_nan()).then(|| acc.min(x)))
}

/// Returns the maximum value, or `None` if empty or any value is NaN.
pub fn max(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    data.iter()
        .copied()
        .try_fold(f64::NEG_INFINITY, |acc, x| (!x.is_nan()).then(|| acc.max(x)))
}

/// Computes the median without mutating the input.
///
/// ```
/// use u_compare::stats::median;
/// assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
/// assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
/// ```
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() || data.iter().any(|x| x.is_nan()) {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some(midpoint(sorted[n / 2 - 1], sorted[n / 2]))
    }
}

/// Pearson product-moment correlation of paired samples.
///
/// # Returns
/// - `None` if lengths differ, fewer than two pairs exist, any value is
///   non-finite, or either side has zero variance.
///
/// ```
/// use u_compare::stats::pearson;
/// let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
/// assert!((r - 1.0).abs() < 1e-12);
/// assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
/// ```
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let sums = centred_sums(x, y)?;
    if sums.sxx <= 0.0 || sums.syy <= 0.0 {
        return None;
    }
    let r = sums.sxy / (sums.sxx.sqrt() * sums.syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Centred second moments of scaled paired samples.
struct CentredSums {
    sxy: f64,
    sxx: f64,
    syy: f64,
    mx: f64,
    my: f64,
    x_scale: f64,
    y_scale: f64,
}

fn centred_sums(x: &[f64], y: &[f64]) -> Option<CentredSums> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let (x_scale, y_scale) = (unit_scale(x), unit_scale(y));
    let xs: Vec<f64> = x.iter().map(|v| v * x_scale).collect();
    let ys: Vec<f64> = y.iter().map(|v| v * y_scale).collect();
    let mx = mean(&xs)?;
    let my = mean(&ys)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&a, &b) in xs.iter().zip(&ys) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    Some(CentredSums {
        sxy,
        sxx,
        syy,
        mx,
        my,
        x_scale,
        y_scale,
    })
}

/// Coefficients of a degree-1 least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Slope of the fitted line.
    pub slope: f64,
    /// Intercept of the fitted line.
    pub intercept: f64,
}

impl LinearFit {
    /// Evaluates the fitted line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fits `y = slope·x + intercept` by ordinary least squares.
///
/// # Returns
/// - `None` if lengths differ, fewer than two points exist, values are
///   non-finite, or `x` is constant.
///
/// ```
/// use u_compare::stats::linear_fit;
/// let fit = linear_fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.intercept - 1.0).abs() < 1e-12);
/// ```
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let sums = centred_sums(x, y)?;
    if sums.sxx <= 0.0 {
        return None;
    }
    // Fitted on scaled data: y·sy = b'·x·sx + a'.
    let scaled_slope = sums.sxy / sums.sxx;
    let slope = scaled_slope * sums.x_scale / sums.y_scale;
    let intercept = (sums.my - scaled_slope * sums.mx) / sums.y_scale;
    (slope.is_finite() && intercept.is_finite()).then_some(LinearFit { slope, intercept })
}

/// Rounds to `decimals` places using correctly rounded decimal formatting
/// (ties resolve on the exact binary value, half-to-even).
///
/// ```
/// use u_compare::stats::round_to;
/// assert_eq!(round_to(2.675, 2), 2.67);
/// assert_eq!(round_to(15.0, 2), 15.0);
/// assert_eq!(round_to(0.33333, 3), 0.333);
/// ```
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// Keeps finite values, maps NaN/Inf to `None`.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Midpoint of two values without overflowing their sum.
fn midpoint(a: f64, b: f64) -> f64 {
    if (a < 0.0) == (b < 0.0) {
        a + (b - a) / 2.0
    } else {
        (a + b) / 2.0
    }
}

/// Power of two bringing the largest magnitude in `data` near 1.
/// Multiplying by it is exact, so scaled statistics match unscaled ones.
fn unit_scale(data: &[f64]) -> f64 {
    let largest = data.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if largest == 0.0 || !largest.is_finite() {
        return 1.0;
    }
    let exponent = (largest.log2().floor() as i32).clamp(-1000, 1000);
    2f64.powi(-exponent)
}

/// Kahan compensated summation.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for &x in data {
        let y = x - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_rejects_non_finite() {
        assert_eq!(mean(&[1.0, f64::INFINITY]), None);
        assert_eq!(mean(&[1.0, f64::NAN]), None);
    }

    #[test]
    fn mean_near_float_limit_stays_finite() {
        assert_eq!(mean(&[1.7e308, 1.7e308]), Some(1.7e308));
        assert_eq!(mean(&[f64::MAX, -f64::MAX]), Some(0.0));
    }

    #[test]
    fn median_midpoint_does_not_overflow() {
        assert_eq!(median(&[1.7e308, 1.7e308]), Some(1.7e308));
        assert_eq!(median(&[-f64::MAX, f64::MAX]), Some(0.0));
        assert_eq!(median(&[-3.0, 5.0]), Some(1.0));
    }

    #[test]
    fn spread_of_huge_values() {
        let sd = std_dev(&[1e308, -1e308]).unwrap();
        assert!((sd / 1.4142135623730951e308 - 1.0).abs() < 1e-12);
        // Variance itself exceeds f64::MAX.
        assert_eq!(variance(&[1e308, -1e308]), None);
    }

    #[test]
    fn pearson_and_fit_of_huge_values() {
        let x = [1e308, -1e308, 5e307];
        let y = [4.0, -4.0, 2.0];
        let r = pearson(&x, &y).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
        let fit = linear_fit(&x, &y).unwrap();
        assert!((fit.slope / 4e-308 - 1.0).abs() < 1e-12);
        assert!(fit.intercept.abs() < 1e-9);
    }

    #[test]
    fn kahan_sum_is_stable() {
        let data = vec![0.1; 10_000];
        assert!((kahan_sum(&data) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn min_max_basic() {
        let v = [3.0, -1.0, 4.0, 1.5];
        assert_eq!(min(&v), Some(-1.0));
        assert_eq!(max(&v), Some(4.0));
        assert_eq!(min(&[]), None);
        assert_eq!(max(&[1.0, f64::NAN]), None);
    }

    #[test]
    fn variance_needs_two_points() {
        assert_eq!(variance(&[1.0]), None);
        assert_eq!(variance(&[5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn pearson_negative_and_bounded() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [10.0, 8.0, 6.0, 4.0, 2.0];
        let r = pearson(&x, &y).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert!((-1.0..=1.0).contains(&r));
    }

    #[test]
    fn pearson_length_mismatch() {
        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn linear_fit_constant_x_fails() {
        assert_eq!(linear_fit(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn linear_fit_predict() {
        let fit = linear_fit(&[1.0, 2.0, 3.0, 4.0], &[3.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((fit.predict(10.0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn round_to_matches_decimal_rounding() {
        assert_eq!(round_to(1.005, 2), 1.0);
        assert_eq!(round_to(-3.14159, 3), -3.142);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn finite_filters() {
        assert_eq!(finite(1.5), Some(1.5));
        assert_eq!(finite(f64::NAN), None);
        assert_eq!(finite(f64::NEG_INFINITY), None);
    }
}
