//! Small numeric helpers shared by the analyzers.
//!
//! Every function is total: empty or too-short inputs yield `None` instead of
//! NaN so callers can turn them into tagged "insufficient data" outcomes.

// ── Moments ───────────────────────────────────────────────────────────────────

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (N denominator). `None` for an empty slice.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Sample standard deviation (N − 1 denominator). `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

// ── Series helpers ────────────────────────────────────────────────────────────

/// Trailing moving average with the window clipped at the series start.
///
/// Element `i` is the mean of `values[i + 1 - w ..= i]` where
/// `w = min(window, i + 1)`. A `window` of 0 behaves like 1.
pub fn trailing_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let span = window.min(i + 1);
        out.push(sum / span as f64);
    }
    out
}

/// Least-squares slope of `values` against their index `0, 1, 2, ...`.
///
/// `None` below two points.
pub fn linear_regression_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values)?;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    Some(num / den)
}

// ── Bivariate ─────────────────────────────────────────────────────────────────

/// Centroid and population covariance of a set of 2-D points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bivariate {
    pub mean_x: f64,
    pub mean_y: f64,
    /// `[[var_x, cov_xy], [cov_xy, var_y]]`.
    pub covariance: [[f64; 2]; 2],
}

impl Bivariate {
    /// `None` below two points.
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for (x, y) in points {
            let dx = x - mean_x;
            let dy = y - mean_y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        Some(Self {
            mean_x,
            mean_y,
            covariance: [[sxx / n, sxy / n], [sxy / n, syy / n]],
        })
    }

    pub fn determinant(&self) -> f64 {
        let c = &self.covariance;
        c[0][0] * c[1][1] - c[0][1] * c[1][0]
    }

    /// Inverse of the covariance matrix, `None` when it is singular.
    ///
    /// Singularity is judged relative to the variances so that the test does
    /// not depend on the units of the two metrics.
    pub fn inverse_covariance(&self) -> Option<[[f64; 2]; 2]> {
        let c = &self.covariance;
        let scale = c[0][0] * c[1][1];
        let det = self.determinant();
        if !det.is_finite() || scale <= 0.0 || det <= SINGULAR_EPSILON * scale {
            return None;
        }
        Some([
            [c[1][1] / det, -c[0][1] / det],
            [-c[1][0] / det, c[0][0] / det],
        ])
    }

    /// Matrix used for Mahalanobis distances: the inverse when the covariance
    /// is regular, otherwise its Moore–Penrose pseudo-inverse.
    ///
    /// A rank-1 covariance `C = λ·v·vᵀ` (collinear points, or one metric
    /// constant) has pseudo-inverse `C / λ²` with `λ = trace(C)`, which turns
    /// the distance into a z-score along the principal axis. `None` only when
    /// every point is identical.
    pub fn precision(&self) -> Option<[[f64; 2]; 2]> {
        if let Some(inverse) = self.inverse_covariance() {
            return Some(inverse);
        }
        let c = &self.covariance;
        let trace = c[0][0] + c[1][1];
        if !trace.is_finite() || trace <= 0.0 {
            return None;
        }
        let scale = trace * trace;
        Some([
            [c[0][0] / scale, c[0][1] / scale],
            [c[1][0] / scale, c[1][1] / scale],
        ])
    }

    /// Mahalanobis distance of `(x, y)` from the centroid.
    pub fn mahalanobis(&self, inverse: &[[f64; 2]; 2], x: f64, y: f64) -> f64 {
        let dx = x - self.mean_x;
        let dy = y - self.mean_y;
        let d2 = dx * (inverse[0][0] * dx + inverse[0][1] * dy)
            + dy * (inverse[1][0] * dx + inverse[1][1] * dy);
        d2.max(0.0).sqrt()
    }
}

/// Relative determinant below which a covariance matrix counts as singular
/// (equivalent to a correlation magnitude above ~0.9999999995).
const SINGULAR_EPSILON: f64 = 1e-9;

// ── Tests ──────────────────────────────────────────────────────────────────────
