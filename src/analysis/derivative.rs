use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("need at least 2 samples to fit, got {0}")]
    TooFewSamples(usize),
    #[error("x has {x} samples but y has {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("sample {0} is not finite")]
    NonFinite(usize),
    #[error("duplicate x value {0}")]
    DuplicateAbscissa(f64),
}

/// A smooth curve that can be differentiated anywhere on the real line.
pub trait Differentiable {
    fn value(&self, x: f64) -> f64;

    fn derivative(&self, x: f64) -> f64;
}

// ---------------------------------------------------------------------------
// Natural cubic spline
// ---------------------------------------------------------------------------

/// Natural cubic spline through (x, y) samples.
///
/// Samples are sorted by x before fitting, so descending sweep legs are
/// accepted as-is.  Outside the sampled range the end segment's polynomial
/// is extended.  With exactly two samples the spline is the straight line
/// through them.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at each knot.
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self, FitError> {
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(FitError::TooFewSamples(x.len()));
        }
        if let Some(i) = (0..x.len()).find(|&i| !x[i].is_finite() || !y[i].is_finite()) {
            return Err(FitError::NonFinite(i));
        }

        let mut samples: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(w) = samples.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(FitError::DuplicateAbscissa(w[0].0));
        }

        let (x, y): (Vec<f64>, Vec<f64>) = samples.into_iter().unzip();
        let m = natural_second_derivatives(&x, &y);
        Ok(Self { x, y, m })
    }

    /// Index of the segment used to evaluate `at`.
    fn segment(&self, at: f64) -> usize {
        let last = self.x.len() - 2;
        match self.x.binary_search_by(|k| k.total_cmp(&at)) {
            Ok(i) => i.min(last),
            Err(0) => 0,
            Err(i) => (i - 1).min(last),
        }
    }
}

/// Solve the tridiagonal system for the knot second derivatives with
/// `m[0] = m[n-1] = 0`.
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let interior = n - 2;
    let mut diag = vec![0.0; interior];
    let mut rhs = vec![0.0; interior];
    for k in 0..interior {
        let i = k + 1;
        diag[k] = 2.0 * (h[i - 1] + h[i]);
        rhs[k] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
    }

    // Thomas algorithm; sub- and super-diagonals are h[k] and h[k + 1].
    for k in 1..interior {
        let w = h[k] / diag[k - 1];
        diag[k] -= w * h[k];
        rhs[k] -= w * rhs[k - 1];
    }
    m[interior] = rhs[interior - 1] / diag[interior - 1];
    for k in (0..interior - 1).rev() {
        m[k + 1] = (rhs[k] - h[k + 1] * m[k + 2]) / diag[k];
    }
    m
}

impl Differentiable for CubicSpline {
    fn value(&self, at: f64) -> f64 {
        let i = self.segment(at);
        let h = self.x[i + 1] - self.x[i];
        let t = at - self.x[i];
        let slope = (self.y[i + 1] - self.y[i]) / h - h * (2.0 * self.m[i] + self.m[i + 1]) / 6.0;
        self.y[i]
            + slope * t
            + self.m[i] / 2.0 * t * t
            + (self.m[i + 1] - self.m[i]) / (6.0 * h) * t * t * t
    }

    fn derivative(&self, at: f64) -> f64 {
        let i = self.segment(at);
        let h = self.x[i + 1] - self.x[i];
        let t = at - self.x[i];
        let slope = (self.y[i + 1] - self.y[i]) / h - h * (2.0 * self.m[i] + self.m[i + 1]) / 6.0;
        slope + self.m[i] * t + (self.m[i + 1] - self.m[i]) / (2.0 * h) * t * t
    }
}
