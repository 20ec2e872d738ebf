use crate::error::{DatasetError, DatasetResult};
use crate::value_objects::series::{finite, Series};

pub const SPLINE_DEGREE: usize = 3;

/// `nu`-th derivative, at each position `i`, of the interpolating cubic spline through points
/// `0..=i`. Positions before [`SPLINE_DEGREE`] are missing.
///
/// Each position is a fresh fit over the whole prefix, so the cost is quadratic in the series
/// length and an earlier value never depends on a later one.
pub fn get_spline(series: &Series, nu: u8) -> DatasetResult<Series> {
    if nu as usize > SPLINE_DEGREE {
        return Err(DatasetError::Configuration(format!(
            "spline derivative order must be <= {SPLINE_DEGREE}, got {nu}"
        )));
    }
    let y = series.dense().ok_or_else(|| {
        DatasetError::UpstreamData(format!(
            "spline({}): series has {} missing values",
            series.name,
            series.null_count()
        ))
    })?;

    let values = (0..y.len())
        .map(|i| {
            if i < SPLINE_DEGREE {
                None
            } else {
                finite(derivative_at_end(&y[..=i], nu))
            }
        })
        .collect();
    Ok(Series {
        name: series.name.clone(),
        index: series.index.clone(),
        values,
    })
}

/// Not-a-knot cubic spline on unit spacing, differentiated at the last knot.
fn derivative_at_end(y: &[f64], nu: u8) -> f64 {
    let n = y.len();
    let last = n - 1;
    if nu == 0 {
        return y[last];
    }
    let m = second_derivatives(y);
    match nu {
        1 => (y[last] - y[last - 1]) + (m[last - 1] + 2.0 * m[last]) / 6.0,
        2 => m[last],
        _ => m[last] - m[last - 1],
    }
}

/// Knot second derivatives. With not-a-knot ends the first and last interior equations
/// decouple (`6 M1 = d1`, `6 M[n-2] = d[n-2]`), leaving a tridiagonal system in between.
fn second_derivatives(y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let d = |i: usize| 6.0 * (y[i + 1] - 2.0 * y[i] + y[i - 1]);
    let mut m = vec![0.0; n];
    m[1] = d(1) / 6.0;
    m[n - 2] = d(n - 2) / 6.0;

    // interior unknowns 2..=n-3
    if n > 4 {
        let size = n - 4;
        let mut rhs: Vec<f64> = (2..n - 2).map(d).collect();
        rhs[0] -= m[1];
        rhs[size - 1] -= m[n - 2];
        let solved = solve_tridiagonal(&rhs, 1.0, 4.0);
        m[2..n - 2].copy_from_slice(&solved);
    }

    m[0] = 2.0 * m[1] - m[2];
    m[n - 1] = 2.0 * m[n - 2] - m[n - 3];
    m
}

/// Thomas algorithm for a constant-coefficient tridiagonal matrix.
fn solve_tridiagonal(rhs: &[f64], off: f64, diag: f64) -> Vec<f64> {
    let size = rhs.len();
    let mut c = vec![0.0; size];
    let mut x = rhs.to_vec();
    c[0] = off / diag;
    x[0] /= diag;
    for i in 1..size {
        let denom = diag - off * c[i - 1];
        c[i] = off / denom;
        x[i] = (x[i] - off * x[i - 1]) / denom;
    }
    for i in (0..size.saturating_sub(1)).rev() {
        x[i] -= c[i] * x[i + 1];
    }
    x
}
