//! Bicubic sampling of a gridded field with analytic first derivatives.
//!
//! Cubic convolution with the Catmull-Rom kernel on the uniform (θ, r)
//! lattice. Passes through every sample and reproduces linear data
//! exactly away from the edges. Stencil neighbors past an edge repeat the
//! edge sample, and query coordinates clamp to the grid.

use ndarray::ArrayView2;

use crate::grid::Grid;

/// Field value and partial derivatives at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub d_theta: f64,
    pub d_r: f64,
}

/// Catmull-Rom weights for offsets -1, 0, 1, 2 at fractional position `u`.
fn weights(u: f64) -> [f64; 4] {
    let u2 = u * u;
    let u3 = u2 * u;
    [
        0.5 * (-u + 2.0 * u2 - u3),
        0.5 * (2.0 - 5.0 * u2 + 3.0 * u3),
        0.5 * (u + 4.0 * u2 - 3.0 * u3),
        0.5 * (-u2 + u3),
    ]
}

/// d/du of [`weights`].
fn weight_slopes(u: f64) -> [f64; 4] {
    let u2 = u * u;
    [
        0.5 * (-1.0 + 4.0 * u - 3.0 * u2),
        0.5 * (-10.0 * u + 9.0 * u2),
        0.5 * (1.0 + 8.0 * u - 9.0 * u2),
        0.5 * (-2.0 * u + 3.0 * u2),
    ]
}

/// Cell index and fractional offset for coordinate `x` on a lattice
/// starting at `origin` with `n` samples spaced `step` apart.
fn locate(x: f64, origin: f64, step: f64, n: usize) -> (usize, f64) {
    let last = (n - 1) as f64;
    let s = ((x - origin) / step).clamp(0.0, last);
    let cell = (s.floor() as usize).min(n - 2);
    (cell, s - cell as f64)
}

fn neighbors(cell: usize, n: usize) -> [usize; 4] {
    let max = n as isize - 1;
    let c = cell as isize;
    [c - 1, c, c + 1, c + 2].map(|k| k.clamp(0, max) as usize)
}

/// Read-only bicubic view of a field laid out on `grid`.
pub struct BicubicField<'a> {
    grid: &'a Grid,
    field: ArrayView2<'a, f64>,
}

impl<'a> BicubicField<'a> {
    /// `field` must have the grid's `[ntheta, nr]` shape.
    pub fn new(grid: &'a Grid, field: ArrayView2<'a, f64>) -> Option<Self> {
        (field.dim() == grid.shape()).then_some(Self { grid, field })
    }

    pub fn sample(&self, theta: f64, r: f64) -> Sample {
        let g = self.grid;
        let (ti, tu) = locate(theta, g.theta[0], g.dtheta, g.ntheta);
        let (ri, ru) = locate(r, g.r[0], g.dr, g.nr);
        let rows = neighbors(ti, g.ntheta);
        let cols = neighbors(ri, g.nr);

        let wt = weights(tu);
        let wr = weights(ru);
        let st = weight_slopes(tu);
        let sr = weight_slopes(ru);

        let mut value = 0.0;
        let mut d_theta = 0.0;
        let mut d_r = 0.0;
        for (a, &i) in rows.iter().enumerate() {
            for (b, &j) in cols.iter().enumerate() {
                let f = self.field[[i, j]];
                value += wt[a] * wr[b] * f;
                d_theta += st[a] * wr[b] * f;
                d_r += wt[a] * sr[b] * f;
            }
        }

        Sample {
            value,
            d_theta: d_theta / g.dtheta,
            d_r: d_r / g.dr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid() -> Grid {
        Grid::new(1.0, 21, 31).unwrap()
    }

    #[test]
    fn test_weights_partition_unity() {
        for u in [0.0, 0.25, 0.5, 0.9] {
            assert_abs_diff_eq!(weights(u).iter().sum::<f64>(), 1.0, epsilon = 1e-14);
            assert_abs_diff_eq!(weight_slopes(u).iter().sum::<f64>(), 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_passes_through_samples() {
        let g = grid();
        let field =
            ndarray::Array2::from_shape_fn(g.shape(), |(i, j)| (i * 7 + j * 3) as f64 % 5.0);
        let interp = BicubicField::new(&g, field.view()).unwrap();
        for &(i, j) in &[(0, 0), (5, 9), (30, 20), (17, 1)] {
            let s = interp.sample(g.theta[i], g.r[j]);
            assert_abs_diff_eq!(s.value, field[[i, j]], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_field_has_exact_slopes_in_interior() {
        let g = grid();
        let field = ndarray::Zip::from(&g.tt)
            .and(&g.rr)
            .map_collect(|&t, &r| 2.0 * t - 3.0 * r + 1.0);
        let interp = BicubicField::new(&g, field.view()).unwrap();
        let s = interp.sample(1.3, 0.47);
        assert_abs_diff_eq!(s.value, 2.0 * 1.3 - 3.0 * 0.47 + 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.d_theta, 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(s.d_r, -3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_queries_outside_grid_clamp() {
        let g = grid();
        let field = g.rr.clone();
        let interp = BicubicField::new(&g, field.view()).unwrap();
        assert_abs_diff_eq!(interp.sample(0.5, 5.0).value, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(interp.sample(-1.0, 1.0).value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let g = grid();
        let wrong = ndarray::Array2::zeros((3, 3));
        assert!(BicubicField::new(&g, wrong.view()).is_none());
    }
}
