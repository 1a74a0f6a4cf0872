//! Axisymmetric (r, θ) discretization and its finite-difference stencils.
//!
//! Arrays are laid out `[ntheta, nr]`: axis 0 is polar angle, axis 1 is
//! radius. Every field, basis array, and weight in the crate shares this
//! shape.

use std::f64::consts::PI;

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::constants::{LAPLACIAN_EPSILON, RADIAL_ORIGIN};
use crate::error::{Result, SolverError};

pub const THETA_AXIS: Axis = Axis(0);
pub const RADIAL_AXIS: Axis = Axis(1);

/// Uniform grid over r ∈ (0, a], θ ∈ [0, π]. Immutable once built.
#[derive(Debug, Clone)]
pub struct Grid {
    pub nr: usize,
    pub ntheta: usize,
    pub outer_radius: f64,
    pub r: Array1<f64>,
    pub theta: Array1<f64>,
    pub dr: f64,
    pub dtheta: f64,
    /// Meshgrid radius [ntheta, nr]
    pub rr: Array2<f64>,
    /// Meshgrid polar angle [ntheta, nr]
    pub tt: Array2<f64>,
    /// Volume weight dV = 2π r² sin θ dr dθ
    pub dv: Array2<f64>,
}

impl Grid {
    pub fn new(outer_radius: f64, nr: usize, ntheta: usize) -> Result<Self> {
        if nr < 2 || ntheta < 2 {
            return Err(SolverError::config(format!(
                "grid needs at least 2 samples per axis, got nr={nr}, ntheta={ntheta}"
            )));
        }
        if !outer_radius.is_finite() || outer_radius <= RADIAL_ORIGIN {
            return Err(SolverError::config(format!(
                "outer_radius must be finite and > {RADIAL_ORIGIN}, got {outer_radius}"
            )));
        }

        let r = Array1::linspace(RADIAL_ORIGIN, outer_radius, nr);
        let theta = Array1::linspace(0.0, PI, ntheta);
        let dr = r[1] - r[0];
        let dtheta = theta[1] - theta[0];

        let rr = Array2::from_shape_fn((ntheta, nr), |(_, j)| r[j]);
        let tt = Array2::from_shape_fn((ntheta, nr), |(i, _)| theta[i]);
        let dv = Array2::from_shape_fn((ntheta, nr), |(i, j)| {
            2.0 * PI * r[j] * r[j] * theta[i].sin() * dr * dtheta
        });

        Ok(Self {
            nr,
            ntheta,
            outer_radius,
            r,
            theta,
            dr,
            dtheta,
            rr,
            tt,
            dv,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.ntheta, self.nr)
    }

    pub fn zeros(&self) -> Array2<f64> {
        Array2::zeros(self.shape())
    }

    /// Volume-weighted inner product Σ f·g·dV.
    pub fn inner(&self, f: ArrayView2<'_, f64>, g: ArrayView2<'_, f64>) -> f64 {
        ndarray::Zip::from(f)
            .and(g)
            .and(&self.dv)
            .fold(0.0, |acc, &a, &b, &w| acc + a * b * w)
    }

    /// ∂f/∂r
    pub fn d_dr(&self, f: ArrayView2<'_, f64>) -> Array2<f64> {
        gradient(f, RADIAL_AXIS, self.dr)
    }

    /// ∂f/∂θ
    pub fn d_dtheta(&self, f: ArrayView2<'_, f64>) -> Array2<f64> {
        gradient(f, THETA_AXIS, self.dtheta)
    }

    /// Axisymmetric spherical Laplacian
    /// (1/r²)∂_r(r²∂_rΦ) + (1/(r² sin θ))∂_θ(sin θ ∂_θΦ),
    /// with additive guards where r → 0 or sin θ → 0.
    pub fn laplacian(&self, phi: ArrayView2<'_, f64>) -> Array2<f64> {
        let d_r = self.d_dr(phi);
        let d_th = self.d_dtheta(phi);

        let r2 = self.rr.mapv(|r| r * r);
        let sin_th = self.tt.mapv(|t| t.sin() + LAPLACIAN_EPSILON);

        let radial_flux = &r2 * &d_r;
        let term_r = self.d_dr(radial_flux.view()) / &r2.mapv(|v| v + LAPLACIAN_EPSILON);

        let angular_flux = &sin_th * &d_th;
        let term_th =
            self.d_dtheta(angular_flux.view()) / &(&r2 * &sin_th).mapv(|v| v + LAPLACIAN_EPSILON);

        term_r + term_th
    }

    /// Elementwise |∇Φ| = sqrt((∂_rΦ)² + (∂_θΦ)²), same stencil as the
    /// feedback operator.
    pub fn gradient_magnitude(&self, phi: ArrayView2<'_, f64>) -> Array2<f64> {
        let d_r = self.d_dr(phi);
        let d_th = self.d_dtheta(phi);
        ndarray::Zip::from(&d_r)
            .and(&d_th)
            .map_collect(|&a, &b| (a * a + b * b).sqrt())
    }
}

/// First derivative along `axis` with uniform `spacing`: centered
/// differences in the interior, one-sided first-order differences at both
/// ends. Requires at least two samples along `axis`.
pub fn gradient(f: ArrayView2<'_, f64>, axis: Axis, spacing: f64) -> Array2<f64> {
    let mut out = Array2::zeros(f.raw_dim());
    let n = f.len_of(axis);
    if n < 2 {
        return out;
    }

    for (src, mut dst) in f.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        dst[0] = (src[1] - src[0]) / spacing;
        dst[n - 1] = (src[n - 1] - src[n - 2]) / spacing;
        for k in 1..n - 1 {
            dst[k] = (src[k + 1] - src[k - 1]) / (2.0 * spacing);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_shape_and_spacing() {
        let g = Grid::new(1.0, 20, 30).unwrap();
        assert_eq!(g.shape(), (30, 20));
        assert_eq!(g.dv.dim(), (30, 20));
        assert_abs_diff_eq!(g.r[19], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(g.theta[29], PI, epsilon = 1e-15);
        assert_abs_diff_eq!(g.dtheta, PI / 29.0, epsilon = 1e-15);
        assert!(g.r[0] > 0.0);
    }

    #[test]
    fn test_volume_weights_approximate_ball() {
        let g = Grid::new(1.0, 200, 200).unwrap();
        let volume: f64 = g.dv.sum();
        let exact = 4.0 / 3.0 * PI;
        assert!(
            (volume - exact).abs() / exact < 0.03,
            "volume {volume} vs {exact}"
        );
        assert!(g.dv.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_rejects_degenerate_grid() {
        assert!(Grid::new(1.0, 1, 30).is_err());
        assert!(Grid::new(0.0, 20, 30).is_err());
        assert!(Grid::new(f64::INFINITY, 20, 30).is_err());
    }

    #[test]
    fn test_gradient_linear_is_exact() {
        let g = Grid::new(2.0, 11, 7).unwrap();
        let f = g.rr.mapv(|r| 3.0 * r - 1.0);
        let d = g.d_dr(f.view());
        for v in d.iter() {
            assert_abs_diff_eq!(*v, 3.0, epsilon = 1e-10);
        }
        let dth = g.d_dtheta(f.view());
        assert!(dth.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_gradient_quadratic_interior_centered() {
        let f = Array2::from_shape_fn((1, 5), |(_, j)| (j as f64).powi(2));
        let d = gradient(f.view(), RADIAL_AXIS, 1.0);
        assert_eq!(d.row(0).to_vec(), vec![1.0, 2.0, 4.0, 6.0, 7.0]);
    }

    #[test]
    fn test_laplacian_of_r_squared() {
        // ∇²(r²) = 6. The nested centered stencil adds exactly 2h²/r².
        let g = Grid::new(1.0, 60, 60).unwrap();
        let f = g.rr.mapv(|r| r * r);
        let lap = g.laplacian(f.view());
        let h2 = g.dr * g.dr;
        for i in 0..60 {
            for j in 2..58 {
                let r = g.r[j];
                let expected = 6.0 + 2.0 * h2 / (r * r);
                assert!(
                    (lap[[i, j]] - expected).abs() < 1e-6 * expected,
                    "lap[{i},{j}] = {}, expected {expected}",
                    lap[[i, j]]
                );
            }
        }
    }

    #[test]
    fn test_gradient_magnitude_of_constant_is_zero() {
        let g = Grid::new(1.0, 12, 9).unwrap();
        let f = g.zeros().mapv(|_| -2.5);
        assert!(g.gradient_magnitude(f.view()).iter().all(|&v| v == 0.0));
    }
}
