//! Fixed angular-harmonic × radial basis modes.
//!
//! Each mode l owns B_l(r, θ) = Y_l^0(cos θ) · sin(lπr/a), which vanishes at
//! r = 0 and r = a. Arrays, squared norms, and the Gram factorization are
//! built once here and only read afterwards.

use std::f64::consts::PI;

use nalgebra::{Cholesky, DMatrix, Dyn};
use ndarray::{Array1, Array2};

use crate::constants::MIN_PROFILE_FILL;
use crate::error::{Result, SolverError};
use crate::grid::Grid;
use crate::legendre::y_l0;

/// One basis mode on a specific grid.
#[derive(Debug, Clone)]
pub struct Mode {
    pub l: u32,
    /// Y_l^0 sampled along θ.
    pub angular: Array1<f64>,
    /// sin(lπr/a) sampled along r.
    pub radial: Array1<f64>,
    /// Outer product, shape [ntheta, nr].
    pub array: Array2<f64>,
    /// ‖B_l‖² = Σ B_l² dV
    pub norm_sq: f64,
}

/// Sampled energy of each separable factor relative to its continuum value.
/// Both are O(1) for a well-resolved mode.
fn profile_fill(grid: &Grid, angular: &Array1<f64>, radial: &Array1<f64>) -> (f64, f64) {
    let angular_fill = 2.0
        * PI
        * grid.dtheta
        * angular
            .iter()
            .zip(grid.theta.iter())
            .map(|(y, t)| y * y * t.sin())
            .sum::<f64>();
    let a = grid.outer_radius;
    let radial_fill = grid.dr
        * radial
            .iter()
            .zip(grid.r.iter())
            .map(|(f, r)| f * f * r * r)
            .sum::<f64>()
        / (a * a * a / 3.0);
    (angular_fill, radial_fill)
}

/// Radial profile sin(lπr/a). Zero at both ends of [0, a].
pub fn radial_profile(l: u32, r: f64, outer_radius: f64) -> f64 {
    (l as f64 * PI * r / outer_radius).sin()
}

/// The full mode set with its Gram matrix G_lm = Σ B_l B_m dV, factored once.
#[derive(Debug, Clone)]
pub struct Basis {
    modes: Vec<Mode>,
    gram: DMatrix<f64>,
    cholesky: Cholesky<f64, Dyn>,
}

impl Basis {
    /// Build every mode in ascending order of `l`.
    ///
    /// Fails if the set is empty, if a mode's angular or radial profile is
    /// numerically empty on this grid (e.g. `sin(lπr/a)` sampled only at its
    /// zeros), or if the modes are linearly dependent on the grid.
    pub fn build(grid: &Grid, modes: &[u32]) -> Result<Self> {
        if modes.is_empty() {
            return Err(SolverError::config("mode set is empty"));
        }
        let mut ls = modes.to_vec();
        ls.sort_unstable();
        if ls.windows(2).any(|w| w[0] == w[1]) {
            return Err(SolverError::config("mode set contains duplicates"));
        }

        let mut built = Vec::with_capacity(ls.len());
        for l in ls {
            if l == 0 {
                return Err(SolverError::config(
                    "mode 0 has an identically zero radial profile",
                ));
            }
            let angular = grid.theta.mapv(|t| y_l0(l, t.cos()));
            let radial = grid.r.mapv(|r| radial_profile(l, r, grid.outer_radius));
            let array = Array2::from_shape_fn(grid.shape(), |(i, j)| angular[i] * radial[j]);
            let norm_sq = grid.inner(array.view(), array.view());

            let (angular_fill, radial_fill) = profile_fill(grid, &angular, &radial);
            if !norm_sq.is_finite()
                || norm_sq <= 0.0
                || angular_fill <= MIN_PROFILE_FILL
                || radial_fill <= MIN_PROFILE_FILL
            {
                return Err(SolverError::config(format!(
                    "mode {l} is degenerate on a {}x{} grid (‖B‖² = {norm_sq:e}, \
                     angular fill {angular_fill:e}, radial fill {radial_fill:e})",
                    grid.ntheta, grid.nr
                )));
            }

            built.push(Mode {
                l,
                angular,
                radial,
                array,
                norm_sq,
            });
        }

        let k = built.len();
        let gram = DMatrix::from_fn(k, k, |a, b| {
            if a == b {
                built[a].norm_sq
            } else {
                grid.inner(built[a].array.view(), built[b].array.view())
            }
        });
        let cholesky = gram.clone().cholesky().ok_or_else(|| {
            SolverError::config("basis modes are linearly dependent on this grid")
        })?;

        tracing::debug!(
            modes = ?built.iter().map(|m| m.l).collect::<Vec<_>>(),
            "built basis"
        );

        Ok(Self {
            modes: built,
            gram,
            cholesky,
        })
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn mode(&self, l: u32) -> Option<&Mode> {
        self.modes.iter().find(|m| m.l == l)
    }

    pub fn gram(&self) -> &DMatrix<f64> {
        &self.gram
    }

    /// Largest |cos| between two distinct modes under the dV inner product.
    /// 0 for an orthogonal basis.
    pub fn max_overlap(&self) -> f64 {
        let k = self.modes.len();
        let mut worst = 0.0f64;
        for a in 0..k {
            for b in (a + 1)..k {
                let cos = self.gram[(a, b)] / (self.gram[(a, a)] * self.gram[(b, b)]).sqrt();
                worst = worst.max(cos.abs());
            }
        }
        worst
    }

    pub(crate) fn cholesky(&self) -> &Cholesky<f64, Dyn> {
        &self.cholesky
    }
}
