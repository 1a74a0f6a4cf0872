//! Nonlinear feedback: a correction field derived from the field's own
//! Laplacian.
//!
//! ρ = -ε₀ ∇²Φ acts as a pseudo-source. The correction is the axis-wise dot
//! product of the gradients of Φ and ρ, normalized so that D ∈ [-1, 1].
//! Because of that normalization the magnitude of ε₀ only matters for
//! floating-point range, not for the direction of the update.

use ndarray::{Array2, ArrayView2, Zip};

use crate::constants::{FEEDBACK_NORM_FLOOR, VACUUM_PERMITTIVITY};
use crate::error::{Result, SolverError, Stage};
use crate::grid::Grid;

/// ρ = -ε₀ ∇²Φ
pub fn pseudo_source(grid: &Grid, phi: ArrayView2<'_, f64>) -> Array2<f64> {
    grid.laplacian(phi).mapv(|v| -VACUUM_PERMITTIVITY * v)
}

/// D = (∂_rΦ ∂_rρ + ∂_θΦ ∂_θρ) / (max|·| + floor).
///
/// Pure. `iteration` only labels a divergence error.
pub fn feedback(grid: &Grid, phi: ArrayView2<'_, f64>, iteration: usize) -> Result<Array2<f64>> {
    let rho = pseudo_source(grid, phi);
    if let Some(bad) = rho.iter().find(|v| !v.is_finite()) {
        return Err(SolverError::diverged(
            iteration,
            Stage::Laplacian,
            format!("pseudo-source contains {bad}"),
        ));
    }

    let dphi_r = grid.d_dr(phi);
    let dphi_th = grid.d_dtheta(phi);
    let drho_r = grid.d_dr(rho.view());
    let drho_th = grid.d_dtheta(rho.view());

    let mut d = Zip::from(&dphi_r)
        .and(&dphi_th)
        .and(&drho_r)
        .and(&drho_th)
        .map_collect(|&pr, &pt, &rr, &rt| pr * rr + pt * rt);

    let peak = d.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if !peak.is_finite() {
        return Err(SolverError::diverged(
            iteration,
            Stage::Feedback,
            "gradient product is not finite",
        ));
    }
    let scale = peak + FEEDBACK_NORM_FLOOR;
    d.mapv_inplace(|v| v / scale);
    Ok(d)
}
