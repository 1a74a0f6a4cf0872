//! Modal projection and the coherence metric.
//!
//! Coefficients solve the normal equations G c = b with b_l = Σ Φ B_l dV.
//! For an orthogonal basis G is diagonal and this is exactly
//! c_l = <Φ, B_l> / ‖B_l‖². Solving the full system keeps the projection a
//! true orthogonal projector on grids where the modes overlap slightly, so
//! re-projection is idempotent and coherence never exceeds one.

use nalgebra::DVector;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::basis::Basis;
use crate::constants::COHERENCE_FLOOR;
use crate::grid::Grid;
use crate::modes::ModeMap;

/// Result of projecting one field. Never mutates the field it was taken from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub coefficients: ModeMap<f64>,
    /// e_l = c_l b_l, the share of captured energy carried by mode l.
    /// Sums to the captured energy. With overlapping modes a single term can
    /// dip slightly below zero.
    pub energies: ModeMap<f64>,
    /// E = Σ Φ² dV
    pub total_energy: f64,
    /// Fraction of E inside the span of the basis, in [0, 1].
    pub coherence: f64,
}

impl Projection {
    pub fn coefficient(&self, l: u32) -> f64 {
        self.coefficients.get(l).copied().unwrap_or(0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.coherence.is_finite()
            && self.total_energy.is_finite()
            && self.coefficients.values().all(|c| c.is_finite())
    }
}

pub fn project(grid: &Grid, basis: &Basis, phi: ArrayView2<'_, f64>) -> Projection {
    let b = DVector::from_iterator(
        basis.len(),
        basis
            .modes()
            .iter()
            .map(|m| grid.inner(phi, m.array.view())),
    );
    let c = basis.cholesky().solve(&b);

    let total_energy = grid.inner(phi, phi);
    let captured = c.dot(&b);
    let coherence = captured / (total_energy + COHERENCE_FLOOR);
    // Only rounding can push the ratio outside [0, 1]; NaN passes through.
    let coherence = if coherence.is_finite() {
        coherence.clamp(0.0, 1.0)
    } else {
        coherence
    };

    let mut coefficients = ModeMap::new();
    let mut energies = ModeMap::new();
    for ((mode, &coef), &inner) in basis.modes().iter().zip(c.iter()).zip(b.iter()) {
        coefficients.insert(mode.l, coef);
        energies.insert(mode.l, coef * inner);
    }

    Projection {
        coefficients,
        energies,
        total_energy,
        coherence,
    }
}

/// Σ_l c_l B_l. Modes absent from `coefficients` contribute nothing.
pub fn reconstruct(grid: &Grid, basis: &Basis, coefficients: &ModeMap<f64>) -> Array2<f64> {
    let mut out = grid.zeros();
    for mode in basis.modes() {
        if let Some(&c) = coefficients.get(mode.l) {
            out.scaled_add(c, &mode.array);
        }
    }
    out
}

/// Discard every component of `phi` outside the basis span.
pub fn reproject(
    grid: &Grid,
    basis: &Basis,
    phi: ArrayView2<'_, f64>,
) -> (Array2<f64>, Projection) {
    let projection = project(grid, basis, phi);
    let rebuilt = reconstruct(grid, basis, &projection.coefficients);
    (rebuilt, projection)
}
