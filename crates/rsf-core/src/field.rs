//! Initial potential and the trap-polarity constraint.

use ndarray::Array2;

use crate::basis::Basis;
use crate::error::{Result, SolverError};
use crate::grid::Grid;
use crate::modes::ModeMap;

/// Σ_l A_l · B_l over every mode of the basis. Every mode needs an amplitude.
pub fn superpose(grid: &Grid, basis: &Basis, amplitudes: &ModeMap<f64>) -> Result<Array2<f64>> {
    let mut phi = grid.zeros();
    for mode in basis.modes() {
        let a = amplitudes
            .get(mode.l)
            .ok_or_else(|| SolverError::config(format!("no amplitude for mode {}", mode.l)))?;
        phi.scaled_add(*a, &mode.array);
    }
    Ok(phi)
}

/// Φ ← -|Φ|
pub fn enforce_polarity(phi: &mut Array2<f64>) {
    phi.mapv_inplace(|v| -v.abs());
}

/// Φ₀ = -|Σ_l A_l B_l| with A_l = base_amplitude · global_scale · ratio_l.
pub fn initial_field(
    grid: &Grid,
    basis: &Basis,
    ratios: &ModeMap<f64>,
    base_amplitude: f64,
    global_scale: f64,
) -> Result<Array2<f64>> {
    let amplitudes: ModeMap<f64> = ratios
        .iter()
        .map(|(l, ratio)| (l, base_amplitude * global_scale * ratio))
        .collect();
    let mut phi = superpose(grid, basis, &amplitudes)?;
    enforce_polarity(&mut phi);
    Ok(phi)
}

pub fn satisfies_polarity(phi: &Array2<f64>) -> bool {
    phi.iter().all(|&v| v <= 0.0)
}
