//! Solver and tracer parameters.
//!
//! Every field has a default so a config file only needs to name what it
//! changes. `validate` runs before any grid is built.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, SolverError};
use crate::modes::ModeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Outer radius `a` of the spherical domain.
    pub outer_radius: f64,
    /// Radial samples.
    pub nr: usize,
    /// Polar-angle samples over [0, π].
    pub ntheta: usize,
    /// Harmonic indices of the target modes.
    pub modes: Vec<u32>,
    /// Relative weight of each mode in the initial field.
    pub amplitude_ratios: ModeMap<f64>,
    pub base_amplitude: f64,
    pub global_scale: f64,
    /// λ in Φ_raw = Φ + λ·D.
    pub step_size: f64,
    pub n_iterations: usize,
    /// Observer cadence in iterations. 0 disables reporting.
    pub report_every: usize,
    /// Stop early once |Δcoherence| between consecutive iterations falls
    /// below this. `None` always runs the full budget.
    pub convergence_tolerance: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            outer_radius: DEFAULT_OUTER_RADIUS,
            nr: DEFAULT_NR,
            ntheta: DEFAULT_NTHETA,
            modes: DEFAULT_MODES.to_vec(),
            amplitude_ratios: [(3, 1.0), (6, 2.0 / 3.0), (9, 1.0 / 3.0)]
                .into_iter()
                .collect(),
            base_amplitude: DEFAULT_BASE_AMPLITUDE,
            global_scale: DEFAULT_GLOBAL_SCALE,
            step_size: DEFAULT_STEP_SIZE,
            n_iterations: DEFAULT_ITERATIONS,
            report_every: DEFAULT_REPORT_EVERY,
            convergence_tolerance: None,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.outer_radius.is_finite() || self.outer_radius <= RADIAL_ORIGIN {
            return Err(SolverError::config(format!(
                "outer_radius must be finite and > {RADIAL_ORIGIN}, got {}",
                self.outer_radius
            )));
        }
        if self.nr < 2 || self.ntheta < 2 {
            return Err(SolverError::config(format!(
                "grid needs at least 2 samples per axis, got nr={}, ntheta={}",
                self.nr, self.ntheta
            )));
        }
        if self.modes.is_empty() {
            return Err(SolverError::config("mode set is empty"));
        }

        let mut seen = HashSet::new();
        for &l in &self.modes {
            if l == 0 {
                return Err(SolverError::config(
                    "mode 0 has an identically zero radial profile",
                ));
            }
            if !seen.insert(l) {
                return Err(SolverError::config(format!("mode {l} listed twice")));
            }
            match self.amplitude_ratios.get(l) {
                Some(ratio) if ratio.is_finite() => {}
                Some(ratio) => {
                    return Err(SolverError::config(format!(
                        "amplitude ratio for mode {l} must be finite, got {ratio}"
                    )));
                }
                None => {
                    return Err(SolverError::config(format!(
                        "no amplitude ratio for mode {l}"
                    )));
                }
            }
        }
        if let Some(extra) = self.amplitude_ratios.modes().find(|l| !seen.contains(l)) {
            return Err(SolverError::config(format!(
                "amplitude ratio given for mode {extra}, which is not in the mode set"
            )));
        }

        if !self.base_amplitude.is_finite() || !self.global_scale.is_finite() {
            return Err(SolverError::config(
                "base_amplitude and global_scale must be finite",
            ));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(SolverError::config(format!(
                "step_size must be finite and > 0, got {}",
                self.step_size
            )));
        }
        if self.n_iterations == 0 {
            return Err(SolverError::config("n_iterations must be >= 1"));
        }
        if let Some(tol) = self.convergence_tolerance
            && (!tol.is_finite() || tol <= 0.0)
        {
            return Err(SolverError::config(format!(
                "convergence_tolerance must be finite and > 0, got {tol}"
            )));
        }
        Ok(())
    }

    /// A_l = base_amplitude · global_scale · ratio_l
    pub fn amplitude(&self, l: u32) -> Option<f64> {
        self.amplitude_ratios
            .get(l)
            .map(|ratio| self.base_amplitude * self.global_scale * ratio)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracerConfig {
    pub n_particles: usize,
    pub n_steps: usize,
    pub dt: f64,
    /// Particles launch uniformly in [-half_width, half_width]² of the (x, z) plane.
    pub half_width: f64,
    pub seed: u64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            n_particles: DEFAULT_PARTICLES,
            n_steps: DEFAULT_TRACER_STEPS,
            dt: DEFAULT_TRACER_DT,
            half_width: DEFAULT_LAUNCH_HALF_WIDTH,
            seed: DEFAULT_TRACER_SEED,
        }
    }
}

impl TracerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_particles == 0 || self.n_steps == 0 {
            return Err(SolverError::config(format!(
                "tracer needs n_particles > 0 and n_steps > 0, got {} and {}",
                self.n_particles, self.n_steps
            )));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SolverError::config(format!(
                "dt must be finite and > 0, got {}",
                self.dt
            )));
        }
        if !self.half_width.is_finite() || self.half_width <= 0.0 {
            return Err(SolverError::config(format!(
                "half_width must be finite and > 0, got {}",
                self.half_width
            )));
        }
        Ok(())
    }
}
