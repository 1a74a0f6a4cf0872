//! Test-particle trajectories in a final field.
//!
//! Particles live in the meridional (x, z) plane and feel F = -∇Φ. Each
//! trajectory is independent, so they integrate in parallel; launch
//! positions come from one seeded RNG up front, so output does not depend on
//! thread scheduling.

use ndarray::{Array2, Array3, ArrayView2, s};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::TracerConfig;
use crate::constants::TRACER_RADIUS_FLOOR;
use crate::error::{Result, SolverError, Stage};
use crate::grid::Grid;
use crate::interp::BicubicField;

/// Cartesian force (f_x, f_z) at (x, z).
///
/// The field is axisymmetric about z, so a point maps to r = √(x²+z²),
/// θ = atan2(|x|, z) ∈ [0, π], and the meridional components fold back with
/// the sign of x.
pub fn force(interp: &BicubicField<'_>, x: f64, z: f64) -> (f64, f64) {
    let r = (x * x + z * z).sqrt() + TRACER_RADIUS_FLOOR;
    let theta = x.abs().atan2(z);
    let sample = interp.sample(theta, r);

    let f_r = -sample.d_r;
    let f_theta = -sample.d_theta / (r + TRACER_RADIUS_FLOOR);
    let (sin_t, cos_t) = theta.sin_cos();

    let f_rho = f_r * sin_t + f_theta * cos_t;
    let f_z = f_r * cos_t - f_theta * sin_t;
    let f_x = if x < 0.0 { -f_rho } else { f_rho };
    (f_x, f_z)
}

/// Launch positions, uniform in the square [-h, h]²: all x first, then all z.
pub fn launch_positions(config: &TracerConfig) -> Vec<(f64, f64)> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let h = config.half_width;
    let xs: Vec<f64> = (0..config.n_particles)
        .map(|_| rng.random_range(-h..h))
        .collect();
    let zs: Vec<f64> = (0..config.n_particles)
        .map(|_| rng.random_range(-h..h))
        .collect();
    xs.into_iter().zip(zs).collect()
}

/// Forward-Euler trajectory of one particle, shape `[n_steps, 2]`.
fn integrate(
    interp: &BicubicField<'_>,
    particle: usize,
    start: (f64, f64),
    config: &TracerConfig,
) -> Result<Array2<f64>> {
    let mut path = Array2::zeros((config.n_steps, 2));
    let (mut x, mut z) = start;
    path[[0, 0]] = x;
    path[[0, 1]] = z;
    for step in 1..config.n_steps {
        let (fx, fz) = force(interp, x, z);
        x += fx * config.dt;
        z += fz * config.dt;
        if !x.is_finite() || !z.is_finite() {
            return Err(SolverError::diverged(
                step,
                Stage::Tracer,
                format!("particle {particle} left the finite plane"),
            ));
        }
        path[[step, 0]] = x;
        path[[step, 1]] = z;
    }
    Ok(path)
}

/// Integrate `n_particles` trajectories through `field`.
/// Returns positions shaped `[n_particles, n_steps, 2]`; step 0 is the launch point.
pub fn trace_particles<'a>(
    grid: &'a Grid,
    field: ArrayView2<'a, f64>,
    config: &TracerConfig,
) -> Result<Array3<f64>> {
    config.validate()?;
    let interp = BicubicField::new(grid, field).ok_or_else(|| {
        SolverError::config(format!(
            "field has shape {:?}, grid is {:?}",
            field.dim(),
            grid.shape()
        ))
    })?;
    if field.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::diverged(
            0,
            Stage::Tracer,
            "field contains non-finite values",
        ));
    }

    let starts = launch_positions(config);
    let paths: Vec<Array2<f64>> = starts
        .par_iter()
        .enumerate()
        .map(|(p, &start)| integrate(&interp, p, start, config))
        .collect::<Result<_>>()?;

    let mut out = Array3::zeros((config.n_particles, config.n_steps, 2));
    for (p, path) in paths.iter().enumerate() {
        out.slice_mut(s![p, .., ..]).assign(path);
    }
    tracing::debug!(
        particles = config.n_particles,
        steps = config.n_steps,
        "particles traced"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n_particles: usize, n_steps: usize) -> TracerConfig {
        TracerConfig {
            n_particles,
            n_steps,
            ..TracerConfig::default()
        }
    }

    #[test]
    fn test_zero_field_leaves_particles_in_place() {
        let g = Grid::new(1.0, 20, 30).unwrap();
        let field = g.zeros();
        let out = trace_particles(&g, field.view(), &config(12, 40)).unwrap();
        assert_eq!(out.dim(), (12, 40, 2));
        for p in 0..12 {
            for step in 1..40 {
                assert_eq!(out[[p, step, 0]], out[[p, 0, 0]]);
                assert_eq!(out[[p, step, 1]], out[[p, 0, 1]]);
            }
        }
    }

    #[test]
    fn test_launch_inside_square_and_seeded() {
        let cfg = config(50, 2);
        let a = launch_positions(&cfg);
        let b = launch_positions(&cfg);
        assert_eq!(a, b);
        assert!(
            a.iter()
                .all(|&(x, z)| x.abs() <= cfg.half_width && z.abs() <= cfg.half_width)
        );
        let other = launch_positions(&TracerConfig { seed: 7, ..cfg });
        assert_ne!(a, other);
    }

    #[test]
    fn test_radial_well_pulls_particles_inward() {
        let g = Grid::new(1.0, 40, 60).unwrap();
        let field = g.rr.mapv(|r| r * r);
        let out = trace_particles(&g, field.view(), &config(16, 60)).unwrap();
        for p in 0..16 {
            let start = out[[p, 0, 0]].hypot(out[[p, 0, 1]]);
            let end = out[[p, 59, 0]].hypot(out[[p, 59, 1]]);
            assert!(end < start, "particle {p}: {start} -> {end}");
        }
    }

    #[test]
    fn test_force_points_down_the_gradient() {
        let g = Grid::new(1.0, 40, 60).unwrap();
        let field = g.rr.mapv(|r| r * r);
        let interp = BicubicField::new(&g, field.view()).unwrap();

        let (fx, fz) = force(&interp, 0.3, 0.0);
        assert!((fx + 0.6).abs() < 1e-6, "fx = {fx}");
        assert!(fz.abs() < 1e-6, "fz = {fz}");

        let (fx, fz) = force(&interp, -0.3, 0.2);
        assert!((fx - 0.6).abs() < 1e-6, "fx = {fx}");
        assert!((fz + 0.4).abs() < 1e-6, "fz = {fz}");
    }

    #[test]
    fn test_force_is_mirror_symmetric_in_x() {
        let g = Grid::new(1.0, 30, 40).unwrap();
        let field = ndarray::Zip::from(&g.rr)
            .and(&g.tt)
            .map_collect(|&r, &t| -(r * (1.0 - r)) * (1.0 + t.cos()));
        let interp = BicubicField::new(&g, field.view()).unwrap();
        let (fx_pos, fz_pos) = force(&interp, 0.3, 0.2);
        let (fx_neg, fz_neg) = force(&interp, -0.3, 0.2);
        assert_eq!(fx_pos, -fx_neg);
        assert_eq!(fz_pos, fz_neg);
    }

    #[test]
    fn test_rejects_mismatched_field() {
        let g = Grid::new(1.0, 20, 30).unwrap();
        let wrong = Array2::zeros((5, 5));
        assert!(matches!(
            trace_particles(&g, wrong.view(), &config(2, 2)),
            Err(SolverError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let g = Grid::new(1.0, 20, 30).unwrap();
        let field = g.zeros();
        let bad = TracerConfig {
            dt: 0.0,
            ..TracerConfig::default()
        };
        assert!(trace_particles(&g, field.view(), &bad).is_err());
    }
}
