/// Innermost radial sample. The grid starts just off the origin so the
/// 1/r² factors in the Laplacian stay finite.
pub const RADIAL_ORIGIN: f64 = 1e-6;

/// Additive guard on r² and sin θ divisions in the Laplacian
pub const LAPLACIAN_EPSILON: f64 = 1e-15;

/// Floor added to max|D| before normalizing the feedback field
pub const FEEDBACK_NORM_FLOOR: f64 = 1e-20;

/// Floor added to total field energy in the coherence ratio
pub const COHERENCE_FLOOR: f64 = 1e-20;

/// A mode is degenerate on the grid when its sampled angular or radial
/// profile carries at most this fraction of its continuum energy.
pub const MIN_PROFILE_FILL: f64 = 1e-8;

/// Pseudo-source scale: ρ = -ε₀ ∇²Φ
pub const VACUUM_PERMITTIVITY: f64 = 8.854_187_812_8e-12;

/// Guard on 1/r when converting angular gradients to tracer forces
pub const TRACER_RADIUS_FLOOR: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Defaults (the reference 3-6-9 run)
// ---------------------------------------------------------------------------

pub const DEFAULT_OUTER_RADIUS: f64 = 1.0;
pub const DEFAULT_NR: usize = 160;
pub const DEFAULT_NTHETA: usize = 240;
pub const DEFAULT_MODES: [u32; 3] = [3, 6, 9];
pub const DEFAULT_BASE_AMPLITUDE: f64 = 1.0;
pub const DEFAULT_GLOBAL_SCALE: f64 = 3.69;
pub const DEFAULT_STEP_SIZE: f64 = 0.22;
pub const DEFAULT_ITERATIONS: usize = 70;
pub const DEFAULT_REPORT_EVERY: usize = 10;

pub const DEFAULT_PARTICLES: usize = 80;
pub const DEFAULT_TRACER_STEPS: usize = 800;
pub const DEFAULT_TRACER_DT: f64 = 0.004;
/// Half-width of the square launch region for tracer particles
pub const DEFAULT_LAUNCH_HALF_WIDTH: f64 = 0.6;
pub const DEFAULT_TRACER_SEED: u64 = 42;
