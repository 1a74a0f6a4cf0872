//! Resonant scalar field solver.
//!
//! Models a single non-positive potential Φ(r, θ) on an axisymmetric
//! spherical grid. Φ is seeded from a superposition of fixed basis modes
//! Y_l^0(cos θ)·sin(lπr/a), then driven by a Laplacian feedback term and
//! re-projected onto the mode span every iteration. Coherence, the share
//! of field energy inside that span, is the tracked quantity.
//!
//! Zero I/O. Persistence and the command line live in sibling crates.

pub mod basis;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod field;
pub mod grid;
pub mod interp;
pub mod legendre;
pub mod modes;
pub mod observer;
pub mod projection;
pub mod tracer;

pub use basis::{Basis, Mode};
pub use config::{SolverConfig, TracerConfig};
pub use engine::{EngineState, IterationRecord, RecursionEngine, SolverOutcome, solve};
pub use error::{Result, SolverError, Stage};
pub use feedback::feedback;
pub use field::{enforce_polarity, initial_field, satisfies_polarity};
pub use grid::Grid;
pub use modes::ModeMap;
pub use observer::{
    ChannelObserver, Checkpoint, FieldSnapshot, IterationObserver, NullObserver, TracingObserver,
};
pub use projection::{Projection, project, reproject};
pub use tracer::trace_particles;
