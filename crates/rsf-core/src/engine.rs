//! Recursion engine: project, feed back, re-project, fold, repeat.
//!
//! The engine exclusively owns Φ while iterating. Each iteration:
//!
//! 1. project Φ and keep `(iteration, coherence, coefficients)`
//! 2. D = feedback(Φ)
//! 3. Φ_raw = Φ + λ·D
//! 4. Φ_proj = Σ c_l(Φ_raw) B_l, dropping everything outside the span
//! 5. Φ = -|Φ_proj|
//! 6. append the record to history
//! 7. hand a read-only checkpoint to the observer if one is due
//!
//! The loop runs to `n_iterations` unless a convergence tolerance is
//! configured. Any NaN/Inf ends the run with `NumericalDivergence` and leaves
//! the engine `Diverged`.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::basis::Basis;
use crate::config::SolverConfig;
use crate::error::{Result, SolverError, Stage};
use crate::feedback::feedback;
use crate::field::{enforce_polarity, initial_field};
use crate::grid::Grid;
use crate::modes::ModeMap;
use crate::observer::{Checkpoint, IterationObserver, NullObserver};
use crate::projection::{Projection, project, reproject};

/// One completed iteration, observed before that iteration's update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub coherence: f64,
    pub coefficients: ModeMap<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Building,
    Iterating,
    /// Stopped early: |Δcoherence| fell below the configured tolerance.
    Converged,
    /// Ran the full iteration budget.
    Exhausted,
    /// A non-finite value appeared. The field and history stay as they were
    /// after the last successful iteration.
    Diverged,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EngineState::Converged | EngineState::Exhausted | EngineState::Diverged
        )
    }
}

pub struct RecursionEngine {
    config: SolverConfig,
    grid: Grid,
    basis: Basis,
    phi: Array2<f64>,
    history: Vec<IterationRecord>,
    state: EngineState,
}

/// Everything a run produces. Consumers (tracer, exporter) take it from here.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub config: SolverConfig,
    pub grid: Grid,
    pub basis: Basis,
    pub field: Array2<f64>,
    pub history: Vec<IterationRecord>,
    /// Projection of the final field.
    pub final_projection: Projection,
    pub state: EngineState,
}

impl SolverOutcome {
    pub fn final_coherence(&self) -> f64 {
        self.final_projection.coherence
    }

    pub fn initial_coherence(&self) -> Option<f64> {
        self.history.first().map(|r| r.coherence)
    }
}

impl RecursionEngine {
    /// Validate the config, build grid and basis, and seed Φ₀.
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let grid = Grid::new(config.outer_radius, config.nr, config.ntheta)?;
        let basis = Basis::build(&grid, &config.modes)?;
        let phi = initial_field(
            &grid,
            &basis,
            &config.amplitude_ratios,
            config.base_amplitude,
            config.global_scale,
        )?;
        Self::assemble(config, grid, basis, phi)
    }

    /// Like `new`, but iterate from a caller-supplied field instead of Φ₀.
    /// The field is folded to the trap polarity before the first iteration.
    pub fn with_initial_field(config: SolverConfig, mut phi: Array2<f64>) -> Result<Self> {
        config.validate()?;
        let grid = Grid::new(config.outer_radius, config.nr, config.ntheta)?;
        if phi.dim() != grid.shape() {
            return Err(SolverError::config(format!(
                "initial field has shape {:?}, grid is {:?}",
                phi.dim(),
                grid.shape()
            )));
        }
        let basis = Basis::build(&grid, &config.modes)?;
        enforce_polarity(&mut phi);
        Self::assemble(config, grid, basis, phi)
    }

    fn assemble(config: SolverConfig, grid: Grid, basis: Basis, phi: Array2<f64>) -> Result<Self> {
        let mut engine = Self {
            history: Vec::with_capacity(config.n_iterations),
            config,
            grid,
            basis,
            phi,
            state: EngineState::Building,
        };
        engine.state = EngineState::Iterating;
        tracing::debug!(
            nr = engine.grid.nr,
            ntheta = engine.grid.ntheta,
            modes = engine.basis.len(),
            budget = engine.config.n_iterations,
            "engine ready"
        );
        Ok(engine)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Read-only view of the current field, e.g. at a caller-chosen checkpoint
    /// between `step` calls.
    pub fn field(&self) -> ArrayView2<'_, f64> {
        self.phi.view()
    }

    /// Current projection of Φ. Does not touch history.
    pub fn observe(&self) -> Projection {
        project(&self.grid, &self.basis, self.phi.view())
    }

    /// Run one iteration. Returns `None` once the engine is terminal.
    ///
    /// A divergence is fatal: the engine moves to `Diverged` and every later
    /// call returns `None`. Nothing from the failed iteration is recorded.
    pub fn step(&mut self) -> Result<Option<&IterationRecord>> {
        if self.state != EngineState::Iterating {
            return Ok(None);
        }
        let iteration = self.history.len() + 1;

        let (record, next) = match self.advance(iteration) {
            Ok(done) => done,
            Err(e) => {
                self.state = EngineState::Diverged;
                tracing::warn!(iteration, error = %e, "recursion diverged");
                return Err(e);
            }
        };
        let coherence = record.coherence;
        self.history.push(record);
        self.phi = next;

        tracing::debug!(iteration, coherence, "iteration complete");

        if iteration >= self.config.n_iterations {
            self.state = EngineState::Exhausted;
        } else if let Some(tol) = self.config.convergence_tolerance
            && let [.., prev, last] = self.history.as_slice()
            && (last.coherence - prev.coherence).abs() < tol
        {
            self.state = EngineState::Converged;
        }
        if self.state.is_terminal() {
            tracing::info!(iteration, coherence, state = ?self.state, "recursion finished");
        }

        Ok(self.history.last())
    }

    /// Observe Φ, then compute the next field. Leaves `self` untouched.
    fn advance(&self, iteration: usize) -> Result<(IterationRecord, Array2<f64>)> {
        let observed = project(&self.grid, &self.basis, self.phi.view());
        if !observed.is_finite() {
            return Err(SolverError::diverged(
                iteration,
                Stage::Projection,
                "projection of the current field is not finite",
            ));
        }

        let d = feedback(&self.grid, self.phi.view(), iteration)?;

        let mut raw = self.phi.clone();
        raw.scaled_add(self.config.step_size, &d);
        if raw.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::diverged(
                iteration,
                Stage::Update,
                "raw update is not finite",
            ));
        }

        let (mut next, _) = reproject(&self.grid, &self.basis, raw.view());
        if next.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::diverged(
                iteration,
                Stage::Projection,
                "re-projected field is not finite",
            ));
        }
        enforce_polarity(&mut next);

        let record = IterationRecord {
            iteration,
            coherence: observed.coherence,
            coefficients: observed.coefficients,
        };
        Ok((record, next))
    }

    /// Run to a terminal state with no reporting.
    pub fn run(self) -> Result<SolverOutcome> {
        self.run_with(&mut NullObserver)
    }

    /// Run to a terminal state, handing a checkpoint to `observer` whenever
    /// `report_every > 0` divides the iteration index.
    pub fn run_with(mut self, observer: &mut dyn IterationObserver) -> Result<SolverOutcome> {
        let report_every = self.config.report_every;
        while !self.state.is_terminal() {
            self.step()?;
            let Some(record) = self.history.last() else {
                break;
            };
            if report_every > 0 && record.iteration % report_every == 0 {
                observer.observe(&Checkpoint {
                    iteration: record.iteration,
                    record,
                    field: self.phi.view(),
                });
            }
        }
        Ok(self.into_outcome())
    }

    pub fn into_outcome(self) -> SolverOutcome {
        let final_projection = project(&self.grid, &self.basis, self.phi.view());
        SolverOutcome {
            config: self.config,
            grid: self.grid,
            basis: self.basis,
            field: self.phi,
            history: self.history,
            final_projection,
            state: self.state,
        }
    }
}

/// Solver entry point: build, iterate to a terminal state, return the outcome.
pub fn solve(config: SolverConfig) -> Result<SolverOutcome> {
    RecursionEngine::new(config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::satisfies_polarity;

    fn small(n_iterations: usize) -> SolverConfig {
        SolverConfig {
            nr: 20,
            ntheta: 30,
            n_iterations,
            report_every: 0,
            ..SolverConfig::default()
        }
    }

    #[test]
    fn test_new_enters_iterating() {
        let engine = RecursionEngine::new(small(3)).unwrap();
        assert_eq!(engine.state(), EngineState::Iterating);
        assert!(engine.history().is_empty());
        assert!(satisfies_polarity(&engine.field().to_owned()));
    }

    #[test]
    fn test_history_records_pre_update_observation() {
        let mut engine = RecursionEngine::new(small(3)).unwrap();
        let before = engine.observe();
        let rec = engine.step().unwrap().unwrap().clone();
        assert_eq!(rec.iteration, 1);
        assert_eq!(rec.coherence, before.coherence);
        assert_eq!(rec.coefficients, before.coefficients);
    }

    #[test]
    fn test_runs_to_budget_and_stops() {
        let mut engine = RecursionEngine::new(small(4)).unwrap();
        for expected in 1..=4 {
            let rec = engine.step().unwrap().unwrap();
            assert_eq!(rec.iteration, expected);
        }
        assert_eq!(engine.state(), EngineState::Exhausted);
        assert!(engine.step().unwrap().is_none());
        assert_eq!(engine.history().len(), 4);
    }

    #[test]
    fn test_polarity_holds_after_every_step() {
        let mut engine = RecursionEngine::new(small(6)).unwrap();
        while engine.step().unwrap().is_some() {
            assert!(engine.field().iter().all(|&v| v <= 0.0));
        }
    }

    #[test]
    fn test_observer_cadence() {
        let cfg = SolverConfig {
            report_every: 2,
            ..small(7)
        };
        let mut seen = Vec::new();
        let mut obs = |cp: &Checkpoint<'_>| {
            assert!(cp.field.iter().all(|&v| v <= 0.0));
            seen.push(cp.iteration);
        };
        let outcome = RecursionEngine::new(cfg).unwrap().run_with(&mut obs).unwrap();
        assert_eq!(seen, vec![2, 4, 6]);
        assert_eq!(outcome.history.len(), 7);
    }

    #[test]
    fn test_reporting_disabled_with_zero() {
        let mut calls = 0usize;
        let mut obs = |_: &Checkpoint<'_>| calls += 1;
        RecursionEngine::new(small(3)).unwrap().run_with(&mut obs).unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_convergence_tolerance_stops_early() {
        let cfg = SolverConfig {
            convergence_tolerance: Some(1.0),
            ..small(50)
        };
        let outcome = solve(cfg).unwrap();
        assert_eq!(outcome.state, EngineState::Converged);
        assert_eq!(outcome.history.len(), 2);
    }

    #[test]
    fn test_nan_initial_field_diverges_at_first_iteration() {
        let cfg = small(3);
        let mut phi = Array2::zeros((30, 20));
        phi[[4, 4]] = f64::NAN;
        let err = RecursionEngine::with_initial_field(cfg, phi)
            .unwrap()
            .run()
            .unwrap_err();
        match err {
            SolverError::NumericalDivergence { iteration, .. } => assert_eq!(iteration, 1),
            other => panic!("expected divergence, got {other}"),
        }
    }

    #[test]
    fn test_divergence_is_terminal() {
        let mut phi = Array2::zeros((30, 20));
        phi[[4, 4]] = f64::INFINITY;
        let mut engine = RecursionEngine::with_initial_field(small(3), phi).unwrap();

        assert!(matches!(
            engine.step(),
            Err(SolverError::NumericalDivergence { iteration: 1, .. })
        ));
        assert_eq!(engine.state(), EngineState::Diverged);
        assert!(engine.history().is_empty());
        assert!(engine.step().unwrap().is_none());
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_initial_field_shape_checked() {
        let err = RecursionEngine::with_initial_field(small(3), Array2::zeros((3, 3)));
        assert!(matches!(err, Err(SolverError::Configuration(_))));
    }

    #[test]
    fn test_deterministic() {
        let a = solve(small(5)).unwrap();
        let b = solve(small(5)).unwrap();
        assert_eq!(a.field, b.field);
        assert_eq!(a.history, b.history);
    }
}
