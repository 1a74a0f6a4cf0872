use std::fmt;

use thiserror::Error;

/// Where in the pipeline a non-finite value surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Laplacian,
    Feedback,
    Update,
    Projection,
    Tracer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Laplacian => "laplacian",
            Stage::Feedback => "feedback",
            Stage::Update => "update",
            Stage::Projection => "projection",
            Stage::Tracer => "tracer",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SolverError {
    /// Invalid parameters or a degenerate basis. Detected before iterating.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// NaN/Inf produced while iterating. Fatal for the run.
    #[error("numerical divergence at iteration {iteration} ({stage}): {detail}")]
    NumericalDivergence {
        iteration: usize,
        stage: Stage,
        detail: String,
    },
}

impl SolverError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SolverError::Configuration(msg.into())
    }

    pub(crate) fn diverged(iteration: usize, stage: Stage, detail: impl Into<String>) -> Self {
        SolverError::NumericalDivergence {
            iteration,
            stage,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
