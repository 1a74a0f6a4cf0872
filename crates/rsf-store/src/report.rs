//! JSON run report.
//!
//! A diagnostic summary of one solve: the config it ran with, the coherence
//! history, and the final projection. Wire names are camelCase. It does not
//! carry enough state to resume a run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rsf_core::{EngineState, IterationRecord, ModeMap, SolverConfig, SolverOutcome};

use crate::error::{Result, StoreError};

pub const CURRENT_VERSION: &str = "1";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub version: String,
    pub config: SolverConfig,
    pub state: EngineState,
    pub iterations: usize,
    pub initial_coherence: Option<f64>,
    pub final_coherence: f64,
    pub final_coefficients: ModeMap<f64>,
    pub final_energies: ModeMap<f64>,
    /// Largest normalized off-diagonal Gram entry of the basis.
    pub max_mode_overlap: f64,
    pub history: Vec<IterationRecord>,
}

impl RunReport {
    pub fn from_outcome(outcome: &SolverOutcome) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            config: outcome.config.clone(),
            state: outcome.state,
            iterations: outcome.history.len(),
            initial_coherence: outcome.initial_coherence(),
            final_coherence: outcome.final_coherence(),
            final_coefficients: outcome.final_projection.coefficients.clone(),
            final_energies: outcome.final_projection.energies.clone(),
            max_mode_overlap: outcome.basis.max_overlap(),
            history: outcome.history.clone(),
        }
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).map_err(|e| StoreError::io(path, e))?;
    tracing::debug!(path = %path.display(), "report written");
    Ok(())
}

pub fn read_report(path: &Path) -> Result<RunReport> {
    let json = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let report: RunReport = serde_json::from_str(&json)?;
    if report.version != CURRENT_VERSION {
        return Err(StoreError::InvalidData(format!(
            "unsupported report version {}, expected {CURRENT_VERSION}",
            report.version
        )));
    }
    Ok(report)
}
