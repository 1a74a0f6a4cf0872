//! TOML run configuration: a `[solver]` table and a `[tracer]` table, both
//! optional, both falling back to defaults field by field.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use rsf_core::{SolverConfig, TracerConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub solver: SolverConfig,
    pub tracer: TracerConfig,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let cfg = FileConfig::parse("").unwrap();
        assert_eq!(cfg.solver, SolverConfig::default());
        assert_eq!(cfg.tracer, TracerConfig::default());
    }

    #[test]
    fn test_partial_tables_keep_defaults() {
        let cfg = FileConfig::parse(
            r#"
[solver]
nr = 40
ntheta = 60
modes = [2, 4]

[solver.amplitude_ratios]
2 = 1.0
4 = 0.5

[tracer]
seed = 9
"#,
        )
        .unwrap();
        assert_eq!(cfg.solver.nr, 40);
        assert_eq!(cfg.solver.modes, vec![2, 4]);
        assert_eq!(cfg.solver.amplitude_ratios.get(4), Some(&0.5));
        assert_eq!(cfg.solver.step_size, SolverConfig::default().step_size);
        assert_eq!(cfg.tracer.seed, 9);
        assert_eq!(cfg.tracer.n_particles, TracerConfig::default().n_particles);
        cfg.solver.validate().unwrap();
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(FileConfig::parse("[solver]\nnr_points = 3\n").is_err());
        assert!(FileConfig::parse("[plot]\nevery = 3\n").is_err());
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = FileConfig::load(Some(Path::new("/nonexistent/rsf.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/rsf.toml"));
    }
}
