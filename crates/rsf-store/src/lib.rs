//! Persistence for solver runs: `.npy` arrays and a JSON run report.
//!
//! `rsf-core` stays free of I/O; everything that touches the filesystem
//! lives here.

pub mod artifacts;
pub mod error;
pub mod report;

pub use artifacts::{
    ArtifactStore, export_gradient_map, read_array, read_trajectories, write_array,
    write_trajectories,
};
pub use error::{Result, StoreError};
pub use report::{CURRENT_VERSION, RunReport, read_report, write_report};
