#![warn(missing_docs)]

//! Batch processing of a powder-bed build.
//!
//! A [`Pipeline`] slices each model, groups its layers into sections,
//! rebuilds contours once per section and hatches every layer. Runs poll a
//! [`CancelToken`], report through [`Progress`], and collect non-fatal
//! problems as [`PipelineIssue`]s. [`JobSupervisor`] runs pipeline work on
//! the Tokio blocking pool with last-request-wins semantics per model.
//!
//! # Example
//!
//! ```ignore
//! use pbf_pipeline::{load_mesh, CancelToken, ModelInput, Pipeline, PipelineConfig, Progress};
//!
//! let config = PipelineConfig::load("job.toml".as_ref())?;
//! let models = config
//!     .models
//!     .iter()
//!     .map(|m| Ok(ModelInput { mesh: load_mesh(&m.mesh)?, transform: m.transform }))
//!     .collect::<pbf_pipeline::Result<Vec<_>>>()?;
//!
//! let report = Pipeline::from_config(&config).run(&models, &CancelToken::new(), &Progress::silent())?;
//! for issue in &report.issues {
//!     eprintln!("{issue}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod issue;
pub mod job;
pub mod pipeline;

pub use config::{ConfigError, ModelConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use issue::{PipelineIssue, Stage};
pub use job::{CancelToken, JobHandle, JobSupervisor, OperationKind, Progress, ProgressEvent};
pub use pipeline::{
    load_mesh, ModelInput, ModelResult, Pipeline, RunReport, SlicedModel, LAYER_CHUNK,
};
