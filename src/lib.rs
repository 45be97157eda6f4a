pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod types;

pub use config::{Config, PipelineConfig, Settings};
pub use error::{PipelineError, Result};
pub use pipeline::{run_pipeline, Pipeline, RunSummary};
pub use types::{ClusterKey, Observation, RawRecord, VersionedRecord};
