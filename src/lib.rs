pub mod classifier;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod decision_tree;
pub mod encoder;
pub mod error;
pub mod features;
pub mod harness;
pub mod imputer;
pub mod knn;
pub mod logistic;
pub mod metrics;
pub mod pipeline;
pub mod report_export;
pub mod scaler;
pub mod splitter;
pub mod synthetic;

pub use config::PipelineConfig;
pub use error::{ClassifierError, PipelineError, Result};
