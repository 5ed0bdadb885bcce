pub mod error;
pub mod logging;

pub mod classifier;
pub mod collector;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod rewriter;
pub mod scanner;
pub mod store;

pub use classifier::{NamingConvention, ReferenceDriven, WorkerClassifier};
pub use config::{Strategy, TransformConfig};
pub use error::{Result, TransformError};
pub use pipeline::{PreparedTransform, TransformReport, Transformer};
pub use store::{FsStore, SourceStore};
