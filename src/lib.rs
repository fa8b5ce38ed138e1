//! spotify-etl - Load Spotify artist and album exports into relational tables
//!
//! CSV sources are read into an in-memory [`Table`], given a derived index
//! column, sorted, and appended in fixed-size batches to tables declared by
//! the [`registry`].

pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod sink;

pub use config::{ConnectionParams, PipelineConfig};
pub use error::{EtlError, Result};
pub use loader::Loader;
pub use model::Table;
pub use pipeline::{Pipeline, PipelineError, RunSummary, Stage};
