// Quill: semantic authorship attribution for short texts
//
// This is the library root. Each module corresponds to a stage or
// collaborator of the attribution pipeline.

pub mod config;
pub mod corpus;
pub mod encoder;
pub mod error;
pub mod index;
pub mod judge;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod retrieval;
pub mod status;

pub use error::{AttributionError, Result};
