//! Business logic services.

pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod result_store;

pub use model::{ModelHandle, ModelSource};
pub use result_store::{JobId, ResultStore};
