//! Continuation module
//!
//! Handles the resumption token carried between bounded slices.
//!
//! # Overview
//!
//! - `Continuation` - cursors, the in-flight batch, retry count and rate budget
//! - `CurrentBatch` / `BatchRecord` - fetched records awaiting augmentation
//! - `ContinuationStore` - file-based persistence used by the CLI host

mod store;
mod types;

pub use store::{ContinuationStore, StoredContinuations};
pub use types::{BatchRecord, Continuation, CurrentBatch};
