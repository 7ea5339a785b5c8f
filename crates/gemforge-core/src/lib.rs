//! Gemforge Core - types shared by every Gemforge crate
//!
//! - `GemforgeError` / `Result` - the pipeline error taxonomy
//! - `ServiceError`, `ServiceErrorKind` - normalized provider failures
//! - `ContentHash` - SHA-256 fingerprints for stored artifacts

mod error;
mod hash;

pub use error::{GemforgeError, Result, ServiceError, ServiceErrorKind};
pub use hash::ContentHash;
