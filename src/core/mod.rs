// Public modules
pub mod compression;
pub mod deploy;
pub mod error;
pub mod jenkins;
pub mod release;
pub mod ssh;
pub mod target;
pub mod variables;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
