//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`io`] - Chunked reads for multipart uploads
//! - [`timing`] - Duration logging around async operations

pub mod io;
pub mod timing;
