//! Error Handling Module
//!
//! Two layers of errors flow through the crate:
//! - [`TransportError`]: what a provider adapter reports (network/HTTP failures)
//! - [`GenerationError`]: what callers of the dispatcher see
//!
//! # Example
//!
//! ```rust,ignore
//! use mindscape_ai::error::{ErrorCategory, GenerationError, TransportError};
//!
//! let err = TransportError::from_status(503, "overloaded");
//! assert_eq!(err.status_code(), Some(503));
//! ```

mod conversions;
pub mod types;

pub use types::*;
