//! The public error type.
//!
//! Every crate in this workspace already shares one error taxonomy
//! ([`txm_core::Error`]); unlike a facade that unifies several internal
//! error types, there is nothing left to wrap here, so this module simply
//! re-exports it under the root crate's own name.

pub use txm_core::Error;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;
