//! # infracc-error
//!
//! Unified error handling for infracc.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., UnknownProvider, MissingResource)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use infracc_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::MissingResource, "no vpc in graph")
//!         .with_operation("aws::handle_vpc_endpoints")
//!         .with_context("candidates", "0"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, infracc_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using infracc Error
pub type Result<T> = std::result::Result<T, Error>;
