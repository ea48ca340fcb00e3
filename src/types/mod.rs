//! Error types and report metadata.
//!
//! # Examples
//!
//! ```
//! use voisin_rail::types::{Failure, RemoteError, ServiceError};
//!
//! let failure = Failure::from(ServiceError::new("JWT expired").with_code("PGRST301"))
//!     .with_context("récupération des missions");
//!
//! assert_eq!(failure.code(), Some("PGRST301"));
//! assert!(matches!(failure.error(), RemoteError::Service(_)));
//! ```
use smallvec::SmallVec;

pub mod envelope;
pub mod failure;
pub mod remote_error;
pub mod report_context;

pub use envelope::*;
pub use failure::*;
pub use remote_error::*;
pub use report_context::*;

/// SmallVec-backed collection used for context labels.
///
/// Most failures carry a single label, so one element is stored inline.
pub type ErrorVec<E> = SmallVec<[E; 1]>;

/// The result tuple: exactly one of a value or a [`Failure`].
pub type Outcome<T> = Result<T, Failure>;
