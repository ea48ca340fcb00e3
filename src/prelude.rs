//! The items most call sites need.
//!
//! ```
//! use voisin_rail::prelude::*;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let rail = Rail::default();
//! let token = CancellationToken::new();
//!
//! let outcome: Outcome<u8> = with_cancel(&token, with_timeout(DEFAULT_TIMEOUT, async {
//!     Ok::<_, Failure>(7)
//! }))
//! .safe(&rail, "chargement")
//! .await;
//!
//! assert_eq!(outcome.ok(), Some(7));
//! # });
//! ```

pub use tokio_util::sync::CancellationToken;

pub use crate::async_ext::{
    with_cancel, with_timeout, EnvelopeFutureExt, FutureRailExt, DEFAULT_TIMEOUT,
};
pub use crate::rail::Rail;
pub use crate::types::{Envelope, Failure, Outcome, RemoteError, ServiceError};
