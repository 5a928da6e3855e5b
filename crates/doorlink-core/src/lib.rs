//! Shared building blocks for the doorlink access-control system.
//!
//! Everything that both the hub and the door modules agree on lives here:
//! identifiers, channel and state vocabularies, protocol defaults, and the
//! crate-wide [`Error`] type.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
