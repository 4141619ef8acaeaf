//! Shared building blocks for the Zalo phone gateway
//!
//! - [`Secret`] keeps credential material out of logs and zeroizes it on drop.
//! - [`redact`] shortens bearer-equivalent tokens for diagnostic output.
//! - [`Error`] covers configuration loading failures shared by all crates.

mod error;
pub mod redact;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
