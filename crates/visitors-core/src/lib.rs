//! # visitors-core
//!
//! Core crate for visitor passes. Contains configuration schemas, typed
//! identifiers, the clock abstraction, and the unified error system.
//!
//! This crate has **no** internal dependencies on other visitors crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::AppError;
pub use result::AppResult;
