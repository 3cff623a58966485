//! Visitor pass entity, validity rules, and URL token handling.

pub mod error;
pub mod model;
pub mod token;

pub use error::{InvalidPassReason, PassError};
pub use model::{CreateVisitorPass, Expiry, PassSnapshot, VisitorPass};
pub use token::{extract_token, tokenise_url};
