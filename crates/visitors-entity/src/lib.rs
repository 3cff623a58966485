//! # visitors-entity
//!
//! Domain entities for visitor passes. Every struct in this crate is a
//! database row or a domain value object. Database entities additionally
//! derive `sqlx::FromRow`.
//!
//! The [`pass::VisitorPass`] state machine is pure: callers pass in the
//! current time and the active [`visitors_core::config::visitors::VisitorsConfig`].

pub mod pass;
pub mod visit_log;

pub use pass::{CreateVisitorPass, Expiry, InvalidPassReason, PassError, PassSnapshot, VisitorPass};
pub use visit_log::{CreateVisitLog, RequestMeta, VisitLog};
