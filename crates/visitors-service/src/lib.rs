//! # visitors-service
//!
//! Orchestrates the visitor pass state machine with its stores. Services
//! follow constructor injection: stores, clock and settings are handed in
//! at construction time via `Arc` references.

pub mod pass;
pub mod visit_log;

pub use pass::PassService;
pub use visit_log::VisitLogService;
