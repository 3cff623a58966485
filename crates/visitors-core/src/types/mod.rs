//! Core type definitions used across the visitors workspace.

pub mod id;

pub use id::*;
