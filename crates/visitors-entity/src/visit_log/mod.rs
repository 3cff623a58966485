//! Per-request audit records.

pub mod model;
pub mod request;

pub use model::{CreateVisitLog, VisitLog};
pub use request::RequestMeta;
