//! PostgreSQL store implementations.

pub mod pass;
pub mod visit_log;

pub use pass::PassRepository;
pub use visit_log::VisitLogRepository;
