//! # visitors-database
//!
//! PostgreSQL connection management, migrations, and the pass and visit
//! log stores. Each store trait has a sqlx implementation and an
//! in-memory one for single-process use and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::{MemoryPassStore, MemoryVisitLogStore};
pub use repositories::{PassRepository, VisitLogRepository};
pub use store::{PassStore, VisitLogStore};
