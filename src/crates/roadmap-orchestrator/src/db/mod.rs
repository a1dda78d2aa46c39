//! Database layer
//!
//! Connectivity, row models, repositories, the unit-of-work transactional
//! boundary and the database-backed checkpoint store.

pub mod checkpoint_store;
pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod uow;

pub use checkpoint_store::DbCheckpointStore;
pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DatabaseError, DbResult};
pub use uow::{Savepoint, UnitOfWork};
