//! Repositories
//!
//! Stateless query modules. Single-statement functions are generic over
//! the executor so the same query runs against the pool or inside a unit
//! of work; multi-statement functions take `&mut SqliteConnection` and are
//! only callable transactionally.

pub mod analysis_repo;
pub mod content_repo;
pub mod log_repo;
pub mod roadmap_repo;
pub mod task_repo;
