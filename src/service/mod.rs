//! Services over the store: generic reads, transactional writes, shopping actions.

mod crud;
pub mod nested;
pub mod shopping;
pub use crud::{CrudService, ListParams, PageRequest, ReadSpec};
