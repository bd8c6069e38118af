//! Route builders.

pub mod common;
pub mod entity;
pub mod shopping;

pub use common::common_routes;
pub use entity::entity_routes;
pub use shopping::shopping_routes;
