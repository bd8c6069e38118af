//! Model definitions per app: tables, serializers and routes.

pub mod catalog;
pub mod content;
pub mod files;
pub mod shopping;
