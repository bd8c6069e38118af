//! HTTP handlers: generic entity views, shopping actions, API schema.

pub mod entity;
pub mod schema;
pub mod shopping;
