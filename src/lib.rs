//! Storefront: multi-language catalog, content and shopping REST backend.

pub mod app;
pub mod apps;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod language;
pub mod migration;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod serializer;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;

pub use app::{build, router};
pub use config::{load, resolve, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use language::Language;
pub use migration::apply_migrations;
pub use response::{success_many, success_one, success_page};
pub use service::CrudService;
pub use settings::Settings;
pub use state::AppState;
