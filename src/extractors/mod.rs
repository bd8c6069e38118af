//! Request extractors.

pub mod language;
pub use language::RequestLanguage;
