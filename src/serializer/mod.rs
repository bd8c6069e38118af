//! Declarative serializers: field mappings, SQL projections for reads and
//! body parsing for writes.

mod errors;
mod field;
pub mod read;
pub mod write;

pub use errors::{ValidationErrors, NON_FIELD_ERRORS};
pub use field::{Attr, Field, Serializer};
pub use read::json_object;
pub use write::{parse, ChildSet, Link, Mode, Reference, WriteData};
