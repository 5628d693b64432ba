#![deny(missing_docs)]
#![doc = "Error taxonomy and provenance types shared by the cooltab grid tooling."]

pub mod errors;
pub mod provenance;

pub use errors::{ErrorInfo, GridError};
pub use provenance::{SchemaVersion, TableProvenance};
