//! Provenance descriptors attached to generated tables and reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Layout version of a written table, manifest or statistics sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when readers of the previous layout would break.
    pub major: u32,
    /// Bumped when fields are only added.
    pub minor: u32,
}

impl SchemaVersion {
    /// `major.minor` descriptor.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

/// Provenance information recorded next to every table and statistics report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TableProvenance {
    /// SHA-256 digest of the input document the artifact was derived from.
    pub input_hash: String,
    /// Path of the input document as given by the caller.
    pub input_path: String,
    /// Generation time: RFC 3339 by default, or the caller's fixed timestamp.
    pub created_at: String,
    /// Schema version of the artifact.
    #[serde(default)]
    pub schema: SchemaVersion,
    /// Version map for the tools involved in producing the artifact.
    pub tool_versions: BTreeMap<String, String>,
}
