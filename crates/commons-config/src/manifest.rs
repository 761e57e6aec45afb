#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

use commons_model::FieldGroupConfig;

/// On-disk layout of a field-group configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldGroupManifest {
    pub config: ManifestHeader,
    #[serde(default)]
    pub notes: Option<ManifestNotes>,
    #[serde(default)]
    pub field_groups: Vec<FieldGroupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestHeader {
    pub schema: String,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestNotes {
    pub summary: Option<String>,
}

impl FieldGroupManifest {
    /// Free-text description from the `[notes]` table.
    pub fn summary(&self) -> Option<&str> {
        self.notes.as_ref()?.summary.as_deref()
    }
}
