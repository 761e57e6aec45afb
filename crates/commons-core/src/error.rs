//! Error types for planning and decomposition.

use thiserror::Error;

/// Broad category of a [`DecomposeError`].
///
/// Callers use it to tell "fix the static field-group config" apart from
/// "this document does not fit the plan it was given".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Static configuration is out of date or inconsistent. Aborts a plan.
    Configuration,
    /// A document holds data the plan was not built for.
    PlanMismatch,
    /// A document is malformed for the configured shape.
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecomposeError {
    #[error("field group {parent} has nested key {key} with no configured field group")]
    UnknownFieldGroup { parent: String, key: String },

    #[error("table {table} would contain column {column} twice")]
    ColumnCollision { table: String, column: String },

    #[error("group handle {index} does not belong to this field-group tree")]
    ForeignGroup { index: usize },

    #[error("field group {group} occurs in the document but is not part of the plan")]
    UnplannedFieldGroup { group: String },

    #[error("field {field} of field group {group} is not part of the plan")]
    UnplannedField { group: String, field: String },

    #[error("field group {group} was planned as 1:1 but holds {count} records under one parent")]
    UnplannedCardinality { group: String, count: usize },

    #[error("record of field group {group} has no value for id key {id_key}")]
    MissingRecordId { group: String, id_key: String },

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("field {key} of field group {group} mixes nested records with scalar values")]
    MixedList { group: String, key: String },

    #[error("field {key} of field group {group} must hold nested records")]
    ExpectedNested { group: String, key: String },

    #[error("document {index}: {source}")]
    InDocument {
        index: usize,
        #[source]
        source: Box<DecomposeError>,
    },
}

impl DecomposeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownFieldGroup { .. }
            | Self::ColumnCollision { .. }
            | Self::ForeignGroup { .. } => ErrorKind::Configuration,
            Self::UnplannedFieldGroup { .. }
            | Self::UnplannedField { .. }
            | Self::UnplannedCardinality { .. } => ErrorKind::PlanMismatch,
            Self::MissingRecordId { .. }
            | Self::NotAnObject
            | Self::MixedList { .. }
            | Self::ExpectedNested { .. } => ErrorKind::Document,
            Self::InDocument { source, .. } => source.kind(),
        }
    }

    pub(crate) fn in_document(self, index: usize) -> Self {
        match self {
            already @ Self::InDocument { .. } => already,
            other => Self::InDocument {
                index,
                source: Box::new(other),
            },
        }
    }
}
