use thiserror::Error;

/// Problems found while assembling the static field-group configuration.
///
/// Every variant means the configuration itself is inconsistent; none of them
/// depend on document data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("field-group configuration is empty")]
    Empty,

    #[error("no root field group (every group declares a parent)")]
    MissingRoot,

    #[error("more than one root field group: {first} and {second}")]
    MultipleRoots { first: String, second: String },

    #[error("duplicate field group: {group}")]
    DuplicateGroup { group: String },

    #[error("field group {group} names unknown parent {parent}")]
    UnknownParent { group: String, parent: String },

    #[error("field group {group} is part of a parent cycle")]
    Cycle { group: String },

    #[error("field groups {first} and {second} share document key {key} under {parent}")]
    DuplicateKey {
        parent: String,
        key: String,
        first: String,
        second: String,
    },

    #[error("field groups {first} and {second} share column prefix {prefix}")]
    DuplicatePrefix {
        prefix: String,
        first: String,
        second: String,
    },

    #[error("field group {group} has an empty id key")]
    MissingIdKey { group: String },

    #[error("id key {id_key} of field group {group} is not listed in its columns")]
    MissingIdColumn { group: String, id_key: String },

    #[error("id key {id_key} of field group {group} is excluded")]
    ExcludedIdKey { group: String, id_key: String },
}
