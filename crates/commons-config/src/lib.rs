#![deny(unsafe_code)]

pub mod error;
pub mod loaders;
pub mod manifest;

pub use crate::error::ConfigLoadError;
pub use crate::loaders::{
    CONFIG_ENV_VAR, field_groups_from_str, load_field_groups, resolve_config_path,
};
pub use crate::manifest::FieldGroupManifest;
