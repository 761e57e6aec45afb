use std::path::{Path, PathBuf};

use tracing::debug;

use commons_model::FieldGroupTree;

use crate::error::ConfigLoadError;
use crate::manifest::FieldGroupManifest;

pub const CONFIG_SCHEMA: &str = "commons.field-groups";
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const CONFIG_ENV_VAR: &str = "COMMONS_FIELD_GROUPS";

/// Resolve the config path: an explicit path wins, then the environment.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigLoadError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => Ok(PathBuf::from(value)),
        _ => Err(ConfigLoadError::MissingPath {
            var: CONFIG_ENV_VAR,
        }),
    }
}

/// Read, validate and resolve a field-group configuration file.
pub fn load_field_groups(path: &Path) -> Result<FieldGroupTree, ConfigLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigLoadError::io(path, e))?;
    let manifest = parse_manifest(path, &contents)?;
    let group_count = manifest.field_groups.len();
    let summary = manifest.summary().unwrap_or_default().to_string();
    let tree =
        FieldGroupTree::new(manifest.field_groups).map_err(|source| ConfigLoadError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        path = %path.display(),
        groups = group_count,
        summary = %summary,
        "loaded field-group config"
    );
    Ok(tree)
}

/// Parse config text that did not come from a file (tests, embedded defaults).
pub fn field_groups_from_str(contents: &str) -> Result<FieldGroupTree, ConfigLoadError> {
    let path = Path::new("<inline>");
    let manifest = parse_manifest(path, contents)?;
    FieldGroupTree::new(manifest.field_groups).map_err(|source| ConfigLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_manifest(path: &Path, contents: &str) -> Result<FieldGroupManifest, ConfigLoadError> {
    let manifest: FieldGroupManifest =
        toml::from_str(contents).map_err(|e| ConfigLoadError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
    validate_header(&manifest)?;
    Ok(manifest)
}

fn validate_header(manifest: &FieldGroupManifest) -> Result<(), ConfigLoadError> {
    if manifest.config.schema != CONFIG_SCHEMA {
        return Err(ConfigLoadError::InvalidHeader {
            message: format!("unsupported schema: {}", manifest.config.schema),
        });
    }
    if manifest.config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(ConfigLoadError::InvalidHeader {
            message: format!(
                "unsupported schema_version: {}",
                manifest.config.schema_version
            ),
        });
    }
    Ok(())
}
