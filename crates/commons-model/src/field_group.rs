//! Field-group configuration and the explicit field-group tree.
//!
//! A field group is one node of the nested document schema (`cases`,
//! `cases.diagnoses`, `cases.diagnoses.treatments`, ...). The tree is built
//! once from the static configuration and never changes afterwards; every
//! engine entry point receives it by reference.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One field group as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroupConfig {
    /// Unique dotted name, also used as the output table name.
    pub name: String,
    /// Document key holding instances of this group inside a parent instance.
    /// Defaults to the last segment of `name`.
    #[serde(default)]
    pub key: Option<String>,
    /// Name of the enclosing field group; `None` for the root.
    #[serde(default)]
    pub parent: Option<String>,
    /// Field that identifies one record of this group.
    pub id_key: String,
    /// Column prefix used when the group is merged into an ancestor table.
    /// Defaults to the document key.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Configured display order of field names.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Fields that are never emitted.
    #[serde(default)]
    pub excluded: Vec<String>,
    /// Optional schema descriptions keyed by field name.
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
}

impl FieldGroupConfig {
    pub fn new(name: impl Into<String>, id_key: impl Into<String>) -> Self {
        let id_key = id_key.into();
        Self {
            name: name.into(),
            key: None,
            parent: None,
            columns: vec![id_key.clone()],
            id_key,
            prefix: None,
            excluded: Vec::new(),
            descriptions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Replace the column order. The id key is kept in front when missing.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        if !self.columns.contains(&self.id_key) {
            self.columns.insert(0, self.id_key.clone());
        }
        self
    }

    #[must_use]
    pub fn with_excluded<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = excluded.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_description(
        mut self,
        field: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.descriptions.insert(field.into(), description.into());
        self
    }
}

/// Stable handle of a node inside one [`FieldGroupTree`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct GroupId(usize);

impl GroupId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved field group with typed parent and children links.
#[derive(Debug, Clone)]
pub struct FieldGroupNode {
    pub id: GroupId,
    pub name: String,
    pub key: String,
    pub prefix: String,
    pub parent: Option<GroupId>,
    pub children: Vec<GroupId>,
    /// Root is depth 1.
    pub depth: usize,
    pub id_key: String,
    pub columns: Vec<String>,
    pub excluded: BTreeSet<String>,
    pub descriptions: BTreeMap<String, String>,
}

impl FieldGroupNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_excluded(&self, field: &str) -> bool {
        self.excluded.contains(field)
    }

    /// Position of `field` in the configured column order.
    pub fn column_position(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == field)
    }

    pub fn description(&self, field: &str) -> Option<&str> {
        self.descriptions.get(field).map(String::as_str)
    }
}

/// Immutable tree of field groups built from the configuration.
#[derive(Debug, Clone)]
pub struct FieldGroupTree {
    nodes: Vec<FieldGroupNode>,
    by_name: BTreeMap<String, GroupId>,
    by_key: BTreeMap<(GroupId, String), GroupId>,
    root: GroupId,
    preorder: Vec<GroupId>,
}

impl FieldGroupTree {
    /// Resolve and validate the configured field groups.
    ///
    /// Children keep the order in which they are declared.
    pub fn new(configs: Vec<FieldGroupConfig>) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::Empty);
        }

        let mut by_name = BTreeMap::new();
        for (idx, config) in configs.iter().enumerate() {
            if by_name.insert(config.name.clone(), GroupId(idx)).is_some() {
                return Err(ConfigError::DuplicateGroup {
                    group: config.name.clone(),
                });
            }
        }

        let mut nodes = Vec::with_capacity(configs.len());
        let mut root: Option<GroupId> = None;
        for (idx, config) in configs.into_iter().enumerate() {
            let id = GroupId(idx);
            let parent = match &config.parent {
                Some(parent) => Some(*by_name.get(parent).ok_or_else(|| {
                    ConfigError::UnknownParent {
                        group: config.name.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => {
                    if let Some(existing) = root {
                        let first: &FieldGroupNode = &nodes[existing.0];
                        return Err(ConfigError::MultipleRoots {
                            first: first.name.clone(),
                            second: config.name.clone(),
                        });
                    }
                    root = Some(id);
                    None
                }
            };
            nodes.push(resolve_node(id, parent, config)?);
        }
        let root = root.ok_or(ConfigError::MissingRoot)?;

        let mut by_key = BTreeMap::new();
        for idx in 0..nodes.len() {
            let Some(parent) = nodes[idx].parent else {
                continue;
            };
            let key = nodes[idx].key.clone();
            if let Some(previous) = by_key.insert((parent, key.clone()), GroupId(idx)) {
                return Err(ConfigError::DuplicateKey {
                    parent: nodes[parent.0].name.clone(),
                    key,
                    first: nodes[previous.0].name.clone(),
                    second: nodes[idx].name.clone(),
                });
            }
            nodes[parent.0].children.push(GroupId(idx));
        }

        let mut tree = Self {
            nodes,
            by_name,
            by_key,
            root,
            preorder: Vec::new(),
        };
        tree.resolve_depths()?;
        tree.preorder = tree.collect_preorder();
        tree.check_prefixes()?;
        Ok(tree)
    }

    pub fn root(&self) -> GroupId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` addresses a group of this tree.
    pub fn contains(&self, id: GroupId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Checked form of [`FieldGroupTree::node`].
    pub fn get(&self, id: GroupId) -> Option<&FieldGroupNode> {
        self.nodes.get(id.0)
    }

    /// # Panics
    ///
    /// Panics when `id` was issued by a different, larger tree.
    pub fn node(&self, id: GroupId) -> &FieldGroupNode {
        &self.nodes[id.0]
    }

    pub fn name(&self, id: GroupId) -> &str {
        &self.node(id).name
    }

    pub fn lookup(&self, name: &str) -> Option<GroupId> {
        self.by_name.get(name).copied()
    }

    /// Child of `parent` stored under document key `key`.
    pub fn child_by_key(&self, parent: GroupId, key: &str) -> Option<GroupId> {
        self.by_key.get(&(parent, key.to_string())).copied()
    }

    pub fn parent(&self, id: GroupId) -> Option<GroupId> {
        self.node(id).parent
    }

    pub fn children(&self, id: GroupId) -> &[GroupId] {
        &self.node(id).children
    }

    pub fn depth(&self, id: GroupId) -> usize {
        self.node(id).depth
    }

    /// All groups, parents before children, siblings in declaration order.
    pub fn preorder(&self) -> &[GroupId] {
        &self.preorder
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: GroupId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Whether `ancestor` lies on the path from `id` to the root (inclusive).
    pub fn is_within(&self, id: GroupId, ancestor: GroupId) -> bool {
        id == ancestor || self.ancestors(id).any(|candidate| candidate == ancestor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldGroupNode> {
        self.nodes.iter()
    }

    fn resolve_depths(&mut self) -> Result<(), ConfigError> {
        let limit = self.nodes.len();
        for idx in 0..self.nodes.len() {
            let mut depth = 1;
            let mut cursor = self.nodes[idx].parent;
            while let Some(parent) = cursor {
                depth += 1;
                if depth > limit {
                    return Err(ConfigError::Cycle {
                        group: self.nodes[idx].name.clone(),
                    });
                }
                cursor = self.nodes[parent.0].parent;
            }
            self.nodes[idx].depth = depth;
        }
        Ok(())
    }

    fn collect_preorder(&self) -> Vec<GroupId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    fn check_prefixes(&self) -> Result<(), ConfigError> {
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for node in self.nodes.iter().filter(|node| !node.is_root()) {
            if let Some(first) = seen.insert(&node.prefix, &node.name) {
                return Err(ConfigError::DuplicatePrefix {
                    prefix: node.prefix.clone(),
                    first: first.to_string(),
                    second: node.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Iterator over the parent chain of a field group.
pub struct Ancestors<'a> {
    tree: &'a FieldGroupTree,
    next: Option<GroupId>,
}

impl Iterator for Ancestors<'_> {
    type Item = GroupId;

    fn next(&mut self) -> Option<GroupId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

fn resolve_node(
    id: GroupId,
    parent: Option<GroupId>,
    config: FieldGroupConfig,
) -> Result<FieldGroupNode, ConfigError> {
    let id_key = config.id_key.trim().to_string();
    if id_key.is_empty() {
        return Err(ConfigError::MissingIdKey { group: config.name });
    }
    if !config.columns.iter().any(|column| column == &id_key) {
        return Err(ConfigError::MissingIdColumn {
            group: config.name,
            id_key,
        });
    }
    if config.excluded.iter().any(|field| field == &id_key) {
        return Err(ConfigError::ExcludedIdKey {
            group: config.name,
            id_key,
        });
    }
    let key = config
        .key
        .unwrap_or_else(|| default_key(&config.name).to_string());
    let prefix = config.prefix.unwrap_or_else(|| key.clone());
    Ok(FieldGroupNode {
        id,
        name: config.name,
        key,
        prefix,
        parent,
        children: Vec::new(),
        depth: 0,
        id_key,
        columns: config.columns,
        excluded: config.excluded.into_iter().collect(),
        descriptions: config.descriptions,
    })
}

fn default_key(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<FieldGroupConfig> {
        vec![
            FieldGroupConfig::new("cases", "case_id"),
            FieldGroupConfig::new("cases.diagnoses", "diagnosis_id").with_parent("cases"),
            FieldGroupConfig::new("cases.diagnoses.treatments", "treatment_id")
                .with_parent("cases.diagnoses"),
            FieldGroupConfig::new("cases.demographic", "demographic_id").with_parent("cases"),
        ]
    }

    #[test]
    fn builds_depths_and_preorder() {
        let tree = FieldGroupTree::new(sample()).expect("tree");
        let names: Vec<&str> = tree.preorder().iter().map(|id| tree.name(*id)).collect();
        assert_eq!(
            names,
            vec![
                "cases",
                "cases.diagnoses",
                "cases.diagnoses.treatments",
                "cases.demographic"
            ]
        );
        let treatments = tree.lookup("cases.diagnoses.treatments").expect("treatments");
        assert_eq!(tree.depth(treatments), 3);
        assert_eq!(tree.node(treatments).key, "treatments");
        assert_eq!(tree.ancestors(treatments).count(), 2);
    }

    #[test]
    fn rejects_unknown_parent() {
        let configs = vec![
            FieldGroupConfig::new("cases", "case_id"),
            FieldGroupConfig::new("cases.samples", "sample_id").with_parent("case"),
        ];
        let err = FieldGroupTree::new(configs).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParent { .. }));
    }

    #[test]
    fn rejects_cycles() {
        let configs = vec![
            FieldGroupConfig::new("cases", "case_id"),
            FieldGroupConfig::new("a", "a_id").with_parent("b"),
            FieldGroupConfig::new("b", "b_id").with_parent("a"),
        ];
        let err = FieldGroupTree::new(configs).unwrap_err();
        assert!(matches!(err, ConfigError::Cycle { .. }));
    }
}
