//! Binding records as delivered by the ingestion layer.
//!
//! Every field is optional on the wire: a record is validated by the
//! [`GraphBuilder`](crate::builder::GraphBuilder), not by deserialization, so
//! one bad record never rejects a whole snapshot.

use serde::{Deserialize, Serialize};

/// A subject granted permissions by a binding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub api_group: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Subject {
    /// Create a fully populated subject.
    pub fn new(kind: &str, api_group: &str, name: &str) -> Self {
        Self {
            kind: Some(kind.to_owned()),
            api_group: Some(api_group.to_owned()),
            name: Some(name.to_owned()),
        }
    }
}

/// The role a binding grants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub api_group: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RoleRef {
    /// Create a fully populated role reference.
    pub fn new(kind: &str, api_group: &str, name: &str) -> Self {
        Self {
            kind: Some(kind.to_owned()),
            api_group: Some(api_group.to_owned()),
            name: Some(name.to_owned()),
        }
    }
}

/// One RoleBinding or ClusterRoleBinding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub subjects: Option<Vec<Subject>>,
    #[serde(default)]
    pub role_ref: Option<RoleRef>,
    /// Raw manifest text for display; never interpreted.
    #[serde(default, alias = "details")]
    pub raw: Option<String>,
}

impl BindingRecord {
    /// Create a record with the required fields set.
    pub fn new(name: &str, kind: &str, subjects: Vec<Subject>, role_ref: Option<RoleRef>) -> Self {
        Self {
            id: None,
            name: Some(name.to_owned()),
            kind: Some(kind.to_owned()),
            subjects: Some(subjects),
            role_ref,
            raw: None,
        }
    }
}

/// Returns the value when present and non-empty.
///
/// The ingestion layer serializes absent strings as `""`, so empty counts as
/// missing.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
