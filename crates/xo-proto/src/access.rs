//! XO-native objects: users, ACLs, resource sets and tag associations.
//!
//! These are not XAPI objects; each is fetched with its own `*.getAll` call.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::{same_id, ObjectKind, XoObject};

/// An XO user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Login.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    /// `none`, `read`, `write` or `admin`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub permission: String,
    /// Group ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl XoObject for User {
    const KIND: ObjectKind = ObjectKind::User;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        same_id(&self.id, &candidate.id) || same_id(&self.email, &candidate.email)
    }
}

/// An access control entry granting `action` on `object` to `subject`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Acl {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// User or group id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    /// Target object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub object: String,
    /// Role, e.g. `viewer`, `operator`, `admin`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,
}

impl XoObject for Acl {
    const KIND: ObjectKind = ObjectKind::Acl;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        same_id(&self.id, &candidate.id)
            || (same_id(&self.subject, &candidate.subject)
                && same_id(&self.object, &candidate.object)
                && same_id(&self.action, &candidate.action))
    }
}

/// Resource kinds a resource set can limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LimitKind {
    /// vCPUs.
    Cpus,
    /// Memory, in bytes.
    Memory,
    /// Disk, in bytes.
    Disk,
}

impl LimitKind {
    /// Key used in the `limits` map.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpus => "cpus",
            Self::Memory => "memory",
            Self::Disk => "disk",
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota for one limit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceLimit {
    /// Not yet consumed.
    #[serde(default)]
    pub available: u64,
    /// Granted.
    #[serde(default)]
    pub total: u64,
}

/// A resource set: a quota-bearing group of objects delegated to subjects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// User and group ids allowed to use the set.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub subjects: BTreeSet<String>,
    /// Templates, SRs and networks usable through the set.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub objects: BTreeSet<String>,
    /// Quotas keyed by limit kind (`cpus`, `memory`, `disk`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, ResourceLimit>,
}

impl ResourceSet {
    /// The quota for `kind`, if one is set.
    #[must_use]
    pub fn limit(&self, kind: LimitKind) -> Option<&ResourceLimit> {
        self.limits.get(kind.as_str())
    }
}

impl XoObject for ResourceSet {
    const KIND: ObjectKind = ObjectKind::ResourceSet;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        same_id(&self.id, &candidate.id) || same_id(&self.name, &candidate.name)
    }
}
