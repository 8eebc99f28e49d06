//! The closed set of object kinds and the comparison trait they share.
//!
//! Every domain object implements [`XoObject`]. A partially populated value
//! of the same type acts as a query: `query.matches(&candidate)` decides
//! whether the candidate satisfies it. Because `matches` takes `&Self`,
//! comparing a network query against a VM is rejected by the compiler.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Tag for every object variant the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    /// XAPI network.
    Network,
    /// Physical host.
    Host,
    /// Resource pool.
    Pool,
    /// Virtual machine.
    Vm,
    /// Virtual disk image.
    Vdi,
    /// Virtual block device (VM to VDI attachment).
    Vbd,
    /// Physical interface.
    Pif,
    /// XO access control entry.
    Acl,
    /// XO user.
    User,
    /// XO resource set.
    ResourceSet,
    /// VM template.
    Template,
    /// Storage repository.
    StorageRepository,
}

/// How the full snapshot for a kind is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    /// `xo.getAllObjects` filtered by XAPI type; the result is a map id → object.
    AllObjects {
        /// Value of the `type` filter.
        xo_type: &'static str,
    },
    /// A type-specific method returning an array.
    GetAll {
        /// Method name.
        method: &'static str,
    },
}

impl ObjectKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Network,
        Self::Host,
        Self::Pool,
        Self::Vm,
        Self::Vdi,
        Self::Vbd,
        Self::Pif,
        Self::Acl,
        Self::User,
        Self::ResourceSet,
        Self::Template,
        Self::StorageRepository,
    ];

    /// The RPC used to fetch every object of this kind.
    #[must_use]
    pub const fn snapshot(self) -> Snapshot {
        match self {
            Self::Network => Snapshot::AllObjects { xo_type: "network" },
            Self::Host => Snapshot::AllObjects { xo_type: "host" },
            Self::Pool => Snapshot::AllObjects { xo_type: "pool" },
            Self::Vm => Snapshot::AllObjects { xo_type: "VM" },
            Self::Vdi => Snapshot::AllObjects { xo_type: "VDI" },
            Self::Vbd => Snapshot::AllObjects { xo_type: "VBD" },
            Self::Pif => Snapshot::AllObjects { xo_type: "PIF" },
            Self::Template => Snapshot::AllObjects { xo_type: "VM-template" },
            Self::StorageRepository => Snapshot::AllObjects { xo_type: "SR" },
            Self::Acl => Snapshot::GetAll { method: "acl.getAll" },
            Self::User => Snapshot::GetAll { method: "user.getAll" },
            Self::ResourceSet => Snapshot::GetAll { method: "resourceSet.getAll" },
        }
    }

    /// Type name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Network => "Network",
            Self::Host => "Host",
            Self::Pool => "Pool",
            Self::Vm => "Vm",
            Self::Vdi => "VDI",
            Self::Vbd => "VBD",
            Self::Pif => "PIF",
            Self::Acl => "Acl",
            Self::User => "User",
            Self::ResourceSet => "ResourceSet",
            Self::Template => "Template",
            Self::StorageRepository => "StorageRepository",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A remotely managed object that can be looked up by partial specification.
pub trait XoObject: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// The kind tag for this type.
    const KIND: ObjectKind;

    /// Remote-assigned identifier. Empty on a query that does not filter by id.
    fn id(&self) -> &str;

    /// Whether `candidate` satisfies `self` used as a query.
    ///
    /// Precedence: equal non-empty ids, then the natural key, then (for
    /// tag-bearing kinds) a tag subset. The first rule that holds wins.
    fn matches(&self, candidate: &Self) -> bool;

    /// Render the query for diagnostics.
    fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Field left at its default; skipped when a query is serialized.
pub(crate) fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Equal and non-empty.
#[must_use]
pub fn same_id(query: &str, candidate: &str) -> bool {
    !query.is_empty() && query == candidate
}

/// An optional constraint: an empty query value accepts anything.
#[must_use]
pub fn optional_eq(query: &str, candidate: &str) -> bool {
    query.is_empty() || query == candidate
}

/// Every distinct query tag is present on the candidate.
///
/// A query without tags never matches through this rule. Duplicate query
/// tags count once.
#[must_use]
pub fn tags_subset(query: &[String], candidate: &[String]) -> bool {
    let wanted: BTreeSet<&str> = query.iter().map(String::as_str).collect();
    if wanted.is_empty() {
        return false;
    }

    let mut remaining = wanted.len();
    for tag in wanted {
        if candidate.iter().any(|c| c.as_str() == tag) {
            remaining -= 1;
        }
        if remaining == 0 {
            return true;
        }
    }
    false
}
