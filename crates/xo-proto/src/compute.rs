//! Hosts, pools, VMs and templates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::{is_default, optional_eq, same_id, tags_subset, ObjectKind, XoObject};

/// VM power state as reported by XAPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PowerState {
    /// Running.
    Running,
    /// Shut down.
    #[default]
    Halted,
    /// Paused.
    Paused,
    /// Suspended to disk.
    Suspended,
}

impl PowerState {
    /// Every power state.
    pub const ALL: [Self; 4] = [Self::Running, Self::Halted, Self::Paused, Self::Suspended];

    /// The string XAPI uses for this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Halted => "Halted",
            Self::Paused => "Paused",
            Self::Suspended => "Suspended",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU counts of a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VmCpus {
    /// Hot-plug ceiling.
    #[serde(default)]
    pub max: u32,
    /// Currently assigned vCPUs.
    #[serde(default)]
    pub number: u32,
}

/// Memory bounds of a VM, in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VmMemory {
    /// Dynamic `[min, max]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dynamic: Vec<u64>,
    /// Static `[min, max]`.
    #[serde(default, rename = "static", skip_serializing_if = "Vec::is_empty")]
    pub static_range: Vec<u64>,
    /// Current size.
    #[serde(default)]
    pub size: u64,
}

/// A virtual machine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vm {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_label: String,
    /// Description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_description: String,
    /// Current power state.
    #[serde(default, skip_serializing_if = "is_default")]
    pub power_state: PowerState,
    /// Pool the VM lives in.
    #[serde(default, rename = "$pool", skip_serializing_if = "String::is_empty")]
    pub pool_id: String,
    /// Host (when running) or pool containing the VM.
    #[serde(default, rename = "$container", skip_serializing_if = "String::is_empty")]
    pub container: String,
    /// vCPU configuration.
    #[serde(default, rename = "CPUs", skip_serializing_if = "is_default")]
    pub cpus: VmCpus,
    /// Memory configuration.
    #[serde(default, skip_serializing_if = "is_default")]
    pub memory: VmMemory,
    /// Attached VIF ids.
    #[serde(default, rename = "VIFs", skip_serializing_if = "Vec::is_empty")]
    pub vifs: Vec<String>,
    /// Attached VBD ids.
    #[serde(default, rename = "$VBDs", skip_serializing_if = "Vec::is_empty")]
    pub vbds: Vec<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Guest addresses reported by the agent, keyed by device path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub addresses: BTreeMap<String, String>,
    /// Resource set the VM is accounted to.
    #[serde(default, rename = "resourceSet", skip_serializing_if = "Option::is_none")]
    pub resource_set: Option<String>,
    /// `hvm` or `pv`.
    #[serde(default, rename = "virtualizationMode", skip_serializing_if = "String::is_empty")]
    pub virtualization_mode: String,
    /// Start on host boot.
    #[serde(default, skip_serializing_if = "is_default")]
    pub auto_poweron: bool,
}

impl XoObject for Vm {
    const KIND: ObjectKind = ObjectKind::Vm;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        if same_id(&self.id, &candidate.id) {
            return true;
        }
        if same_id(&self.name_label, &candidate.name_label) {
            return true;
        }
        tags_subset(&self.tags, &candidate.tags)
    }
}

/// Host CPU topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostCpus {
    /// Physical cores.
    #[serde(default)]
    pub cores: u32,
    /// Sockets.
    #[serde(default)]
    pub sockets: u32,
}

/// Host memory usage, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostMemory {
    /// Used.
    #[serde(default)]
    pub usage: u64,
    /// Total.
    #[serde(default)]
    pub size: u64,
}

/// A physical host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Host {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_label: String,
    /// Description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_description: String,
    /// Owning pool.
    #[serde(default, rename = "$poolId", skip_serializing_if = "String::is_empty")]
    pub pool_id: String,
    /// Management address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    /// `Running` or `Halted`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub power_state: String,
    /// CPU topology.
    #[serde(default, skip_serializing_if = "is_default")]
    pub cpus: HostCpus,
    /// Memory usage.
    #[serde(default, skip_serializing_if = "is_default")]
    pub memory: HostMemory,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl XoObject for Host {
    const KIND: ObjectKind = ObjectKind::Host;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        same_id(&self.id, &candidate.id) || same_id(&self.name_label, &candidate.name_label)
    }
}

/// A resource pool.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pool {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_label: String,
    /// Description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_description: String,
    /// Master host id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub master: String,
    /// Default storage repository id.
    #[serde(default, rename = "default_SR", skip_serializing_if = "String::is_empty")]
    pub default_sr: String,
    /// Aggregate CPU topology.
    #[serde(default, skip_serializing_if = "is_default")]
    pub cpus: HostCpus,
}

impl XoObject for Pool {
    const KIND: ObjectKind = ObjectKind::Pool;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        same_id(&self.id, &candidate.id) || same_id(&self.name_label, &candidate.name_label)
    }
}

/// A VM template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Template {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_label: String,
    /// Description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_description: String,
    /// Owning pool.
    #[serde(default, rename = "$poolId", skip_serializing_if = "String::is_empty")]
    pub pool_id: String,
    /// Shipped with XenServer / XCP-ng rather than user-created.
    #[serde(default, rename = "isDefaultTemplate")]
    pub is_default_template: bool,
}

impl XoObject for Template {
    const KIND: ObjectKind = ObjectKind::Template;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        same_id(&self.id, &candidate.id)
            || (same_id(&self.name_label, &candidate.name_label)
                && optional_eq(&self.pool_id, &candidate.pool_id))
    }
}
