//! Storage repositories, VDIs and VBDs.

use serde::{Deserialize, Serialize};

use crate::object::{is_default, optional_eq, same_id, tags_subset, ObjectKind, XoObject};

/// A storage repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageRepository {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_label: String,
    /// Owning pool.
    #[serde(default, rename = "$poolId", skip_serializing_if = "String::is_empty")]
    pub pool_id: String,
    /// Host for a local SR, pool for a shared one.
    #[serde(default, rename = "$container", skip_serializing_if = "String::is_empty")]
    pub container: String,
    /// Driver type, e.g. `lvm`, `nfs`, `ext`.
    #[serde(default, rename = "SR_type", skip_serializing_if = "String::is_empty")]
    pub sr_type: String,
    /// Capacity in bytes.
    #[serde(default, skip_serializing_if = "is_default")]
    pub size: u64,
    /// Allocated bytes.
    #[serde(default, skip_serializing_if = "is_default")]
    pub physical_usage: u64,
    /// Shared across the pool.
    #[serde(default, skip_serializing_if = "is_default")]
    pub shared: bool,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl XoObject for StorageRepository {
    const KIND: ObjectKind = ObjectKind::StorageRepository;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        if same_id(&self.id, &candidate.id) {
            return true;
        }
        if same_id(&self.name_label, &candidate.name_label)
            && optional_eq(&self.pool_id, &candidate.pool_id)
        {
            return true;
        }
        tags_subset(&self.tags, &candidate.tags)
    }
}

/// A virtual disk image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vdi {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_label: String,
    /// Description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name_description: String,
    /// Repository holding the image.
    #[serde(default, rename = "$SR", skip_serializing_if = "String::is_empty")]
    pub sr_id: String,
    /// Owning pool.
    #[serde(default, rename = "$poolId", skip_serializing_if = "String::is_empty")]
    pub pool_id: String,
    /// Virtual size in bytes.
    #[serde(default, skip_serializing_if = "is_default")]
    pub size: u64,
    /// Attachments of this image.
    #[serde(default, rename = "$VBDs", skip_serializing_if = "Vec::is_empty")]
    pub vbds: Vec<String>,
}

impl XoObject for Vdi {
    const KIND: ObjectKind = ObjectKind::Vdi;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        same_id(&self.id, &candidate.id)
            || (same_id(&self.name_label, &candidate.name_label)
                && optional_eq(&self.pool_id, &candidate.pool_id))
    }
}

/// A virtual block device: one VM's attachment of one VDI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vbd {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Attached VM.
    #[serde(default, rename = "VM", skip_serializing_if = "String::is_empty")]
    pub vm_id: String,
    /// Attached image; empty for an empty CD drive.
    #[serde(default, rename = "VDI", skip_serializing_if = "String::is_empty")]
    pub vdi_id: String,
    /// Currently plugged.
    #[serde(default, skip_serializing_if = "is_default")]
    pub attached: bool,
    /// Bootable device.
    #[serde(default, skip_serializing_if = "is_default")]
    pub bootable: bool,
    /// CD drive rather than a disk.
    #[serde(default, skip_serializing_if = "is_default")]
    pub is_cd_drive: bool,
    /// Device position, e.g. `0`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub position: String,
    /// Read-only attachment.
    #[serde(default, skip_serializing_if = "is_default")]
    pub read_only: bool,
}

impl XoObject for Vbd {
    const KIND: ObjectKind = ObjectKind::Vbd;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        same_id(&self.id, &candidate.id)
            || (same_id(&self.vm_id, &candidate.vm_id) && same_id(&self.vdi_id, &candidate.vdi_id))
    }
}

/// A VM disk: the block device together with the image it attaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// The attachment.
    pub vbd: Vbd,
    /// The image.
    pub vdi: Vdi,
}
