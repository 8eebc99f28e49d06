use std::collections::HashMap;

use tracing::warn;
use xo_proto::{Disk, Vbd, Vdi};

use crate::client::XoClient;
use crate::error::ClientResult;

impl XoClient {
    /// Disks attached to a VM, ordered by device position.
    ///
    /// CD drives and attachments whose image is not visible are skipped.
    pub async fn get_vm_disks(&self, vm_id: &str) -> ClientResult<Vec<Disk>> {
        let vbds: Vec<Vbd> = self
            .get_all::<Vbd>()
            .await?
            .into_iter()
            .filter(|vbd| vbd.vm_id == vm_id && !vbd.is_cd_drive && !vbd.vdi_id.is_empty())
            .collect();
        if vbds.is_empty() {
            return Ok(Vec::new());
        }

        let mut vdis: HashMap<String, Vdi> = self
            .get_all::<Vdi>()
            .await?
            .into_iter()
            .map(|vdi| (vdi.id.clone(), vdi))
            .collect();

        let mut disks: Vec<Disk> = vbds
            .into_iter()
            .filter_map(|vbd| match vdis.remove(&vbd.vdi_id) {
                Some(vdi) => Some(Disk { vbd, vdi }),
                None => {
                    warn!(vbd = %vbd.id, vdi = %vbd.vdi_id, "vbd references unknown vdi");
                    None
                }
            })
            .collect();
        disks.sort_by(|a, b| a.vbd.position.cmp(&b.vbd.position));
        Ok(disks)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::mock_client;
    use serde_json::json;

    #[tokio::test]
    async fn test_pairs_vbds_with_vdis() {
        let (client, _mock) = mock_client(|_, params| {
            Ok(match params["filter"]["type"].as_str() {
                Some("VBD") => json!({
                    "vbd-2": {"id": "vbd-2", "VM": "vm-1", "VDI": "vdi-2", "position": "1"},
                    "vbd-1": {"id": "vbd-1", "VM": "vm-1", "VDI": "vdi-1", "position": "0"},
                    "vbd-cd": {"id": "vbd-cd", "VM": "vm-1", "VDI": "iso", "is_cd_drive": true, "position": "3"},
                    "vbd-x": {"id": "vbd-x", "VM": "vm-2", "VDI": "vdi-9", "position": "0"}
                }),
                Some("VDI") => json!({
                    "vdi-1": {"id": "vdi-1", "name_label": "root", "size": 10},
                    "vdi-2": {"id": "vdi-2", "name_label": "data", "size": 20},
                    "vdi-9": {"id": "vdi-9", "name_label": "other"}
                }),
                _ => json!({}),
            })
        });

        let disks = client.get_vm_disks("vm-1").await.expect("disks");
        let names: Vec<_> = disks.iter().map(|d| d.vdi.name_label.as_str()).collect();
        assert_eq!(names, vec!["root", "data"]);
    }

    #[tokio::test]
    async fn test_vm_without_disks() {
        let (client, mock) = mock_client(|_, _| Ok(json!({})));
        assert!(client.get_vm_disks("vm-1").await.expect("disks").is_empty());
        assert_eq!(mock.methods().len(), 1);
    }
}
