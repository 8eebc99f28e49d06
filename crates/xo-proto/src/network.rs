//! Networks and physical interfaces.

use serde::{Deserialize, Serialize};

use crate::object::{is_default, optional_eq, same_id, ObjectKind, XoObject};

/// A network.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Network {
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
    /// Bridge device on each host.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bridge: String,
    /// MTU in bytes.
    #[serde(default, rename = "MTU", skip_serializing_if = "is_default")]
    pub mtu: u32,
    /// PIF ids backing this network.
    #[serde(default, rename = "PIFs", skip_serializing_if = "Vec::is_empty")]
    pub pifs: Vec<String>,
    /// Whether VIFs are locked by default.
    #[serde(default, rename = "defaultIsLocked", skip_serializing_if = "is_default")]
    pub default_is_locked: bool,
    /// Attached to new VMs automatically.
    #[serde(default, skip_serializing_if = "is_default")]
    pub automatic: bool,
}

impl XoObject for Network {
    const KIND: ObjectKind = ObjectKind::Network;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        if same_id(&self.id, &candidate.id) {
            return true;
        }
        same_id(&self.name_label, &candidate.name_label)
            && optional_eq(&self.pool_id, &candidate.pool_id)
    }
}

/// A physical interface on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pif {
    /// Object id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Device name, e.g. `eth0`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device: String,
    /// VLAN tag; `-1` for an untagged interface.
    #[serde(default = "untagged")]
    pub vlan: i64,
    /// Host the interface belongs to.
    #[serde(default, rename = "$host", skip_serializing_if = "String::is_empty")]
    pub host: String,
    /// Network the interface is plugged into.
    #[serde(default, rename = "$network", skip_serializing_if = "String::is_empty")]
    pub network: String,
    /// Owning pool.
    #[serde(default, rename = "$poolId", skip_serializing_if = "String::is_empty")]
    pub pool_id: String,
    /// Currently attached.
    #[serde(default, skip_serializing_if = "is_default")]
    pub attached: bool,
    /// Management interface of its host.
    #[serde(default, skip_serializing_if = "is_default")]
    pub management: bool,
    /// Master of a bond.
    #[serde(default, rename = "isBondMaster", skip_serializing_if = "is_default")]
    pub is_bond_master: bool,
}

const fn untagged() -> i64 {
    -1
}

impl Default for Pif {
    fn default() -> Self {
        Self {
            id: String::new(),
            device: String::new(),
            vlan: untagged(),
            host: String::new(),
            network: String::new(),
            pool_id: String::new(),
            attached: false,
            management: false,
            is_bond_master: false,
        }
    }
}

impl XoObject for Pif {
    const KIND: ObjectKind = ObjectKind::Pif;

    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, candidate: &Self) -> bool {
        if same_id(&self.id, &candidate.id) {
            return true;
        }
        self.vlan == candidate.vlan
            && same_id(&self.device, &candidate.device)
            && optional_eq(&self.host, &candidate.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn network(id: &str, name: &str, pool: &str) -> Network {
        Network {
            id: id.to_string(),
            name_label: name.to_string(),
            pool_id: pool.to_string(),
            ..Network::default()
        }
    }

    #[test_case(network("n1", "", ""), network("n1", "lan", "p1"), true ; "id wins")]
    #[test_case(network("n1", "wan", "p2"), network("n1", "lan", "p1"), true ; "id wins over mismatched fields")]
    #[test_case(network("", "lan", ""), network("n1", "lan", "p1"), true ; "name without pool")]
    #[test_case(network("", "lan", "p1"), network("n1", "lan", "p1"), true ; "name and pool")]
    #[test_case(network("", "lan", "p2"), network("n1", "lan", "p1"), false ; "name in another pool")]
    #[test_case(network("", "", "p1"), network("n1", "lan", "p1"), false ; "pool alone is not a key")]
    #[test_case(network("n2", "", ""), network("n1", "lan", "p1"), false ; "different id")]
    fn network_matching(query: Network, candidate: Network, expected: bool) {
        assert_eq!(query.matches(&candidate), expected);
    }

    #[test]
    fn test_network_decodes_xo_fields() {
        let raw = r#"{
            "id": "net-1",
            "type": "network",
            "name_label": "Pool-wide network associated with eth0",
            "$poolId": "pool-1",
            "bridge": "xenbr0",
            "MTU": 1500,
            "PIFs": ["pif-1", "pif-2"],
            "defaultIsLocked": false,
            "automatic": true
        }"#;
        let net: Network = serde_json::from_str(raw).expect("decode network");
        assert_eq!(net.pool_id, "pool-1");
        assert_eq!(net.mtu, 1500);
        assert_eq!(net.pifs.len(), 2);
        assert!(net.automatic);
    }

    #[test]
    fn test_pif_vlan_and_device() {
        let query = Pif {
            device: "eth1".to_string(),
            vlan: 100,
            ..Pif::default()
        };
        let candidate = Pif {
            id: "pif-9".to_string(),
            device: "eth1".to_string(),
            vlan: 100,
            host: "host-1".to_string(),
            ..Pif::default()
        };
        assert!(query.matches(&candidate));

        let other_vlan = Pif { vlan: 200, ..candidate.clone() };
        assert!(!query.matches(&other_vlan));

        let pinned = Pif { host: "host-2".to_string(), ..query };
        assert!(!pinned.matches(&candidate));
    }

    #[test]
    fn test_pif_missing_vlan_defaults_to_untagged() {
        let pif: Pif = serde_json::from_str(r#"{"id": "p", "device": "eth0"}"#).expect("decode pif");
        assert_eq!(pif.vlan, -1);
    }
}
