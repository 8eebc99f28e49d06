use serde::Serialize;
use serde_json::json;
use tracing::debug;
use xo_proto::{Network, ObjectKind, XoObject};

use crate::client::XoClient;
use crate::error::{ClientResult, NotFoundError};
use crate::wait::{StateWait, PRESENT};

/// Parameters for `network.create`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NetworkSpec {
    /// Pool to create the network in.
    #[serde(rename = "pool")]
    pub pool_id: String,
    /// Display name.
    #[serde(rename = "name")]
    pub name_label: String,
    /// Description.
    #[serde(rename = "description", skip_serializing_if = "String::is_empty")]
    pub name_description: String,
    /// MTU; the server default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    /// PIF to build a VLAN on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pif: Option<String>,
    /// VLAN tag, with `pif`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
}

fn by_id(id: &str) -> Network {
    Network {
        id: id.to_string(),
        ..Network::default()
    }
}

impl XoClient {
    /// Create a network and wait until it is visible.
    pub async fn create_network(&self, spec: &NetworkSpec) -> ClientResult<Network> {
        let id: String = self.call("network.create", spec).await?;
        debug!(id = %id, name = %spec.name_label, "network created");

        let query = by_id(&id);
        StateWait::appear()
            .run(|| self.lookup(&query), |_: &Network| PRESENT.to_string())
            .await?
            .ok_or_else(|| {
                NotFoundError {
                    kind: ObjectKind::Network,
                    query: query.describe(),
                }
                .into()
            })
    }

    /// Delete a network and wait until it is gone.
    pub async fn delete_network(&self, id: &str) -> ClientResult<()> {
        self.invoke("network.delete", json!({ "id": id })).await?;

        let query = by_id(id);
        StateWait::disappear()
            .run(|| self.lookup(&query), |_: &Network| PRESENT.to_string())
            .await?;
        Ok(())
    }
}
