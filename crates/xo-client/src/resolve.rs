//! Object lookup by partial specification.
//!
//! Every lookup fetches a fresh snapshot of the whole kind and filters it
//! locally with [`XoObject::matches`]. Nothing is cached between calls.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::debug;
use xo_proto::{Snapshot, XoObject};

use crate::client::XoClient;
use crate::error::{ClientError, ClientResult, NotFoundError};

impl XoClient {
    /// Every object of kind `T`, unfiltered.
    ///
    /// # Errors
    ///
    /// Returns the RPC or decode error of the snapshot call.
    pub async fn get_all<T: XoObject>(&self) -> ClientResult<Vec<T>> {
        let objects: Vec<T> = match T::KIND.snapshot() {
            Snapshot::AllObjects { xo_type } => {
                let by_id: BTreeMap<String, T> = self
                    .call("xo.getAllObjects", json!({ "filter": { "type": xo_type } }))
                    .await?;
                by_id.into_values().collect()
            }
            Snapshot::GetAll { method } => self.call(method, ()).await?,
        };
        debug!(kind = %T::KIND, count = objects.len(), "fetched snapshot");
        Ok(objects)
    }

    /// Every object of kind `T` that `query` matches.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] when nothing matches; never an empty list.
    pub async fn find_objects<T: XoObject>(&self, query: &T) -> ClientResult<Vec<T>> {
        let matches: Vec<T> = self
            .get_all::<T>()
            .await?
            .into_iter()
            .filter(|candidate| query.matches(candidate))
            .collect();

        if matches.is_empty() {
            return Err(NotFoundError {
                kind: T::KIND,
                query: query.describe(),
            }
            .into());
        }
        Ok(matches)
    }

    /// The single object `query` matches.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] for no match and
    /// [`ClientError::Ambiguous`] for more than one.
    pub async fn find_object<T: XoObject>(&self, query: &T) -> ClientResult<T> {
        let mut matches = self.find_objects(query).await?;
        let count = matches.len();
        match matches.pop() {
            Some(object) if count == 1 => Ok(object),
            _ => Err(ClientError::Ambiguous {
                kind: T::KIND,
                count,
                query: query.describe(),
            }),
        }
    }

    /// Like [`find_object`](Self::find_object), with "not found" as `None`.
    ///
    /// # Errors
    ///
    /// Returns every error except [`NotFoundError`].
    pub async fn lookup<T: XoObject>(&self, query: &T) -> ClientResult<Option<T>> {
        match self.find_object(query).await {
            Ok(object) => Ok(Some(object)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_client;
    use serde_json::Value;
    use xo_proto::{Network, ResourceSet, RpcError, Vm};

    fn networks() -> Value {
        json!({
            "net-1": {"id": "net-1", "name_label": "lan", "$poolId": "pool-a"},
            "net-2": {"id": "net-2", "name_label": "lan", "$poolId": "pool-b"},
            "net-3": {"id": "net-3", "name_label": "storage", "$poolId": "pool-a"}
        })
    }

    #[tokio::test]
    async fn test_find_network_by_name_and_pool() {
        let (client, mock) = mock_client(|method, params| {
            assert_eq!(method, "xo.getAllObjects");
            assert_eq!(params["filter"]["type"], "network");
            Ok(networks())
        });

        let query = Network {
            name_label: "lan".to_string(),
            pool_id: "pool-b".to_string(),
            ..Network::default()
        };
        let found = client.find_object(&query).await.expect("found");
        assert_eq!(found.id, "net-2");
        assert_eq!(mock.methods(), vec!["xo.getAllObjects"]);
    }

    #[tokio::test]
    async fn test_find_objects_returns_whole_match_set() {
        let (client, _mock) = mock_client(|_, _| Ok(networks()));
        let query = Network {
            name_label: "lan".to_string(),
            ..Network::default()
        };
        let found = client.find_objects(&query).await.expect("found");
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_more_than_one_match_is_ambiguous() {
        let (client, _mock) = mock_client(|_, _| Ok(networks()));
        let query = Network {
            name_label: "lan".to_string(),
            ..Network::default()
        };
        match client.find_object(&query).await {
            Err(ClientError::Ambiguous { count, .. }) => assert_eq!(count, 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_not_found() {
        let (client, _mock) = mock_client(|_, _| Ok(json!({})));
        let query = Vm {
            name_label: "web".to_string(),
            ..Vm::default()
        };

        let err = client.find_objects(&query).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            format!("Could not find Vm with query: {}", query.describe())
        );
        assert!(client.lookup(&query).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn test_xo_native_kinds_use_get_all() {
        let (client, mock) = mock_client(|method, _| match method {
            "resourceSet.getAll" => Ok(json!([
                {"id": "rs-1", "name": "team-a"},
                {"id": "rs-2", "name": "team-b"}
            ])),
            other => Err(RpcError::new(-32601, format!("unknown method {other}"))),
        });

        let query = ResourceSet {
            name: "team-b".to_string(),
            ..ResourceSet::default()
        };
        assert_eq!(client.find_object(&query).await.expect("found").id, "rs-2");
        assert_eq!(mock.methods(), vec!["resourceSet.getAll"]);
    }

    #[tokio::test]
    async fn test_rpc_errors_are_not_not_found() {
        let (client, _mock) = mock_client(|_, _| Err(RpcError::new(2, "not enough permissions")));
        let err = client.get_all::<Vm>().await.unwrap_err();
        assert!(matches!(err, ClientError::Rpc(_)));
        assert!(client.lookup(&Vm::default()).await.is_err());
    }
}
