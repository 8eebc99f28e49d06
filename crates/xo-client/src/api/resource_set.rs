use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::json;
use tracing::debug;
use xo_proto::{LimitKind, ResourceSet};

use crate::client::XoClient;
use crate::error::ClientResult;

/// Desired contents of a resource set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResourceSetSpec {
    /// Display name.
    pub name: String,
    /// User and group ids.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub subjects: BTreeSet<String>,
    /// Template, SR and network ids.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub objects: BTreeSet<String>,
    /// Quota per limit kind (`cpus`, `memory`, `disk`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, u64>,
}

impl ResourceSetSpec {
    /// Set the quota for `kind`.
    #[must_use]
    pub fn limit(mut self, kind: LimitKind, quantity: u64) -> Self {
        self.limits.insert(kind.as_str().to_string(), quantity);
        self
    }
}

impl From<&ResourceSet> for ResourceSetSpec {
    fn from(set: &ResourceSet) -> Self {
        Self {
            name: set.name.clone(),
            subjects: set.subjects.clone(),
            objects: set.objects.clone(),
            limits: set
                .limits
                .iter()
                .map(|(kind, limit)| (kind.clone(), limit.total))
                .collect(),
        }
    }
}

impl XoClient {
    /// Create a resource set.
    pub async fn create_resource_set(&self, spec: &ResourceSetSpec) -> ClientResult<ResourceSet> {
        self.call("resourceSet.create", spec).await
    }

    /// Delete a resource set.
    pub async fn delete_resource_set(&self, id: &str) -> ClientResult<()> {
        self.invoke("resourceSet.delete", json!({ "id": id })).await
    }

    /// Allow a user or group to use the set.
    pub async fn add_resource_set_subject(&self, id: &str, subject: &str) -> ClientResult<()> {
        self.invoke("resourceSet.addSubject", json!({ "id": id, "subject": subject }))
            .await
    }

    /// Revoke a user or group.
    pub async fn remove_resource_set_subject(&self, id: &str, subject: &str) -> ClientResult<()> {
        self.invoke("resourceSet.removeSubject", json!({ "id": id, "subject": subject }))
            .await
    }

    /// Make an object usable through the set.
    pub async fn add_resource_set_object(&self, id: &str, object: &str) -> ClientResult<()> {
        self.invoke("resourceSet.addObject", json!({ "id": id, "object": object }))
            .await
    }

    /// Withdraw an object from the set.
    pub async fn remove_resource_set_object(&self, id: &str, object: &str) -> ClientResult<()> {
        self.invoke("resourceSet.removeObject", json!({ "id": id, "object": object }))
            .await
    }

    /// Set or replace the quota for `limit_id`.
    pub async fn add_resource_set_limit(&self, id: &str, limit_id: &str, quantity: u64) -> ClientResult<()> {
        self.invoke(
            "resourceSet.addLimit",
            json!({ "id": id, "limitId": limit_id, "quantity": quantity }),
        )
        .await
    }

    /// Drop the quota for `limit_id`.
    pub async fn remove_resource_set_limit(&self, id: &str, limit_id: &str) -> ClientResult<()> {
        self.invoke("resourceSet.removeLimit", json!({ "id": id, "limitId": limit_id }))
            .await
    }

    /// Move `current` to `desired` with incremental calls only.
    ///
    /// Returns the set as stored on the server afterwards.
    pub async fn update_resource_set(
        &self,
        current: &ResourceSet,
        desired: &ResourceSetSpec,
    ) -> ClientResult<ResourceSet> {
        let id = current.id.as_str();

        if current.name != desired.name {
            debug!(id, name = %desired.name, "renaming resource set");
            self.invoke("resourceSet.set", json!({ "id": id, "name": desired.name }))
                .await?;
        }

        for subject in current.subjects.difference(&desired.subjects) {
            self.remove_resource_set_subject(id, subject).await?;
        }
        for subject in desired.subjects.difference(&current.subjects) {
            self.add_resource_set_subject(id, subject).await?;
        }

        for object in current.objects.difference(&desired.objects) {
            self.remove_resource_set_object(id, object).await?;
        }
        for object in desired.objects.difference(&current.objects) {
            self.add_resource_set_object(id, object).await?;
        }

        for kind in current.limits.keys() {
            if !desired.limits.contains_key(kind) {
                self.remove_resource_set_limit(id, kind).await?;
            }
        }
        for (kind, quantity) in &desired.limits {
            let unchanged = current
                .limits
                .get(kind)
                .is_some_and(|limit| limit.total == *quantity);
            if !unchanged {
                self.add_resource_set_limit(id, kind, *quantity).await?;
            }
        }

        self.find_object(&ResourceSet {
            id: id.to_string(),
            ..ResourceSet::default()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_client;
    use xo_proto::ResourceLimit;

    fn set(subjects: &[&str], objects: &[&str], limits: &[(&str, u64)]) -> ResourceSet {
        ResourceSet {
            id: "rs-1".to_string(),
            name: "team".to_string(),
            subjects: subjects.iter().map(ToString::to_string).collect(),
            objects: objects.iter().map(ToString::to_string).collect(),
            limits: limits
                .iter()
                .map(|(k, total)| {
                    (
                        (*k).to_string(),
                        ResourceLimit {
                            available: *total,
                            total: *total,
                        },
                    )
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_sends_spec() {
        let (client, mock) = mock_client(|_, params| {
            Ok(json!({
                "id": "rs-1",
                "name": params["name"],
                "limits": {"cpus": {"available": 4, "total": 4}}
            }))
        });

        let spec = ResourceSetSpec {
            name: "team".to_string(),
            ..ResourceSetSpec::default()
        }
        .limit(LimitKind::Cpus, 4);
        let created = client.create_resource_set(&spec).await.expect("created");

        assert_eq!(created.limit(LimitKind::Cpus).map(|l| l.total), Some(4));
        assert_eq!(
            mock.calls()[0],
            (
                "resourceSet.create".to_string(),
                json!({"name": "team", "limits": {"cpus": 4}})
            )
        );
    }

    #[tokio::test]
    async fn test_update_issues_only_needed_calls() {
        let current = set(&["u1", "u2"], &["sr-1"], &[("cpus", 4), ("disk", 100)]);
        let desired = ResourceSetSpec::from(&set(&["u2", "u3"], &["sr-1"], &[("cpus", 8), ("disk", 100)]));
        let stored = serde_json::to_value(set(&["u2", "u3"], &["sr-1"], &[("cpus", 8), ("disk", 100)]))
            .expect("encode");

        let (client, mock) = mock_client(move |method, _| match method {
            "resourceSet.getAll" => Ok(json!([stored.clone()])),
            _ => Ok(json!(true)),
        });

        let updated = client
            .update_resource_set(&current, &desired)
            .await
            .expect("updated");
        assert_eq!(updated.limit(LimitKind::Cpus).map(|l| l.total), Some(8));

        assert_eq!(
            mock.calls(),
            vec![
                (
                    "resourceSet.removeSubject".to_string(),
                    json!({"id": "rs-1", "subject": "u1"})
                ),
                (
                    "resourceSet.addSubject".to_string(),
                    json!({"id": "rs-1", "subject": "u3"})
                ),
                (
                    "resourceSet.addLimit".to_string(),
                    json!({"id": "rs-1", "limitId": "cpus", "quantity": 8})
                ),
                ("resourceSet.getAll".to_string(), json!({})),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_removes_dropped_limits_and_renames() {
        let current = set(&[], &[], &[("memory", 1024)]);
        let desired = ResourceSetSpec {
            name: "renamed".to_string(),
            ..ResourceSetSpec::default()
        };
        let (client, mock) = mock_client(|method, _| match method {
            "resourceSet.getAll" => Ok(json!([{"id": "rs-1", "name": "renamed"}])),
            _ => Ok(json!(true)),
        });

        client
            .update_resource_set(&current, &desired)
            .await
            .expect("updated");
        assert_eq!(
            mock.methods(),
            vec!["resourceSet.set", "resourceSet.removeLimit", "resourceSet.getAll"]
        );
    }
}
