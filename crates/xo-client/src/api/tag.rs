use std::collections::BTreeSet;

use serde_json::json;
use tracing::debug;

use crate::client::XoClient;
use crate::error::ClientResult;

impl XoClient {
    /// Attach `tag` to object `id`.
    pub async fn add_tag(&self, id: &str, tag: &str) -> ClientResult<()> {
        self.invoke("tag.add", json!({ "id": id, "tag": tag })).await
    }

    /// Detach `tag` from object `id`.
    pub async fn remove_tag(&self, id: &str, tag: &str) -> ClientResult<()> {
        self.invoke("tag.remove", json!({ "id": id, "tag": tag })).await
    }

    /// Make the tags on `id` equal `desired`, given the `current` ones.
    ///
    /// Removals are issued before additions; unchanged tags are not touched.
    pub async fn sync_tags(&self, id: &str, current: &[String], desired: &[String]) -> ClientResult<()> {
        let current: BTreeSet<&str> = current.iter().map(String::as_str).collect();
        let desired: BTreeSet<&str> = desired.iter().map(String::as_str).collect();

        for tag in current.difference(&desired) {
            debug!(id, tag, "removing tag");
            self.remove_tag(id, tag).await?;
        }
        for tag in desired.difference(&current) {
            debug!(id, tag, "adding tag");
            self.add_tag(id, tag).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::mock_client;
    use serde_json::json;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_sync_tags_issues_only_the_difference() {
        let (client, mock) = mock_client(|_, _| Ok(json!(true)));

        client
            .sync_tags("vm-1", &tags(&["a", "b", "old"]), &tags(&["a", "b", "new", "new"]))
            .await
            .expect("synced");

        assert_eq!(
            mock.calls(),
            vec![
                ("tag.remove".to_string(), json!({"id": "vm-1", "tag": "old"})),
                ("tag.add".to_string(), json!({"id": "vm-1", "tag": "new"})),
            ]
        );
    }

    #[tokio::test]
    async fn test_sync_tags_noop() {
        let (client, mock) = mock_client(|_, _| Ok(json!(true)));
        client
            .sync_tags("vm-1", &tags(&["a"]), &tags(&["a"]))
            .await
            .expect("synced");
        assert!(mock.calls().is_empty());
    }
}
