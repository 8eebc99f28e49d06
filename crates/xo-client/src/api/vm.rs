use std::time::Duration;

use serde_json::json;
use tracing::debug;
use xo_proto::{ObjectKind, PowerState, Vm, XoObject};

use crate::client::XoClient;
use crate::error::{ClientResult, NotFoundError};
use crate::wait::StateWait;

fn by_id(id: &str) -> Vm {
    Vm {
        id: id.to_string(),
        ..Vm::default()
    }
}

impl XoClient {
    /// Fetch one VM by id.
    pub async fn get_vm(&self, id: &str) -> ClientResult<Vm> {
        self.find_object(&by_id(id)).await
    }

    /// Boot a VM.
    pub async fn start_vm(&self, id: &str) -> ClientResult<()> {
        debug!(id, "starting vm");
        self.invoke("vm.start", json!({ "id": id })).await
    }

    /// Shut a VM down; `force` skips the clean guest shutdown.
    pub async fn stop_vm(&self, id: &str, force: bool) -> ClientResult<()> {
        debug!(id, force, "stopping vm");
        self.invoke("vm.stop", json!({ "id": id, "force": force })).await
    }

    /// Delete a VM.
    pub async fn delete_vm(&self, id: &str) -> ClientResult<()> {
        self.invoke("vm.delete", json!({ "id": id })).await
    }

    /// Poll until the VM reports `target`, returning its final state.
    ///
    /// Other power states are treated as in progress; a VM that disappears
    /// fails the wait.
    pub async fn wait_for_vm_power_state(
        &self,
        id: &str,
        target: PowerState,
        timeout: Duration,
    ) -> ClientResult<Vm> {
        let pending: Vec<&str> = PowerState::ALL
            .iter()
            .filter(|state| **state != target)
            .map(|state| state.as_str())
            .collect();
        let query = by_id(id);

        StateWait::new(&pending, &[target.as_str()])
            .timeout(timeout)
            .run(|| self.lookup(&query), |vm: &Vm| vm.power_state.as_str().to_string())
            .await?
            .ok_or_else(|| {
                NotFoundError {
                    kind: ObjectKind::Vm,
                    query: query.describe(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::ClientError;
    use crate::testing::mock_client;

    #[tokio::test]
    async fn test_start_and_stop_send_expected_params() {
        let (client, mock) = mock_client(|_, _| Ok(json!(true)));

        client.start_vm("vm-1").await.expect("start");
        client.stop_vm("vm-1", true).await.expect("stop");

        let calls = mock.calls();
        assert_eq!(calls[0].0, "vm.start");
        assert_eq!(calls[0].1, json!({"id": "vm-1"}));
        assert_eq!(calls[1].0, "vm.stop");
        assert_eq!(calls[1].1, json!({"id": "vm-1", "force": true}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_power_state_polls_until_running() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&polls);
        let (client, _mock) = mock_client(move |_, _| {
            let poll = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let state = if poll < 3 { "Halted" } else { "Running" };
            Ok(json!({"vm-1": {"id": "vm-1", "name_label": "web", "power_state": state}}))
        });

        let vm = client
            .wait_for_vm_power_state("vm-1", PowerState::Running, Duration::from_secs(60))
            .await
            .expect("running");
        assert_eq!(vm.power_state, PowerState::Running);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_vm_fails_the_wait() {
        let (client, _mock) = mock_client(|_, _| Ok(json!({})));
        let err = client
            .wait_for_vm_power_state("vm-1", PowerState::Running, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedState { ref state, .. } if state == "absent"));
    }
}
