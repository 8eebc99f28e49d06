use serde::Serialize;
use serde_json::json;
use xo_proto::User;

use crate::client::XoClient;
use crate::error::ClientResult;

/// Parameters for `user.create`.
#[derive(Clone, PartialEq, Eq, Default, Serialize)]
pub struct UserSpec {
    /// Login.
    pub email: String,
    /// Initial password.
    pub password: String,
    /// `none`, `read`, `write` or `admin`; the server default when empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub permission: String,
}

impl std::fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSpec")
            .field("email", &self.email)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

impl XoClient {
    /// Create a user.
    pub async fn create_user(&self, spec: &UserSpec) -> ClientResult<User> {
        let id: String = self.call("user.create", spec).await?;
        Ok(User {
            id,
            email: spec.email.clone(),
            permission: spec.permission.clone(),
            groups: Vec::new(),
        })
    }

    /// Delete a user.
    pub async fn delete_user(&self, id: &str) -> ClientResult<()> {
        self.invoke("user.delete", json!({ "id": id })).await
    }
}
