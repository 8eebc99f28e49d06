use serde_json::json;
use xo_proto::{Acl, ObjectKind, XoObject};

use crate::client::XoClient;
use crate::error::{ClientResult, NotFoundError};
use crate::wait::{StateWait, PRESENT};

impl XoClient {
    /// Grant `action` on `object` to `subject`, returning the stored entry.
    pub async fn create_acl(&self, subject: &str, object: &str, action: &str) -> ClientResult<Acl> {
        self.invoke(
            "acl.add",
            json!({ "subject": subject, "object": object, "action": action }),
        )
        .await?;

        let query = Acl {
            subject: subject.to_string(),
            object: object.to_string(),
            action: action.to_string(),
            ..Acl::default()
        };
        StateWait::appear()
            .run(|| self.lookup(&query), |_: &Acl| PRESENT.to_string())
            .await?
            .ok_or_else(|| {
                NotFoundError {
                    kind: ObjectKind::Acl,
                    query: query.describe(),
                }
                .into()
            })
    }

    /// Revoke an entry.
    pub async fn delete_acl(&self, acl: &Acl) -> ClientResult<()> {
        self.invoke(
            "acl.remove",
            json!({ "subject": acl.subject, "object": acl.object, "action": acl.action }),
        )
        .await
    }
}
