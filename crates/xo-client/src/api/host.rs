use xo_proto::object::optional_eq;
use xo_proto::{Host, XoObject};

use crate::client::XoClient;
use crate::error::{ClientResult, NotFoundError};
use crate::sort::{sort_by_field, SortOrder};

impl XoClient {
    /// Hosts in `pool` (all pools when empty), ordered by `field`.
    ///
    /// An unknown `field` keeps the server's order.
    pub async fn get_sorted_hosts(
        &self,
        pool: &str,
        field: &str,
        order: SortOrder,
    ) -> ClientResult<Vec<Host>> {
        let hosts: Vec<Host> = self
            .get_all::<Host>()
            .await?
            .into_iter()
            .filter(|host| optional_eq(pool, &host.pool_id))
            .collect();

        if hosts.is_empty() {
            let query = Host {
                pool_id: pool.to_string(),
                ..Host::default()
            };
            return Err(NotFoundError {
                kind: Host::KIND,
                query: query.describe(),
            }
            .into());
        }
        Ok(sort_by_field(hosts, field, order))
    }
}
