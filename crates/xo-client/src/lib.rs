//! # xo-client
//!
//! Client for the Xen Orchestra JSON-RPC API over websockets.
//!
//! Layers, bottom up:
//!
//! - [`transport`] turns a websocket into a byte stream and back.
//! - [`codec`] pulls complete JSON messages off that stream.
//! - [`rpc`] correlates requests and responses over one connection.
//! - [`XoClient`] signs in and optionally reconnects with backoff.
//! - [`resolve`] finds objects by partial specification; [`wait`] polls
//!   for eventually consistent state changes.
//!
//! ```no_run
//! use xo_client::{ClientConfig, XoClient};
//! use xo_proto::Network;
//!
//! # async fn example() -> xo_client::ClientResult<()> {
//! let config = ClientConfig::with_password("wss://xoa.example.com", "admin@admin.net", "admin")?;
//! let client = XoClient::connect(config).await?;
//!
//! let query = Network { name_label: "Pool-wide network".into(), ..Network::default() };
//! let network = client.find_object(&query).await?;
//! println!("{}", network.id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
pub mod backoff;
mod client;
pub mod codec;
pub mod config;
pub mod duration;
pub mod error;
pub mod resolve;
pub mod rpc;
pub mod sort;
pub mod state;
pub mod transport;
pub mod wait;

#[cfg(test)]
mod testing;

pub use api::{NetworkSpec, ResourceSetSpec, UserSpec};
pub use backoff::{retry_with_backoff, BackoffPolicy};
pub use client::XoClient;
pub use config::{ClientConfig, Credentials, RawConfig, RetryMode};
pub use duration::{parse_duration, ParseDurationError};
pub use error::{ClientError, ClientResult, ConfigError, NotFoundError, TransportError};
pub use rpc::RpcClient;
pub use sort::{sort_by_field, SortOrder};
pub use state::{AtomicClientState, ClientState};
pub use wait::{PollSchedule, StateWait, ABSENT, PRESENT};
