//! Typed operations on [`XoClient`](crate::XoClient).
//!
//! Each operation is one RPC, followed by a [`StateWait`](crate::StateWait)
//! where the result only becomes visible to later reads after a delay.

mod acl;
mod disk;
mod host;
mod network;
mod resource_set;
mod tag;
mod user;
mod vm;

pub use network::NetworkSpec;
pub use resource_set::ResourceSetSpec;
pub use user::UserSpec;
