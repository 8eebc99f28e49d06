//! # xo-proto
//!
//! Wire types and domain objects for the Xen Orchestra JSON-RPC API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod compute;
pub mod error;
pub mod network;
pub mod object;
pub mod rpc;
pub mod storage;

pub use access::{Acl, LimitKind, ResourceLimit, ResourceSet, User};
pub use compute::{Host, HostCpus, HostMemory, Pool, PowerState, Template, Vm, VmCpus, VmMemory};
pub use error::ProtoError;
pub use network::{Network, Pif};
pub use object::{ObjectKind, Snapshot, XoObject};
pub use rpc::{Params, Request, Response, RpcError, JSONRPC_VERSION};
pub use storage::{Disk, StorageRepository, Vbd, Vdi};
