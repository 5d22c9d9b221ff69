//! Tether Core - Shared building blocks for hub/proxy state synchronization
//!
//! This crate provides everything both sides of a tether connection agree on:
//! - Dynamic value types (`Value`, `ValueMap`)
//! - The shallow diff engine (`diff`, `apply`, `Patch`)
//! - Wire messages (`Message`, `Response`) and the payload `Codec`
//! - Single-fire asynchronous results (`Deferred`, `Resolver`)
//! - The state container contract (`Store`) and a reducer-backed store
//! - Transport contracts and an in-memory transport
//! - RON-loadable options (`SyncOptions`)
//!
//! ## Data Flow
//!
//! ```text
//! proxy ──DISPATCH──▶ hub ──▶ Store::dispatch ──▶ listeners
//!   ▲                                                │
//!   │                                  selector → diff(previous, next)
//!   └──────────── STATE / PATCH_STATE ◀──────────────┘
//! ```

mod codec;
mod deferred;
pub mod diff;
mod error;
mod message;
mod options;
mod store;
pub mod transport;
mod value;

pub use codec::{Codec, Transform};
pub use deferred::{deferred, Deferred, Resolver, Settled};
pub use diff::{apply, diff, Change, Patch};
pub use error::{DispatchError, Error, Result, TransportError};
pub use message::{
    is_dispatch_for, Message, Response, DISPATCH_TYPE, PATCH_STATE_TYPE, STATE_TYPE,
};
pub use options::{CodecKind, SyncOptions};
pub use store::{Listener, Listeners, Reducer, ReducerStore, Store, Subscription};
pub use transport::{Link, Port, PortId, Reply, Scope, SenderInfo, Transport, TransportListener};
pub use value::{Value, ValueMap};

/// Selector key used when a proxy does not ask for one
pub const DEFAULT_KEY: &str = "state";
