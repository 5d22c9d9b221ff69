//! Tether Hub - Owns the authoritative store and keeps proxies in sync
//!
//! The hub side of a tether connection. It wraps any [`Store`](tether_core::Store)
//! and serves proxies over a [`Transport`](tether_core::Transport).
//!
//! ## Architecture
//!
//! ```text
//! Hub (owns the store)
//!  │
//!  ├── DispatchProxy ── DISPATCH ──▶ Store::dispatch ──▶ Responder
//!  │
//!  └── Channel[] (one per connected port)
//!       └── Binding[] ── selector(state) ── diff ──▶ STATE / PATCH_STATE
//! ```
//!
//! ## Key Components
//!
//! - [`Hub`]: Connection lifecycle manager, built by [`wrap_store`]
//! - [`HubConfig`]: Validated port name, codec, responder and selectors
//! - [`SelectorRegistry`]: Named projections from state to views
//! - [`Responder`]: Strategy for answering dispatches
//!
//! ## Guarantees
//!
//! 1. **Snapshot first** - a channel receives `STATE` for every bound key
//!    before any `PATCH_STATE`
//! 2. **Patches are relative to what was sent** - a failed send leaves the
//!    channel's cached view untouched
//! 3. **Errors stay local** - a failing dispatch is answered with an error
//!    response; the hub keeps running

mod channel;
mod config;
mod dispatch;
mod error;
mod hub;
mod selector;

pub use channel::ChannelState;
pub use config::{HubConfig, HubConfigBuilder};
pub use dispatch::{send_response, DefaultResponder, Responder, SENDER_FIELD};
pub use error::{Error, Result};
pub use hub::{wrap_store, Hub};
pub use selector::{identity, Selector, SelectorRegistry};
