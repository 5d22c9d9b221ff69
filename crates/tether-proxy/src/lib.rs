//! Tether Proxy - Cached state projection kept current by a hub
//!
//! A proxy holds one selector view of the hub's state. It is fed the
//! messages the hub posts on its port and forwards dispatches back:
//!
//! ```text
//! hub ── STATE ──────▶ ProxyStore::receive ── replace view, ready
//! hub ── PATCH_STATE ▶ ProxyStore::receive ── apply(view, patch)
//! hub ◀── DISPATCH ─── ProxyStore::dispatch ◀── Response settles Deferred
//! ```
//!
//! [`ProxyStore`] implements [`Store`](tether_core::Store), so code written
//! against the hub's store runs unchanged against a proxy.

mod config;
mod error;
mod store;

pub use config::{ProxyConfig, ProxyConfigBuilder};
pub use error::{Error, Result};
pub use store::ProxyStore;
