//! Hub - Owns the store and serves every proxy connection
//!
//! The hub is built once per synchronization domain by [`Hub::wrap`]. It
//! registers itself with the transport and from then on is driven entirely
//! by transport events and store notifications:
//!
//! - **connect**: bind the port to its selectors, send the initial
//!   snapshots, subscribe the channel to the store
//! - **store change**: refresh every active channel, sending patches
//! - **message**: route `DISPATCH` requests into the store
//! - **disconnect**: unsubscribe and forget the channel
//!
//! Handlers run to completion one at a time on the caller's thread. The
//! hub tolerates re-entrant events (a dispatch triggered while a channel
//! is being refreshed) by deferring the nested refresh until the running
//! one finishes.

use crate::channel::{Channel, ChannelState};
use crate::config::HubConfig;
use crate::dispatch::DispatchProxy;
use crate::error::Result;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tether_core::{
    Port, PortId, Reply, Scope, SenderInfo, Store, Transport, TransportError, TransportListener,
    Value,
};
use tracing::{debug, trace, warn};

/// Channel slot in the channel table
///
/// Lifecycle state and keys are mirrored outside the `RefCell` so they stay
/// readable while the channel is refreshing.
struct ChannelCell {
    channel: RefCell<Channel>,
    state: Cell<ChannelState>,
    keys: Vec<String>,
    /// A refresh was requested while the channel was busy
    dirty: Cell<bool>,
    /// A disconnect arrived while the channel was busy
    closing: Cell<bool>,
}

impl ChannelCell {
    fn new(channel: Channel) -> Rc<Self> {
        Rc::new(Self {
            state: Cell::new(channel.state()),
            keys: channel.keys().map(str::to_string).collect(),
            channel: RefCell::new(channel),
            dirty: Cell::new(false),
            closing: Cell::new(false),
        })
    }

    fn close(&self, channel: &mut Channel) {
        channel.close();
        self.state.set(channel.state());
    }
}

struct HubInner<S> {
    me: Weak<HubInner<S>>,
    store: S,
    config: HubConfig,
    dispatcher: DispatchProxy,
    channels: RefCell<IndexMap<PortId, Rc<ChannelCell>>>,
}

/// Central coordinator that owns the store and its proxy channels
///
/// ```
/// use tether_core::transport::memory::{ConnectRequest, MemoryTransport};
/// use tether_core::{ReducerStore, Value};
/// use tether_hub::{Hub, HubConfig};
///
/// let transport = MemoryTransport::new();
/// let store = ReducerStore::new(Value::from_iter([("count", 0)]), |state, _| Ok(state.clone()));
/// let config = HubConfig::builder().port_name("app").build().unwrap();
/// let hub = Hub::wrap(store, config, &transport).unwrap();
///
/// let client = transport.connect(ConnectRequest::new("app"));
/// assert_eq!(hub.channel_count(), 1);
/// assert_eq!(client.drain().len(), 1); // initial STATE
/// ```
pub struct Hub<S: Store + 'static> {
    inner: Rc<HubInner<S>>,
}

impl<S: Store + 'static> Hub<S> {
    /// Wrap a store and start serving proxies on `transport`
    ///
    /// Listeners are attached for internal and external connections. A
    /// transport without external events is accepted with a warning; any
    /// other listener failure is an error.
    pub fn wrap<T: Transport + ?Sized>(store: S, config: HubConfig, transport: &T) -> Result<Self> {
        let dispatcher = DispatchProxy::new(
            config.port_name().to_string(),
            config.codec().clone(),
            config.responder(),
        );
        let inner = Rc::new_cyclic(|me| HubInner {
            me: me.clone(),
            store,
            config,
            dispatcher,
            channels: RefCell::new(IndexMap::new()),
        });

        let listener: Rc<dyn TransportListener> = inner.clone();
        transport.listen(Scope::Internal, listener.clone())?;
        match transport.listen(Scope::External, listener) {
            Ok(()) => {}
            Err(TransportError::Unsupported(scope)) => {
                warn!(%scope, "transport lacks this event scope, serving internal connections only");
            }
            Err(err) => return Err(err.into()),
        }

        debug!(port_name = inner.config.port_name(), "hub ready");
        Ok(Self { inner })
    }

    /// The wrapped store
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// The hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Number of open channels
    pub fn channel_count(&self) -> usize {
        self.inner.channels.borrow().len()
    }

    /// Ids of open channels, in connection order
    pub fn channel_ids(&self) -> Vec<PortId> {
        self.inner.channels.borrow().keys().copied().collect()
    }

    /// Lifecycle state of a channel, if it is still tracked
    pub fn channel_state(&self, id: PortId) -> Option<ChannelState> {
        self.inner.channels.borrow().get(&id).map(|cell| cell.state.get())
    }

    /// Selector keys a channel is bound to
    pub fn channel_keys(&self, id: PortId) -> Vec<String> {
        self.inner
            .channels
            .borrow()
            .get(&id)
            .map(|cell| cell.keys.clone())
            .unwrap_or_default()
    }
}

/// Wrap `store` and serve proxies on `transport`
///
/// Shorthand for [`Hub::wrap`].
pub fn wrap_store<S, T>(store: S, config: HubConfig, transport: &T) -> Result<Hub<S>>
where
    S: Store + 'static,
    T: Transport + ?Sized,
{
    Hub::wrap(store, config, transport)
}

impl<S: Store + 'static> HubInner<S> {
    /// Refresh one channel against the current state
    fn refresh(&self, id: PortId) {
        let Some(cell) = self.channels.borrow().get(&id).cloned() else {
            return;
        };
        cell.dirty.set(true);
        let Ok(mut channel) = cell.channel.try_borrow_mut() else {
            trace!(port = id, "channel busy, refresh deferred");
            return;
        };
        while cell.dirty.replace(false) {
            let state = self.store.state();
            channel.refresh(&state, self.config.codec());
        }
        if cell.closing.get() {
            cell.close(&mut channel);
        }
    }
}

impl<S: Store + 'static> TransportListener for HubInner<S> {
    fn connected(&self, port: Rc<dyn Port>) {
        if port.name() != self.config.port_name() {
            trace!(name = port.name(), "ignoring connection for another port");
            return;
        }

        let id = port.id();
        let mut channel = Channel::open(port, self.config.selectors(), &self.store.state());
        if let Err(err) = channel.activate(self.config.codec()) {
            debug!(port = id, error = %err, "initial snapshot not delivered");
            channel.close();
            return;
        }

        let me = self.me.clone();
        channel.attach(self.store.subscribe(Rc::new(move || {
            if let Some(hub) = me.upgrade() {
                hub.refresh(id);
            }
        })));
        self.channels.borrow_mut().insert(id, ChannelCell::new(channel));
    }

    fn disconnected(&self, port: PortId) {
        let Some(cell) = self.channels.borrow_mut().shift_remove(&port) else {
            return;
        };
        match cell.channel.try_borrow_mut() {
            Ok(mut channel) => cell.close(&mut channel),
            // Busy refreshing; the running refresh closes it on the way out
            Err(_) => cell.closing.set(true),
        };
    }

    fn message(&self, message: Value, sender: SenderInfo, reply: Reply) {
        self.dispatcher.handle(&self.store, &message, &sender, reply);
    }
}
