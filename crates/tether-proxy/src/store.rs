//! Proxy store
//!
//! A [`ProxyStore`] mirrors one selector view of the hub's state. It never
//! computes state itself: `STATE` replaces the cached view, `PATCH_STATE`
//! patches it, and dispatches travel to the hub over a [`Link`].

use crate::config::ProxyConfig;
use crate::error::Result;
use std::cell::{Cell, RefCell};
use std::fmt;
use tether_core::{
    apply, deferred, Deferred, DispatchError, Link, Listener, Listeners, Message, Response, Store,
    Subscription, Value, ValueMap, PATCH_STATE_TYPE, STATE_TYPE,
};
use tracing::{debug, trace, warn};

type ReadyCallback = Box<dyn FnOnce()>;

/// Cached projection of the hub's state
pub struct ProxyStore<L: Link> {
    link: L,
    config: ProxyConfig,
    view: RefCell<ValueMap>,
    ready: Cell<bool>,
    on_ready: RefCell<Vec<ReadyCallback>>,
    listeners: Listeners,
}

impl<L: Link> ProxyStore<L> {
    /// Create a proxy talking to the hub over `link`
    ///
    /// The view is empty and the proxy not ready until the first `STATE`
    /// for its key is received.
    pub fn new(link: L, config: ProxyConfig) -> Self {
        Self {
            link,
            config,
            view: RefCell::new(ValueMap::new()),
            ready: Cell::new(false),
            on_ready: RefCell::new(Vec::new()),
            listeners: Listeners::new(),
        }
    }

    /// The proxy configuration
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Whether the initial snapshot arrived
    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// Run `callback` once the initial snapshot arrived
    ///
    /// Runs immediately when the proxy is already ready.
    pub fn ready(&self, callback: impl FnOnce() + 'static) {
        if self.ready.get() {
            callback();
        } else {
            self.on_ready.borrow_mut().push(Box::new(callback));
        }
    }

    /// Feed one message posted by the hub
    ///
    /// Messages of other types or for other keys are ignored. A message
    /// for this proxy's key that cannot be decoded is an error.
    pub fn receive(&self, message: &Value) -> Result<()> {
        let kind = message.get("type").and_then(Value::as_str);
        if !matches!(kind, Some(STATE_TYPE | PATCH_STATE_TYPE)) {
            trace!("ignoring foreign message");
            return Ok(());
        }
        if message.get("key").and_then(Value::as_str) != Some(self.config.key()) {
            trace!("ignoring message for another key");
            return Ok(());
        }

        let receive = self.config.codec().deserializing(|message| {
            self.accept(message);
            Ok(())
        });
        Ok(receive(message)?)
    }

    fn accept(&self, message: Message) {
        match message {
            Message::State { view, .. } => {
                *self.view.borrow_mut() = view;
                self.listeners.notify();
                if !self.ready.replace(true) {
                    debug!(key = self.config.key(), "proxy ready");
                    let callbacks = std::mem::take(&mut *self.on_ready.borrow_mut());
                    for callback in callbacks {
                        callback();
                    }
                }
            }
            Message::PatchState { patch, .. } => {
                if !self.ready.get() {
                    warn!(key = self.config.key(), "patch received before initial state, ignored");
                    return;
                }
                let next = apply(&self.view.borrow(), &patch);
                *self.view.borrow_mut() = next;
                trace!(changes = patch.len(), "patch applied");
                self.listeners.notify();
            }
            Message::Dispatch { .. } => {}
        }
    }

    /// Ask the hub to dispatch `action`
    ///
    /// The result settles with the hub's response: its value, or its error
    /// message. A request the transport could not carry rejects at once.
    pub fn dispatch(&self, action: Value) -> Deferred<Value> {
        let message = Message::Dispatch {
            port_name: self.config.port_name().to_string(),
            action,
        };
        let encoded = match message.encode(self.config.codec()) {
            Ok(encoded) => encoded,
            Err(err) => return Deferred::rejected(err),
        };

        let (resolver, outcome) = deferred();
        let sent = self.link.request(
            encoded,
            Box::new(move |reply: Value| match Response::from_value(&reply) {
                Ok(Response { error: None, value }) => resolver.resolve(value),
                Ok(Response {
                    error: Some(message),
                    ..
                }) => resolver.reject(message),
                Err(err) => resolver.reject(err),
            }),
        );
        if let Err(err) = sent {
            debug!(error = %err, "dispatch not sent");
            return Deferred::rejected(DispatchError::new(err.to_string()));
        }
        outcome
    }
}

impl<L: Link> Store for ProxyStore<L> {
    fn state(&self) -> Value {
        Value::map(self.view.borrow().clone())
    }

    fn dispatch(&self, action: Value) -> std::result::Result<Deferred<Value>, DispatchError> {
        Ok(ProxyStore::dispatch(self, action))
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.listeners.add(listener)
    }
}

impl<L: Link> fmt::Debug for ProxyStore<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyStore")
            .field("config", &self.config)
            .field("ready", &self.ready.get())
            .field("view", &self.view.borrow())
            .finish()
    }
}
