//! In-process transport
//!
//! Everything happens on the calling thread. Messages posted to a port are
//! queued until the client drains them, which keeps delivery order explicit
//! and lets tests assert on the exact message sequence. Requests are
//! delivered to hub listeners synchronously.

use super::{
    Link, Port, PortId, Reply, ReplyCallback, Scope, SenderInfo, Transport, TransportListener,
};
use crate::{TransportError, Value};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Parameters of a new connection
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Port name
    pub name: String,
    /// Requested selector keys
    pub keys: Vec<String>,
    /// Origin metadata the hub will see
    pub sender: SenderInfo,
    /// Internal or external connection
    pub scope: Scope,
}

impl ConnectRequest {
    /// An internal connection under `name` with no selector keys
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            sender: SenderInfo::default(),
            scope: Scope::Internal,
        }
    }

    /// Request a selector key
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Set the origin metadata
    pub fn sender(mut self, sender: SenderInfo) -> Self {
        self.sender = sender;
        self
    }

    /// Mark as an external connection
    pub fn external(mut self) -> Self {
        self.scope = Scope::External;
        self
    }
}

#[derive(Default)]
struct Shared {
    supports_external: bool,
    next_port: PortId,
    listeners: Vec<(Scope, Rc<dyn TransportListener>)>,
}

/// Transport living entirely in memory
#[derive(Clone)]
pub struct MemoryTransport {
    shared: Rc<RefCell<Shared>>,
}

impl MemoryTransport {
    /// A transport offering both internal and external events
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                supports_external: true,
                ..Shared::default()
            })),
        }
    }

    /// A transport without external events
    pub fn internal_only() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared::default())),
        }
    }

    /// Number of listeners registered for a scope
    pub fn listener_count(&self, scope: Scope) -> usize {
        self.shared
            .borrow()
            .listeners
            .iter()
            .filter(|(s, _)| *s == scope)
            .count()
    }

    fn listeners_for(&self, scope: Scope) -> Vec<Rc<dyn TransportListener>> {
        self.shared
            .borrow()
            .listeners
            .iter()
            .filter(|(s, _)| *s == scope)
            .map(|(_, l)| l.clone())
            .collect()
    }

    /// Open a port and announce it to the hub
    pub fn connect(&self, request: ConnectRequest) -> MemoryClient {
        let id = {
            let mut shared = self.shared.borrow_mut();
            let id = shared.next_port;
            shared.next_port += 1;
            id
        };
        let port = Rc::new(MemoryPort {
            id,
            name: request.name,
            keys: request.keys,
            sender: request.sender,
            queue: RefCell::new(VecDeque::new()),
            open: Rc::new(Cell::new(true)),
        });

        for listener in self.listeners_for(request.scope) {
            listener.connected(port.clone());
        }

        MemoryClient {
            transport: self.clone(),
            port,
            scope: request.scope,
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn listen(&self, scope: Scope, listener: Rc<dyn TransportListener>) -> Result<(), TransportError> {
        let mut shared = self.shared.borrow_mut();
        if scope == Scope::External && !shared.supports_external {
            return Err(TransportError::Unsupported(scope));
        }
        shared.listeners.push((scope, listener));
        Ok(())
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("MemoryTransport")
            .field("supports_external", &shared.supports_external)
            .field("listeners", &shared.listeners.len())
            .finish()
    }
}

struct MemoryPort {
    id: PortId,
    name: String,
    keys: Vec<String>,
    sender: SenderInfo,
    queue: RefCell<VecDeque<Value>>,
    open: Rc<Cell<bool>>,
}

impl Port for MemoryPort {
    fn id(&self) -> PortId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn sender(&self) -> &SenderInfo {
        &self.sender
    }

    fn post(&self, message: Value) -> Result<(), TransportError> {
        if !self.open.get() {
            return Err(TransportError::Closed);
        }
        self.queue.borrow_mut().push_back(message);
        Ok(())
    }
}

/// The proxy's end of a memory port
#[derive(Clone)]
pub struct MemoryClient {
    transport: MemoryTransport,
    port: Rc<MemoryPort>,
    scope: Scope,
}

impl MemoryClient {
    /// Id of the underlying port
    pub fn id(&self) -> PortId {
        self.port.id
    }

    /// Whether the port is still open
    pub fn is_connected(&self) -> bool {
        self.port.open.get()
    }

    /// Take every message posted so far, oldest first
    pub fn drain(&self) -> Vec<Value> {
        self.port.queue.borrow_mut().drain(..).collect()
    }

    /// Feed queued messages to `deliver` until the queue is empty
    ///
    /// Messages posted while delivering are picked up in the same call.
    pub fn pump(&self, mut deliver: impl FnMut(Value)) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.port.queue.borrow_mut().pop_front();
            match next {
                Some(message) => {
                    deliver(message);
                    delivered += 1;
                }
                None => return delivered,
            }
        }
    }

    /// Close the port and tell the hub
    pub fn disconnect(&self) {
        if !self.port.open.replace(false) {
            return;
        }
        self.port.queue.borrow_mut().clear();
        trace!(port = self.port.id, "memory port closed");
        for listener in self.transport.listeners_for(self.scope) {
            listener.disconnected(self.port.id);
        }
    }
}

impl Link for MemoryClient {
    fn request(&self, message: Value, on_reply: ReplyCallback) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        let open = self.port.open.clone();
        let reply = Reply::new(move |value| {
            if !open.get() {
                return Err(TransportError::Closed);
            }
            on_reply(value);
            Ok(())
        });
        for listener in self.transport.listeners_for(self.scope) {
            listener.message(message.clone(), self.port.sender.clone(), reply.clone());
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryClient")
            .field("id", &self.port.id)
            .field("name", &self.port.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
