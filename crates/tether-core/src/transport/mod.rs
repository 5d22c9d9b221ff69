//! Transport contracts
//!
//! These traits define the message channel the hub and its proxies share.
//! Users implement them for their environment (browser runtime ports,
//! worker message channels, sockets). [`memory`] provides an in-process
//! implementation.
//!
//! The transport is name-addressed and connection-oriented: a proxy opens a
//! [`Port`] under a name, the hub hears about it through
//! [`TransportListener::connected`], and ports can vanish at any time.
//! Requests travel separately from ports and carry their own single-fire
//! [`Reply`].

pub mod memory;

use crate::{TransportError, Value, ValueMap};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Identifier of a port, unique per transport
pub type PortId = u64;

/// Which side of the synchronization domain an event comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Connections from inside the domain
    Internal,
    /// Connections originating outside the domain
    External,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Internal => write!(f, "internal"),
            Scope::External => write!(f, "external"),
        }
    }
}

/// Origin metadata supplied by the transport
///
/// Provenance only; the hub attaches it to actions but never makes
/// decisions based on it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SenderInfo {
    /// Identifier of the sending context
    pub id: String,
    /// Extra transport-specific fields (origin URL, frame, tab, ...)
    pub metadata: ValueMap,
}

impl SenderInfo {
    /// Create sender info with an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: ValueMap::new(),
        }
    }

    /// Add a metadata field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Render as `{id, ...metadata}`
    pub fn to_value(&self) -> Value {
        let mut fields = ValueMap::new();
        fields.insert("id".into(), self.id.as_str().into());
        fields.extend(self.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::map(fields)
    }
}

/// One open connection, as seen by the hub
pub trait Port {
    /// Unique id of this connection
    fn id(&self) -> PortId;

    /// The name the proxy connected under
    fn name(&self) -> &str;

    /// Selector keys the proxy asked for
    fn keys(&self) -> &[String];

    /// Who opened the connection
    fn sender(&self) -> &SenderInfo;

    /// Send a message down this connection
    ///
    /// Returns [`TransportError::Closed`] once the proxy is gone.
    fn post(&self, message: Value) -> Result<(), TransportError>;
}

type ReplyFn = Box<dyn FnOnce(Value) -> Result<(), TransportError>>;

/// Single-fire reply to a request
///
/// Clones share the same slot: the first `send` wins and later ones fail
/// with [`TransportError::Closed`].
#[derive(Clone)]
pub struct Reply {
    slot: Rc<RefCell<Option<ReplyFn>>>,
}

impl Reply {
    /// Wrap the transport's reply primitive
    pub fn new(send: impl FnOnce(Value) -> Result<(), TransportError> + 'static) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(Box::new(send)))),
        }
    }

    /// Deliver the reply
    pub fn send(self, value: Value) -> Result<(), TransportError> {
        let send = self.slot.borrow_mut().take();
        match send {
            Some(send) => send(value),
            None => Err(TransportError::Closed),
        }
    }

    /// Whether a reply was already sent
    pub fn is_spent(&self) -> bool {
        self.slot.borrow().is_none()
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// Event handlers the hub registers with a transport
pub trait TransportListener {
    /// A proxy opened a port
    fn connected(&self, port: Rc<dyn Port>);

    /// A port closed
    fn disconnected(&self, port: PortId);

    /// A request arrived
    fn message(&self, message: Value, sender: SenderInfo, reply: Reply);
}

/// Hub side of a transport
pub trait Transport {
    /// Register a listener for one event scope
    ///
    /// Transports without the requested scope return
    /// [`TransportError::Unsupported`].
    fn listen(&self, scope: Scope, listener: Rc<dyn TransportListener>) -> Result<(), TransportError>;
}

/// Callback receiving the hub's reply to a request
pub type ReplyCallback = Box<dyn FnOnce(Value)>;

/// Proxy side of a transport
pub trait Link {
    /// Send a request to the hub; `on_reply` fires at most once
    fn request(&self, message: Value, on_reply: ReplyCallback) -> Result<(), TransportError>;
}

impl<L: Link + ?Sized> Link for Rc<L> {
    fn request(&self, message: Value, on_reply: ReplyCallback) -> Result<(), TransportError> {
        (**self).request(message, on_reply)
    }
}
