//! Channels and change notification
//!
//! A channel is one proxy connection plus the views it is bound to. Each
//! binding remembers the last view it successfully sent; on every state
//! change it recomputes its view, diffs it against that memory, and sends a
//! `PATCH_STATE` only when something changed.
//!
//! Lifecycle:
//!
//! ```text
//! Connecting ──(snapshots sent)──▶ Active ──(disconnect)──▶ Closed
//! ```

use crate::selector::{Selector, SelectorRegistry};
use std::rc::Rc;
use tether_core::{diff, Codec, Message, Port, PortId, Subscription, Value, ValueMap};
use tracing::{debug, trace};

/// Lifecycle of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Port accepted, snapshots not yet sent
    Connecting,
    /// Receiving patches
    Active,
    /// Disconnected; terminal
    Closed,
}

/// One selector bound to a channel
struct Binding {
    key: String,
    selector: Selector,
    /// Last view sent on this channel
    previous: ValueMap,
}

impl Binding {
    fn new(key: String, selector: Selector, state: &Value) -> Self {
        let previous = selector(state);
        Self {
            key,
            selector,
            previous,
        }
    }
}

/// A proxy connection and its cached views
pub struct Channel {
    port: Rc<dyn Port>,
    state: ChannelState,
    bindings: Vec<Binding>,
    subscription: Option<Subscription>,
}

impl Channel {
    /// Bind a new port to the selectors it asked for
    pub(crate) fn open(port: Rc<dyn Port>, selectors: &SelectorRegistry, state: &Value) -> Self {
        let bindings = selectors
            .resolve(port.keys())
            .into_iter()
            .map(|(key, selector)| Binding::new(key, selector, state))
            .collect();
        Self {
            port,
            state: ChannelState::Connecting,
            bindings,
            subscription: None,
        }
    }

    /// Port id
    pub fn id(&self) -> PortId {
        self.port.id()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Keys this channel is bound to
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.key.as_str())
    }

    /// Send the initial snapshot of every binding
    ///
    /// The channel becomes active only if every snapshot went out.
    pub(crate) fn activate(&mut self, codec: &Codec) -> tether_core::Result<()> {
        let port = self.port.clone();
        let send = codec.serializing(move |raw| Ok(port.post(raw)?));
        for binding in &self.bindings {
            send(&Message::State {
                key: binding.key.clone(),
                view: binding.previous.clone(),
            })?;
        }
        self.state = ChannelState::Active;
        debug!(port = self.id(), keys = self.bindings.len(), "channel active");
        Ok(())
    }

    /// Attach the store subscription that drives [`Channel::refresh`]
    pub(crate) fn attach(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    /// Recompute every view and send the non-empty patches
    ///
    /// Returns the number of patches sent. A binding whose patch could not
    /// be delivered keeps its old view, so the next patch is still relative
    /// to what the proxy actually holds.
    pub(crate) fn refresh(&mut self, state: &Value, codec: &Codec) -> usize {
        if self.state != ChannelState::Active {
            return 0;
        }

        let port = self.port.clone();
        let send = codec.serializing(move |raw| Ok(port.post(raw)?));
        let mut sent = 0;
        for binding in &mut self.bindings {
            let next = (binding.selector)(state);
            let patch = diff(&binding.previous, &next);
            if patch.is_empty() {
                continue;
            }

            trace!(key = %binding.key, changes = patch.len(), "sending patch");
            let message = Message::PatchState {
                key: binding.key.clone(),
                patch,
            };
            match send(&message) {
                Ok(()) => {
                    binding.previous = next;
                    sent += 1;
                }
                Err(err) => debug!(key = %binding.key, error = %err, "patch not delivered"),
            }
        }
        sent
    }

    /// Release the subscription and drop cached views
    pub(crate) fn close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.bindings.clear();
        self.state = ChannelState::Closed;
        debug!(port = self.id(), "channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tether_core::{Patch, SenderInfo, TransportError};

    struct TestPort {
        keys: Vec<String>,
        sent: RefCell<Vec<Value>>,
        open: Cell<bool>,
        sender: SenderInfo,
    }

    impl TestPort {
        fn new(keys: &[&str]) -> Rc<Self> {
            Rc::new(Self {
                keys: keys.iter().map(|k| k.to_string()).collect(),
                sent: RefCell::new(Vec::new()),
                open: Cell::new(true),
                sender: SenderInfo::default(),
            })
        }

        fn messages(&self) -> Vec<Message> {
            self.sent
                .borrow()
                .iter()
                .map(|raw| Message::decode(raw, &Codec::identity()).unwrap())
                .collect()
        }
    }

    impl Port for TestPort {
        fn id(&self) -> PortId {
            1
        }

        fn name(&self) -> &str {
            "app"
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
            self.sent.borrow_mut().push(message);
            Ok(())
        }
    }

    fn registry() -> SelectorRegistry {
        let mut registry = SelectorRegistry::new();
        for field in ["a", "b"] {
            let name = format!("s_{field}");
            registry
                .register(
                    name,
                    Rc::new(move |state: &Value| {
                        let mut view = ValueMap::new();
                        view.insert(field.to_string(), state.get(field).cloned().unwrap_or_default());
                        view
                    }),
                )
                .unwrap();
        }
        registry
    }

    fn view(pairs: &[(&str, i64)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn test_activate_sends_one_snapshot_per_binding() {
        let port = TestPort::new(&["s_a", "s_b"]);
        let state = Value::from_iter([("a", 1), ("b", 2)]);
        let mut channel = Channel::open(port.clone(), &registry(), &state);
        assert_eq!(channel.state(), ChannelState::Connecting);

        channel.activate(&Codec::identity()).unwrap();
        assert_eq!(channel.state(), ChannelState::Active);
        assert_eq!(
            port.messages(),
            vec![
                Message::State {
                    key: "s_a".into(),
                    view: view(&[("a", 1)])
                },
                Message::State {
                    key: "s_b".into(),
                    view: view(&[("b", 2)])
                },
            ]
        );
    }

    #[test]
    fn test_refresh_only_patches_changed_views() {
        let port = TestPort::new(&["s_a", "s_b"]);
        let state = Value::from_iter([("a", 1), ("b", 2)]);
        let mut channel = Channel::open(port.clone(), &registry(), &state);
        channel.activate(&Codec::identity()).unwrap();
        port.sent.borrow_mut().clear();

        let next = Value::from_iter([("a", 1), ("b", 3)]);
        assert_eq!(channel.refresh(&next, &Codec::identity()), 1);
        assert_eq!(
            port.messages(),
            vec![Message::PatchState {
                key: "s_b".into(),
                patch: diff(&view(&[("b", 2)]), &view(&[("b", 3)])),
            }]
        );

        // Same state again: nothing to send
        assert_eq!(channel.refresh(&next, &Codec::identity()), 0);
    }

    #[test]
    fn test_undelivered_patch_keeps_previous_view() {
        let port = TestPort::new(&["s_a"]);
        let mut channel = Channel::open(port.clone(), &registry(), &Value::from_iter([("a", 1)]));
        channel.activate(&Codec::identity()).unwrap();
        port.sent.borrow_mut().clear();

        port.open.set(false);
        assert_eq!(channel.refresh(&Value::from_iter([("a", 2)]), &Codec::identity()), 0);

        port.open.set(true);
        channel.refresh(&Value::from_iter([("a", 3)]), &Codec::identity());
        let expected: Patch = diff(&view(&[("a", 1)]), &view(&[("a", 3)]));
        assert_eq!(
            port.messages(),
            vec![Message::PatchState {
                key: "s_a".into(),
                patch: expected
            }]
        );
    }

    #[test]
    fn test_closed_channel_sends_nothing() {
        let port = TestPort::new(&[]);
        let mut channel = Channel::open(port.clone(), &registry(), &Value::from_iter([("a", 1)]));
        channel.activate(&Codec::identity()).unwrap();
        assert_eq!(channel.keys().collect::<Vec<_>>(), vec!["state"]);

        channel.close();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert_eq!(channel.keys().count(), 0);
        assert_eq!(channel.refresh(&Value::from_iter([("a", 9)]), &Codec::identity()), 0);
        assert_eq!(port.sent.borrow().len(), 1);
    }
}
