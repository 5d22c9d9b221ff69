//! The state container contract
//!
//! The hub never owns state directly. It talks to a [`Store`], which exposes
//! the current state, accepts actions, and announces transitions to its
//! subscribers. [`ReducerStore`] is the stock implementation: a pure reducer
//! folded over dispatched actions.

use crate::{Deferred, DispatchError, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Change listener
pub type Listener = Rc<dyn Fn()>;

/// A state container
pub trait Store {
    /// Snapshot of the current state
    fn state(&self) -> Value;

    /// Apply an action
    ///
    /// An `Err` is an immediate failure; a rejected [`Deferred`] is a
    /// failure discovered later.
    fn dispatch(&self, action: Value) -> Result<Deferred<Value>, DispatchError>;

    /// Register a listener called after every state transition
    fn subscribe(&self, listener: Listener) -> Subscription;
}

impl<S: Store + ?Sized> Store for Rc<S> {
    fn state(&self) -> Value {
        (**self).state()
    }

    fn dispatch(&self, action: Value) -> Result<Deferred<Value>, DispatchError> {
        (**self).dispatch(action)
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        (**self).subscribe(listener)
    }
}

/// Handle to a registered listener
///
/// The listener stays registered until [`Subscription::unsubscribe`] is
/// called or the handle is dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a release action
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Release the listener now
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: IndexMap<u64, Listener>,
}

/// A listener list that tolerates changes during notification
///
/// Each pass runs over a snapshot taken before the first call, so listeners
/// added or removed mid-pass do not disturb it.
#[derive(Clone, Default)]
pub struct Listeners {
    table: Rc<RefCell<ListenerTable>>,
}

impl Listeners {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    pub fn add(&self, listener: Listener) -> Subscription {
        let id = {
            let mut table = self.table.borrow_mut();
            let id = table.next_id;
            table.next_id += 1;
            table.listeners.insert(id, listener);
            id
        };
        let table: Weak<RefCell<ListenerTable>> = Rc::downgrade(&self.table);
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.borrow_mut().listeners.shift_remove(&id);
            }
        })
    }

    /// Call every listener registered when the pass starts
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self.table.borrow().listeners.values().cloned().collect();
        for listener in snapshot {
            listener();
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.table.borrow().listeners.len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reducer signature: `(state, action) -> next state`
pub type Reducer = Box<dyn Fn(&Value, &Value) -> Result<Value, DispatchError>>;

/// A store driven by a reducer
///
/// A dispatch counts as a transition when the reducer returns a value that
/// is not [shallowly equal](Value::shallow_eq) to the current state.
/// Returning the incoming state untouched therefore notifies nobody.
pub struct ReducerStore {
    state: RefCell<Value>,
    reducer: Reducer,
    listeners: Listeners,
}

impl ReducerStore {
    /// Create a store with an initial state
    pub fn new(
        initial: Value,
        reducer: impl Fn(&Value, &Value) -> Result<Value, DispatchError> + 'static,
    ) -> Self {
        Self {
            state: RefCell::new(initial),
            reducer: Box::new(reducer),
            listeners: Listeners::new(),
        }
    }

    /// Number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Store for ReducerStore {
    fn state(&self) -> Value {
        self.state.borrow().clone()
    }

    fn dispatch(&self, action: Value) -> Result<Deferred<Value>, DispatchError> {
        let next = (self.reducer)(&self.state.borrow(), &action)?;
        let changed = !self.state.borrow().shallow_eq(&next);
        if changed {
            *self.state.borrow_mut() = next;
            self.listeners.notify();
        }
        Ok(Deferred::resolved(action))
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.listeners.add(listener)
    }
}

impl fmt::Debug for ReducerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerStore")
            .field("state", &self.state.borrow())
            .field("subscribers", &self.listeners.len())
            .finish()
    }
}
