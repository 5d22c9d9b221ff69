//! Dispatch proxy
//!
//! Turns a `DISPATCH` request into a store dispatch and hands the outcome
//! to a [`Responder`], which decides how and when to answer. Nothing in
//! here can fail the hub: decoding errors, store failures and rejected
//! results all become an error [`Response`].

use std::rc::Rc;
use tether_core::{
    is_dispatch_for, Codec, Deferred, DispatchError, Message, Reply, Response, SenderInfo, Store,
    Value,
};
use tracing::{debug, trace, warn};

/// Field added to every proxied action
pub const SENDER_FIELD: &str = "_sender";

/// Strategy for answering a dispatch
///
/// The responder owns `reply` and may send it whenever the outcome allows;
/// the transport keeps the reply channel open until then.
pub trait Responder {
    /// Answer one dispatch
    fn respond(&self, outcome: Deferred<Value>, reply: Reply);
}

impl<F: Fn(Deferred<Value>, Reply)> Responder for F {
    fn respond(&self, outcome: Deferred<Value>, reply: Reply) {
        self(outcome, reply)
    }
}

/// Waits for the outcome, then replies `{error: null, value}` or
/// `{error: message, value: null}`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponder;

impl Responder for DefaultResponder {
    fn respond(&self, outcome: Deferred<Value>, reply: Reply) {
        outcome.on_settle(move |result| {
            let response = match result {
                Ok(value) => Response::ok(value),
                Err(err) => {
                    warn!(error = %err, "dispatch failed");
                    Response::err(err.message())
                }
            };
            send_response(reply, &response);
        });
    }
}

/// Deliver a response, tolerating a proxy that already left
pub fn send_response(reply: Reply, response: &Response) {
    if let Err(err) = reply.send(response.to_value()) {
        debug!(error = %err, "dispatch reply undeliverable");
    }
}

/// Routes dispatch requests for one port name into a store
pub(crate) struct DispatchProxy {
    port_name: String,
    codec: Codec,
    responder: Rc<dyn Responder>,
}

impl DispatchProxy {
    pub(crate) fn new(port_name: String, codec: Codec, responder: Rc<dyn Responder>) -> Self {
        Self {
            port_name,
            codec,
            responder,
        }
    }

    /// Handle one request; returns false when the message is not ours
    pub(crate) fn handle<S: Store + ?Sized>(
        &self,
        store: &S,
        message: &Value,
        sender: &SenderInfo,
        reply: Reply,
    ) -> bool {
        if !is_dispatch_for(message, &self.port_name) {
            trace!("ignoring foreign message");
            return false;
        }

        let outcome = match self.augment(message, sender) {
            Ok(action) => match store.dispatch(action) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error = %err, sender = %sender.id, "store rejected dispatch");
                    Deferred::rejected(err)
                }
            },
            Err(err) => {
                warn!(error = %err, sender = %sender.id, "undecodable dispatch");
                Deferred::rejected(err)
            }
        };

        self.responder.respond(outcome, reply);
        true
    }

    /// Decode the payload and attach `_sender`
    fn augment(&self, message: &Value, sender: &SenderInfo) -> Result<Value, DispatchError> {
        let mut action = match Message::decode(message, &self.codec)? {
            Message::Dispatch { action, .. } => action,
            other => {
                return Err(DispatchError::new(format!(
                    "expected a dispatch, got {}",
                    other.kind()
                )))
            }
        };
        if action.as_map().is_none() {
            return Err(DispatchError::new(format!(
                "action must be a map, got {}",
                action.type_name()
            )));
        }
        action.insert(SENDER_FIELD, sender.to_value());
        Ok(action)
    }
}
