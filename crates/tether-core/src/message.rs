//! Wire messages exchanged between the hub and its proxies
//!
//! Every message is a map. Routing fields (`type`, `key`, `portName`) are
//! always plain values; only `payload` goes through the serialization
//! pipeline, so traffic from unrelated subsystems sharing the transport can
//! be recognized and skipped without decoding it.

use crate::{Codec, Error, Patch, Result, Value, ValueMap};

/// Full snapshot of a view
pub const STATE_TYPE: &str = "STATE";
/// Incremental update of a view
pub const PATCH_STATE_TYPE: &str = "PATCH_STATE";
/// Proxy-to-hub action
pub const DISPATCH_TYPE: &str = "DISPATCH";

/// A decoded hub/proxy message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `{type: "STATE", key, payload: View}`
    State { key: String, view: ValueMap },
    /// `{type: "PATCH_STATE", key, payload: Patch}`
    PatchState { key: String, patch: Patch },
    /// `{type: "DISPATCH", portName, payload: Action}`
    Dispatch { port_name: String, action: Value },
}

impl Message {
    /// The wire `type` of this message
    pub fn kind(&self) -> &'static str {
        match self {
            Message::State { .. } => STATE_TYPE,
            Message::PatchState { .. } => PATCH_STATE_TYPE,
            Message::Dispatch { .. } => DISPATCH_TYPE,
        }
    }

    /// Encode for the wire, passing the payload through `codec`
    pub fn encode(&self, codec: &Codec) -> Result<Value> {
        let mut fields = ValueMap::new();
        fields.insert("type".into(), self.kind().into());
        let payload = match self {
            Message::State { key, view } => {
                fields.insert("key".into(), key.as_str().into());
                Value::map(view.clone())
            }
            Message::PatchState { key, patch } => {
                fields.insert("key".into(), key.as_str().into());
                patch.to_value()
            }
            Message::Dispatch { port_name, action } => {
                fields.insert("portName".into(), port_name.as_str().into());
                action.clone()
            }
        };
        fields.insert("payload".into(), codec.serialize(payload)?);
        Ok(Value::map(fields))
    }

    /// Decode a wire value, passing the payload through `codec`
    pub fn decode(value: &Value, codec: &Codec) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedMessage("missing message type".into()))?;
        let payload = codec.deserialize(value.get("payload").cloned().unwrap_or_default())?;

        match kind {
            STATE_TYPE => {
                let view = payload.as_map().cloned().ok_or_else(|| {
                    Error::MalformedMessage(format!("STATE payload must be a map, got {}", payload.type_name()))
                })?;
                Ok(Message::State {
                    key: required_str(value, "key")?,
                    view,
                })
            }
            PATCH_STATE_TYPE => Ok(Message::PatchState {
                key: required_str(value, "key")?,
                patch: Patch::from_value(&payload)?,
            }),
            DISPATCH_TYPE => Ok(Message::Dispatch {
                port_name: required_str(value, "portName")?,
                action: payload,
            }),
            other => Err(Error::MalformedMessage(format!("unknown message type: {other}"))),
        }
    }
}

fn required_str(value: &Value, field: &str) -> Result<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedMessage(format!("missing string field `{field}`")))
}

/// Check the routing fields of a dispatch without decoding its payload
pub fn is_dispatch_for(value: &Value, port_name: &str) -> bool {
    value.get("type").and_then(Value::as_str) == Some(DISPATCH_TYPE)
        && value.get("portName").and_then(Value::as_str) == Some(port_name)
}

/// Reply to a dispatch: `{error: string|null, value}`
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Failure message, if the dispatch failed
    pub error: Option<String>,
    /// Resolved value (null on failure)
    pub value: Value,
}

impl Response {
    /// A successful reply
    pub fn ok(value: Value) -> Self {
        Self { error: None, value }
    }

    /// A failed reply
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            value: Value::Null,
        }
    }

    /// Whether this reply carries an error
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Encode for the wire
    pub fn to_value(&self) -> Value {
        let mut fields = ValueMap::new();
        fields.insert(
            "error".into(),
            self.error.as_deref().map(Value::from).unwrap_or_default(),
        );
        fields.insert("value".into(), self.value.clone());
        Value::map(fields)
    }

    /// Decode from the wire
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value
            .as_map()
            .ok_or_else(|| Error::MalformedMessage(format!("response must be a map, got {}", value.type_name())))?;
        let error = match fields.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(message.clone()),
            Some(other) => Some(other.to_string()),
        };
        Ok(Self {
            error,
            value: fields.get("value").cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Change;

    #[test]
    fn test_state_wire_shape() {
        let view: ValueMap = [("b".to_string(), Value::Int(2))].into_iter().collect();
        let msg = Message::State {
            key: "s".into(),
            view,
        };
        let wire = msg.encode(&Codec::identity()).unwrap();

        assert_eq!(wire.get("type"), Some(&Value::from("STATE")));
        assert_eq!(wire.get("key"), Some(&Value::from("s")));
        assert_eq!(wire.get("payload"), Some(&Value::from_iter([("b", 2)])));
    }

    #[test]
    fn test_patch_state_decodes() {
        let msg = Message::PatchState {
            key: "s".into(),
            patch: Patch::from(vec![Change::Update {
                key: "b".into(),
                value: 3.into(),
            }]),
        };
        let wire = msg.encode(&Codec::identity()).unwrap();
        assert_eq!(Message::decode(&wire, &Codec::identity()).unwrap(), msg);
    }

    #[test]
    fn test_routing_fields_survive_payload_codec() {
        let msg = Message::Dispatch {
            port_name: "app".into(),
            action: Value::from_iter([("type", "X")]),
        };
        let wire = msg.encode(&Codec::ron()).unwrap();

        assert!(is_dispatch_for(&wire, "app"));
        assert!(!is_dispatch_for(&wire, "other"));
        assert!(matches!(wire.get("payload"), Some(Value::String(_))));
        assert_eq!(Message::decode(&wire, &Codec::ron()).unwrap(), msg);
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let wire = Value::from_iter([("type", "HELLO")]);
        assert!(matches!(
            Message::decode(&wire, &Codec::identity()),
            Err(Error::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_response_wire_shape() {
        let failed = Response::err("boom").to_value();
        assert_eq!(failed.get("error"), Some(&Value::from("boom")));
        assert_eq!(failed.get("value"), Some(&Value::Null));

        let ok = Response::from_value(&Response::ok(5.into()).to_value()).unwrap();
        assert_eq!(ok, Response::ok(Value::Int(5)));
        assert!(!ok.is_err());
    }
}
