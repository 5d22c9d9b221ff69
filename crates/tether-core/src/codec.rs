//! Serialization pipeline for message payloads
//!
//! A [`Codec`] pairs a serializer with a deserializer. Both default to the
//! identity, and both must be pure: they see only the payload, never the
//! channel it travels on. Failures are returned to the caller of the
//! wrapped send or receive, never swallowed here.

use crate::{Error, Message, Result, Value};
use std::fmt;
use std::rc::Rc;

/// A payload transform
pub type Transform = Rc<dyn Fn(Value) -> Result<Value>>;

/// Serializer/deserializer pair applied to every message payload
#[derive(Clone)]
pub struct Codec {
    serializer: Option<Transform>,
    deserializer: Option<Transform>,
}

impl Codec {
    /// Pass payloads through unchanged
    pub fn identity() -> Self {
        Self {
            serializer: None,
            deserializer: None,
        }
    }

    /// Use custom transforms
    pub fn new(
        serializer: impl Fn(Value) -> Result<Value> + 'static,
        deserializer: impl Fn(Value) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            serializer: Some(Rc::new(serializer)),
            deserializer: Some(Rc::new(deserializer)),
        }
    }

    /// Replace only the serializer
    pub fn with_serializer(mut self, serializer: impl Fn(Value) -> Result<Value> + 'static) -> Self {
        self.serializer = Some(Rc::new(serializer));
        self
    }

    /// Replace only the deserializer
    pub fn with_deserializer(mut self, deserializer: impl Fn(Value) -> Result<Value> + 'static) -> Self {
        self.deserializer = Some(Rc::new(deserializer));
        self
    }

    /// Encode payloads as RON text
    pub fn ron() -> Self {
        Self::new(
            |payload| {
                ron::to_string(&payload)
                    .map(Value::String)
                    .map_err(|e| Error::Codec(e.to_string()))
            },
            |encoded| match encoded {
                Value::String(text) => ron::from_str(&text).map_err(|e| Error::Codec(e.to_string())),
                other => Err(Error::Codec(format!(
                    "expected RON text, got {}",
                    other.type_name()
                ))),
            },
        )
    }

    /// Apply the serializer once
    pub fn serialize(&self, payload: Value) -> Result<Value> {
        match &self.serializer {
            Some(serializer) => serializer(payload),
            None => Ok(payload),
        }
    }

    /// Apply the deserializer once
    pub fn deserialize(&self, encoded: Value) -> Result<Value> {
        match &self.deserializer {
            Some(deserializer) => deserializer(encoded),
            None => Ok(encoded),
        }
    }

    /// Wrap a raw send primitive so it accepts messages
    pub fn serializing<F>(&self, send: F) -> impl Fn(&Message) -> Result<()>
    where
        F: Fn(Value) -> Result<()>,
    {
        let codec = self.clone();
        move |message| send(message.encode(&codec)?)
    }

    /// Wrap a message receiver so it accepts raw wire values
    pub fn deserializing<F>(&self, receive: F) -> impl Fn(&Value) -> Result<()>
    where
        F: Fn(Message) -> Result<()>,
    {
        let codec = self.clone();
        move |raw| receive(Message::decode(raw, &codec)?)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("serializer", &self.serializer.is_some())
            .field("deserializer", &self.deserializer.is_some())
            .finish()
    }
}
