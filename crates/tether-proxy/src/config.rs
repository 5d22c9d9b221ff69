//! Proxy Configuration - Port name, selector key and payload codec

use crate::error::{Error, Result};
use tether_core::{Codec, SyncOptions, Value, DEFAULT_KEY};

/// Validated proxy configuration
///
/// # Example
///
/// ```
/// use tether_proxy::ProxyConfig;
///
/// let config = ProxyConfig::builder().port_name("app").build().unwrap();
/// assert_eq!(config.key(), "state");
///
/// let config = ProxyConfig::builder()
///     .port_name("app")
///     .key("todos")
///     .build()
///     .unwrap();
/// assert_eq!(config.key(), "todos");
/// ```
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    port_name: String,
    key: String,
    codec: Codec,
}

impl ProxyConfig {
    /// Start building a configuration
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Port name to connect under
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Selector key whose view this proxy mirrors
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Payload codec; must mirror the hub's
    pub fn codec(&self) -> &Codec {
        &self.codec
    }
}

/// Builder for [`ProxyConfig`]
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
    port_name: Option<String>,
    key: Option<String>,
    codec: Codec,
}

impl ProxyConfigBuilder {
    /// Set the port name (required)
    pub fn port_name(mut self, name: impl Into<String>) -> Self {
        self.port_name = Some(name.into());
        self
    }

    /// Bind to a selector other than the default
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Replace the whole payload codec
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the payload serializer
    pub fn serializer(
        mut self,
        serializer: impl Fn(Value) -> tether_core::Result<Value> + 'static,
    ) -> Self {
        self.codec = self.codec.with_serializer(serializer);
        self
    }

    /// Set the payload deserializer
    pub fn deserializer(
        mut self,
        deserializer: impl Fn(Value) -> tether_core::Result<Value> + 'static,
    ) -> Self {
        self.codec = self.codec.with_deserializer(deserializer);
        self
    }

    /// Apply options loaded from a file
    ///
    /// Only fields present in the options override the builder.
    pub fn options(mut self, options: &SyncOptions) -> Self {
        if let Some(name) = &options.port_name {
            self.port_name = Some(name.clone());
        }
        if let Some(key) = &options.key {
            self.key = Some(key.clone());
        }
        if let Some(kind) = options.codec {
            self.codec = kind.codec();
        }
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<ProxyConfig> {
        let port_name = match self.port_name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(Error::MissingPortName),
        };
        Ok(ProxyConfig {
            port_name,
            key: self
                .key
                .filter(|key| !key.is_empty())
                .unwrap_or_else(|| DEFAULT_KEY.to_string()),
            codec: self.codec,
        })
    }
}
