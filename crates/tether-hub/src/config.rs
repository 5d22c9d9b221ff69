//! Hub Configuration - Port name, payload codec, responder and selectors
//!
//! A [`HubConfig`] can only be obtained through [`HubConfigBuilder::build`],
//! which validates every option up front. A hub is therefore never running
//! with a configuration that would fail on first use.

use crate::dispatch::{DefaultResponder, Responder};
use crate::error::{Error, Result};
use crate::selector::{Selector, SelectorRegistry};
use std::fmt;
use std::rc::Rc;
use tether_core::{Codec, SyncOptions, Value, ValueMap};

/// Validated configuration for wrapping a store
///
/// # Example
///
/// ```
/// use tether_hub::HubConfig;
///
/// let config = HubConfig::builder()
///     .port_name("app")
///     .selector("count", |state| {
///         state
///             .get("count")
///             .map(|v| [("count".to_string(), v.clone())].into_iter().collect())
///             .unwrap_or_default()
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(config.port_name(), "app");
/// assert_eq!(config.selectors().len(), 1);
///
/// // The port name is mandatory
/// assert!(HubConfig::builder().build().is_err());
/// ```
#[derive(Clone)]
pub struct HubConfig {
    port_name: String,
    codec: Codec,
    responder: Rc<dyn Responder>,
    selectors: SelectorRegistry,
}

impl HubConfig {
    /// Start building a configuration
    pub fn builder() -> HubConfigBuilder {
        HubConfigBuilder::default()
    }

    /// Port name proxies must connect under
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Payload codec
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Strategy used to answer dispatches
    pub fn responder(&self) -> Rc<dyn Responder> {
        self.responder.clone()
    }

    /// Registered selectors
    pub fn selectors(&self) -> &SelectorRegistry {
        &self.selectors
    }
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConfig")
            .field("port_name", &self.port_name)
            .field("codec", &self.codec)
            .field("selectors", &self.selectors)
            .finish()
    }
}

/// Builder for [`HubConfig`]
#[derive(Default)]
pub struct HubConfigBuilder {
    port_name: Option<String>,
    codec: Codec,
    responder: Option<Rc<dyn Responder>>,
    selectors: Vec<(String, Selector)>,
}

impl HubConfigBuilder {
    /// Set the port name (required)
    pub fn port_name(mut self, name: impl Into<String>) -> Self {
        self.port_name = Some(name.into());
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

    /// Replace the default dispatch responder
    pub fn responder(mut self, responder: impl Responder + 'static) -> Self {
        self.responder = Some(Rc::new(responder));
        self
    }

    /// Register a named selector
    pub fn selector(
        mut self,
        name: impl Into<String>,
        selector: impl Fn(&Value) -> ValueMap + 'static,
    ) -> Self {
        self.selectors.push((name.into(), Rc::new(selector)));
        self
    }

    /// Apply options loaded from a file
    ///
    /// Only fields present in the options override the builder.
    pub fn options(mut self, options: &SyncOptions) -> Self {
        if let Some(name) = &options.port_name {
            self.port_name = Some(name.clone());
        }
        if let Some(kind) = options.codec {
            self.codec = kind.codec();
        }
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<HubConfig> {
        let port_name = match self.port_name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(Error::MissingPortName),
        };

        let mut selectors = SelectorRegistry::new();
        for (name, selector) in self.selectors {
            selectors.register(name, selector)?;
        }

        Ok(HubConfig {
            port_name,
            codec: self.codec,
            responder: self.responder.unwrap_or_else(|| Rc::new(DefaultResponder)),
            selectors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::CodecKind;

    #[test]
    fn test_missing_port_name() {
        assert!(matches!(
            HubConfig::builder().build(),
            Err(Error::MissingPortName)
        ));
        assert!(matches!(
            HubConfig::builder().port_name("").build(),
            Err(Error::MissingPortName)
        ));
    }

    #[test]
    fn test_duplicate_selector_fails_build() {
        let result = HubConfig::builder()
            .port_name("app")
            .selector("s", |_| ValueMap::new())
            .selector("s", |_| ValueMap::new())
            .build();
        assert!(matches!(result, Err(Error::DuplicateSelector(name)) if name == "s"));
    }

    #[test]
    fn test_options_override_port_and_codec() {
        let options = SyncOptions {
            port_name: Some("from-file".into()),
            codec: Some(CodecKind::Ron),
            key: None,
        };
        let config = HubConfig::builder()
            .port_name("inline")
            .options(&options)
            .build()
            .unwrap();

        assert_eq!(config.port_name(), "from-file");
        let encoded = config.codec().serialize(Value::Int(1)).unwrap();
        assert!(matches!(encoded, Value::String(_)));
    }

    #[test]
    fn test_options_without_port_keep_builder_value() {
        let config = HubConfig::builder()
            .port_name("inline")
            .options(&SyncOptions::default())
            .build()
            .unwrap();
        assert_eq!(config.port_name(), "inline");
    }

    #[test]
    fn test_options_without_codec_keep_serializer() {
        let options = SyncOptions {
            port_name: Some("app".into()),
            ..SyncOptions::default()
        };
        let config = HubConfig::builder()
            .serializer(|_| Ok(Value::from("ENC")))
            .options(&options)
            .build()
            .unwrap();

        assert_eq!(config.codec().serialize(Value::Int(1)).unwrap(), Value::from("ENC"));
    }
}
