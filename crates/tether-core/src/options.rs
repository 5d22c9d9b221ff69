//! RON options shared by hub and proxy configuration

use crate::{Codec, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Payload encoding selectable from an options file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecKind {
    /// Payloads travel as values
    #[default]
    Identity,
    /// Payloads travel as RON text
    Ron,
}

impl CodecKind {
    /// Build the matching codec
    pub fn codec(self) -> Codec {
        match self {
            CodecKind::Identity => Codec::identity(),
            CodecKind::Ron => Codec::ron(),
        }
    }
}

/// Serializable part of a hub or proxy configuration
///
/// ```text
/// (
///     port_name: Some("app"),
///     codec: Some(Ron),
///     key: Some("todos"),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Port name both sides connect under
    #[serde(default)]
    pub port_name: Option<String>,
    /// Payload encoding; `None` keeps the builder's codec
    #[serde(default)]
    pub codec: Option<CodecKind>,
    /// Selector key (proxy only)
    #[serde(default)]
    pub key: Option<String>,
}

impl SyncOptions {
    /// Parse options from RON text
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load options from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let options = Self::from_ron(&text)?;
        debug!(path = %path.display(), codec = ?options.codec, "loaded sync options");
        Ok(options)
    }
}
