//! Selector registry
//!
//! A selector maps the full state to a flat view. Proxies pick selectors by
//! name when they connect; the name doubles as the `key` of every message
//! carrying that view.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use tether_core::{Value, ValueMap, DEFAULT_KEY};
use tracing::warn;

/// A pure projection from state to view
pub type Selector = Rc<dyn Fn(&Value) -> ValueMap>;

/// The whole state as a view
///
/// Top-level fields of a map state become view fields. Any other state
/// projects to an empty view.
pub fn identity() -> Selector {
    Rc::new(|state: &Value| state.as_map().cloned().unwrap_or_default())
}

/// Named selectors available to proxies
///
/// [`DEFAULT_KEY`] always resolves: to the selector registered under that
/// name, or to [`identity`] otherwise.
#[derive(Clone, Default)]
pub struct SelectorRegistry {
    selectors: IndexMap<String, Selector>,
}

impl SelectorRegistry {
    /// Create a registry holding only the implicit default
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a selector under a unique, non-empty name
    pub fn register(&mut self, name: impl Into<String>, selector: Selector) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::EmptySelectorKey);
        }
        if self.selectors.contains_key(&name) {
            return Err(Error::DuplicateSelector(name));
        }
        self.selectors.insert(name, selector);
        Ok(())
    }

    /// Look up a selector by name
    pub fn get(&self, name: &str) -> Option<Selector> {
        match self.selectors.get(name) {
            Some(selector) => Some(selector.clone()),
            None if name == DEFAULT_KEY => Some(identity()),
            None => None,
        }
    }

    /// Resolve the keys a proxy asked for
    ///
    /// No keys means [`DEFAULT_KEY`]. Unknown keys are skipped with a
    /// warning, and repeated keys are bound once.
    pub fn resolve(&self, keys: &[String]) -> Vec<(String, Selector)> {
        if keys.is_empty() {
            return self
                .get(DEFAULT_KEY)
                .map(|selector| vec![(DEFAULT_KEY.to_string(), selector)])
                .unwrap_or_default();
        }

        let mut resolved: Vec<(String, Selector)> = Vec::with_capacity(keys.len());
        for key in keys {
            if resolved.iter().any(|(name, _)| name == key) {
                continue;
            }
            match self.get(key) {
                Some(selector) => resolved.push((key.clone(), selector)),
                None => warn!(key = %key, "proxy requested an unknown selector"),
            }
        }
        resolved
    }

    /// Names of the explicitly registered selectors, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.selectors.keys().map(String::as_str)
    }

    /// Number of explicitly registered selectors
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Whether only the implicit default is available
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

impl fmt::Debug for SelectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &'static str) -> Selector {
        Rc::new(move |state: &Value| {
            let mut view = ValueMap::new();
            view.insert(name.to_string(), state.get(name).cloned().unwrap_or_default());
            view
        })
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identity_projects_top_level() {
        let state = Value::from_iter([("a", 1), ("b", 2)]);
        let view = identity()(&state);
        assert_eq!(view.len(), 2);
        assert_eq!(view.get("b"), Some(&Value::Int(2)));
        assert!(identity()(&Value::Int(3)).is_empty());
    }

    #[test]
    fn test_duplicate_and_empty_names_rejected() {
        let mut registry = SelectorRegistry::new();
        registry.register("a", field("a")).unwrap();
        assert!(matches!(
            registry.register("a", field("a")),
            Err(Error::DuplicateSelector(name)) if name == "a"
        ));
        assert!(matches!(
            registry.register("", field("a")),
            Err(Error::EmptySelectorKey)
        ));
    }

    #[test]
    fn test_default_key_falls_back_to_identity() {
        let registry = SelectorRegistry::new();
        let resolved = registry.resolve(&[]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, DEFAULT_KEY);

        let state = Value::from_iter([("x", 1)]);
        assert_eq!((resolved[0].1)(&state).get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_default_key_can_be_overridden() {
        let mut registry = SelectorRegistry::new();
        registry.register(DEFAULT_KEY, field("only")).unwrap();

        let state = Value::from_iter([("only", 1), ("other", 2)]);
        let selector = registry.get(DEFAULT_KEY).unwrap();
        assert_eq!(selector(&state).len(), 1);
    }

    #[test]
    fn test_resolve_skips_unknown_and_repeated() {
        let mut registry = SelectorRegistry::new();
        registry.register("s1", field("a")).unwrap();
        registry.register("s2", field("b")).unwrap();

        let resolved = registry.resolve(&keys(&["s2", "missing", "s1", "s2"]));
        let names: Vec<_> = resolved.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["s2", "s1"]);
    }
}
