//! PDF print options.
//!
//! Options are a free-form JSON object handed to the browser's print call.
//! The defaults below are always present; caller options replace them key by key
//! and may add keys the defaults don't mention (e.g. `scale`, `format`).

use serde::Serialize;
use serde_json::{Map, Value};

/// Print options sent with every render request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PrintOptions(Map<String, Value>);

impl Default for PrintOptions {
    fn default() -> Self {
        let mut map = Map::new();
        map.insert("landscape".into(), Value::Bool(false));
        map.insert("displayHeaderFooter".into(), Value::Bool(false));
        map.insert("printBackground".into(), Value::Bool(true));
        map.insert("preferCSSPageSize".into(), Value::Bool(true));
        Self(map)
    }
}

impl PrintOptions {
    /// Apply caller overrides on top of the current options.
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        for (key, value) in overrides {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Boolean option lookup; `None` if absent or not a bool.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn defaults() {
        let opts = PrintOptions::default();
        assert_eq!(opts.flag("landscape"), Some(false));
        assert_eq!(opts.flag("displayHeaderFooter"), Some(false));
        assert_eq!(opts.flag("printBackground"), Some(true));
        assert_eq!(opts.flag("preferCSSPageSize"), Some(true));
        assert_eq!(opts.as_map().len(), 4);
    }

    #[test]
    fn overrides_replace_only_given_keys() {
        let mut overrides = BTreeMap::new();
        overrides.insert("landscape".to_string(), Value::Bool(true));
        overrides.insert("scale".to_string(), serde_json::json!(0.8));

        let opts = PrintOptions::default().with_overrides(&overrides);

        assert_eq!(opts.flag("landscape"), Some(true));
        assert_eq!(opts.flag("printBackground"), Some(true));
        assert_eq!(opts.get("scale"), Some(&serde_json::json!(0.8)));
        assert_eq!(opts.as_map().len(), 5);
    }

    #[test]
    fn serializes_as_plain_object() {
        let json = serde_json::to_value(PrintOptions::default()).unwrap();
        assert_eq!(json["preferCSSPageSize"], Value::Bool(true));
        assert!(json.is_object());
    }
}
