//! Media locators.
//!
//! A locator is a string inside a JSON payload that identifies a blob. Three
//! shapes are recognised, for a prefix `artifacts` and proxy `/api/upload-proxy`:
//!
//! - `/artifacts/<id>.<ext>`
//! - `https://host/artifacts/<id>.<ext>`
//! - `https://host/api/upload-proxy?key=artifacts/<id>.<ext>`
//!
//! Anything else is not a locator. Keys are rendered back in the first shape.

use serde_json::Value;
use url::Url;

use crate::config::ExchangeConfig;

/// Parser and renderer for media locators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorGrammar {
    prefix: String,
    proxy_path: String,
    key_param: String,
}

impl Default for LocatorGrammar {
    fn default() -> Self {
        Self::from_config(&ExchangeConfig::default())
    }
}

impl LocatorGrammar {
    #[must_use]
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self {
            prefix: config.blob_prefix.trim_matches('/').to_string(),
            proxy_path: format!("/{}", config.proxy_path.trim_matches('/')),
            key_param: config.proxy_key_param.clone(),
        }
    }

    /// The blob key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key_from_path(&self, path: &str) -> Option<String> {
        let key = path.strip_prefix('/')?;
        let rest = key.strip_prefix(self.prefix.as_str())?.strip_prefix('/')?;
        (!rest.is_empty()).then(|| key.to_string())
    }

    /// Extract the blob key a locator string points at.
    #[must_use]
    pub fn extract(&self, locator: &str) -> Option<String> {
        if locator.starts_with('/') {
            return self.key_from_path(locator);
        }

        let url = Url::parse(locator).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        if url.path() == self.proxy_path {
            return url
                .query_pairs()
                .find(|(name, _)| name == self.key_param.as_str())
                .map(|(_, value)| value.trim_start_matches('/').to_string())
                .filter(|key| !key.is_empty());
        }

        self.key_from_path(url.path())
    }

    /// Render a blob key as a locator.
    #[must_use]
    pub fn render(&self, key: &str) -> String {
        format!("/{}", key.trim_start_matches('/'))
    }

    /// Every blob key referenced anywhere inside `value`, in document order,
    /// without duplicates.
    #[must_use]
    pub fn collect(&self, value: &Value) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_into(value, &mut keys);
        keys
    }

    /// Like [`collect`](Self::collect), appending to an existing list.
    pub fn collect_into(&self, value: &Value, keys: &mut Vec<String>) {
        match value {
            Value::String(s) => {
                if let Some(key) = self.extract(s) {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.collect_into(item, keys);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    self.collect_into(item, keys);
                }
            }
            _ => {}
        }
    }

    /// Rewrite every locator in `value` whose key `replace` maps to a new key.
    ///
    /// Returns the number of strings rewritten.
    pub fn rewrite<F>(&self, value: &mut Value, replace: &mut F) -> usize
    where
        F: FnMut(&str) -> Option<String>,
    {
        match value {
            Value::String(s) => match self.extract(s).and_then(|key| replace(&key)) {
                Some(new_key) => {
                    *s = self.render(&new_key);
                    1
                }
                None => 0,
            },
            Value::Array(items) => items.iter_mut().map(|v| self.rewrite(v, &mut *replace)).sum(),
            Value::Object(map) => map.values_mut().map(|v| self.rewrite(v, &mut *replace)).sum(),
            _ => 0,
        }
    }
}
