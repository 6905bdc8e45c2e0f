//! Artifact schema registry.
//!
//! Each schema names the JSON pointers of its media locator fields, a payload
//! check, and whether its primary media may be hashed lazily during a merge.
//! Schemas not in the registry are opaque: their whole payload is scanned
//! for locators.

use std::collections::HashMap;

use serde_json::Value;

use super::locator::LocatorGrammar;

/// Payload check for a schema.
pub type Validator = fn(&Value) -> Result<(), String>;

/// Description of one artifact schema.
#[derive(Debug, Clone)]
pub struct SchemaSpec {
    pub name: String,
    /// JSON pointers of media locator fields; the first is the primary one.
    pub media_fields: Vec<String>,
    pub validate: Validator,
    /// Whether existing artifacts of this schema get their hash computed on demand.
    pub backfill_hash: bool,
}

impl SchemaSpec {
    pub fn new(name: &str, media_fields: &[&str], validate: Validator, backfill_hash: bool) -> Self {
        Self {
            name: name.to_string(),
            media_fields: media_fields.iter().map(|f| (*f).to_string()).collect(),
            validate,
            backfill_hash,
        }
    }
}

fn require_string(payload: &Value, field: &str) -> Result<(), String> {
    match payload.get(field) {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(format!("'{field}' must be a string")),
        None => Err(format!("missing '{field}'")),
    }
}

fn validate_image(payload: &Value) -> Result<(), String> {
    require_string(payload, "imageUrl")
}

fn validate_video(payload: &Value) -> Result<(), String> {
    require_string(payload, "videoUrl")
}

fn validate_text(payload: &Value) -> Result<(), String> {
    require_string(payload, "text")
}

/// Lookup table from schema name to its [`SchemaSpec`].
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, SchemaSpec>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SchemaRegistry {
    /// An empty registry: every schema is opaque.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// The built-in schemas: `image-v1`, `video-v1`, `text-v1`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(SchemaSpec::new("image-v1", &["/imageUrl"], validate_image, true));
        registry.register(SchemaSpec::new(
            "video-v1",
            &["/videoUrl", "/posterUrl"],
            validate_video,
            false,
        ));
        registry.register(SchemaSpec::new("text-v1", &[], validate_text, false));
        registry
    }

    /// Add or replace a schema.
    pub fn register(&mut self, spec: SchemaSpec) {
        self.schemas.insert(spec.name.clone(), spec);
    }

    #[must_use]
    pub fn get(&self, schema: &str) -> Option<&SchemaSpec> {
        self.schemas.get(schema)
    }

    /// Check a payload against its schema. Unknown schemas always pass.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self, schema: &str, payload: &Value) -> Result<(), String> {
        match self.get(schema) {
            Some(spec) => (spec.validate)(payload),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn supports_backfill(&self, schema: &str) -> bool {
        self.get(schema).is_some_and(|spec| spec.backfill_hash)
    }

    /// Blob keys referenced by a payload, primary first, without duplicates.
    #[must_use]
    pub fn media_keys(&self, schema: &str, payload: &Value, grammar: &LocatorGrammar) -> Vec<String> {
        let Some(spec) = self.get(schema) else {
            return grammar.collect(payload);
        };

        let mut keys: Vec<String> = Vec::new();
        for pointer in &spec.media_fields {
            if let Some(key) = payload
                .pointer(pointer)
                .and_then(Value::as_str)
                .and_then(|s| grammar.extract(s))
            {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// The key of the primary media field, if any.
    #[must_use]
    pub fn primary_media_key(
        &self,
        schema: &str,
        payload: &Value,
        grammar: &LocatorGrammar,
    ) -> Option<String> {
        match self.get(schema) {
            Some(spec) => spec
                .media_fields
                .first()
                .and_then(|pointer| payload.pointer(pointer))
                .and_then(Value::as_str)
                .and_then(|s| grammar.extract(s)),
            None => grammar.collect(payload).into_iter().next(),
        }
    }

    /// Rewrite media locators through `replace`. Known schemas only touch
    /// their declared fields.
    pub fn rewrite_media<F>(
        &self,
        schema: &str,
        payload: &mut Value,
        grammar: &LocatorGrammar,
        mut replace: F,
    ) -> usize
    where
        F: FnMut(&str) -> Option<String>,
    {
        let Some(spec) = self.get(schema) else {
            return grammar.rewrite(payload, &mut replace);
        };

        let mut rewritten = 0;
        for pointer in &spec.media_fields {
            if let Some(field) = payload.pointer_mut(pointer) {
                rewritten += grammar.rewrite(field, &mut replace);
            }
        }
        rewritten
    }

    /// Point the primary media field at `key`, for payloads whose original
    /// locator couldn't be parsed. Returns false for opaque schemas.
    pub fn set_primary_media(
        &self,
        schema: &str,
        payload: &mut Value,
        grammar: &LocatorGrammar,
        key: &str,
    ) -> bool {
        let Some(pointer) = self.get(schema).and_then(|spec| spec.media_fields.first()) else {
            return false;
        };
        let locator = Value::String(grammar.render(key));
        if let Some(field) = payload.pointer_mut(pointer) {
            *field = locator;
            return true;
        }
        match (payload, pointer.strip_prefix('/')) {
            (Value::Object(map), Some(name)) if !name.contains('/') => {
                map.insert(name.to_string(), locator);
                true
            }
            _ => false,
        }
    }
}
