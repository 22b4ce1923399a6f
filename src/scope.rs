//! Immutable, case-insensitive lookup over decoded configuration data.
//!
//! A [`Scope`] is built once from a decoded mapping. Every nested mapping
//! value is wrapped as a child `Scope` eagerly at construction, so `fetch`
//! chains never re-parse nested structure and immutability is transitive.
//! Keys are stored lower-cased and lookup keys are lower-cased before
//! comparison, so there is a single canonical representation rather than
//! parallel lookup paths.
//!
//! The base mapping never changes after construction. The only mutable slot
//! is the optional "pretend" override layer, which shadows entries for test
//! scenarios and stays writable after the owning [`Reality`](crate::Reality)
//! freezes, because it is distinct from the base mapping. Production code
//! activates it never; test harnesses opt in through
//! [`testing::Pretend`](crate::testing::Pretend).

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_yaml::{Mapping, Value};

use crate::error::ConfidantError;

/// One fetched entry: a nested [`Scope`] or a leaf YAML value.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Scope(Scope),
    Value(Value),
}

impl Item {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Item::Value(v) => v.as_str(),
            Item::Scope(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Item::Value(v) => v.as_i64(),
            Item::Scope(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Item::Value(v) => v.as_f64(),
            Item::Scope(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Item::Value(v) => v.as_bool(),
            Item::Scope(_) => None,
        }
    }

    pub fn as_scope(&self) -> Option<&Scope> {
        match self {
            Item::Scope(s) => Some(s),
            Item::Value(_) => None,
        }
    }

    pub fn into_scope(self) -> Option<Scope> {
        match self {
            Item::Scope(s) => Some(s),
            Item::Value(_) => None,
        }
    }

    fn from_value(value: Value) -> Item {
        match value {
            Value::Mapping(mapping) => Item::Scope(Scope::from_mapping(Some(mapping))),
            other => Item::Value(other),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Item::Scope(scope) => Value::Mapping(scope.to_mapping()),
            Item::Value(value) => value.clone(),
        }
    }
}

/// Immutable, case-insensitive, tree-shaped lookup structure.
#[derive(Debug)]
pub struct Scope {
    base: BTreeMap<String, Item>,
    pretend: Mutex<Option<BTreeMap<String, Item>>>,
}

impl Scope {
    /// Build a scope from a decoded mapping; `None` is treated as empty.
    ///
    /// Construction is the one-time conversion point: nested mappings become
    /// child scopes here, keys are canonicalized here, and the result never
    /// changes afterwards.
    pub fn from_mapping(mapping: Option<Mapping>) -> Self {
        let mut base = BTreeMap::new();
        for (key, value) in mapping.unwrap_or_default() {
            base.insert(normalize_key(&key), Item::from_value(value));
        }
        Self {
            base,
            pretend: Mutex::new(None),
        }
    }

    /// Look up `key`, override layer first, then the base mapping.
    ///
    /// A miss lists the sorted known keys, and the sorted pretend keys when
    /// the override layer is active.
    pub fn fetch(&self, key: &str) -> Result<Item, ConfidantError> {
        let wanted = key.to_lowercase();
        let layer = self.pretend.lock().expect("pretend layer poisoned");
        if let Some(overrides) = layer.as_ref()
            && let Some(item) = overrides.get(&wanted)
        {
            return Ok(item.clone());
        }
        if let Some(item) = self.base.get(&wanted) {
            return Ok(item.clone());
        }
        Err(ConfidantError::KeyNotFound(missing_key_message(
            &wanted,
            &self.base,
            layer.as_ref(),
        )))
    }

    /// Whether `key` resolves in either layer.
    pub fn key_exists(&self, key: &str) -> bool {
        let wanted = key.to_lowercase();
        let layer = self.pretend.lock().expect("pretend layer poisoned");
        layer
            .as_ref()
            .is_some_and(|overrides| overrides.contains_key(&wanted))
            || self.base.contains_key(&wanted)
    }

    /// The sorted base keys. Pretend keys are not included.
    pub fn keys(&self) -> Vec<String> {
        self.base.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Navigate a dotted path through nested scopes, e.g. `"database.url"`.
    pub fn dig(&self, path: &str) -> Result<Item, ConfidantError> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let item = self.fetch(head)?;
        match rest {
            None => Ok(item),
            Some(rest) => match item {
                Item::Scope(child) => child.dig(rest),
                Item::Value(_) => Err(ConfidantError::KeyNotFound(format!(
                    "key not found: :{rest}. :{} is not a nested scope.",
                    head.to_lowercase()
                ))),
            },
        }
    }

    /// Plain nested mapping, with override values winning recursively at
    /// every depth where present.
    pub fn to_mapping(&self) -> Mapping {
        let mut out = Mapping::new();
        for (key, item) in &self.base {
            out.insert(Value::String(key.clone()), item.to_value());
        }
        let layer = self.pretend.lock().expect("pretend layer poisoned");
        if let Some(overrides) = layer.as_ref() {
            for (key, item) in overrides {
                out.insert(Value::String(key.clone()), item.to_value());
            }
        }
        out
    }

    /// Shadow entries over the base mapping. Activates the override layer on
    /// first use; calls accumulate. Exposed through `testing::Pretend`.
    pub(crate) fn pretend_overlay(&self, overrides: Mapping) {
        let mut layer = self.pretend.lock().expect("pretend layer poisoned");
        let map = layer.get_or_insert_with(BTreeMap::new);
        for (key, value) in overrides {
            map.insert(normalize_key(&key), Item::from_value(value));
        }
    }

    /// Deactivate the override layer entirely.
    pub(crate) fn pretend_clear(&self) {
        *self.pretend.lock().expect("pretend layer poisoned") = None;
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        let layer = self.pretend.lock().expect("pretend layer poisoned").clone();
        Self {
            base: self.base.clone(),
            pretend: Mutex::new(layer),
        }
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.base != other.base {
            return false;
        }
        let ours = self.pretend.lock().expect("pretend layer poisoned").clone();
        let theirs = other.pretend.lock().expect("pretend layer poisoned").clone();
        ours == theirs
    }
}

/// Canonical (lower-cased text) form of a YAML mapping key.
pub(crate) fn normalize_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.to_lowercase(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default(),
    }
}

fn missing_key_message(
    key: &str,
    base: &BTreeMap<String, Item>,
    overrides: Option<&BTreeMap<String, Item>>,
) -> String {
    let known = symbol_list(base.keys());
    match overrides {
        None => format!("key not found: :{key}. Known keys are {known}."),
        Some(map) => {
            let pretend = symbol_list(map.keys());
            format!("key not found: :{key}. Known keys are {known}. Pretend keys are {pretend}.")
        }
    }
}

fn symbol_list<'a>(keys: impl Iterator<Item = &'a String>) -> String {
    let list: Vec<String> = keys.map(|k| format!(":{k}")).collect();
    if list.is_empty() {
        "(none)".to_string()
    } else {
        list.join(", ")
    }
}
