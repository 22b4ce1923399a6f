//! Declarative schema validation for merged scopes.
//!
//! A [`Schema`] names the keys a mapping may carry and what shape each one
//! has. Validation walks the whole tree and reports **every** violation in
//! one pass, so a user fixing a config file sees the full list instead of
//! replaying load-fail cycles.
//!
//! Schemas are plain data (`serde` derives), so they can be built in code or
//! deserialized from YAML:
//!
//! ```ignore
//! let schema: Schema = serde_yaml::from_str(
//!     "required:\n  host: string\nallow_unknown: false\n",
//! )?;
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::Violation;
use crate::scope::normalize_key;

/// Shape constraint for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Any,
    String,
    Integer,
    Float,
    Bool,
    Sequence,
    Mapping,
}

impl Kind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Kind::Any => true,
            Kind::String => value.is_string(),
            Kind::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
            Kind::Float => value.as_f64().is_some(),
            Kind::Bool => value.is_bool(),
            Kind::Sequence => value.is_sequence(),
            Kind::Mapping => value.is_mapping(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Kind::Any => "any value",
            Kind::String => "a string",
            Kind::Integer => "an integer",
            Kind::Float => "a number",
            Kind::Bool => "a boolean",
            Kind::Sequence => "a sequence",
            Kind::Mapping => "a mapping",
        }
    }
}

/// Keys a mapping may carry. Unknown keys are rejected unless
/// `allow_unknown` is set; `nested` entries are required mappings validated
/// recursively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    required: BTreeMap<String, Kind>,
    optional: BTreeMap<String, Kind>,
    nested: BTreeMap<String, Schema>,
    allow_unknown: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, key: &str, kind: Kind) -> Self {
        self.required.insert(key.to_lowercase(), kind);
        self
    }

    pub fn optional(mut self, key: &str, kind: Kind) -> Self {
        self.optional.insert(key.to_lowercase(), kind);
        self
    }

    pub fn nested(mut self, key: &str, schema: Schema) -> Self {
        self.nested.insert(key.to_lowercase(), schema);
        self
    }

    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    /// Permit `key` as an optional free-form field. Used to admit
    /// environment-derived keys without loosening the rest of the schema.
    pub(crate) fn admit(&mut self, key: &str) {
        let key = key.to_lowercase();
        if !self.required.contains_key(&key) && !self.nested.contains_key(&key) {
            self.optional.insert(key, Kind::Any);
        }
    }

    /// Validate `mapping`, collecting every violation instead of stopping at
    /// the first.
    pub fn validate(&self, mapping: &Mapping) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.validate_at(mapping, "", &mut violations);
        violations
    }

    fn validate_at(&self, mapping: &Mapping, prefix: &str, out: &mut Vec<Violation>) {
        let mut present: BTreeMap<String, &Value> = BTreeMap::new();
        for (key, value) in mapping {
            present.insert(normalize_key(key), value);
        }

        for (key, kind) in &self.required {
            match present.get(key) {
                None => out.push(Violation {
                    path: join(prefix, key),
                    message: "required key is missing".into(),
                }),
                Some(value) if !kind.matches(value) => out.push(Violation {
                    path: join(prefix, key),
                    message: format!("expected {}", kind.describe()),
                }),
                Some(_) => {}
            }
        }

        for (key, kind) in &self.optional {
            if let Some(value) = present.get(key)
                && !kind.matches(value)
            {
                out.push(Violation {
                    path: join(prefix, key),
                    message: format!("expected {}", kind.describe()),
                });
            }
        }

        for (key, schema) in &self.nested {
            match present.get(key) {
                None => out.push(Violation {
                    path: join(prefix, key),
                    message: "required key is missing".into(),
                }),
                Some(Value::Mapping(child)) => {
                    schema.validate_at(child, &join(prefix, key), out);
                }
                Some(_) => out.push(Violation {
                    path: join(prefix, key),
                    message: "expected a nested mapping".into(),
                }),
            }
        }

        if !self.allow_unknown {
            for key in present.keys() {
                if !self.required.contains_key(key)
                    && !self.optional.contains_key(key)
                    && !self.nested.contains_key(key)
                {
                    out.push(Violation {
                        path: join(prefix, key),
                        message: "unknown key".into(),
                    });
                }
            }
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
