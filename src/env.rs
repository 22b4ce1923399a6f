use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::{Mapping, Value};

use crate::error::ConfidantError;
use crate::scope::normalize_key;

/// Every environment variable with its name lower-cased.
///
/// Takes the captured environment mapping so tests can pass synthetic data
/// instead of the process environment.
pub fn env_mapping(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    env.iter()
        .map(|(key, value)| (key.to_lowercase(), value.clone()))
        .collect()
}

/// Overlay environment variables onto a decoded config mapping.
///
/// Any config key equal to an env name after lower-casing both sides is a
/// fatal collision, checked before a single insertion happens. Everything
/// else is strictly additive: env entries are inserted as string values only
/// for keys the config does not define.
///
/// Returns the lower-cased names that were admitted, so the schema layer can
/// permit them as optional fields.
pub fn overlay(
    config: &mut Mapping,
    env: &BTreeMap<String, String>,
) -> Result<Vec<String>, ConfidantError> {
    let vars = env_mapping(env);

    let config_keys: BTreeSet<String> = config.keys().map(normalize_key).collect();
    for key in vars.keys() {
        if config_keys.contains(key) {
            return Err(ConfidantError::EnvConfigCollision { key: key.clone() });
        }
    }

    let mut admitted = Vec::with_capacity(vars.len());
    for (key, value) in vars {
        config.insert(Value::String(key.clone()), Value::String(value));
        admitted.push(key);
    }
    Ok(admitted)
}
