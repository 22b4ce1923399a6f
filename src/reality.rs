//! The aggregate root: locate, decrypt, merge, freeze, validate.
//!
//! A [`Reality`] holds exactly two scopes, `config` and `secrets`, built
//! once during [`RealityBuilder::load`] and never mutated afterwards. All
//! I/O — file reads, decryption, an interactive key prompt if one is needed
//! — happens inline, synchronously, during that single call. Once it
//! returns, the value is immutable and safe to share across concurrent
//! readers without locking. The only post-freeze mutable state is the
//! per-scope pretend layer, which targets a slot distinct from the base
//! mappings (see [`testing`](crate::testing)).
//!
//! Construction itself is not designed for concurrent or reentrant use
//! against evolving file state; that ordering is a caller responsibility.

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::codec::SecretCodec;
use crate::env::overlay;
use crate::error::{ConfidantError, Violation};
use crate::keys::{self, DEFAULT_KEY_FILENAME, KeyPrompt, TerminalPrompt};
use crate::locate::FileLocator;
use crate::paths::PathResolver;
use crate::schema::Schema;
use crate::scope::Scope;

/// Basename of the plaintext configuration file.
pub const CONFIG_BASENAME: &str = "config.yml";
/// Basename of the encrypted secrets file.
pub const SECRETS_BASENAME: &str = "secrets.yml";

/// Frozen configuration and secrets for one namespace.
#[derive(Debug)]
pub struct Reality {
    config: Scope,
    secrets: Scope,
}

impl Reality {
    pub fn builder(namespace: &str) -> RealityBuilder {
        RealityBuilder::new(namespace)
    }

    /// All-defaults shorthand: process environment, `master_key` key file,
    /// no schemas beyond the defaults.
    pub fn load(namespace: &str) -> Result<Reality, ConfidantError> {
        Self::builder(namespace).load()
    }

    pub fn config(&self) -> &Scope {
        &self.config
    }

    pub fn secrets(&self) -> &Scope {
        &self.secrets
    }

    /// Case-insensitive root dispatch: `config`/`configs` and
    /// `secret`/`secrets` are the only valid names.
    pub fn fetch(&self, scope_name: &str) -> Result<&Scope, ConfidantError> {
        match scope_name.to_lowercase().as_str() {
            "config" | "configs" => Ok(&self.config),
            "secret" | "secrets" => Ok(&self.secrets),
            _ => Err(ConfidantError::UnknownScope {
                name: scope_name.to_string(),
            }),
        }
    }
}

/// Builder threading every input explicitly — the decryption key override,
/// schemas, and the environment all travel through here rather than any
/// process-wide state.
pub struct RealityBuilder {
    namespace: String,
    keyfile: String,
    master_key: Option<String>,
    configs_schema: Option<Schema>,
    secrets_schema: Option<Schema>,
    env: Option<BTreeMap<String, String>>,
    prompt: Box<dyn KeyPrompt>,
}

impl RealityBuilder {
    fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            keyfile: DEFAULT_KEY_FILENAME.to_string(),
            master_key: None,
            configs_schema: None,
            secrets_schema: None,
            env: None,
            prompt: Box::new(TerminalPrompt),
        }
    }

    /// Basename of the key file searched alongside config and secrets
    /// (default `master_key`).
    pub fn decryption_keyfile(mut self, name: &str) -> Self {
        self.keyfile = name.to_string();
        self
    }

    /// Explicit decryption key. Skips the key file, the environment
    /// variable, and the prompt entirely.
    pub fn master_key(mut self, key: &str) -> Self {
        self.master_key = Some(key.to_string());
        self
    }

    /// Schema for the config scope. Defaults to "no required keys, unknown
    /// keys rejected"; environment-derived keys are always admitted.
    pub fn configs_schema(mut self, schema: Schema) -> Self {
        self.configs_schema = Some(schema);
        self
    }

    /// Schema for the secrets scope. When absent, only the scope's
    /// existence is required — no deep validation.
    pub fn secrets_schema(mut self, schema: Schema) -> Self {
        self.secrets_schema = Some(schema);
        self
    }

    /// Replace the environment mapping (default: the process environment,
    /// captured once at load).
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Replace the interactive key prompt (default: a no-echo terminal
    /// prompt on stderr).
    pub fn key_prompt(mut self, prompt: Box<dyn KeyPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Load, merge, freeze, and validate.
    pub fn load(mut self) -> Result<Reality, ConfidantError> {
        let env = self.env.take().unwrap_or_else(|| std::env::vars().collect());
        let locator = FileLocator::new(PathResolver::new(&self.namespace, &env)?);

        let (config, env_keys) = self.load_config(&locator, &env)?;
        let secrets = self.load_secrets(&locator, &env)?;

        // Frozen from here: only the per-scope pretend layers stay writable.
        let reality = Reality { config, secrets };
        self.validate(&reality, &env_keys)?;
        Ok(reality)
    }

    fn load_config(
        &self,
        locator: &FileLocator,
        env: &BTreeMap<String, String>,
    ) -> Result<(Scope, Vec<String>), ConfidantError> {
        let file = match locator.find(CONFIG_BASENAME) {
            Ok(file) => file,
            Err(ConfidantError::FileNotFound { paths, .. }) => {
                return Err(ConfidantError::MissingConfigFile { paths });
            }
            Err(other) => return Err(other),
        };
        let mut mapping = decode(&file.read()?, file.path())?;
        let env_keys = overlay(&mut mapping, env)?;
        let scope = Scope::from_mapping(Some(mapping));
        tracing::debug!(namespace = %self.namespace, keys = scope.len(), "config scope built");
        Ok((scope, env_keys))
    }

    fn load_secrets(
        &mut self,
        locator: &FileLocator,
        env: &BTreeMap<String, String>,
    ) -> Result<Scope, ConfidantError> {
        let file = match locator.find(SECRETS_BASENAME) {
            Ok(file) => file,
            Err(ConfidantError::FileNotFound { paths, .. }) => {
                return Err(ConfidantError::MissingSecretsFile { paths });
            }
            Err(other) => return Err(other),
        };

        let key = keys::resolve_key(
            self.master_key.as_deref(),
            &self.keyfile,
            locator,
            env,
            self.prompt.as_mut(),
        )?;
        let codec =
            SecretCodec::new(&key).map_err(|e| ConfidantError::SecretsFileDecryption {
                detail: e.to_string(),
            })?;

        let ciphertext = file.read_bytes()?;
        // Never echo ciphertext or key material into the error.
        let plaintext =
            codec
                .decrypt(&ciphertext)
                .map_err(|_| ConfidantError::SecretsFileDecryption {
                    detail: format!(
                        "{} could not be decrypted — is the key correct?",
                        file.path().display()
                    ),
                })?;
        let text = String::from_utf8(plaintext).map_err(|_| {
            ConfidantError::SecretsFileDecryption {
                detail: format!(
                    "{} decrypted to non-UTF-8 content",
                    file.path().display()
                ),
            }
        })?;

        let scope = Scope::from_mapping(Some(decode(&text, file.path())?));
        tracing::debug!(namespace = %self.namespace, keys = scope.len(), "secrets scope built");
        Ok(scope)
    }

    /// Post-freeze, read-only check of both scopes against their schemas.
    fn validate(&mut self, reality: &Reality, env_keys: &[String]) -> Result<(), ConfidantError> {
        let mut violations: Vec<Violation> = Vec::new();

        let mut config_schema = self.configs_schema.take().unwrap_or_default();
        for key in env_keys {
            config_schema.admit(key);
        }
        violations.extend(prefixed(
            config_schema.validate(&reality.config.to_mapping()),
            "config",
        ));

        // An absent secrets schema requires only that the scope exists,
        // which construction guarantees.
        if let Some(schema) = self.secrets_schema.take() {
            violations.extend(prefixed(
                schema.validate(&reality.secrets.to_mapping()),
                "secrets",
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfidantError::SchemaValidation { violations })
        }
    }
}

/// Decode YAML text to a mapping. Null (and empty) documents decode to an
/// empty mapping; any other non-mapping document is a parse error.
fn decode(text: &str, path: &Path) -> Result<Mapping, ConfidantError> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| ConfidantError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    match value {
        Value::Null => Ok(Mapping::new()),
        other => serde_yaml::from_value(other).map_err(|e| ConfidantError::Parse {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn prefixed(violations: Vec<Violation>, root: &str) -> Vec<Violation> {
    violations
        .into_iter()
        .map(|v| Violation {
            path: format!("{root}.{}", v.path),
            message: v.message,
        })
        .collect()
}
