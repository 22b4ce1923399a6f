//! Create, edit, and rotate a namespace's files.
//!
//! Framework-free operation layer: each task returns a [`TaskOutcome`] and
//! every failure is a raised [`ConfidantError`] — this module never exits
//! the process or prints anything. The CLI adapter decides how to display
//! outcomes and which exit code to return.
//!
//! Output contract: `key_material` is the only thing destined for stdout
//! (so generated keys can be piped); `notes` are human guidance destined
//! for stderr.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::codec::SecretCodec;
use crate::error::ConfidantError;
use crate::keys::{self, DEFAULT_KEY_FILENAME, KeyPrompt};
use crate::locate::FileLocator;
use crate::paths::PathResolver;
use crate::reality::{CONFIG_BASENAME, SECRETS_BASENAME};

const CONFIG_TEMPLATE: &str = "---\n# Configuration for this namespace.\n";
const SECRETS_TEMPLATE: &str = "---\n# Secrets for this namespace.\n";

/// A file-management operation on a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    CreateConfig,
    CreateSecrets,
    EditConfig,
    EditSecrets,
    RotateSecrets,
}

/// What a task produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskOutcome {
    /// Generated key, if the task produced one. Destined for stdout.
    pub key_material: Option<String>,
    /// Human guidance. Destined for stderr.
    pub notes: Vec<String>,
}

/// Execute `action` against `namespace` with the given environment.
pub fn execute(
    namespace: &str,
    action: &TaskAction,
    env: &BTreeMap<String, String>,
    prompt: &mut dyn KeyPrompt,
) -> Result<TaskOutcome, ConfidantError> {
    let locator = FileLocator::new(PathResolver::new(namespace, env)?);
    match action {
        TaskAction::CreateConfig => create_config(&locator),
        TaskAction::CreateSecrets => create_secrets(&locator),
        TaskAction::EditConfig => edit_config(&locator, env),
        TaskAction::EditSecrets => edit_secrets(&locator, env, prompt),
        TaskAction::RotateSecrets => rotate_secrets(&locator, env, prompt),
    }
}

fn create_config(locator: &FileLocator) -> Result<TaskOutcome, ConfidantError> {
    ensure_absent(locator, CONFIG_BASENAME)?;
    let target = locator.primary_target(CONFIG_BASENAME);
    write_private(&target, CONFIG_TEMPLATE.as_bytes())?;
    Ok(TaskOutcome {
        key_material: None,
        notes: vec![format!("Created {}", target.display())],
    })
}

fn create_secrets(locator: &FileLocator) -> Result<TaskOutcome, ConfidantError> {
    ensure_absent(locator, SECRETS_BASENAME)?;
    let key = SecretCodec::generate_key();
    let codec = SecretCodec::new(&key).map_err(|e| ConfidantError::SecretsFileEncryption {
        detail: e.to_string(),
    })?;
    let sealed = codec
        .encrypt(SECRETS_TEMPLATE.as_bytes())
        .map_err(|e| ConfidantError::SecretsFileEncryption {
            detail: e.to_string(),
        })?;
    let target = locator.primary_target(SECRETS_BASENAME);
    write_private(&target, &sealed)?;
    Ok(TaskOutcome {
        key_material: Some(key),
        notes: vec![
            format!("Created {}", target.display()),
            format!(
                "Store the key in '{}' next to it, or in the {} environment variable — it is not written anywhere.",
                DEFAULT_KEY_FILENAME,
                keys::key_env_var(DEFAULT_KEY_FILENAME)
            ),
        ],
    })
}

fn edit_config(
    locator: &FileLocator,
    env: &BTreeMap<String, String>,
) -> Result<TaskOutcome, ConfidantError> {
    let file = match locator.find(CONFIG_BASENAME) {
        Ok(file) => file,
        Err(ConfidantError::FileNotFound { paths, .. }) => {
            return Err(ConfidantError::MissingConfigFile { paths });
        }
        Err(other) => return Err(other),
    };
    // Permission gate before handing the path to an editor.
    file.read()?;
    run_editor(env, file.path())?;

    let edited = file.read()?;
    serde_yaml::from_str::<serde_yaml::Value>(&edited).map_err(|e| ConfidantError::Parse {
        path: file.path().to_path_buf(),
        source: e,
    })?;
    Ok(TaskOutcome {
        key_material: None,
        notes: vec![format!("Updated {}", file.path().display())],
    })
}

fn edit_secrets(
    locator: &FileLocator,
    env: &BTreeMap<String, String>,
    prompt: &mut dyn KeyPrompt,
) -> Result<TaskOutcome, ConfidantError> {
    let file = match locator.find(SECRETS_BASENAME) {
        Ok(file) => file,
        Err(ConfidantError::FileNotFound { paths, .. }) => {
            return Err(ConfidantError::MissingSecretsFile { paths });
        }
        Err(other) => return Err(other),
    };

    let key = keys::resolve_key(None, DEFAULT_KEY_FILENAME, locator, env, prompt)?;
    let codec = SecretCodec::new(&key).map_err(|e| ConfidantError::SecretsFileDecryption {
        detail: e.to_string(),
    })?;
    let plaintext = codec.decrypt(&file.read_bytes()?).map_err(|_| {
        ConfidantError::SecretsFileDecryption {
            detail: format!(
                "{} could not be decrypted — is the key correct?",
                file.path().display()
            ),
        }
    })?;

    // NamedTempFile is created 0600, and cleans itself up on drop.
    let mut scratch = tempfile::Builder::new()
        .prefix("secrets-")
        .suffix(".yml")
        .tempfile()
        .map_err(|e| ConfidantError::Io {
            path: std::env::temp_dir(),
            source: e,
        })?;
    scratch
        .write_all(&plaintext)
        .map_err(|e| ConfidantError::Io {
            path: scratch.path().to_path_buf(),
            source: e,
        })?;
    scratch.flush().map_err(|e| ConfidantError::Io {
        path: scratch.path().to_path_buf(),
        source: e,
    })?;

    run_editor(env, scratch.path())?;

    let edited = fs::read(scratch.path()).map_err(|e| ConfidantError::Io {
        path: scratch.path().to_path_buf(),
        source: e,
    })?;
    serde_yaml::from_slice::<serde_yaml::Value>(&edited).map_err(|e| ConfidantError::Parse {
        path: scratch.path().to_path_buf(),
        source: e,
    })?;

    let sealed = codec
        .encrypt(&edited)
        .map_err(|e| ConfidantError::SecretsFileEncryption {
            detail: e.to_string(),
        })?;
    write_private(file.path(), &sealed)?;
    Ok(TaskOutcome {
        key_material: None,
        notes: vec![format!("Updated {}", file.path().display())],
    })
}

fn rotate_secrets(
    locator: &FileLocator,
    env: &BTreeMap<String, String>,
    prompt: &mut dyn KeyPrompt,
) -> Result<TaskOutcome, ConfidantError> {
    let file = match locator.find(SECRETS_BASENAME) {
        Ok(file) => file,
        Err(ConfidantError::FileNotFound { paths, .. }) => {
            return Err(ConfidantError::MissingSecretsFile { paths });
        }
        Err(other) => return Err(other),
    };

    let current_key = keys::resolve_key(None, DEFAULT_KEY_FILENAME, locator, env, prompt)?;
    let current =
        SecretCodec::new(&current_key).map_err(|e| ConfidantError::SecretsFileDecryption {
            detail: e.to_string(),
        })?;
    let plaintext = current.decrypt(&file.read_bytes()?).map_err(|_| {
        ConfidantError::SecretsFileDecryption {
            detail: format!(
                "{} could not be decrypted — is the key correct?",
                file.path().display()
            ),
        }
    })?;

    let new_key = SecretCodec::generate_key();
    let next = SecretCodec::new(&new_key).map_err(|e| ConfidantError::SecretsFileEncryption {
        detail: e.to_string(),
    })?;
    let sealed = next
        .encrypt(&plaintext)
        .map_err(|e| ConfidantError::SecretsFileEncryption {
            detail: e.to_string(),
        })?;
    write_private(file.path(), &sealed)?;

    Ok(TaskOutcome {
        key_material: Some(new_key),
        notes: vec![
            format!("Re-encrypted {}", file.path().display()),
            "Replace the stored key everywhere the old one lives.".to_string(),
        ],
    })
}

fn ensure_absent(locator: &FileLocator, basename: &str) -> Result<(), ConfidantError> {
    match locator.find(basename) {
        Ok(file) => Err(ConfidantError::AlreadyExists {
            path: file.path().to_path_buf(),
        }),
        Err(ConfidantError::FileNotFound { .. }) => Ok(()),
        // Ambiguity is its own failure, not an invitation to create a third copy.
        Err(other) => Err(other),
    }
}

/// Write with owner-only permissions from the first byte, not via umask.
fn write_private(path: &Path, content: &[u8]) -> Result<(), ConfidantError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfidantError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| ConfidantError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    file.write_all(content).map_err(|e| ConfidantError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    // mode() only applies at creation; pin it down for overwrites too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
            ConfidantError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    }
    Ok(())
}

fn run_editor(env: &BTreeMap<String, String>, path: &Path) -> Result<(), ConfidantError> {
    let editor = env
        .get("VISUAL")
        .or_else(|| env.get("EDITOR"))
        .cloned()
        .unwrap_or_else(|| "vi".to_string());
    let status = Command::new(&editor)
        .arg(path)
        .status()
        .map_err(|e| ConfidantError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(ConfidantError::Editor { editor })
    }
}
