//! Decryption key resolution.
//!
//! The key for the secrets file comes from the first source that yields a
//! value, with no fallthrough once one does:
//!
//! 1. an explicit in-process override, threaded through the builder;
//! 2. an environment variable named after the key file (`master_key` →
//!    `MASTER_KEY`);
//! 3. the key file itself, found in the same namespace search paths as the
//!    config and secrets files, permission-checked and whitespace-trimmed;
//! 4. an interactive no-echo prompt, only when the key file is missing and
//!    the input stream is a terminal.
//!
//! An explicitly empty override is passed through untouched; the codec
//! rejects it, so an empty key surfaces as an encryption/decryption error
//! rather than being silently skipped.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal};

use crate::error::{ConfidantError, display_paths};
use crate::locate::FileLocator;

/// Default key file basename.
pub const DEFAULT_KEY_FILENAME: &str = "master_key";

/// Seam for interactive key entry, so tests can substitute a stub.
pub trait KeyPrompt {
    /// Whether the input stream supports prompting at all.
    fn is_interactive(&self) -> bool;

    /// Prompt on the status stream and read one line without echo.
    fn read_key(&mut self, prompt: &str) -> io::Result<String>;
}

/// Prompts on stderr and reads from the terminal without echo.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl KeyPrompt for TerminalPrompt {
    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn read_key(&mut self, prompt: &str) -> io::Result<String> {
        eprint!("{prompt}");
        rpassword::read_password()
    }
}

/// Resolve the secrets decryption key (see the module docs for the order).
///
/// Ambiguity and permission errors while locating the key file propagate
/// unchanged; only the not-found outcome falls through to the prompt.
pub fn resolve_key(
    explicit: Option<&str>,
    filename: &str,
    locator: &FileLocator,
    env: &BTreeMap<String, String>,
    prompt: &mut dyn KeyPrompt,
) -> Result<String, ConfidantError> {
    if let Some(key) = explicit {
        tracing::debug!("decryption key from explicit override");
        return Ok(key.to_string());
    }

    let var = key_env_var(filename);
    if let Some(key) = env.get(&var) {
        tracing::debug!(%var, "decryption key from environment");
        return Ok(key.trim().to_string());
    }

    match locator.find(filename) {
        Ok(file) => {
            tracing::debug!(path = %file.path().display(), "decryption key from key file");
            Ok(file.read()?.trim().to_string())
        }
        Err(ConfidantError::FileNotFound { basename, paths }) => {
            if prompt.is_interactive() {
                let line = prompt
                    .read_key(&format!("Enter the decryption key for '{basename}': "))
                    .map_err(|e| ConfidantError::SecretsFileDecryption {
                        detail: format!("failed to read key from terminal: {e}"),
                    })?;
                Ok(line.trim().to_string())
            } else {
                Err(ConfidantError::SecretsFileDecryption {
                    detail: format!(
                        "no key file '{basename}' in any of: {} and no terminal to prompt on",
                        display_paths(&paths)
                    ),
                })
            }
        }
        Err(other) => Err(other),
    }
}

/// Environment variable name for a key file: upper-cased, with
/// non-alphanumerics mapped to `_`.
pub fn key_env_var(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::paths::PathResolver;

    struct StubPrompt {
        interactive: bool,
        reply: Option<String>,
    }

    impl KeyPrompt for StubPrompt {
        fn is_interactive(&self) -> bool {
            self.interactive
        }

        fn read_key(&mut self, _prompt: &str) -> io::Result<String> {
            self.reply
                .take()
                .ok_or_else(|| io::Error::other("no reply configured"))
        }
    }

    fn locator_in(dir: &TempDir) -> (FileLocator, BTreeMap<String, String>) {
        let env: BTreeMap<String, String> = [(
            "XDG_CONFIG_DIRS".to_string(),
            dir.path().to_str().unwrap().to_string(),
        )]
        .into();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        (
            FileLocator::new(PathResolver::new("app", &env).unwrap()),
            env,
        )
    }

    fn no_prompt() -> StubPrompt {
        StubPrompt {
            interactive: false,
            reply: None,
        }
    }

    #[test]
    fn explicit_override_wins() {
        let dir = TempDir::new().unwrap();
        let (locator, mut env) = locator_in(&dir);
        env.insert("MASTER_KEY".into(), "from-env".into());

        let key = resolve_key(
            Some("explicit"),
            DEFAULT_KEY_FILENAME,
            &locator,
            &env,
            &mut no_prompt(),
        )
        .unwrap();
        assert_eq!(key, "explicit");
    }

    #[test]
    fn explicit_empty_string_passes_through() {
        let dir = TempDir::new().unwrap();
        let (locator, env) = locator_in(&dir);
        let key = resolve_key(Some(""), DEFAULT_KEY_FILENAME, &locator, &env, &mut no_prompt())
            .unwrap();
        assert_eq!(key, "");
    }

    #[test]
    fn env_var_beats_key_file() {
        let dir = TempDir::new().unwrap();
        let (locator, mut env) = locator_in(&dir);
        fs::write(dir.path().join("app/master_key"), "from-file\n").unwrap();
        env.insert("MASTER_KEY".into(), " from-env \n".into());

        let key = resolve_key(None, DEFAULT_KEY_FILENAME, &locator, &env, &mut no_prompt())
            .unwrap();
        assert_eq!(key, "from-env");
    }

    #[cfg(unix)]
    #[test]
    fn key_file_content_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let (locator, env) = locator_in(&dir);
        let path = dir.path().join("app/master_key");
        fs::write(&path, "  sekrit \n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        }

        let key = resolve_key(None, DEFAULT_KEY_FILENAME, &locator, &env, &mut no_prompt())
            .unwrap();
        assert_eq!(key, "sekrit");
    }

    #[test]
    fn missing_file_prompts_when_interactive() {
        let dir = TempDir::new().unwrap();
        let (locator, env) = locator_in(&dir);
        let mut prompt = StubPrompt {
            interactive: true,
            reply: Some("typed-in\n".into()),
        };

        let key = resolve_key(None, DEFAULT_KEY_FILENAME, &locator, &env, &mut prompt).unwrap();
        assert_eq!(key, "typed-in");
    }

    #[test]
    fn missing_file_without_terminal_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (locator, env) = locator_in(&dir);

        let err = resolve_key(None, DEFAULT_KEY_FILENAME, &locator, &env, &mut no_prompt())
            .unwrap_err();
        match err {
            ConfidantError::SecretsFileDecryption { detail } => {
                assert!(detail.contains("master_key"), "{detail}");
                assert!(detail.contains(dir.path().to_str().unwrap()), "{detail}");
            }
            other => panic!("expected SecretsFileDecryption, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn insecure_key_file_does_not_fall_through_to_prompt() {
        let dir = TempDir::new().unwrap();
        let (locator, env) = locator_in(&dir);
        let path = dir.path().join("app/master_key");
        fs::write(&path, "sekrit\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        }
        let mut prompt = StubPrompt {
            interactive: true,
            reply: Some("never-used".into()),
        };

        let err =
            resolve_key(None, DEFAULT_KEY_FILENAME, &locator, &env, &mut prompt).unwrap_err();
        assert!(matches!(err, ConfidantError::FilePermissions { .. }));
    }

    #[test]
    fn alternate_filename_gets_its_own_variable() {
        assert_eq!(key_env_var("master_key"), "MASTER_KEY");
        assert_eq!(key_env_var("staging.key"), "STAGING_KEY");
        assert_eq!(key_env_var("k2"), "K2");
    }
}
