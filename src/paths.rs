//! Search directory computation for a namespace.
//!
//! Directories are derived from an environment mapping captured at
//! construction time, never re-read per call:
//!
//! - the home config base (`XDG_CONFIG_HOME`, default `~/.config`) is
//!   included only when `HOME` is set, and comes first;
//! - the system bases (`XDG_CONFIG_DIRS`, default `/etc/xdg`) follow,
//!   preserving their colon-separated order.
//!
//! Each base is suffixed with `/{namespace}`. The first entry is the
//! "primary" location, used by the create tasks. Variables that are set
//! but empty count as unset, so the list is never empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfidantError;

/// Environment variable naming the user-level config base directory.
pub const HOME_CONFIG_VAR: &str = "XDG_CONFIG_HOME";
/// Environment variable naming the colon-separated system config bases.
pub const SYSTEM_CONFIG_VAR: &str = "XDG_CONFIG_DIRS";
/// Fallback user-level base when `XDG_CONFIG_HOME` is unset.
pub const DEFAULT_HOME_CONFIG: &str = "~/.config";
/// Fallback system base when `XDG_CONFIG_DIRS` is unset.
pub const DEFAULT_SYSTEM_CONFIG: &str = "/etc/xdg";

const HOME_VAR: &str = "HOME";

/// Ordered, immutable search directories for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    namespace: String,
    dirs: Vec<PathBuf>,
}

impl PathResolver {
    /// Compute the search directories for `namespace` from `env`.
    ///
    /// The namespace is validated before any environment access.
    pub fn new(namespace: &str, env: &BTreeMap<String, String>) -> Result<Self, ConfidantError> {
        if namespace.is_empty() {
            return Err(ConfidantError::InvalidNamespace);
        }

        let mut bases: Vec<String> = Vec::new();
        if env.contains_key(HOME_VAR) {
            let home_base = non_empty(env, HOME_CONFIG_VAR).unwrap_or(DEFAULT_HOME_CONFIG);
            bases.push(home_base.to_string());
        }
        let system = non_empty(env, SYSTEM_CONFIG_VAR).unwrap_or(DEFAULT_SYSTEM_CONFIG);
        bases.extend(
            system
                .split(':')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        if bases.is_empty() {
            bases.push(DEFAULT_SYSTEM_CONFIG.to_string());
        }

        let dirs = bases
            .iter()
            .map(|base| expand_tilde(base, env).join(namespace))
            .collect();

        Ok(Self {
            namespace: namespace.to_string(),
            dirs,
        })
    }

    /// Like [`new`](Self::new), capturing the process environment once.
    pub fn from_process_env(namespace: &str) -> Result<Self, ConfidantError> {
        Self::new(namespace, &std::env::vars().collect())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First search directory, where new files are created.
    pub fn primary(&self) -> &Path {
        &self.dirs[0]
    }
}

/// Expand a leading `~` against the `HOME` entry of `env`.
///
/// Only tilde expansion is performed; symlinks and `..` segments are left
/// untouched.
fn expand_tilde(base: &str, env: &BTreeMap<String, String>) -> PathBuf {
    if let Some(home) = env.get(HOME_VAR) {
        if base == "~" {
            return PathBuf::from(home);
        }
        if let Some(rest) = base.strip_prefix("~/") {
            return Path::new(home).join(rest);
        }
    }
    PathBuf::from(base)
}

fn non_empty<'a>(env: &'a BTreeMap<String, String>, var: &str) -> Option<&'a str> {
    env.get(var).map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_namespace_rejected() {
        let result = PathResolver::new("", &env_of(&[("HOME", "/home/u")]));
        assert!(matches!(result, Err(ConfidantError::InvalidNamespace)));
    }

    #[test]
    fn no_home_uses_system_dirs_only() {
        let resolver =
            PathResolver::new("test-app", &env_of(&[("XDG_CONFIG_DIRS", "/a:/b")])).unwrap();
        assert_eq!(
            resolver.dirs(),
            &[PathBuf::from("/a/test-app"), PathBuf::from("/b/test-app")]
        );
    }

    #[test]
    fn home_entry_precedes_system_dirs() {
        let env = env_of(&[
            ("HOME", "/home/u"),
            ("XDG_CONFIG_HOME", "/home/u/.config"),
            ("XDG_CONFIG_DIRS", "/a:/b"),
        ]);
        let resolver = PathResolver::new("app", &env).unwrap();
        assert_eq!(
            resolver.dirs(),
            &[
                PathBuf::from("/home/u/.config/app"),
                PathBuf::from("/a/app"),
                PathBuf::from("/b/app"),
            ]
        );
    }

    #[test]
    fn home_config_defaults_to_tilde_config() {
        let env = env_of(&[("HOME", "/home/u")]);
        let resolver = PathResolver::new("app", &env).unwrap();
        assert_eq!(resolver.primary(), Path::new("/home/u/.config/app"));
    }

    #[test]
    fn system_dirs_default_when_unset() {
        let resolver = PathResolver::new("app", &BTreeMap::new()).unwrap();
        assert_eq!(resolver.dirs(), &[PathBuf::from("/etc/xdg/app")]);
    }

    #[test]
    fn empty_vars_count_as_unset() {
        let env = env_of(&[("HOME", "/home/u"), ("XDG_CONFIG_HOME", ""), ("XDG_CONFIG_DIRS", "")]);
        let resolver = PathResolver::new("app", &env).unwrap();
        assert_eq!(
            resolver.dirs(),
            &[
                PathBuf::from("/home/u/.config/app"),
                PathBuf::from("/etc/xdg/app"),
            ]
        );
    }

    #[test]
    fn colon_order_preserved() {
        let env = env_of(&[("XDG_CONFIG_DIRS", "/z:/m:/a")]);
        let resolver = PathResolver::new("n", &env).unwrap();
        assert_eq!(
            resolver.dirs(),
            &[
                PathBuf::from("/z/n"),
                PathBuf::from("/m/n"),
                PathBuf::from("/a/n"),
            ]
        );
    }

    #[test]
    fn empty_colon_segments_skipped() {
        let env = env_of(&[("XDG_CONFIG_DIRS", "/a::/b:")]);
        let resolver = PathResolver::new("n", &env).unwrap();
        assert_eq!(
            resolver.dirs(),
            &[PathBuf::from("/a/n"), PathBuf::from("/b/n")]
        );
    }

    #[test]
    fn tilde_expands_against_home() {
        let env = env_of(&[("HOME", "/home/u"), ("XDG_CONFIG_DIRS", "~/bases")]);
        let resolver = PathResolver::new("n", &env).unwrap();
        assert_eq!(
            resolver.dirs(),
            &[
                PathBuf::from("/home/u/.config/n"),
                PathBuf::from("/home/u/bases/n"),
            ]
        );
    }

    #[test]
    fn tilde_left_alone_without_home() {
        let env = env_of(&[("XDG_CONFIG_DIRS", "~/bases")]);
        let resolver = PathResolver::new("n", &env).unwrap();
        assert_eq!(resolver.dirs(), &[PathBuf::from("~/bases/n")]);
    }

    #[test]
    fn computed_once_and_stable() {
        let env = env_of(&[("XDG_CONFIG_DIRS", "/a")]);
        let resolver = PathResolver::new("n", &env).unwrap();
        let first = resolver.dirs().to_vec();
        assert_eq!(resolver.dirs(), first.as_slice());
        assert_eq!(resolver.namespace(), "n");
    }
}
