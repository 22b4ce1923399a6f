//! Unique file resolution across the namespace search directories.
//!
//! A basename resolves to exactly one of three outcomes: a single existing
//! file, not-found, or ambiguous (two or more candidates). Silently picking
//! the first match would cause confusing drift when a stale file lingers in
//! a lower-priority directory, so ambiguity is surfaced, never resolved
//! heuristically.

use std::path::PathBuf;

use crate::error::ConfidantError;
use crate::guard::GuardedFile;
use crate::paths::PathResolver;

/// Finds exactly one file matching a basename within the search directories.
#[derive(Debug, Clone)]
pub struct FileLocator {
    resolver: PathResolver,
}

impl FileLocator {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn namespace(&self) -> &str {
        self.resolver.namespace()
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        self.resolver.dirs()
    }

    /// Path where a new `basename` would be created. Purely computed; the
    /// filesystem is not touched.
    pub fn primary_target(&self, basename: &str) -> PathBuf {
        self.resolver.primary().join(basename)
    }

    /// Resolve `basename` to exactly one existing file, wrapped for
    /// permission-checked access.
    pub fn find(&self, basename: &str) -> Result<GuardedFile, ConfidantError> {
        let mut matches: Vec<PathBuf> = self
            .resolver
            .dirs()
            .iter()
            .map(|dir| dir.join(basename))
            .filter(|candidate| candidate.is_file())
            .collect();

        match matches.len() {
            0 => Err(ConfidantError::FileNotFound {
                basename: basename.to_string(),
                paths: self.resolver.dirs().to_vec(),
            }),
            1 => {
                let path = matches.remove(0);
                tracing::debug!(basename, path = %path.display(), "file located");
                Ok(GuardedFile::new(path))
            }
            _ => Err(ConfidantError::AmbiguousSource {
                basename: basename.to_string(),
                matches,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn locator_over(dirs: &[&TempDir], namespace: &str) -> FileLocator {
        let bases: Vec<String> = dirs
            .iter()
            .map(|d| d.path().to_str().unwrap().to_string())
            .collect();
        let env: BTreeMap<String, String> =
            [("XDG_CONFIG_DIRS".to_string(), bases.join(":"))].into();
        for dir in dirs {
            fs::create_dir_all(dir.path().join(namespace)).unwrap();
        }
        FileLocator::new(PathResolver::new(namespace, &env).unwrap())
    }

    #[test]
    fn unique_match_found() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let locator = locator_over(&[&a, &b], "app");
        fs::write(b.path().join("app/config.yml"), "x: 1\n").unwrap();

        let file = locator.find("config.yml").unwrap();
        assert_eq!(file.path(), b.path().join("app/config.yml"));
    }

    #[test]
    fn not_found_names_basename_and_paths() {
        let a = TempDir::new().unwrap();
        let locator = locator_over(&[&a], "app");

        match locator.find("config.yml") {
            Err(ConfidantError::FileNotFound { basename, paths }) => {
                assert_eq!(basename, "config.yml");
                assert_eq!(paths, locator.search_dirs());
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn two_matches_are_ambiguous() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let locator = locator_over(&[&a, &b], "app");
        fs::write(a.path().join("app/config.yml"), "x: 1\n").unwrap();
        fs::write(b.path().join("app/config.yml"), "x: 2\n").unwrap();

        match locator.find("config.yml") {
            Err(ConfidantError::AmbiguousSource { basename, matches }) => {
                assert_eq!(basename, "config.yml");
                // Matches come back in search-path order.
                assert_eq!(
                    matches,
                    vec![
                        a.path().join("app/config.yml"),
                        b.path().join("app/config.yml"),
                    ]
                );
            }
            other => panic!("expected AmbiguousSource, got {other:?}"),
        }
    }

    #[test]
    fn directory_with_matching_name_is_not_a_match() {
        let a = TempDir::new().unwrap();
        let locator = locator_over(&[&a], "app");
        fs::create_dir_all(a.path().join("app/config.yml")).unwrap();

        assert!(matches!(
            locator.find("config.yml"),
            Err(ConfidantError::FileNotFound { .. })
        ));
    }

    #[test]
    fn primary_target_is_first_dir() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let locator = locator_over(&[&a, &b], "app");
        assert_eq!(
            locator.primary_target("secrets.yml"),
            a.path().join("app/secrets.yml")
        );
    }
}
