use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// One schema finding: the dot-joined path of the offending key and what
/// went wrong there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfidantError {
    #[error("Namespace must be a non-empty string")]
    InvalidNamespace,

    #[error("Could not find '{basename}' in any of: {}", display_paths(.paths))]
    FileNotFound {
        basename: String,
        paths: Vec<PathBuf>,
    },

    #[error(
        "'{basename}' found in more than one search directory: {} — remove all but one",
        display_paths(.matches)
    )]
    AmbiguousSource {
        basename: String,
        matches: Vec<PathBuf>,
    },

    #[error(
        "Insecure permissions {mode:04o} on {} — fix with: chmod 600 {}",
        .path.display(),
        .path.display()
    )]
    FilePermissions { path: PathBuf, mode: u32 },

    #[error("Missing config file 'config.yml'. Searched: {}", display_paths(.paths))]
    MissingConfigFile { paths: Vec<PathBuf> },

    #[error("Missing secrets file 'secrets.yml'. Searched: {}", display_paths(.paths))]
    MissingSecretsFile { paths: Vec<PathBuf> },

    #[error("Could not decrypt secrets: {detail}")]
    SecretsFileDecryption { detail: String },

    #[error("Could not encrypt secrets: {detail}")]
    SecretsFileEncryption { detail: String },

    #[error(
        "Environment variable '{key}' collides with a config file key — rename the variable or the key"
    )]
    EnvConfigCollision { key: String },

    #[error("Schema validation failed: {}", display_violations(.violations))]
    SchemaValidation { violations: Vec<Violation> },

    #[error("{0}")]
    KeyNotFound(String),

    #[error("Unknown scope '{name}' — valid scopes are 'config' and 'secrets'")]
    UnknownScope { name: String },

    #[error("{} already exists — edit it instead of creating it again", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Editor '{editor}' exited with a failure status")]
    Editor { editor: String },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
