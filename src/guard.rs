//! Permission-gated file access.
//!
//! Config and secret files commonly leak through group/world-readable bits
//! inherited from the umask. Every read re-checks the mode bits, so a
//! `chmod` between two reads is caught.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfidantError;

/// Modes a config or secrets file may carry: owner read or read-write,
/// group read, read-write, or nothing. No "other" bits, ever.
pub const ALLOWED_MODES: [u32; 6] = [0o600, 0o640, 0o660, 0o400, 0o440, 0o460];

/// A located file whose reads verify permission bits first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedFile {
    path: PathBuf,
}

impl GuardedFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file as UTF-8 text, after the permission check.
    pub fn read(&self) -> Result<String, ConfidantError> {
        self.check()?;
        fs::read_to_string(&self.path).map_err(|e| ConfidantError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Read the raw bytes, after the permission check.
    pub fn read_bytes(&self) -> Result<Vec<u8>, ConfidantError> {
        self.check()?;
        fs::read(&self.path).map_err(|e| ConfidantError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    #[cfg(unix)]
    fn check(&self) -> Result<(), ConfidantError> {
        use std::os::unix::fs::PermissionsExt;

        let meta = fs::metadata(&self.path).map_err(|e| ConfidantError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        let mode = meta.permissions().mode() & 0o777;
        if ALLOWED_MODES.contains(&mode) {
            Ok(())
        } else {
            Err(ConfidantError::FilePermissions {
                path: self.path.clone(),
                mode,
            })
        }
    }

    // No mode bits to inspect off Unix.
    #[cfg(not(unix))]
    fn check(&self) -> Result<(), ConfidantError> {
        Ok(())
    }
}
