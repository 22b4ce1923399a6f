//! Layered configuration and encrypted secrets for namespaced applications.
//!
//! Confidant resolves a namespace's `config.yml` and encrypted
//! `secrets.yml` from standard search directories, merges environment
//! variables into the config, validates the result against a schema, and
//! hands you an immutable, path-addressable view:
//!
//! ```ignore
//! let reality = Reality::load("my-app")?;
//! let location = reality.fetch("config")?.fetch("location")?;
//! let token = reality.fetch("secrets")?.dig("api.token")?;
//! ```
//!
//! # Where files come from
//!
//! Search directories are XDG-derived and computed once per load:
//! `$XDG_CONFIG_HOME/{namespace}` (default `~/.config/{namespace}`, only
//! when `HOME` is set) followed by each entry of `$XDG_CONFIG_DIRS`
//! (default `/etc/xdg`), in order, suffixed with `/{namespace}`.
//!
//! A basename must resolve to **exactly one** file across those
//! directories. Zero matches and two-plus matches are distinct, fatal
//! errors — a stale copy in a lower-priority directory is surfaced as
//! ambiguity, never silently shadowed. This is a deliberate departure from
//! merge-style config loaders: config and secrets describe one
//! environment, and two files claiming that role is a deployment bug.
//!
//! # Security posture
//!
//! Both files (and the optional `master_key` file) are read through a
//! permission gate: owner read/read-write, optionally group read or
//! read-write, and never any "other" bits. The check runs on every read,
//! and files the companion tasks create are `chmod 600` from the first
//! byte rather than trusting the umask.
//!
//! `secrets.yml` is AES-256-GCM encrypted. The key comes from the first
//! source that yields one: an explicit
//! [`master_key()`](RealityBuilder::master_key) override, the `MASTER_KEY`
//! environment
//! variable, a `master_key` file in the same search paths, or — only on an
//! interactive terminal — a no-echo prompt on stderr. Decryption failure
//! is its own error and never echoes ciphertext or key material.
//!
//! # Layering
//!
//! Environment variables merge into the config scope **additively**: a
//! variable whose lower-cased name is absent from the config file becomes
//! a config key; one that matches an existing key (case-insensitively) is
//! a fatal collision. There is no last-write-wins between the two sources,
//! so a value's origin is always unambiguous.
//!
//! # Scopes
//!
//! The merged data is exposed as [`Scope`]s: immutable, case-insensitive
//! lookup trees in which every nested mapping was wrapped at construction.
//! `fetch` misses name the keys that do exist. For tests, an override
//! layer can shadow entries without touching the base data — see the
//! [`testing`] module; production code never imports it.
//!
//! # Validation
//!
//! After the two scopes are frozen, both are checked against [`Schema`]s.
//! The config schema defaults to "nothing required, unknown keys
//! rejected", with environment-derived keys always admitted; an absent
//! secrets schema requires only that the secrets scope exists. Every
//! violation is reported in one pass.
//!
//! # Companion tasks
//!
//! The [`tasks`] module (and the `clap` adapter in [`TaskCli`], behind the
//! default-on `clap` feature) creates, edits, and rotates the files:
//! generated keys print to stdout for piping, guidance goes to stderr, and
//! abort conditions map to exit code 1. The library itself never exits the
//! process.
//!
//! # Concurrency
//!
//! Loading is single-threaded, synchronous, and may block on the key
//! prompt. A constructed [`Reality`] is immutable and safe to share across
//! readers; the per-scope pretend layer is meant for single-threaded test
//! setup only.

pub mod error;
pub mod schema;
pub mod tasks;
pub mod testing;

#[cfg(feature = "clap")]
mod cli;
mod codec;
mod env;
mod guard;
mod keys;
mod locate;
mod paths;
mod reality;
mod scope;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use cli::{TaskCli, TaskCommand, run};
pub use codec::{CodecError, SecretCodec};
pub use error::{ConfidantError, Violation};
pub use guard::{ALLOWED_MODES, GuardedFile};
pub use keys::{DEFAULT_KEY_FILENAME, KeyPrompt, TerminalPrompt};
pub use locate::FileLocator;
pub use paths::PathResolver;
pub use reality::{CONFIG_BASENAME, Reality, RealityBuilder, SECRETS_BASENAME};
pub use schema::{Kind, Schema};
pub use scope::{Item, Scope};
pub use tasks::{TaskAction, TaskOutcome};
