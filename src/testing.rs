//! Test-only override capability for [`Scope`].
//!
//! Production code never imports this module. A test harness opts in
//! explicitly:
//!
//! ```ignore
//! use confidant::testing::Pretend;
//!
//! reality.fetch("config")?.pretend(overrides);
//! ```
//!
//! Without the import the methods do not exist, so accidental production
//! use fails at compile time with rustc pointing at this trait.

use serde_yaml::Mapping;

use crate::scope::Scope;

/// Shadow entries of a [`Scope`] without touching its immutable base.
pub trait Pretend {
    /// Overlay `overrides` on the scope. Activates the override layer on
    /// first use; repeated calls accumulate. Keys are normalized the same
    /// way base keys are, and mapping values are wrapped as child scopes.
    fn pretend(&self, overrides: Mapping);

    /// Drop the override layer entirely, restoring base-only lookups.
    fn clear_pretend(&self);
}

impl Pretend for Scope {
    fn pretend(&self, overrides: Mapping) {
        self.pretend_overlay(overrides);
    }

    fn clear_pretend(&self) {
        self.pretend_clear();
    }
}
