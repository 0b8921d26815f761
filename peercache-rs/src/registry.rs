//! Provides the registry which keeps all groups of a process.
//!
//! The registry is a simple map from names to [Group]s guarded by a reader/writer lock. It is
//! created once on startup and passed around to everyone who needs access to a group. Groups are
//! never removed, they live as long as the registry.
//!
//! Creating a group is idempotent: once a group with a given name exists, any further call to
//! [Registry::new_group] with that name returns the existing group and discards the given
//! settings and loader.
//!
//! # Examples
//!
//! ```
//! # use std::sync::Arc;
//! # use peercache::group::GetterFunc;
//! # use peercache::registry::Registry;
//! let registry = Registry::new();
//! let first = registry.new_group("scores", 2048, Arc::new(GetterFunc::new(|_| Ok(Vec::new()))));
//! let second = registry.new_group("scores", 4096, Arc::new(GetterFunc::new(|_| Ok(Vec::new()))));
//!
//! // The first writer wins...
//! assert_eq!(Arc::ptr_eq(&first, &second), true);
//! assert_eq!(second.cache_bytes(), 2048);
//!
//! assert_eq!(registry.get_group("scores").is_some(), true);
//! assert_eq!(registry.get_group("unknown").is_none(), true);
//! ```
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;

use crate::config::Settings;
use crate::fmt::format_size;
use crate::group::{Getter, Group};

/// Keeps all groups known to this process.
#[derive(Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Creates a new and empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Registry::default())
    }

    /// Creates a new group or returns the existing one with the given name.
    ///
    /// Note that **cache_bytes** and **getter** are ignored if the group already exists.
    pub fn new_group(&self, name: &str, cache_bytes: usize, getter: Arc<dyn Getter>) -> Arc<Group> {
        let mut groups = self.groups.write();
        if let Some(group) = groups.get(name) {
            return group.clone();
        }

        log::info!(
            "Creating group '{}' with a cache size of {}...",
            name,
            format_size(cache_bytes)
        );
        let group = Arc::new(Group::new(name, cache_bytes, getter));
        let _ = groups.insert(name.to_owned(), group.clone());

        group
    }

    /// Creates a new group (or returns the existing one) using the cache size given in the
    /// settings.
    ///
    /// # Errors
    /// Fails if the settings do not contain a group with the given name.
    ///
    /// # Examples
    /// ```
    /// # use std::sync::Arc;
    /// # use peercache::config::Settings;
    /// # use peercache::group::GetterFunc;
    /// # use peercache::registry::Registry;
    /// let settings = Settings::from_yaml("
    /// groups:
    ///     scores:
    ///         max_memory: 2k
    /// ").unwrap();
    ///
    /// let registry = Registry::new();
    /// let getter = Arc::new(GetterFunc::new(|_| Ok(Vec::new())));
    /// let scores = registry.new_group_from_settings(&settings, "scores", getter.clone()).unwrap();
    /// assert_eq!(scores.cache_bytes(), 2048);
    ///
    /// assert_eq!(registry.new_group_from_settings(&settings, "unknown", getter).is_err(), true);
    /// ```
    pub fn new_group_from_settings(
        &self,
        settings: &Settings,
        name: &str,
        getter: Arc<dyn Getter>,
    ) -> anyhow::Result<Arc<Group>> {
        let group_settings = settings
            .group(name)
            .with_context(|| format!("No settings present for group '{}'.", name))?;

        Ok(self.new_group(name, group_settings.max_memory, getter))
    }

    /// Returns the group with the given name or **None** if no such group exists.
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Returns the names of all known groups in ascending order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();

        names
    }

    /// Returns the number of known groups.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Determines if no group has been created yet.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}
