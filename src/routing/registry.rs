//! Registration records.
//!
//! The registry is created once at set-up, handed to the registrar, and only
//! written while objects are registered. It always mirrors what is mounted:
//! a verb taken over by a later method is dropped from the earlier record,
//! and a method left without routes has no entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routing::route::Verb;

/// Precedence when two registrations collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the first registration; later ones are logged and ignored.
    #[default]
    FirstWins,
    /// Replace the earlier registration.
    LastWins,
}

/// One mounted route of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub object: String,
    pub method: String,
    pub path: String,
    pub verbs: Vec<Verb>,
}

impl RegistrationRecord {
    pub fn key(&self) -> String {
        format!("{}.{}", self.object, self.method)
    }
}

/// Routes bound so far, keyed by `object.method`.
#[derive(Debug, Default)]
pub struct Registry {
    records: BTreeMap<String, Vec<RegistrationRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&[RegistrationRecord]> {
        self.records.get(key).map(Vec::as_slice)
    }

    /// Record every route of one method, replacing what the key held before.
    pub fn insert(&mut self, key: String, records: Vec<RegistrationRecord>) {
        self.records.insert(key, records);
    }

    /// Forget every route of `key`.
    pub fn remove(&mut self, key: &str) -> Option<Vec<RegistrationRecord>> {
        self.records.remove(key)
    }

    /// Forget `verb` on `path` for `key`, dropping records left without verbs.
    ///
    /// Returns whether anything was removed.
    pub fn remove_verb(&mut self, key: &str, path: &str, verb: Verb) -> bool {
        let Some(records) = self.records.get_mut(key) else {
            return false;
        };

        let mut removed = false;
        for record in records.iter_mut().filter(|r| r.path == path) {
            let before = record.verbs.len();
            record.verbs.retain(|v| *v != verb);
            removed |= record.verbs.len() != before;
        }
        records.retain(|r| !r.verbs.is_empty());
        if records.is_empty() {
            self.records.remove(key);
        }
        removed
    }

    /// Number of distinct `object.method` keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistrationRecord> {
        self.records.values().flatten()
    }
}
