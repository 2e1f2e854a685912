// crates/interface-tester/src/registry.rs
// ============================================================================
// Module: Test Case Registry
// Description: Indexed collection of interface test cases.
// Purpose: Register test cases per (interface, version, role) and serve lookups.
// Dependencies: crate::{model, testcase}, tracing
// ============================================================================

//! ## Overview
//! The registry is an explicit value threaded through discovery rather than
//! process-wide state. Cases are append-only once registered and the registry
//! hands out shared references only.
//!
//! Identity of a registration is its key, its name, and the file it came from.
//! Registering the same identity twice is a no-op, so repeated discovery over
//! the same tree never grows the registry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::model::InterfaceName;
use crate::model::Role;
use crate::model::TestKey;
use crate::testcase::InterfaceTestCase;

// ============================================================================
// SECTION: Registration Outcome
// ============================================================================

/// Outcome of a registration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The case was appended.
    Added,
    /// An identical registration already exists; nothing changed.
    AlreadyRegistered,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Test cases indexed by interface, version, and role.
///
/// # Invariants
/// - Cases under one key keep registration order.
/// - No two cases under one key share both name and source.
#[derive(Debug, Default, Clone)]
pub struct TestCaseRegistry {
    /// Registered cases keyed by interface, version, and role.
    cases: BTreeMap<TestKey, Vec<InterfaceTestCase>>,
}

impl TestCaseRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a test case under its key.
    pub fn register(&mut self, case: InterfaceTestCase) -> Registration {
        let entries = self.cases.entry(case.key.clone()).or_default();
        let same_name: Vec<&InterfaceTestCase> =
            entries.iter().filter(|existing| existing.name == case.name).collect();
        if same_name.iter().any(|existing| existing.source == case.source) {
            tracing::debug!(key = %case.key, name = %case.name, "test case already registered");
            return Registration::AlreadyRegistered;
        }
        if let Some(previous) = same_name.first() {
            tracing::warn!(
                key = %case.key,
                name = %case.name,
                previous = %source_label(previous),
                source = %source_label(&case),
                "test case name registered from more than one source"
            );
        }
        entries.push(case);
        Registration::Added
    }

    /// Returns the cases registered for an interface, version, and role.
    #[must_use]
    pub fn get(&self, interface: &InterfaceName, version: u32, role: Role) -> &[InterfaceTestCase] {
        self.get_key(&TestKey::new(interface.clone(), version, role))
    }

    /// Returns the cases registered under a key.
    #[must_use]
    pub fn get_key(&self, key: &TestKey) -> &[InterfaceTestCase] {
        self.cases.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns the registered keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &TestKey> {
        self.cases.keys()
    }

    /// Iterates over every registered case in key order.
    pub fn iter(&self) -> impl Iterator<Item = &InterfaceTestCase> {
        self.cases.values().flatten()
    }

    /// Returns the total number of registered cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.values().map(Vec::len).sum()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.values().all(Vec::is_empty)
    }
}

/// Formats the source of a case for log output.
fn source_label(case: &InterfaceTestCase) -> String {
    case.source.as_ref().map_or_else(|| "<inline>".to_string(), |path| path.display().to_string())
}
