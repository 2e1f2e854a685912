// crates/interface-tester/src/event.rs
// ============================================================================
// Module: Lifecycle Events
// Description: Declared and resolved lifecycle events for simulated runs.
// Purpose: Separate what a test asks for from what the runtime receives.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Tests declare events either by bare name or by descriptor. A bare
//! relation kind such as `relation-changed` is resolved by the composer into a
//! fully-qualified event bound to one relation instance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Relation Event Kinds
// ============================================================================

/// Relation lifecycle event suffixes.
pub const RELATION_EVENT_KINDS: [&str; 5] = [
    "relation-created",
    "relation-joined",
    "relation-changed",
    "relation-departed",
    "relation-broken",
];

/// Returns true when the name is a bare relation event kind.
#[must_use]
pub fn is_relation_kind(name: &str) -> bool {
    RELATION_EVENT_KINDS.contains(&name)
}

/// Splits `<endpoint>-relation-<kind>` into its endpoint and kind.
#[must_use]
pub fn split_relation_event(name: &str) -> Option<(&str, &str)> {
    RELATION_EVENT_KINDS.iter().find_map(|kind| {
        let endpoint = name.strip_suffix(kind)?.strip_suffix('-')?;
        if endpoint.is_empty() { None } else { Some((endpoint, *kind)) }
    })
}

// ============================================================================
// SECTION: Declared Events
// ============================================================================

/// Event as declared by a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventSpec {
    /// Bare event name.
    Name(String),
    /// Event with explicit relation metadata.
    Descriptor(EventDescriptor),
}

impl EventSpec {
    /// Returns the declared event name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Descriptor(descriptor) => &descriptor.name,
        }
    }
}

impl From<&str> for EventSpec {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl fmt::Display for EventSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Descriptor(descriptor) => match &descriptor.relation {
                Some(relation) => write!(f, "{} ({})", descriptor.name, relation.endpoint),
                None => f.write_str(&descriptor.name),
            },
        }
    }
}

/// Fully-specified event descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventDescriptor {
    /// Event name (bare kind or fully-qualified).
    pub name: String,
    /// Explicit relation binding.
    #[serde(default)]
    pub relation: Option<RelationBinding>,
}

/// Explicit relation binding for a declared event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationBinding {
    /// Endpoint the event is scoped to.
    pub endpoint: String,
    /// Relation identifier, when more than one relation uses the endpoint.
    #[serde(default)]
    pub relation_id: Option<u32>,
    /// Remote unit that triggered the event.
    #[serde(default)]
    pub remote_unit: Option<u32>,
}

// ============================================================================
// SECTION: Resolved Events
// ============================================================================

/// Event delivered to the component runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Fully-qualified event name.
    pub name: String,
    /// Relation the event is scoped to.
    pub relation: Option<BoundRelation>,
}

impl Event {
    /// Creates an event that is not scoped to a relation.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation: None,
        }
    }

    /// Returns the relation kind suffix for relation-scoped events.
    #[must_use]
    pub fn relation_kind(&self) -> Option<&str> {
        self.relation.as_ref()?;
        split_relation_event(&self.name).map(|(_, kind)| kind)
    }
}

/// Relation instance an event is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundRelation {
    /// Endpoint name.
    pub endpoint: String,
    /// Relation identifier in the composed state.
    pub relation_id: u32,
    /// Remote unit that triggered the event.
    pub remote_unit: Option<u32>,
}
