// crates/interface-tester/src/composer.rs
// ============================================================================
// Module: State Composer
// Description: Merge a state template with a test's declared state.
// Purpose: Produce the initial state and the concrete event for one test run.
// Dependencies: crate::{event, model, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! The test case is authoritative for the interface under test; the template
//! supplies everything else the component needs to run. Composition:
//!
//! 1. Start from the template, or an empty state.
//! 2. Drop template relations using the interface, warning when any exist.
//! 3. Add the test state's relations using the interface.
//! 4. When none remain, synthesize one on the single endpoint the component
//!    declares for the role. Zero or several candidates is a configuration
//!    error.
//!
//! Non-relation fields of the test state override the template only where
//! they are set. Interfaces missing from relations are filled from component
//! metadata and missing relation ids are assigned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::event::BoundRelation;
use crate::event::Event;
use crate::event::EventSpec;
use crate::event::RelationBinding;
use crate::event::is_relation_kind;
use crate::event::split_relation_event;
use crate::model::InterfaceName;
use crate::model::Relation;
use crate::model::Role;
use crate::model::State;
use crate::runtime::ComponentMetadata;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors raised before an event is played.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// The component declares no endpoint for the role and interface.
    #[error("component '{component}' declares no {role} endpoint for interface {interface}")]
    NoEndpoint {
        /// Component name.
        component: String,
        /// Role under test.
        role: Role,
        /// Interface under test.
        interface: InterfaceName,
    },
    /// The component declares several endpoints for the role and interface.
    #[error(
        "component '{component}' declares several {role} endpoints for interface {interface} \
         ({}); the test must name one",
        .endpoints.join(", ")
    )]
    AmbiguousEndpoint {
        /// Component name.
        component: String,
        /// Role under test.
        role: Role,
        /// Interface under test.
        interface: InterfaceName,
        /// Candidate endpoints.
        endpoints: Vec<String>,
    },
    /// A relation or event names an endpoint not declared for the role and interface.
    #[error(
        "endpoint '{endpoint}' is not a {role} endpoint for interface {interface} on component \
         '{component}'"
    )]
    UnsupportedEndpoint {
        /// Component name.
        component: String,
        /// Offending endpoint.
        endpoint: String,
        /// Role under test.
        role: Role,
        /// Interface under test.
        interface: InterfaceName,
    },
    /// Two relations share one relation identifier.
    #[error("relation id {0} is used by more than one relation")]
    DuplicateRelationId(u32),
    /// The event targets an endpoint without any relation in the state.
    #[error("event targets endpoint '{0}' but the state has no relation on it")]
    MissingRelation(String),
    /// The event names a relation id that does not exist on the endpoint.
    #[error("no relation {relation_id} on endpoint '{endpoint}'")]
    UnknownRelation {
        /// Endpoint name.
        endpoint: String,
        /// Requested relation identifier.
        relation_id: u32,
    },
    /// The event targets an endpoint with several relations and no relation id.
    #[error("endpoint '{endpoint}' has {count} relations; the event must name a relation id")]
    AmbiguousRelation {
        /// Endpoint name.
        endpoint: String,
        /// Number of relations on the endpoint.
        count: usize,
    },
    /// The event name is scoped to another endpoint than its relation binding.
    #[error("event '{event}' does not belong to endpoint '{endpoint}'")]
    EventMismatch {
        /// Declared event name.
        event: String,
        /// Bound endpoint.
        endpoint: String,
    },
}

// ============================================================================
// SECTION: Composition Context
// ============================================================================

/// What a composition is about: one interface, one role, one component.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    /// Interface under test.
    pub interface: &'a InterfaceName,
    /// Role under test.
    pub role: Role,
    /// Metadata of the component under test.
    pub metadata: &'a ComponentMetadata,
}

impl<'a> Target<'a> {
    /// Creates a composition target.
    #[must_use]
    pub const fn new(
        interface: &'a InterfaceName,
        role: Role,
        metadata: &'a ComponentMetadata,
    ) -> Self {
        Self {
            interface,
            role,
            metadata,
        }
    }

    /// Returns the interface a relation uses, consulting metadata when untagged.
    fn relation_interface<'r>(&'r self, relation: &'r Relation) -> Option<&'r InterfaceName> {
        relation.interface.as_ref().or_else(|| self.metadata.interface_of(&relation.endpoint))
    }

    /// Returns true when the relation uses the interface under test.
    fn uses_interface(&self, relation: &Relation) -> bool {
        self.relation_interface(relation) == Some(self.interface)
    }

    /// Returns the single endpoint declared for the role and interface.
    fn unique_endpoint(&self) -> Result<&'a str, ComposeError> {
        let endpoints = self.metadata.endpoints_for(self.role, self.interface);
        match endpoints.as_slice() {
            [endpoint] => Ok(*endpoint),
            [] => Err(ComposeError::NoEndpoint {
                component: self.metadata.name.clone(),
                role: self.role,
                interface: self.interface.clone(),
            }),
            many => Err(ComposeError::AmbiguousEndpoint {
                component: self.metadata.name.clone(),
                role: self.role,
                interface: self.interface.clone(),
                endpoints: many.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    /// Ensures an endpoint is declared for the role and interface.
    fn check_endpoint(&self, endpoint: &str) -> Result<(), ComposeError> {
        if self.metadata.endpoints_for(self.role, self.interface).contains(&endpoint) {
            return Ok(());
        }
        Err(self.unsupported(endpoint))
    }

    /// Binds a relation declared by the test to an endpoint of the component.
    ///
    /// Catalog tests do not know the component's endpoint names: a relation
    /// tagged with the interface under test whose endpoint is empty or not
    /// declared is moved to the single declared endpoint. Relations on other
    /// interfaces are ignored.
    fn adopt(&self, relation: &Relation) -> Result<Option<Relation>, ComposeError> {
        let mut relation = relation.clone();
        if relation.endpoint.is_empty() && relation.interface.is_none() {
            relation.interface = Some(self.interface.clone());
        }
        if !self.uses_interface(&relation) {
            if self.relation_interface(&relation).is_none() {
                return Err(self.unsupported(&relation.endpoint));
            }
            tracing::warn!(
                interface = %self.interface,
                relation = %relation.label(),
                "ignoring test relation that does not use the interface under test"
            );
            return Ok(None);
        }
        if self.check_endpoint(&relation.endpoint).is_err() {
            if relation.interface.as_ref() != Some(self.interface) {
                return Err(self.unsupported(&relation.endpoint));
            }
            relation.endpoint = self.unique_endpoint()?.to_string();
        }
        Ok(Some(relation))
    }

    /// Builds the error for an endpoint outside the role and interface.
    fn unsupported(&self, endpoint: &str) -> ComposeError {
        ComposeError::UnsupportedEndpoint {
            component: self.metadata.name.clone(),
            endpoint: endpoint.to_string(),
            role: self.role,
            interface: self.interface.clone(),
        }
    }
}

// ============================================================================
// SECTION: State Composition
// ============================================================================

/// Composes the initial state for one test run.
///
/// # Errors
///
/// Returns [`ComposeError`] when no relation can be synthesized, a declared
/// relation uses an endpoint the component does not support, or relation ids
/// collide.
pub fn compose(
    template: Option<&State>,
    test_state: Option<&State>,
    target: &Target<'_>,
) -> Result<State, ComposeError> {
    let mut state = template.cloned().unwrap_or_default();

    let (overridden, kept): (Vec<Relation>, Vec<Relation>) =
        state.relations.drain(..).partition(|relation| target.uses_interface(relation));
    if !overridden.is_empty() {
        let endpoints: Vec<String> = overridden.iter().map(Relation::label).collect();
        tracing::warn!(
            interface = %target.interface,
            relations = %endpoints.join(", "),
            "template relations for the interface under test are overridden by the test"
        );
    }
    state.relations = kept;

    let mut declared = Vec::new();
    if let Some(test_state) = test_state {
        merge_environment(&mut state, test_state);
        for relation in &test_state.relations {
            if let Some(relation) = target.adopt(relation)? {
                declared.push(relation);
            }
        }
    }

    if declared.is_empty() {
        let endpoint = target.unique_endpoint()?;
        tracing::debug!(interface = %target.interface, endpoint, "synthesizing default relation");
        declared.push(Relation::new(endpoint));
    }
    state.relations.extend(declared);

    for relation in &mut state.relations {
        if relation.interface.is_none() {
            relation.interface = target.metadata.interface_of(&relation.endpoint).cloned();
        }
    }
    assign_relation_ids(&mut state.relations)?;
    Ok(state)
}

/// Overrides template environment fields with the ones the test sets.
fn merge_environment(state: &mut State, test_state: &State) {
    if test_state.leader {
        state.leader = true;
    }
    state.config.extend(test_state.config.iter().map(|(k, v)| (k.clone(), v.clone())));
    for container in &test_state.containers {
        match state.containers.iter_mut().find(|existing| existing.name == container.name) {
            Some(existing) => *existing = container.clone(),
            None => state.containers.push(container.clone()),
        }
    }
    state.networks.extend(test_state.networks.iter().map(|(k, v)| (k.clone(), v.clone())));
    if !test_state.unit_status.is_unknown() {
        state.unit_status = test_state.unit_status.clone();
    }
    if !test_state.app_status.is_unknown() {
        state.app_status = test_state.app_status.clone();
    }
}

/// Assigns the lowest free identifiers to relations without one.
fn assign_relation_ids(relations: &mut [Relation]) -> Result<(), ComposeError> {
    let mut used = BTreeSet::new();
    for id in relations.iter().filter_map(|relation| relation.relation_id) {
        if !used.insert(id) {
            return Err(ComposeError::DuplicateRelationId(id));
        }
    }
    let mut next = 1;
    for relation in relations.iter_mut().filter(|relation| relation.relation_id.is_none()) {
        while used.contains(&next) {
            next += 1;
        }
        relation.relation_id = Some(next);
        used.insert(next);
    }
    Ok(())
}

// ============================================================================
// SECTION: Event Resolution
// ============================================================================

/// Resolves a declared event against the composed state.
///
/// # Errors
///
/// Returns [`ComposeError`] when the event cannot be bound to exactly one
/// relation of the interface under test.
pub fn resolve_event(
    spec: &EventSpec,
    state: &State,
    target: &Target<'_>,
) -> Result<Event, ComposeError> {
    match spec {
        EventSpec::Descriptor(descriptor) => match &descriptor.relation {
            Some(binding) => resolve_bound(&descriptor.name, binding, state, target),
            None => resolve_named(&descriptor.name, state, target),
        },
        EventSpec::Name(name) => resolve_named(name, state, target),
    }
}

/// Resolves an event declared by name only.
fn resolve_named(name: &str, state: &State, target: &Target<'_>) -> Result<Event, ComposeError> {
    if is_relation_kind(name) {
        let endpoint = target.unique_endpoint()?;
        return bind(format!("{endpoint}-{name}"), endpoint, None, None, state);
    }
    if let Some((endpoint, _)) = split_relation_event(name) {
        target.check_endpoint(endpoint)?;
        return bind(name.to_string(), endpoint, None, None, state);
    }
    Ok(Event::bare(name))
}

/// Resolves an event carrying an explicit relation binding.
fn resolve_bound(
    name: &str,
    binding: &RelationBinding,
    state: &State,
    target: &Target<'_>,
) -> Result<Event, ComposeError> {
    target.check_endpoint(&binding.endpoint)?;
    let qualified = if is_relation_kind(name) {
        format!("{}-{name}", binding.endpoint)
    } else {
        match split_relation_event(name) {
            Some((endpoint, _)) if endpoint == binding.endpoint => name.to_string(),
            _ => {
                return Err(ComposeError::EventMismatch {
                    event: name.to_string(),
                    endpoint: binding.endpoint.clone(),
                });
            }
        }
    };
    bind(qualified, &binding.endpoint, binding.relation_id, binding.remote_unit, state)
}

/// Binds a relation event to one relation of the state.
fn bind(
    name: String,
    endpoint: &str,
    relation_id: Option<u32>,
    remote_unit: Option<u32>,
    state: &State,
) -> Result<Event, ComposeError> {
    let candidates: Vec<&Relation> = state.relations_for_endpoint(endpoint).collect();
    let relation = match relation_id {
        Some(id) => candidates.iter().find(|relation| relation.relation_id == Some(id)).ok_or_else(
            || ComposeError::UnknownRelation {
                endpoint: endpoint.to_string(),
                relation_id: id,
            },
        )?,
        None => match candidates.as_slice() {
            [relation] => relation,
            [] => return Err(ComposeError::MissingRelation(endpoint.to_string())),
            many => {
                return Err(ComposeError::AmbiguousRelation {
                    endpoint: endpoint.to_string(),
                    count: many.len(),
                });
            }
        },
    };
    let remote_unit = remote_unit.or_else(|| {
        let first = relation.remote_units_data.keys().next().copied();
        needs_remote_unit(&name).then_some(first).flatten()
    });
    Ok(Event {
        relation: relation.relation_id.map(|relation_id| BoundRelation {
            endpoint: endpoint.to_string(),
            relation_id,
            remote_unit,
        }),
        name,
    })
}

/// Returns true for relation events raised on behalf of a remote unit.
fn needs_remote_unit(name: &str) -> bool {
    split_relation_event(name).is_some_and(|(_, kind)| {
        matches!(kind, "relation-joined" | "relation-changed" | "relation-departed")
    })
}
