// crates/interface-tester/src/runtime.rs
// ============================================================================
// Module: Component Runtime Interface
// Description: Component metadata and the simulated runtime contract.
// Purpose: Define the seam between the tester and the simulation engine.
// Dependencies: crate::{event, model, loader}, serde, thiserror
// ============================================================================

//! ## Overview
//! The tester never executes component code itself. A [`ComponentRuntime`]
//! implementation wraps the component under test together with the simulation
//! engine, exposes the component's declared endpoints, and plays exactly one
//! event against a state, returning the resulting state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::event::Event;
use crate::loader;
use crate::loader::DocumentError;
use crate::model::InterfaceName;
use crate::model::Role;
use crate::model::State;

// ============================================================================
// SECTION: Component Metadata
// ============================================================================

/// Declared relation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Interface spoken over the endpoint.
    pub interface: InterfaceName,
    /// Optional maximum number of relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Capability metadata declared by a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    /// Component name.
    pub name: String,
    /// Endpoints the component provides.
    #[serde(default)]
    pub provides: BTreeMap<String, EndpointSpec>,
    /// Endpoints the component requires.
    #[serde(default)]
    pub requires: BTreeMap<String, EndpointSpec>,
    /// Peer endpoints.
    #[serde(default)]
    pub peers: BTreeMap<String, EndpointSpec>,
}

/// Errors raised while loading component metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Metadata document could not be read or parsed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Metadata document has the wrong shape.
    #[error("invalid component metadata {path}: {error}")]
    Invalid {
        /// Metadata path.
        path: String,
        /// Deserialization details.
        error: String,
    },
}

impl ComponentMetadata {
    /// Creates metadata with no declared endpoints.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declares a provided endpoint.
    #[must_use]
    pub fn provides(
        mut self,
        endpoint: impl Into<String>,
        interface: impl Into<InterfaceName>,
    ) -> Self {
        self.provides.insert(endpoint.into(), EndpointSpec {
            interface: interface.into(),
            limit: None,
        });
        self
    }

    /// Declares a required endpoint.
    #[must_use]
    pub fn requires(
        mut self,
        endpoint: impl Into<String>,
        interface: impl Into<InterfaceName>,
    ) -> Self {
        self.requires.insert(endpoint.into(), EndpointSpec {
            interface: interface.into(),
            limit: None,
        });
        self
    }

    /// Loads metadata from a YAML, JSON, or RON document.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the document cannot be loaded or parsed.
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let document = loader::load_document(path)?;
        serde_json::from_value(document).map_err(|err| MetadataError::Invalid {
            path: path.display().to_string(),
            error: err.to_string(),
        })
    }

    /// Returns the endpoint table for a role.
    #[must_use]
    pub const fn endpoints(&self, role: Role) -> &BTreeMap<String, EndpointSpec> {
        match role {
            Role::Provider => &self.provides,
            Role::Requirer => &self.requires,
        }
    }

    /// Returns endpoint names declared for the role that use the interface.
    #[must_use]
    pub fn endpoints_for(&self, role: Role, interface: &InterfaceName) -> Vec<&str> {
        self.endpoints(role)
            .iter()
            .filter(|(_, spec)| &spec.interface == interface)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Returns the interface of any declared endpoint.
    #[must_use]
    pub fn interface_of(&self, endpoint: &str) -> Option<&InterfaceName> {
        self.provides
            .get(endpoint)
            .or_else(|| self.requires.get(endpoint))
            .or_else(|| self.peers.get(endpoint))
            .map(|spec| &spec.interface)
    }
}

// ============================================================================
// SECTION: Runtime Contract
// ============================================================================

/// Errors surfaced by a component runtime while playing an event.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The component raised an error while handling the event.
    #[error("component error: {0}")]
    Component(String),
    /// The simulation engine rejected the state or event.
    #[error("simulation error: {0}")]
    Simulation(String),
}

/// Simulated component runtime for a single component under test.
pub trait ComponentRuntime {
    /// Returns the component's declared capability metadata.
    fn metadata(&self) -> &ComponentMetadata;

    /// Plays one event against the state and returns the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the component or the simulation fails.
    fn play(&self, state: &State, event: &Event) -> Result<State, RuntimeError>;
}
