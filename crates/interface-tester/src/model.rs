// crates/interface-tester/src/model.rs
// ============================================================================
// Module: Interface Tester Model
// Description: Roles, test keys, relation instances, and simulated state.
// Purpose: Provide serializable types shared by loaders, composer, and executor.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The simulated state mirrors the environment a component instance observes:
//! relation instances with their databags, leadership, configuration, workload
//! containers, network bindings, and statuses. All collections are ordered so
//! composed states and reports are deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Remote application name used when a relation does not declare one.
pub const DEFAULT_REMOTE_APP: &str = "remote";

// ============================================================================
// SECTION: Roles and Keys
// ============================================================================

/// One side of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Side that publishes the interface.
    Provider,
    /// Side that consumes the interface.
    Requirer,
}

impl Role {
    /// All roles in canonical order.
    pub const ALL: [Self; 2] = [Self::Provider, Self::Requirer];

    /// Returns the lowercase label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Requirer => "requirer",
        }
    }

    /// Returns the conventional schema symbol for the role.
    #[must_use]
    pub const fn schema_symbol(self) -> &'static str {
        match self {
            Self::Provider => "ProviderSchema",
            Self::Requirer => "RequirerSchema",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0} (expected provider or requirer)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "provider" => Ok(Self::Provider),
            "requirer" => Ok(Self::Requirer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Name of a catalogued interface.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceName(String);

impl InterfaceName {
    /// Creates a new interface name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for InterfaceName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for InterfaceName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Registry key identifying an interface version and role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestKey {
    /// Interface name.
    pub interface: InterfaceName,
    /// Interface version number.
    pub version: u32,
    /// Role under test.
    pub role: Role,
}

impl TestKey {
    /// Creates a new test key.
    #[must_use]
    pub fn new(interface: impl Into<InterfaceName>, version: u32, role: Role) -> Self {
        Self {
            interface: interface.into(),
            version,
            role,
        }
    }
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{}/{}", self.interface, self.version, self.role)
    }
}

// ============================================================================
// SECTION: Relations
// ============================================================================

/// Relation databag contents (string keys to string values).
pub type Databag = BTreeMap<String, String>;

/// Relation instance between the component under test and a remote app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Relation {
    /// Endpoint name on the component under test; empty binds to the
    /// component's endpoint for the interface under test.
    #[serde(default)]
    pub endpoint: String,
    /// Interface name; inferred from component metadata when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<InterfaceName>,
    /// Relation identifier; assigned during composition when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_id: Option<u32>,
    /// Remote application name.
    #[serde(default = "default_remote_app")]
    pub remote_app_name: String,
    /// Application-scoped data written by the component under test.
    #[serde(default)]
    pub local_app_data: Databag,
    /// Unit-scoped data written by the component under test.
    #[serde(default)]
    pub local_unit_data: Databag,
    /// Application-scoped data written by the remote side.
    #[serde(default)]
    pub remote_app_data: Databag,
    /// Unit-scoped data written by each remote unit.
    #[serde(default = "default_remote_units")]
    pub remote_units_data: BTreeMap<u32, Databag>,
}

impl Relation {
    /// Creates an empty relation bound to an endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            interface: None,
            relation_id: None,
            remote_app_name: default_remote_app(),
            local_app_data: Databag::new(),
            local_unit_data: Databag::new(),
            remote_app_data: Databag::new(),
            remote_units_data: default_remote_units(),
        }
    }

    /// Sets the interface name.
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<InterfaceName>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// Sets the relation identifier.
    #[must_use]
    pub const fn with_relation_id(mut self, relation_id: u32) -> Self {
        self.relation_id = Some(relation_id);
        self
    }

    /// Sets the remote application databag.
    #[must_use]
    pub fn with_remote_app_data(mut self, data: Databag) -> Self {
        self.remote_app_data = data;
        self
    }

    /// Sets the local application databag.
    #[must_use]
    pub fn with_local_app_data(mut self, data: Databag) -> Self {
        self.local_app_data = data;
        self
    }

    /// Returns a human-readable label for diagnostics.
    #[must_use]
    pub fn label(&self) -> String {
        match self.relation_id {
            Some(id) => format!("{}:{id}", self.endpoint),
            None => self.endpoint.clone(),
        }
    }
}

/// Default remote application name.
fn default_remote_app() -> String {
    DEFAULT_REMOTE_APP.to_string()
}

/// Default remote units: a single unit with an empty databag.
fn default_remote_units() -> BTreeMap<u32, Databag> {
    BTreeMap::from([(0, Databag::new())])
}

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Workload status name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusName {
    /// Status has not been set.
    #[default]
    Unknown,
    /// Workload is healthy.
    Active,
    /// Workload needs operator intervention.
    Blocked,
    /// Workload waits on another component.
    Waiting,
    /// Workload is performing maintenance.
    Maintenance,
}

impl StatusName {
    /// Returns the lowercase label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Waiting => "waiting",
            Self::Maintenance => "maintenance",
        }
    }
}

/// Unit or application status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Status {
    /// Status name.
    #[serde(default)]
    pub name: StatusName,
    /// Status message.
    #[serde(default)]
    pub message: String,
}

impl Status {
    /// Returns true when the status was never set.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.name == StatusName::Unknown && self.message.is_empty()
    }
}

/// Workload container descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Container {
    /// Container name.
    pub name: String,
    /// Whether the workload agent is reachable.
    #[serde(default)]
    pub can_connect: bool,
}

/// Network binding descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Network {
    /// Address the unit binds to.
    #[serde(default)]
    pub bind_address: Option<String>,
    /// Addresses remote units use to reach this unit.
    #[serde(default)]
    pub ingress_addresses: Vec<String>,
}

// ============================================================================
// SECTION: Simulated State
// ============================================================================

/// Full mocked environment of a component instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct State {
    /// Whether the unit is the application leader.
    #[serde(default)]
    pub leader: bool,
    /// Configuration values.
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    /// Relation instances.
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Workload containers.
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Network bindings keyed by binding name.
    #[serde(default)]
    pub networks: BTreeMap<String, Network>,
    /// Unit status.
    #[serde(default)]
    pub unit_status: Status,
    /// Application status.
    #[serde(default)]
    pub app_status: Status,
}

impl State {
    /// Returns relations bound to the given endpoint.
    pub fn relations_for_endpoint<'a>(
        &'a self,
        endpoint: &'a str,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.iter().filter(move |relation| relation.endpoint == endpoint)
    }

    /// Returns the relation with the given identifier.
    #[must_use]
    pub fn relation_by_id(&self, relation_id: u32) -> Option<&Relation> {
        self.relations.iter().find(|relation| relation.relation_id == Some(relation_id))
    }

    /// Returns relations explicitly tagged with the given interface.
    ///
    /// Relations without an interface tag are resolved by the composer against
    /// component metadata before execution.
    pub fn relations_with_interface<'a>(
        &'a self,
        interface: &'a InterfaceName,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.iter().filter(move |relation| relation.interface.as_ref() == Some(interface))
    }
}
