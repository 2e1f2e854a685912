// crates/interface-tester/src/lib.rs
// ============================================================================
// Module: Interface Tester Library
// Description: Relation interface catalog loading, discovery, and test runs.
// Purpose: Check that a component implements one side of a relation interface.
// Dependencies: jsonschema, regex, ron, serde, serde_json, serde_yaml, tracing
// ============================================================================

//! ## Overview
//! `interface-tester` reads a catalog of relation interfaces laid out as
//! `<root>/<interface>/v<N>/`, each version holding a `schema.json` with the
//! databag contracts of both roles and an `interface_tests/` directory of test
//! manifests. Discovery registers the tests into an explicit
//! [`TestCaseRegistry`]; an [`InterfaceTester`] then composes an initial state
//! for each test, plays its event through a [`ComponentRuntime`], and checks
//! the resulting databags.
//!
//! The component runtime itself is an external collaborator and is only
//! modelled here as a trait.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod composer;
pub mod discovery;
pub mod event;
pub mod executor;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod registry;
pub mod report;
pub mod runtime;
pub mod schema;
pub mod testcase;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use composer::ComposeError;
pub use composer::Target;
pub use discovery::DiscoveryError;
pub use discovery::DiscoveryReport;
pub use discovery::IncludePattern;
pub use discovery::PathIdentity;
pub use discovery::discover;
pub use discovery::parse_interface_path;
pub use event::Event;
pub use event::EventSpec;
pub use executor::InterfaceTester;
pub use executor::RunReport;
pub use executor::TestOutcome;
pub use executor::TestStatus;
pub use executor::TesterError;
pub use executor::TesterSettings;
pub use model::*;
pub use registry::Registration;
pub use registry::TestCaseRegistry;
pub use report::CatalogReport;
pub use runtime::ComponentMetadata;
pub use runtime::ComponentRuntime;
pub use runtime::RuntimeError;
pub use schema::DataBagSchema;
pub use schema::DatabagScope;
pub use schema::SchemaLoadError;
pub use testcase::InterfaceTestCase;
pub use testcase::SchemaMode;
pub use validator::Expectation;
pub use validator::ExpectationValidator;
pub use validator::OutputValidator;
