// crates/interface-tester/src/executor.rs
// ============================================================================
// Module: Test Executor
// Description: Play interface test cases against a component runtime.
// Purpose: Compose, play, validate, and aggregate outcomes for one key.
// Dependencies: crate::{composer, discovery, registry, runtime, schema}, tracing
// ============================================================================

//! ## Overview
//! An [`InterfaceTester`] is configured for one interface, version, and role.
//! Each registered case runs through three ordered checks:
//!
//! 1. play the event against the composed state;
//! 2. run the case's custom validator on the resulting state;
//! 3. validate the local databags of every relation using the interface.
//!
//! A play failure skips checks 2 and 3. Checks 2 and 3 are independent of each
//! other, and every relation is validated even when an earlier one fails.
//! A panic raised while playing or validating is recorded like an error.
//! Configuration failures (schema loading, composition, event resolution)
//! mark the case as errored before anything is played. Every case runs; the
//! run fails at the end when any case did not pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use thiserror::Error;

use crate::composer;
use crate::composer::Target;
use crate::discovery;
use crate::discovery::DiscoveryError;
use crate::discovery::IncludePattern;
use crate::event::Event;
use crate::model::InterfaceName;
use crate::model::Role;
use crate::model::State;
use crate::model::TestKey;
use crate::registry::TestCaseRegistry;
use crate::runtime::ComponentMetadata;
use crate::runtime::ComponentRuntime;
use crate::schema::DataBagSchema;
use crate::schema::SchemaCache;
use crate::testcase::InterfaceTestCase;
use crate::testcase::SchemaMode;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// What to test and where the catalog lives.
#[derive(Debug, Clone, PartialEq)]
pub struct TesterSettings {
    /// Interface under test.
    pub interface: InterfaceName,
    /// Interface version under test.
    pub version: u32,
    /// Role implemented by the component under test.
    pub role: Role,
    /// Catalog root containing `<interface>/v<N>` directories.
    pub catalog_root: PathBuf,
    /// Baseline state the component needs to function.
    pub state_template: Option<State>,
}

impl TesterSettings {
    /// Creates settings without a state template.
    #[must_use]
    pub fn new(
        interface: impl Into<InterfaceName>,
        version: u32,
        role: Role,
        catalog_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interface: interface.into(),
            version,
            role,
            catalog_root: catalog_root.into(),
            state_template: None,
        }
    }

    /// Sets the state template.
    #[must_use]
    pub fn with_state_template(mut self, template: State) -> Self {
        self.state_template = Some(template);
        self
    }

    /// Returns the registry key under test.
    #[must_use]
    pub fn key(&self) -> TestKey {
        TestKey::new(self.interface.clone(), self.version, self.role)
    }

    /// Returns the version directory of the interface under test.
    #[must_use]
    pub fn version_dir(&self) -> PathBuf {
        self.catalog_root.join(self.interface.as_str()).join(format!("v{}", self.version))
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    /// Every check passed.
    Passed,
    /// At least one check failed.
    Failed {
        /// Failure messages in check order.
        errors: Vec<String>,
    },
    /// The case could not be played because of a configuration error.
    Errored {
        /// Configuration error message.
        error: String,
    },
}

/// Outcome of one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// Test case name.
    pub name: String,
    /// Final status.
    pub status: TestStatus,
}

impl TestOutcome {
    /// Returns true when the case passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.status, TestStatus::Passed)
    }

    /// Returns the error messages of the case (empty when it passed).
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        match &self.status {
            TestStatus::Passed => Vec::new(),
            TestStatus::Failed {
                errors,
            } => errors.clone(),
            TestStatus::Errored {
                error,
            } => vec![error.clone()],
        }
    }
}

/// Outcomes of every case run for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Key under test.
    pub key: TestKey,
    /// Outcomes in registration order.
    pub outcomes: Vec<TestOutcome>,
}

impl RunReport {
    /// Returns true when every case passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TestOutcome::passed)
    }

    /// Returns the number of passed cases.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.passed()).count()
    }

    /// Returns every error, prefixed with its test case name.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .flat_map(|outcome| {
                outcome.errors().into_iter().map(|error| format!("{}: {error}", outcome.name))
            })
            .collect()
    }

    /// Converts the report into an error when any case did not pass.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Failed`] quoting every collected error.
    pub fn into_result(self) -> Result<Self, TesterError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(TesterError::Failed {
            errors: self.errors(),
            key: self.key,
        })
    }
}

/// Errors surfaced by a tester run.
#[derive(Debug, Error)]
pub enum TesterError {
    /// At least one case failed or errored.
    #[error("interface tests failed for {key}:\n{}", .errors.join("\n"))]
    Failed {
        /// Key under test.
        key: TestKey,
        /// Every collected error.
        errors: Vec<String>,
    },
    /// The catalog could not be discovered.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

// ============================================================================
// SECTION: Tester
// ============================================================================

/// Runs interface test cases for one interface, version, and role.
pub struct InterfaceTester<R> {
    /// Component runtime under test.
    runtime: R,
    /// Tester settings.
    settings: TesterSettings,
    /// Schemas loaded during this tester's lifetime.
    schemas: SchemaCache,
}

impl<R: ComponentRuntime> InterfaceTester<R> {
    /// Creates a tester for a component runtime.
    #[must_use]
    pub fn new(runtime: R, settings: TesterSettings) -> Self {
        Self {
            runtime,
            settings,
            schemas: SchemaCache::new(),
        }
    }

    /// Returns the tester settings.
    #[must_use]
    pub const fn settings(&self) -> &TesterSettings {
        &self.settings
    }

    /// Returns the cases registered for the configured key.
    #[must_use]
    pub fn collect<'r>(&self, registry: &'r TestCaseRegistry) -> &'r [InterfaceTestCase] {
        registry.get_key(&self.settings.key())
    }

    /// Discovers the configured interface in the catalog and runs its cases.
    ///
    /// # Errors
    ///
    /// Returns [`TesterError::Discovery`] when the catalog cannot be read.
    pub fn discover_and_run(&mut self) -> Result<RunReport, TesterError> {
        let include = IncludePattern::exact(self.settings.interface.as_str());
        let mut registry = TestCaseRegistry::new();
        discovery::discover(&self.settings.catalog_root, &include, &mut registry)?;
        Ok(self.run(&registry))
    }

    /// Runs every case registered for the configured key.
    pub fn run(&mut self, registry: &TestCaseRegistry) -> RunReport {
        let key = self.settings.key();
        let cases = registry.get_key(&key);
        if cases.is_empty() {
            tracing::warn!(%key, "no interface tests registered");
        }
        let outcomes: Vec<TestOutcome> = cases.iter().map(|case| self.run_case(case)).collect();
        let report = RunReport {
            key,
            outcomes,
        };
        tracing::info!(
            key = %report.key,
            total = report.outcomes.len(),
            passed = report.passed(),
            "interface test run complete"
        );
        report
    }

    /// Runs one case through composition, play, and validation.
    pub fn run_case(&mut self, case: &InterfaceTestCase) -> TestOutcome {
        let status = match self.prepare(case) {
            Err(error) => TestStatus::Errored {
                error,
            },
            Ok((schema, state, event)) => {
                let errors = self.check(case, schema.as_ref(), &state, &event);
                if errors.is_empty() {
                    TestStatus::Passed
                } else {
                    TestStatus::Failed {
                        errors,
                    }
                }
            }
        };
        match &status {
            TestStatus::Passed => tracing::info!(key = %case.key, name = %case.name, "passed"),
            TestStatus::Failed {
                errors,
            } => tracing::warn!(
                key = %case.key,
                name = %case.name,
                errors = errors.len(),
                "failed"
            ),
            TestStatus::Errored {
                error,
            } => tracing::error!(key = %case.key, name = %case.name, %error, "errored"),
        }
        TestOutcome {
            name: case.name.clone(),
            status,
        }
    }

    /// Resolves the schema, composes the state, and resolves the event.
    fn prepare(
        &mut self,
        case: &InterfaceTestCase,
    ) -> Result<(Option<DataBagSchema>, State, Event), String> {
        let key = self.settings.key();
        if case.key != key {
            return Err(format!("test case belongs to {}, tester runs {key}", case.key));
        }
        let schema = self.resolve_schema(&case.schema)?;
        let target =
            Target::new(&self.settings.interface, self.settings.role, self.runtime.metadata());
        let state = composer::compose(
            self.settings.state_template.as_ref(),
            case.input_state.as_ref(),
            &target,
        )
        .map_err(|err| format!("could not compose initial state: {err}"))?;
        let event = composer::resolve_event(&case.event, &state, &target)
            .map_err(|err| format!("could not resolve event '{}': {err}", case.event))?;
        Ok((schema, state, event))
    }

    /// Resolves the effective schema for a case.
    fn resolve_schema(&mut self, mode: &SchemaMode) -> Result<Option<DataBagSchema>, String> {
        match mode {
            SchemaMode::Skip => Ok(None),
            SchemaMode::Empty => Ok(Some(DataBagSchema::empty())),
            SchemaMode::Custom(schema) => Ok(Some(schema.clone())),
            SchemaMode::Default => {
                let version_dir = self.settings.version_dir();
                let schemas = self.schemas.get(&version_dir).map_err(|err| {
                    format!("could not load schema for {}: {err}", self.settings.key())
                })?;
                Ok(Some(schemas.for_role(self.settings.role).cloned().unwrap_or_default()))
            }
        }
    }

    /// Plays the event and runs the custom and schema checks.
    fn check(
        &self,
        case: &InterfaceTestCase,
        schema: Option<&DataBagSchema>,
        state: &State,
        event: &Event,
    ) -> Vec<String> {
        let played = panic::catch_unwind(AssertUnwindSafe(|| self.runtime.play(state, event)));
        let mut output = match played {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return vec![format!("could not play scene: {err}")],
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                return vec![format!("could not play scene: component panicked: {message}")];
            }
        };
        tag_interfaces(&mut output, self.runtime.metadata());

        let mut errors = Vec::new();
        if let Some(validator) = &case.validator {
            let interface = &self.settings.interface;
            let validated =
                panic::catch_unwind(AssertUnwindSafe(|| validator.validate(interface, &output)));
            match validated {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(format!("validating scene output: {err}")),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    errors.push(format!("validating scene output: {message}"));
                }
            }
        }
        if let Some(schema) = schema {
            let mut checked = 0;
            for relation in output.relations_with_interface(&self.settings.interface) {
                checked += 1;
                let label = relation.label();
                errors.extend(
                    schema
                        .validate_relation(relation)
                        .into_iter()
                        .map(|error| format!("relation {label}: {error}")),
                );
            }
            tracing::debug!(name = %case.name, relations = checked, "schema validation done");
        }
        errors
    }
}

/// Extracts the message carried by a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "panic with a non-string payload".to_string()
}

/// Fills missing relation interfaces in a resulting state from metadata.
fn tag_interfaces(state: &mut State, metadata: &ComponentMetadata) {
    for relation in &mut state.relations {
        if relation.interface.is_none() {
            relation.interface = metadata.interface_of(&relation.endpoint).cloned();
        }
    }
}
