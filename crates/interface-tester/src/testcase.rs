// crates/interface-tester/src/testcase.rs
// ============================================================================
// Module: Interface Test Cases
// Description: One compliance check for one interface version and role.
// Purpose: Carry the event, initial state, validator, and schema mode of a test.
// Dependencies: crate::{event, model, schema, validator}
// ============================================================================

//! ## Overview
//! Test cases are assembled once, registered, and only read afterwards. The
//! validator is shared behind an [`Arc`] so registries can hand out clones
//! without copying closures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::event::EventSpec;
use crate::model::InterfaceName;
use crate::model::Role;
use crate::model::State;
use crate::model::TestKey;
use crate::schema::DataBagSchema;
use crate::validator::OutputValidator;

// ============================================================================
// SECTION: Schema Mode
// ============================================================================

/// How the resulting databags are checked against a schema.
#[derive(Debug, Clone, Default)]
pub enum SchemaMode {
    /// Use the interface's declared schema for the role.
    #[default]
    Default,
    /// Do not check the databags.
    Skip,
    /// Require both local databags to be empty.
    Empty,
    /// Use a test-specific schema.
    Custom(DataBagSchema),
}

impl SchemaMode {
    /// Returns the lowercase label for the mode.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Skip => "skip",
            Self::Empty => "empty",
            Self::Custom(_) => "custom",
        }
    }
}

// ============================================================================
// SECTION: Test Case
// ============================================================================

/// Compliance check for one interface version and role.
#[derive(Clone)]
pub struct InterfaceTestCase {
    /// Interface, version, and role under test.
    pub key: TestKey,
    /// Human-readable test name.
    pub name: String,
    /// Event that triggers the check.
    pub event: EventSpec,
    /// Initial state declared by the test.
    pub input_state: Option<State>,
    /// Custom validation of the resulting state.
    pub validator: Option<Arc<dyn OutputValidator>>,
    /// Schema validation mode.
    pub schema: SchemaMode,
    /// File the test was loaded from, if any.
    pub source: Option<PathBuf>,
}

impl fmt::Debug for InterfaceTestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceTestCase")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("event", &self.event)
            .field("input_state", &self.input_state)
            .field("validator", &self.validator.as_ref().map(|_| "<validator>"))
            .field("schema", &self.schema)
            .field("source", &self.source)
            .finish()
    }
}

impl InterfaceTestCase {
    /// Creates a test case with default schema mode and no validator.
    #[must_use]
    pub fn new(
        interface: impl Into<InterfaceName>,
        version: u32,
        role: Role,
        name: impl Into<String>,
        event: impl Into<EventSpec>,
    ) -> Self {
        Self {
            key: TestKey::new(interface, version, role),
            name: name.into(),
            event: event.into(),
            input_state: None,
            validator: None,
            schema: SchemaMode::Default,
            source: None,
        }
    }

    /// Sets the declared initial state.
    #[must_use]
    pub fn with_state(mut self, state: State) -> Self {
        self.input_state = Some(state);
        self
    }

    /// Sets the custom validator.
    #[must_use]
    pub fn with_validator(mut self, validator: impl OutputValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Sets the schema validation mode.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaMode) -> Self {
        self.schema = schema;
        self
    }

    /// Records the file the test was loaded from.
    #[must_use]
    pub fn with_source(mut self, source: &Path) -> Self {
        self.source = Some(source.to_path_buf());
        self
    }

    /// Returns true when the test declares its own initial state.
    #[must_use]
    pub const fn has_input_state(&self) -> bool {
        self.input_state.is_some()
    }
}
