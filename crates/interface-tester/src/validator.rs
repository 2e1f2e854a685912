// crates/interface-tester/src/validator.rs
// ============================================================================
// Module: Output Validators
// Description: Custom checks applied to the state produced by a simulated run.
// Purpose: Support both programmatic closures and declarative expectations.
// Dependencies: crate::{model, schema}, serde
// ============================================================================

//! ## Overview
//! A test case may carry one [`OutputValidator`]. Rust callers usually pass a
//! closure; catalog manifests declare a list of [`Expectation`]s that are
//! checked against every relation of the interface under test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::model::InterfaceName;
use crate::model::State;
use crate::model::StatusName;
use crate::schema::DatabagScope;

// ============================================================================
// SECTION: Validator Contract
// ============================================================================

/// Custom validation of a resulting state.
pub trait OutputValidator: Send + Sync {
    /// Validates the state produced by playing the test event.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the first failed check.
    fn validate(&self, interface: &InterfaceName, state: &State) -> Result<(), String>;
}

impl<F> OutputValidator for F
where
    F: Fn(&State) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, _interface: &InterfaceName, state: &State) -> Result<(), String> {
        self(state)
    }
}

// ============================================================================
// SECTION: Declarative Expectations
// ============================================================================

/// Declarative check applied to each relation of the interface under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Expectation {
    /// The local databag of the scope is empty.
    DatabagEmpty {
        /// Databag scope.
        scope: DatabagScope,
    },
    /// The local databag of the scope contains every listed key.
    DatabagHasKeys {
        /// Databag scope.
        scope: DatabagScope,
        /// Keys that must be present.
        keys: Vec<String>,
    },
    /// The local databag of the scope equals the given data exactly.
    DatabagEquals {
        /// Databag scope.
        scope: DatabagScope,
        /// Expected contents.
        data: BTreeMap<String, String>,
    },
    /// The unit status has the given name.
    UnitStatus {
        /// Expected status name.
        name: StatusName,
    },
}

impl Expectation {
    /// Checks the expectation against a resulting state.
    fn check(&self, interface: &InterfaceName, state: &State) -> Result<(), String> {
        if let Self::UnitStatus {
            name,
        } = self
        {
            if state.unit_status.name == *name {
                return Ok(());
            }
            return Err(format!(
                "expected unit status {}, found {}",
                name.as_str(),
                state.unit_status.name.as_str()
            ));
        }
        let mut matched = false;
        for relation in state.relations_with_interface(interface) {
            matched = true;
            let label = relation.label();
            match self {
                Self::DatabagEmpty {
                    scope,
                } => {
                    let bag = scope.local_bag(relation);
                    if !bag.is_empty() {
                        return Err(format!("relation {label}: local {scope} databag is not empty"));
                    }
                }
                Self::DatabagHasKeys {
                    scope,
                    keys,
                } => {
                    let bag = scope.local_bag(relation);
                    let missing: Vec<&str> = keys
                        .iter()
                        .filter(|key| !bag.contains_key(key.as_str()))
                        .map(String::as_str)
                        .collect();
                    if !missing.is_empty() {
                        return Err(format!(
                            "relation {label}: local {scope} databag is missing keys: {}",
                            missing.join(", ")
                        ));
                    }
                }
                Self::DatabagEquals {
                    scope,
                    data,
                } => {
                    if scope.local_bag(relation) != data {
                        return Err(format!(
                            "relation {label}: local {scope} databag does not match the \
                             expected data"
                        ));
                    }
                }
                Self::UnitStatus {
                    ..
                } => {}
            }
        }
        if matched {
            Ok(())
        } else {
            Err(format!("no relation using interface {interface} in the resulting state"))
        }
    }
}

/// Validator built from a list of declarative expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectationValidator {
    /// Expectations checked in order.
    expectations: Vec<Expectation>,
}

impl ExpectationValidator {
    /// Creates a validator from expectations.
    #[must_use]
    pub const fn new(expectations: Vec<Expectation>) -> Self {
        Self {
            expectations,
        }
    }

    /// Returns the configured expectations.
    #[must_use]
    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }
}

impl OutputValidator for ExpectationValidator {
    fn validate(&self, interface: &InterfaceName, state: &State) -> Result<(), String> {
        let failures: Vec<String> = self
            .expectations
            .iter()
            .filter_map(|expectation| expectation.check(interface, state).err())
            .collect();
        if failures.is_empty() { Ok(()) } else { Err(failures.join("; ")) }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;

    use super::*;
    use crate::model::Relation;

    fn state_with(data: &[(&str, &str)]) -> State {
        let bag = data.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        State {
            relations: vec![
                Relation::new("ingress")
                    .with_interface("ingress")
                    .with_relation_id(1)
                    .with_local_app_data(bag),
            ],
            ..State::default()
        }
    }

    #[test]
    fn expectations_deserialize_from_tagged_documents() {
        let parsed: Vec<Expectation> = serde_json::from_value(json!([
            {"kind": "databag_empty", "scope": "app"},
            {"kind": "databag_has_keys", "scope": "unit", "keys": ["host"]},
            {"kind": "unit_status", "name": "active"}
        ]))
        .unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(matches!(parsed[2], Expectation::UnitStatus { name: StatusName::Active }));
    }

    #[test]
    fn databag_expectations_check_every_matching_relation() {
        let interface = InterfaceName::from("ingress");
        let validator = ExpectationValidator::new(vec![Expectation::DatabagHasKeys {
            scope: DatabagScope::App,
            keys: vec!["ingress".to_string()],
        }]);
        assert!(validator.validate(&interface, &state_with(&[("ingress", "{}")])).is_ok());
        let err = validator.validate(&interface, &state_with(&[])).unwrap_err();
        assert!(err.contains("missing keys: ingress"));
    }

    #[test]
    fn databag_expectations_fail_without_matching_relation() {
        let validator = ExpectationValidator::new(vec![Expectation::DatabagEmpty {
            scope: DatabagScope::App,
        }]);
        let interface = InterfaceName::from("tracing");
        let err = validator.validate(&interface, &state_with(&[])).unwrap_err();
        assert!(err.contains("no relation using interface tracing"));
    }

    #[test]
    fn closures_are_validators() {
        let validator = |state: &State| {
            if state.leader { Ok(()) } else { Err("not leader".to_string()) }
        };
        let interface = InterfaceName::from("ingress");
        let result = validator.validate(&interface, &State::default());
        assert_eq!(result, Err("not leader".to_string()));
    }
}
