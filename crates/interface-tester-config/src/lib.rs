// crates/interface-tester-config/src/lib.rs
// ============================================================================
// Module: Interface Tester Config Library
// Description: Canonical config model and validation for interface-tester.toml.
// Purpose: Single source of truth for tester configuration semantics.
// Dependencies: interface-tester, serde, toml
// ============================================================================

//! ## Overview
//! `interface-tester-config` defines the configuration model shared by the
//! command line and by harness integrations: where the catalog lives, which
//! interfaces to include, an optional run target, and the log level. Loading
//! is strict and fails closed on oversized, non-UTF-8, or invalid input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
