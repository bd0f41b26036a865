// crates/go-transformer-config/src/lib.rs
// ============================================================================
// Module: Go Transformer Config Library
// Description: Canonical configuration model and validation.
// Purpose: Single source of truth for go-transformer.toml semantics.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! `go-transformer-config` defines the tool-chain and orchestration settings
//! used by the build and test orchestrators. Every setting has a default, so
//! the configuration file is optional; when one is supplied it is validated
//! strictly and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
