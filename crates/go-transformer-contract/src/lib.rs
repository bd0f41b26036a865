// crates/go-transformer-contract/src/lib.rs
// ============================================================================
// Module: Go Transformer Contract Library
// Description: Versioned contract schemas and manifest codec.
// Purpose: Single source of truth for the task boundary format.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Contracts are the typed, versioned envelopes exchanged with the pipeline
//! that invokes the transformer. An input manifest carries one golang-source
//! contract; an output manifest carries one or more executable or test-run
//! contracts.
//!
//! Invariants:
//! - Exactly one schema version is active per contract kind; any other `type`
//!   string fails with [`SchemaError::UnknownContractType`].
//! - Decoding is two-phase: the envelope is read first and `data` is re-parsed
//!   against the schema selected by `type`.
//! - Empty optional fields are omitted on encode.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod contract;
pub mod manifest;
pub mod types;

// ============================================================================
// SECTION: Errors
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding or encoding contracts and manifests.
///
/// # Invariants
/// - [`SchemaError::UnknownContractType`] always carries the offending `type`.
/// - [`SchemaError::Io`] always carries the path that failed.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The `type` discriminator does not name an active schema.
    #[error("unknown contract type {0:?}")]
    UnknownContractType(String),
    /// The payload is not valid JSON or does not match the selected schema.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// Serialization of an in-memory contract failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Reading or writing a manifest file failed.
    #[error("{path}: {message}")]
    Io {
        /// Manifest path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error text.
        message: String,
    },
}

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use contract::Contract;
pub use contract::ContractData;
pub use contract::ContractType;
pub use contract::decode_contract;
pub use contract::encode_contract;
pub use manifest::InputManifest;
pub use manifest::OutputManifest;
pub use manifest::OutputResult;
pub use manifest::TransformerAsset;
pub use manifest::decode_input_manifest;
pub use manifest::decode_output_manifest;
pub use manifest::encode_output_manifest;
pub use manifest::read_input_manifest;
pub use manifest::write_output_manifest;
pub use types::ExecutableData;
pub use types::SourceData;
pub use types::SourceHack;
pub use types::SuiteResult;
pub use types::TestRunData;
