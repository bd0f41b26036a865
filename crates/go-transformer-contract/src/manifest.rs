// crates/go-transformer-contract/src/manifest.rs
// ============================================================================
// Module: Transformer Manifests
// Description: Input and output envelopes exchanged with the pipeline runtime.
// Purpose: Decode the input manifest and encode the output manifest on disk.
// Dependencies: serde, serde_json, std
// ============================================================================

//! ## Overview
//! The input manifest names one artifact directory (relative to the manifest
//! file) and the source contract describing it. The output manifest lists one
//! result per produced artifact. A result's `artifactPath` is optional and is
//! omitted when there is nothing on disk to point at.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::SchemaError;
use crate::contract::Contract;
use crate::contract::RawContract;

// ============================================================================
// SECTION: Manifest Types
// ============================================================================

/// Input to the transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputManifest {
    /// The single input asset.
    pub input: TransformerAsset,
}

/// An artifact directory paired with the contract describing it.
///
/// # Invariants
/// - `artifact_path` is relative to the manifest file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerAsset {
    /// Directory containing the asset files.
    pub artifact_path: String,
    /// Contract describing the asset.
    pub contract: Contract,
}

/// Output of the transformer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputManifest {
    /// Produced results, in production order.
    pub results: Vec<OutputResult>,
}

/// One produced result.
///
/// # Invariants
/// - When present, `artifact_path` names a non-empty directory relative to the
///   output manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputResult {
    /// Directory containing the result's files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    /// Contract describing the result.
    pub contract: Contract,
}

// ============================================================================
// SECTION: Raw Manifest Types
// ============================================================================

/// Input manifest with its contract left undecoded.
#[derive(Deserialize)]
struct RawInputManifest {
    /// Raw input asset.
    input: RawAsset,
}

/// Input asset with its contract left undecoded.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAsset {
    /// Directory containing the asset files.
    #[serde(default)]
    artifact_path: String,
    /// Raw contract envelope.
    contract: RawContract,
}

/// Output manifest with its result contracts left undecoded.
#[derive(Deserialize)]
struct RawOutputManifest {
    /// Raw results.
    results: Vec<RawOutputResult>,
}

/// Output result with its contract left undecoded.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOutputResult {
    /// Directory containing the result's files.
    #[serde(default)]
    artifact_path: Option<String>,
    /// Raw contract envelope.
    contract: RawContract,
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Decodes an input manifest from JSON bytes.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownContractType`] when the input contract names
/// no active schema, or [`SchemaError::Malformed`] for invalid JSON.
pub fn decode_input_manifest(bytes: &[u8]) -> Result<InputManifest, SchemaError> {
    let raw: RawInputManifest =
        serde_json::from_slice(bytes).map_err(|err| SchemaError::Malformed(err.to_string()))?;
    let contract = Contract::try_from(raw.input.contract)?;
    Ok(InputManifest {
        input: TransformerAsset {
            artifact_path: raw.input.artifact_path,
            contract,
        },
    })
}

/// Decodes an output manifest from JSON bytes.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownContractType`] for the first result whose
/// contract names no active schema, or [`SchemaError::Malformed`] for invalid
/// JSON.
pub fn decode_output_manifest(bytes: &[u8]) -> Result<OutputManifest, SchemaError> {
    let raw: RawOutputManifest =
        serde_json::from_slice(bytes).map_err(|err| SchemaError::Malformed(err.to_string()))?;
    let results = raw
        .results
        .into_iter()
        .map(|result| -> Result<OutputResult, SchemaError> {
            Ok(OutputResult {
                artifact_path: result.artifact_path,
                contract: Contract::try_from(result.contract)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(OutputManifest {
        results,
    })
}

/// Encodes an output manifest as JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`SchemaError::Serialization`] when serialization fails.
pub fn encode_output_manifest(manifest: &OutputManifest) -> Result<Vec<u8>, SchemaError> {
    let mut bytes = serde_json::to_vec(manifest)
        .map_err(|err| SchemaError::Serialization(err.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Reads and decodes the input manifest at `path`.
///
/// # Errors
///
/// Returns [`SchemaError::Io`] when the file cannot be read, otherwise the
/// errors of [`decode_input_manifest`].
pub fn read_input_manifest(path: &Path) -> Result<InputManifest, SchemaError> {
    let bytes = fs::read(path).map_err(|err| SchemaError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    decode_input_manifest(&bytes)
}

/// Encodes and writes the output manifest to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`SchemaError::Io`] when the file cannot be written, otherwise the
/// errors of [`encode_output_manifest`].
pub fn write_output_manifest(path: &Path, manifest: &OutputManifest) -> Result<(), SchemaError> {
    let bytes = encode_output_manifest(manifest)?;
    fs::write(path, bytes).map_err(|err| SchemaError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
