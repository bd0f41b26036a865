// crates/go-transformer-contract/src/contract.rs
// ============================================================================
// Module: Contract Envelope
// Description: Versioned contract envelope and its two-phase codec.
// Purpose: Dispatch `data` decoding on the `type` discriminator.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A contract is `{type, version, name, data}` on the wire. In memory the
//! `type` is not stored separately: it is derived from the [`ContractData`]
//! variant, so an encoded contract can never carry a type that disagrees with
//! its payload. Decoding reads the envelope with `data` kept opaque, then
//! re-parses `data` with the schema the discriminator selects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeStruct;
use serde_json::Map;
use serde_json::Value;

use crate::SchemaError;
use crate::types::ExecutableData;
use crate::types::SourceData;
use crate::types::TestRunData;

// ============================================================================
// SECTION: Contract Types
// ============================================================================

/// Active golang-source schema identifier.
pub const GOLANG_SOURCE_TYPE: &str = "type-product-os-t-golang-source@1.1.0";
/// Active executable schema identifier.
pub const EXECUTABLE_TYPE: &str = "type-product-os-t-executable@1.1.0";
/// Active test-run schema identifier.
pub const TEST_RUN_TYPE: &str = "type-product-os-t-test-run@1.0.2";

/// Contract kinds with an active schema.
///
/// # Invariants
/// - Each variant maps to exactly one versioned `type` string.
/// - A new schema version is a new variant, never an edit of an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractType {
    /// Go source repository (`golang-source`).
    GolangSource,
    /// Compiled executable (`executable`).
    Executable,
    /// Test-run report (`test-run`).
    TestRun,
}

impl ContractType {
    /// All contract types with an active schema.
    pub const ALL: [Self; 3] = [Self::GolangSource, Self::Executable, Self::TestRun];

    /// Returns the versioned wire identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GolangSource => GOLANG_SOURCE_TYPE,
            Self::Executable => EXECUTABLE_TYPE,
            Self::TestRun => TEST_RUN_TYPE,
        }
    }

    /// Resolves a wire identifier to its contract type.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownContractType`] for any identifier that is
    /// not an exact match, including other versions of a known kind.
    pub fn parse(value: &str) -> Result<Self, SchemaError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| SchemaError::UnknownContractType(value.to_string()))
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Contract
// ============================================================================

/// Type-specific contract payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractData {
    /// Go source repository description.
    GolangSource(SourceData),
    /// Compiled executable description.
    Executable(ExecutableData),
    /// Test-run outcome.
    TestRun(TestRunData),
}

impl ContractData {
    /// Returns the contract type selected by this payload.
    #[must_use]
    pub const fn contract_type(&self) -> ContractType {
        match self {
            Self::GolangSource(_) => ContractType::GolangSource,
            Self::Executable(_) => ContractType::Executable,
            Self::TestRun(_) => ContractType::TestRun,
        }
    }
}

/// Versioned, typed contract envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawContract")]
pub struct Contract {
    /// Contract version (for sources, the version embedded into builds).
    pub version: String,
    /// Contract name (for sources, the repository import path).
    pub name: String,
    /// Type-specific payload.
    pub data: ContractData,
}

impl Contract {
    /// Creates a contract with empty version and name.
    #[must_use]
    pub const fn new(data: ContractData) -> Self {
        Self {
            version: String::new(),
            name: String::new(),
            data,
        }
    }

    /// Returns the contract type derived from the payload.
    #[must_use]
    pub const fn contract_type(&self) -> ContractType {
        self.data.contract_type()
    }

    /// Returns the golang-source payload, if this is a source contract.
    #[must_use]
    pub const fn source_data(&self) -> Option<&SourceData> {
        match &self.data {
            ContractData::GolangSource(data) => Some(data),
            _ => None,
        }
    }
}

impl Serialize for Contract {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let field_count =
            2 + usize::from(!self.version.is_empty()) + usize::from(!self.name.is_empty());
        let mut state = serializer.serialize_struct("Contract", field_count)?;
        state.serialize_field("type", self.contract_type().as_str())?;
        if self.version.is_empty() {
            state.skip_field("version")?;
        } else {
            state.serialize_field("version", &self.version)?;
        }
        if self.name.is_empty() {
            state.skip_field("name")?;
        } else {
            state.serialize_field("name", &self.name)?;
        }
        match &self.data {
            ContractData::GolangSource(data) => state.serialize_field("data", data)?,
            ContractData::Executable(data) => state.serialize_field("data", data)?,
            ContractData::TestRun(data) => state.serialize_field("data", data)?,
        }
        state.end()
    }
}

// ============================================================================
// SECTION: Two-Phase Decoding
// ============================================================================

/// Contract envelope with the payload left undecoded.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawContract {
    /// Versioned type discriminator.
    #[serde(rename = "type")]
    pub(crate) contract_type: String,
    /// Contract version.
    #[serde(default)]
    pub(crate) version: String,
    /// Contract name.
    #[serde(default)]
    pub(crate) name: String,
    /// Opaque payload, decoded once `contract_type` is known.
    #[serde(default)]
    pub(crate) data: Value,
}

impl TryFrom<RawContract> for Contract {
    type Error = SchemaError;

    fn try_from(raw: RawContract) -> Result<Self, Self::Error> {
        let kind = ContractType::parse(&raw.contract_type)?;
        let data = decode_data(kind, raw.data)?;
        Ok(Self {
            version: raw.version,
            name: raw.name,
            data,
        })
    }
}

/// Decodes an opaque payload against the schema selected by `kind`.
fn decode_data(kind: ContractType, data: Value) -> Result<ContractData, SchemaError> {
    let data = if data.is_null() { Value::Object(Map::new()) } else { data };
    let malformed = |err: serde_json::Error| SchemaError::Malformed(format!("{kind} data: {err}"));
    match kind {
        ContractType::GolangSource => {
            serde_json::from_value(data).map(ContractData::GolangSource).map_err(malformed)
        }
        ContractType::Executable => {
            serde_json::from_value(data).map(ContractData::Executable).map_err(malformed)
        }
        ContractType::TestRun => {
            serde_json::from_value(data).map(ContractData::TestRun).map_err(malformed)
        }
    }
}

/// Decodes a single contract from JSON bytes.
///
/// # Errors
///
/// Returns [`SchemaError::UnknownContractType`] when `type` names no active
/// schema and [`SchemaError::Malformed`] when the envelope or payload is
/// invalid.
pub fn decode_contract(bytes: &[u8]) -> Result<Contract, SchemaError> {
    let raw: RawContract =
        serde_json::from_slice(bytes).map_err(|err| SchemaError::Malformed(err.to_string()))?;
    Contract::try_from(raw)
}

/// Encodes a single contract as compact JSON bytes.
///
/// # Errors
///
/// Returns [`SchemaError::Serialization`] when serialization fails.
pub fn encode_contract(contract: &Contract) -> Result<Vec<u8>, SchemaError> {
    serde_json::to_vec(contract).map_err(|err| SchemaError::Serialization(err.to_string()))
}
