// crates/go-transformer-contract/src/types.rs
// ============================================================================
// Module: Contract Data Types
// Description: Per-kind payload schemas carried in a contract's `data` field.
// Purpose: Provide canonical shapes for source, executable, and test-run data.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each struct here is the `data` payload of exactly one contract kind. The
//! structs never overlap: the owning [`crate::ContractData`] variant decides
//! which one is in play. Optional fields are skipped on encode when empty so
//! payloads stay minimal for downstream schema evolution.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Golang Source
// ============================================================================

/// Description of a repository containing Go source code.
///
/// # Invariants
/// - `binaries` name directories under `./cmd/<binary>`; when empty a single
///   target is derived from the contract name.
/// - `tags` apply to every binary; there is no per-binary tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceData {
    /// Target platforms the repository supports (informational).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    /// Binary targets this repository builds into.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<String>,
    /// Go build tags set for every build and test invocation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// System-level packages per distribution.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, Vec<String>>,
    /// Layout overrides for repositories that predate Go modules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hack: Option<SourceHack>,
}

impl SourceData {
    /// Returns the GOPATH module override, if one is set and non-empty.
    #[must_use]
    pub fn module_override(&self) -> Option<&str> {
        self.hack.as_ref().map(|hack| hack.module.as_str()).filter(|module| !module.is_empty())
    }
}

/// Legacy layout overrides for GOPATH builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHack {
    /// Import path to mount the tree at, relative to `$GOPATH/src`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,
}

// ============================================================================
// SECTION: Executable
// ============================================================================

/// A single compiled executable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableData {
    /// Platform the executable runs on, in `os/arch` form.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform: String,
    /// Executable file name inside the artifact directory.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
    /// Version string embedded at link time.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// System-level packages per distribution, carried over from the source.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, Vec<String>>,
}

// ============================================================================
// SECTION: Test Run
// ============================================================================

/// Outcome of a test run.
///
/// # Invariants
/// - `success` reflects orchestration-level completion only; individual suite
///   failures are reported in `suites` without clearing it on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunData {
    /// True when every test pass completed without invocation error.
    #[serde(default)]
    pub success: bool,
    /// Per-package results, unit suites first.
    #[serde(rename = "suiteResults", default, skip_serializing_if = "Vec::is_empty")]
    pub suites: Vec<SuiteResult>,
}

/// Pass/fail outcome of one test package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResult {
    /// Go import path of the package.
    #[serde(rename = "suiteName", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// True when the package-level event was `pass`.
    #[serde(rename = "suiteSuccess", default)]
    pub success: bool,
    /// Files the runner could not attribute to a test (never filled by this engine).
    #[serde(rename = "unmatchedFiles", default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched_files: Vec<String>,
}

impl SuiteResult {
    /// Creates a suite result without unmatched files.
    #[must_use]
    pub fn new(name: impl Into<String>, success: bool) -> Self {
        Self {
            name: name.into(),
            success,
            unmatched_files: Vec::new(),
        }
    }
}
