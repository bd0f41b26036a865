// crates/go-transformer-core/src/task.rs
// ============================================================================
// Module: Task Runner
// Description: Control flow of one transformer invocation.
// Purpose: Load the input manifest, dispatch build or test, write the output.
// Dependencies: go-transformer-config, go-transformer-contract, thiserror
// ============================================================================

//! ## Overview
//! [`run_task`] is the whole lifecycle of an invocation: read the input
//! manifest, locate the source tree next to it, prepare the output artifact
//! directory next to the output manifest, install declared system packages,
//! run the selected orchestrator, and write the output manifest. Every stage
//! failure surfaces as a [`TaskError`] naming the stage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use go_transformer_config::TransformerConfig;
use go_transformer_contract::Contract;
use go_transformer_contract::ContractData;
use go_transformer_contract::ContractType;
use go_transformer_contract::OutputManifest;
use go_transformer_contract::OutputResult;
use go_transformer_contract::SchemaError;
use go_transformer_contract::read_input_manifest;
use go_transformer_contract::write_output_manifest;
use thiserror::Error;

use crate::build::BuildError;
use crate::build::BuildOrchestrator;
use crate::build::BuildRequest;
use crate::log::TaskLogEvent;
use crate::log::TaskLogSink;
use crate::packages::DependencyError;
use crate::packages::InstallerRegistry;
use crate::process::CommandRunner;
use crate::process::Invocation;
use crate::process::ProcessError;
use crate::test_run::TestError;
use crate::test_run::TestOrchestrator;
use crate::test_run::TestRequest;
use crate::workspace::WorkspaceResolver;
use crate::workspace::linker_for;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Operation requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Compile executables.
    Build,
    /// Run the test passes.
    Test,
}

impl RunMode {
    /// Returns the lowercase mode name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
        }
    }
}

/// Host-supplied options for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    /// Input manifest path.
    pub input_path: PathBuf,
    /// Output manifest path.
    pub output_path: PathBuf,
    /// Requested operation.
    pub mode: RunMode,
    /// Artifact directory name, relative to the output manifest's directory.
    pub output_artifact_directory: String,
    /// Verbose tool-chain output and input dump.
    pub debug: bool,
}

/// Collaborators shared by every stage of an invocation.
pub struct TaskContext<'a> {
    /// Tool-chain settings.
    pub config: &'a TransformerConfig,
    /// Process runner.
    pub runner: &'a dyn CommandRunner,
    /// Frozen installer registry.
    pub installers: &'a InstallerRegistry,
    /// Task event sink.
    pub log: &'a dyn TaskLogSink,
    /// Legacy workspace root, when defined.
    pub legacy_root: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Stage-level invocation errors.
#[derive(Debug, Error)]
pub enum TaskError {
    /// `go env` failed in debug mode.
    #[error("inspecting go environment: {0}")]
    Toolchain(ProcessError),
    /// The input manifest could not be loaded.
    #[error("failed to load input manifest: {0}")]
    LoadInput(SchemaError),
    /// The input contract is not a source contract.
    #[error("input contract must be {expected}, got {found}")]
    UnexpectedContract {
        /// Accepted kind.
        expected: ContractType,
        /// Kind found in the input.
        found: ContractType,
    },
    /// The input artifact directory is unusable.
    #[error("input artifact path {path}: {message}")]
    InputArtifact {
        /// Path derived from the input manifest.
        path: PathBuf,
        /// Failure detail.
        message: String,
    },
    /// The output artifact directory could not be prepared.
    #[error("creating output artifact path {path}: {message}")]
    OutputDirectory {
        /// Path derived from the output manifest.
        path: PathBuf,
        /// Failure detail.
        message: String,
    },
    /// Declared system packages could not be installed.
    #[error("installing dependencies: {0}")]
    Dependencies(DependencyError),
    /// A build target failed.
    #[error("build failed: {0}")]
    Build(BuildError),
    /// A test pass failed fatally.
    #[error("test run failed: {0}")]
    Test(TestError),
    /// The output manifest could not be written.
    #[error("writing output manifest {path}: {source}")]
    WriteOutput {
        /// Output manifest path.
        path: PathBuf,
        /// Underlying codec error.
        source: SchemaError,
    },
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs one invocation end to end and returns the manifest it wrote.
///
/// # Errors
///
/// Returns [`TaskError`] for the first failing stage; nothing is written to
/// the output manifest path in that case.
pub fn run_task(ctx: &TaskContext<'_>, options: &TaskOptions) -> Result<OutputManifest, TaskError> {
    if options.debug {
        ctx.runner
            .run(&Invocation::new(ctx.config.toolchain.go.as_str(), ["env"]))
            .map_err(TaskError::Toolchain)?;
    }

    let input = read_input_manifest(&options.input_path).map_err(TaskError::LoadInput)?;
    if options.debug {
        let dump = serde_json::to_string(&input).unwrap_or_default();
        ctx.log.record(&TaskLogEvent::debug("input_loaded", dump));
    }
    let contract = &input.input.contract;
    let Some(source) = contract.source_data() else {
        return Err(TaskError::UnexpectedContract {
            expected: ContractType::GolangSource,
            found: contract.contract_type(),
        });
    };

    let tree = input_artifact_path(&options.input_path, &input.input.artifact_path)?;
    let output_dir = output_artifact_path(&options.output_path, &options.output_artifact_directory)?;

    if !source.depends_on.is_empty() {
        ctx.log.record(
            &TaskLogEvent::info("dependencies_installing", "fetching dependencies")
                .with_field("distributions", source.depends_on.keys().cloned().collect::<Vec<_>>().join(",")),
        );
    }
    ctx.installers.install_all(ctx.runner, &source.depends_on).map_err(TaskError::Dependencies)?;

    let linker = linker_for(ctx.config.workspace.link_strategy, ctx.runner);
    let resolver = WorkspaceResolver::new(ctx.legacy_root.clone(), linker.as_ref(), ctx.log);

    let results = match options.mode {
        RunMode::Build => BuildOrchestrator::new(ctx.config, ctx.runner, &resolver, ctx.log)
            .run(&BuildRequest {
                name: &contract.name,
                version: &contract.version,
                source,
                tree: &tree,
                output_dir: &output_dir,
                artifact_path: &options.output_artifact_directory,
                debug: options.debug,
            })
            .map_err(TaskError::Build)?,
        RunMode::Test => {
            let data = TestOrchestrator::new(ctx.config, ctx.runner, &resolver, ctx.log)
                .run(&TestRequest {
                    name: &contract.name,
                    source,
                    tree: &tree,
                })
                .map_err(TaskError::Test)?;
            let artifact_path = if dir_is_empty(&output_dir)? {
                None
            } else {
                Some(options.output_artifact_directory.clone())
            };
            vec![OutputResult {
                artifact_path,
                contract: Contract::new(ContractData::TestRun(data)),
            }]
        }
    };

    let manifest = OutputManifest {
        results,
    };
    write_output_manifest(&options.output_path, &manifest).map_err(|source| {
        TaskError::WriteOutput {
            path: options.output_path.clone(),
            source,
        }
    })?;
    ctx.log.record(
        &TaskLogEvent::info("task_finished", "output manifest written")
            .with_field("mode", options.mode.as_str())
            .with_field("results", manifest.results.len().to_string())
            .with_field("output", options.output_path.display().to_string()),
    );
    Ok(manifest)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins `relative` onto the directory holding `manifest`. A bare file name
/// lives in the current directory.
fn sibling_path(manifest: &Path, relative: &str) -> PathBuf {
    let dir = match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    dir.join(relative)
}

/// Resolves the source tree next to the input manifest to an absolute path.
fn input_artifact_path(input_path: &Path, artifact_path: &str) -> Result<PathBuf, TaskError> {
    let path = sibling_path(input_path, artifact_path);
    let absolute = fs::canonicalize(&path).map_err(|err| TaskError::InputArtifact {
        path: path.clone(),
        message: err.to_string(),
    })?;
    if absolute.is_dir() {
        Ok(absolute)
    } else {
        Err(TaskError::InputArtifact {
            path,
            message: "not a directory".to_string(),
        })
    }
}

/// Creates the artifact directory next to the output manifest and returns its
/// absolute path; tool-chain commands run elsewhere and need it absolute.
fn output_artifact_path(output_path: &Path, directory: &str) -> Result<PathBuf, TaskError> {
    let path = sibling_path(output_path, directory);
    let failed = |err: std::io::Error| TaskError::OutputDirectory {
        path: path.clone(),
        message: err.to_string(),
    };
    fs::create_dir_all(&path).map_err(failed)?;
    fs::canonicalize(&path).map_err(failed)
}

/// Returns true when `dir` has no entries.
fn dir_is_empty(dir: &Path) -> Result<bool, TaskError> {
    let mut entries = fs::read_dir(dir).map_err(|err| TaskError::OutputDirectory {
        path: dir.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(entries.next().is_none())
}
