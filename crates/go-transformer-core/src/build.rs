// crates/go-transformer-core/src/build.rs
// ============================================================================
// Module: Build Orchestrator
// Description: Compiles each declared binary of a golang-source contract.
// Purpose: Turn source data into executable output results.
// Dependencies: go-transformer-config, go-transformer-contract, thiserror
// ============================================================================

//! ## Overview
//! Targets build one at a time in declared order. Each target resolves its
//! own workspace (the target doubles as the legacy module identifier) and
//! runs `go build` there; the first failing target stops the loop.
//!
//! The recorded platform is the host's: no cross-compilation happens, and
//! declared platforms only trigger a warning when the host is not among them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use go_transformer_config::TransformerConfig;
use go_transformer_contract::Contract;
use go_transformer_contract::ContractData;
use go_transformer_contract::ExecutableData;
use go_transformer_contract::OutputResult;
use go_transformer_contract::SourceData;
use thiserror::Error;

use crate::log::TaskLogEvent;
use crate::log::TaskLogSink;
use crate::process::CommandRunner;
use crate::process::Invocation;
use crate::process::ProcessError;
use crate::workspace::WorkspaceError;
use crate::workspace::WorkspaceResolver;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Build orchestration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Neither binaries nor a usable contract name were given.
    #[error("no build target: binaries empty and contract name {name:?} has no basename")]
    NoTargets {
        /// Contract name that was tried.
        name: String,
    },
    /// The workspace for a target could not be prepared.
    #[error("setting up workspace for {target}: {source}")]
    Workspace {
        /// Target being built.
        target: String,
        /// Underlying resolver error.
        source: WorkspaceError,
    },
    /// `go build` failed for a target.
    #[error("building {target}: {source}")]
    Target {
        /// Target being built.
        target: String,
        /// Underlying process error.
        source: ProcessError,
    },
}

// ============================================================================
// SECTION: Targets
// ============================================================================

/// Returns the binaries to build: the declared list, or the basename of the
/// contract name when none are declared.
#[must_use]
pub fn build_targets(name: &str, source: &SourceData) -> Vec<String> {
    if !source.binaries.is_empty() {
        return source.binaries.clone();
    }
    let base = name.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    if base.is_empty() { Vec::new() } else { vec![base.to_string()] }
}

/// Returns the host platform in Go `os/arch` notation.
#[must_use]
pub fn host_platform() -> String {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
        "powerpc64" => "ppc64",
        other => other,
    };
    format!("{os}/{arch}")
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Per-target build inputs.
#[derive(Debug, Clone, Copy)]
pub struct BuildOpts<'a> {
    /// Binary target name.
    pub target: &'a str,
    /// Directory receiving the compiled binary.
    pub output_dir: &'a Path,
    /// Version string embedded through the linker.
    pub version: &'a str,
    /// Build tags shared by all targets.
    pub tags: &'a [String],
    /// Adds `-x` when set.
    pub debug: bool,
}

/// Returns the `go` arguments for one target.
#[must_use]
pub fn build_args(config: &TransformerConfig, opts: &BuildOpts<'_>) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "-o".to_string(),
        opts.output_dir.join(opts.target).display().to_string(),
        "-ldflags".to_string(),
        format!("-X {}={}", config.build.version_symbol, opts.version),
    ];
    if opts.debug {
        args.push("-x".to_string());
    }
    if !opts.tags.is_empty() {
        args.push("-tags".to_string());
        args.push(opts.tags.join(","));
    }
    // Without the leading "./" go looks the package up in GOPATH.
    args.push(format!("./{}/{}", config.build.command_dir.trim_end_matches('/'), opts.target));
    args
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// One build invocation.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Contract name, used when no binaries are declared.
    pub name: &'a str,
    /// Contract version, embedded into every binary.
    pub version: &'a str,
    /// Source payload.
    pub source: &'a SourceData,
    /// Absolute path of the source tree.
    pub tree: &'a Path,
    /// Directory receiving the binaries.
    pub output_dir: &'a Path,
    /// `artifactPath` recorded on each result.
    pub artifact_path: &'a str,
    /// Verbose tool-chain output.
    pub debug: bool,
}

/// Builds every target of a source contract.
pub struct BuildOrchestrator<'a> {
    /// Tool-chain settings.
    config: &'a TransformerConfig,
    /// Process runner for `go build`.
    runner: &'a dyn CommandRunner,
    /// Workspace resolver.
    resolver: &'a WorkspaceResolver<'a>,
    /// Task event sink.
    log: &'a dyn TaskLogSink,
}

impl<'a> BuildOrchestrator<'a> {
    /// Creates a build orchestrator.
    #[must_use]
    pub const fn new(
        config: &'a TransformerConfig,
        runner: &'a dyn CommandRunner,
        resolver: &'a WorkspaceResolver<'a>,
        log: &'a dyn TaskLogSink,
    ) -> Self {
        Self {
            config,
            runner,
            resolver,
            log,
        }
    }

    /// Builds all targets in order, returning one executable result each.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for the first target whose workspace or build
    /// fails; later targets are not attempted.
    pub fn run(&self, request: &BuildRequest<'_>) -> Result<Vec<OutputResult>, BuildError> {
        let targets = build_targets(request.name, request.source);
        if targets.is_empty() {
            return Err(BuildError::NoTargets {
                name: request.name.to_string(),
            });
        }

        let platform = host_platform();
        let declared = &request.source.platforms;
        if !declared.is_empty() && !declared.contains(&platform) {
            self.log.record(
                &TaskLogEvent::warn("platform_mismatch", "host platform not among declared platforms")
                    .with_field("host", platform.clone())
                    .with_field("declared", declared.join(",")),
            );
        }

        let mut results = Vec::with_capacity(targets.len());
        for target in &targets {
            self.build_target(request, target)?;
            results.push(OutputResult {
                artifact_path: Some(request.artifact_path.to_string()),
                contract: Contract::new(ContractData::Executable(ExecutableData {
                    platform: platform.clone(),
                    filename: target.clone(),
                    version: request.version.to_string(),
                    depends_on: request.source.depends_on.clone(),
                })),
            });
        }
        Ok(results)
    }

    /// Resolves the workspace for `target` and runs `go build`.
    fn build_target(&self, request: &BuildRequest<'_>, target: &str) -> Result<(), BuildError> {
        let workspace = self
            .resolver
            .resolve(request.tree, target, request.source.module_override())
            .map_err(|source| BuildError::Workspace {
                target: target.to_string(),
                source,
            })?;

        let args = build_args(
            self.config,
            &BuildOpts {
                target,
                output_dir: request.output_dir,
                version: request.version,
                tags: &request.source.tags,
                debug: request.debug,
            },
        );
        let mut invocation = Invocation::new(self.config.toolchain.go.as_str(), args)
            .in_dir(&workspace.workdir)
            .with_env(&workspace.env);
        if request.debug {
            invocation = invocation.forward_stderr();
        }

        self.log.record(
            &TaskLogEvent::info("build_started", format!("building {target}"))
                .with_field("target", target)
                .with_field("mode", workspace.mode.as_str())
                .with_field("command", invocation.command_line()),
        );
        self.runner.run(&invocation).map_err(|source| BuildError::Target {
            target: target.to_string(),
            source,
        })?;
        self.log.record(
            &TaskLogEvent::info("build_finished", format!("built {target}"))
                .with_field("target", target),
        );
        Ok(())
    }
}
