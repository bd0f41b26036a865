// crates/go-transformer-core/src/workspace.rs
// ============================================================================
// Module: Workspace Resolver
// Description: Module-mode detection and the GOPATH compatibility shim.
// Purpose: Hand the tool-chain a working directory and env it can build in.
// Dependencies: go-transformer-config, std, thiserror
// ============================================================================

//! ## Overview
//! A tree holding `go.mod` builds in place. Anything else is a legacy tree:
//! it must appear under `$GOPATH/src/<module>` before `go` will resolve its
//! imports, so the resolver makes it visible there through a [`TreeLinker`]
//! and switches module support off for the tool-chain.
//!
//! An existing compatibility path is reused untouched, which keeps repeated
//! resolutions in one invocation cheap and idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use go_transformer_config::LinkStrategy;
use thiserror::Error;

use crate::log::TaskLogEvent;
use crate::log::TaskLogSink;
use crate::process::CommandRunner;
use crate::process::Invocation;
use crate::process::ProcessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File whose presence marks a module-mode tree.
pub const MODULE_MARKER: &str = "go.mod";

/// Environment variable naming the legacy workspace root.
pub const LEGACY_ROOT_ENV: &str = "GOPATH";

/// Environment override disabling module mode for legacy trees.
pub const LEGACY_MODE_OVERRIDE: (&str, &str) = ("GO111MODULE", "off");

// ============================================================================
// SECTION: Types
// ============================================================================

/// How the tool-chain should treat the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceMode {
    /// The tree declares its own module.
    Module,
    /// The tree is served from the legacy workspace root.
    Legacy,
}

impl WorkspaceMode {
    /// Returns the lowercase label used in log events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Legacy => "legacy",
        }
    }
}

/// Outcome of resolving a source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWorkspace {
    /// Detected mode.
    pub mode: WorkspaceMode,
    /// Directory the tool-chain runs in.
    pub workdir: PathBuf,
    /// Environment overrides for the tool-chain.
    pub env: Vec<(String, String)>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Workspace resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    /// Legacy mode needs a workspace root and none is set.
    #[error("GOPATH undefined")]
    UndefinedWorkspaceRoot,
    /// The module identifier cannot name a path below the workspace root.
    #[error("invalid module path {module:?}")]
    InvalidModulePath {
        /// Rejected identifier.
        module: String,
    },
    /// A path could not be inspected.
    #[error("stat {path}: {message}")]
    Stat {
        /// Inspected path.
        path: PathBuf,
        /// Underlying I/O error text.
        message: String,
    },
    /// A directory could not be created.
    #[error("mkdir {path}: {message}")]
    CreateDir {
        /// Directory being created.
        path: PathBuf,
        /// Underlying I/O error text.
        message: String,
    },
    /// The tree could not be made visible at the compatibility path.
    #[error("{operation} {source_path} -> {target}: {message}")]
    Link {
        /// Linker that failed (`bind-mount` or `symlink`).
        operation: &'static str,
        /// Tree being exposed.
        source_path: PathBuf,
        /// Compatibility path.
        target: PathBuf,
        /// Failure detail.
        message: String,
    },
}

// ============================================================================
// SECTION: Tree Linkers
// ============================================================================

/// Makes a source tree visible at another path.
pub trait TreeLinker {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Exposes `tree` at `target`. The parent of `target` exists and
    /// `target` itself does not.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Link`] or [`WorkspaceError::CreateDir`] on
    /// failure.
    fn link(&self, tree: &Path, target: &Path) -> Result<(), WorkspaceError>;
}

/// Linker running `mount --bind`.
pub struct BindMountLinker<'a> {
    /// Runner for the `mount` utility.
    runner: &'a dyn CommandRunner,
}

impl<'a> BindMountLinker<'a> {
    /// Creates a bind-mount linker.
    #[must_use]
    pub const fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
        }
    }
}

impl TreeLinker for BindMountLinker<'_> {
    fn name(&self) -> &'static str {
        "bind-mount"
    }

    fn link(&self, tree: &Path, target: &Path) -> Result<(), WorkspaceError> {
        fs::create_dir_all(target).map_err(|err| WorkspaceError::CreateDir {
            path: target.to_path_buf(),
            message: err.to_string(),
        })?;
        let invocation = Invocation::new(
            "mount",
            [
                "--bind".to_string(),
                tree.display().to_string(),
                target.display().to_string(),
            ],
        );
        self.runner.run(&invocation).map(|_| ()).map_err(|err: ProcessError| {
            WorkspaceError::Link {
                operation: self.name(),
                source_path: tree.to_path_buf(),
                target: target.to_path_buf(),
                message: err.to_string(),
            }
        })
    }
}

/// Linker creating a directory symlink.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinkLinker;

impl TreeLinker for SymlinkLinker {
    fn name(&self) -> &'static str {
        "symlink"
    }

    fn link(&self, tree: &Path, target: &Path) -> Result<(), WorkspaceError> {
        symlink_dir(tree, target).map_err(|err| WorkspaceError::Link {
            operation: self.name(),
            source_path: tree.to_path_buf(),
            target: target.to_path_buf(),
            message: err.to_string(),
        })
    }
}

/// Creates a directory symlink at `target` pointing to `tree`.
#[cfg(unix)]
fn symlink_dir(tree: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(tree, target)
}

/// Creates a directory symlink at `target` pointing to `tree`.
#[cfg(windows)]
fn symlink_dir(tree: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(tree, target)
}

/// Linker trying `primary` first and `fallback` when it fails.
///
/// # Invariants
/// - A directory left empty by a failed primary attempt is removed before the
///   fallback runs.
pub struct FallbackLinker<P, F> {
    /// Preferred linker.
    primary: P,
    /// Linker used when the preferred one fails.
    fallback: F,
}

impl<P: TreeLinker, F: TreeLinker> FallbackLinker<P, F> {
    /// Creates a fallback combinator.
    #[must_use]
    pub const fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
        }
    }
}

impl<P: TreeLinker, F: TreeLinker> TreeLinker for FallbackLinker<P, F> {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn link(&self, tree: &Path, target: &Path) -> Result<(), WorkspaceError> {
        match self.primary.link(tree, target) {
            Ok(()) => Ok(()),
            Err(primary_err) => {
                // Only succeeds on an empty directory; a populated target is left alone.
                let _ = fs::remove_dir(target);
                self.fallback.link(tree, target).map_err(|fallback_err| WorkspaceError::Link {
                    operation: self.fallback.name(),
                    source_path: tree.to_path_buf(),
                    target: target.to_path_buf(),
                    message: format!("{fallback_err} (after {primary_err})"),
                })
            }
        }
    }
}

/// Builds the linker for a configured strategy.
#[must_use]
pub fn linker_for<'a>(
    strategy: LinkStrategy,
    runner: &'a dyn CommandRunner,
) -> Box<dyn TreeLinker + 'a> {
    match strategy {
        LinkStrategy::BindMount => Box::new(BindMountLinker::new(runner)),
        LinkStrategy::Symlink => Box::new(SymlinkLinker),
        LinkStrategy::Auto if cfg!(target_os = "linux") => {
            Box::new(FallbackLinker::new(BindMountLinker::new(runner), SymlinkLinker))
        }
        LinkStrategy::Auto => Box::new(SymlinkLinker),
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves source trees into tool-chain working directories.
pub struct WorkspaceResolver<'a> {
    /// Legacy workspace root, when defined.
    legacy_root: Option<PathBuf>,
    /// Linker for missing compatibility paths.
    linker: &'a dyn TreeLinker,
    /// Task event sink.
    log: &'a dyn TaskLogSink,
}

impl<'a> WorkspaceResolver<'a> {
    /// Creates a resolver with an explicit legacy root.
    #[must_use]
    pub fn new(
        legacy_root: Option<PathBuf>,
        linker: &'a dyn TreeLinker,
        log: &'a dyn TaskLogSink,
    ) -> Self {
        Self {
            legacy_root,
            linker,
            log,
        }
    }

    /// Resolves `tree` for `module`, preferring `module_override` as the
    /// compatibility path identifier when present.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] when the marker cannot be inspected, the
    /// legacy root is undefined, or the compatibility path cannot be set up.
    pub fn resolve(
        &self,
        tree: &Path,
        module: &str,
        module_override: Option<&str>,
    ) -> Result<ResolvedWorkspace, WorkspaceError> {
        if path_exists(&tree.join(MODULE_MARKER))? {
            self.log.record(
                &TaskLogEvent::debug("workspace_resolved", "module-mode tree")
                    .with_field("mode", WorkspaceMode::Module.as_str())
                    .with_field("workdir", tree.display().to_string()),
            );
            return Ok(ResolvedWorkspace {
                mode: WorkspaceMode::Module,
                workdir: tree.to_path_buf(),
                env: Vec::new(),
            });
        }

        let root = self.legacy_root.as_deref().ok_or(WorkspaceError::UndefinedWorkspaceRoot)?;
        let identifier = module_override.unwrap_or(module);
        let relative = module_relative_path(identifier)?;
        let workdir = root.join("src").join(relative);

        if path_exists(&workdir)? {
            self.log.record(
                &TaskLogEvent::debug("workspace_reused", "compatibility path already present")
                    .with_field("workdir", workdir.display().to_string()),
            );
        } else {
            if let Some(parent) = workdir.parent() {
                fs::create_dir_all(parent).map_err(|err| WorkspaceError::CreateDir {
                    path: parent.to_path_buf(),
                    message: err.to_string(),
                })?;
            }
            self.linker.link(tree, &workdir)?;
            self.log.record(
                &TaskLogEvent::info("workspace_linked", "legacy tree exposed under workspace root")
                    .with_field("linker", self.linker.name())
                    .with_field("source", tree.display().to_string())
                    .with_field("workdir", workdir.display().to_string()),
            );
        }

        let (key, value) = LEGACY_MODE_OVERRIDE;
        Ok(ResolvedWorkspace {
            mode: WorkspaceMode::Legacy,
            workdir,
            env: vec![(key.to_string(), value.to_string())],
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the legacy workspace root from [`LEGACY_ROOT_ENV`]. An empty value
/// counts as unset.
#[must_use]
pub fn legacy_root_from_env() -> Option<PathBuf> {
    std::env::var_os(LEGACY_ROOT_ENV).filter(|value| !value.is_empty()).map(PathBuf::from)
}

/// Returns whether `path` exists, treating only not-found as absence.
fn path_exists(path: &Path) -> Result<bool, WorkspaceError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(WorkspaceError::Stat {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

/// Validates a module identifier as a relative path of plain segments.
fn module_relative_path(module: &str) -> Result<&Path, WorkspaceError> {
    let path = Path::new(module);
    let plain = !module.is_empty()
        && path.components().all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(path)
    } else {
        Err(WorkspaceError::InvalidModulePath {
            module: module.to_string(),
        })
    }
}

#[cfg(test)]
mod tests;
