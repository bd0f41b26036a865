// crates/go-transformer-core/src/lib.rs
// ============================================================================
// Module: Go Transformer Core Library
// Description: Public API surface for the build/test orchestration engine.
// Purpose: Expose the process runner, installers, resolver, and orchestrators.
// Dependencies: crate::{build, log, packages, process, task, test_run, workspace}
// ============================================================================

//! ## Overview
//! The engine turns a golang-source contract into executable or test-run
//! contracts by driving the Go tool-chain. It is strictly sequential: every
//! step blocks on its child process, and no state outlives an invocation.
//!
//! External programs run behind [`CommandRunner`], so orchestrators can be
//! exercised with scripted runners instead of a real tool-chain.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod build;
pub mod log;
pub mod packages;
pub mod process;
pub mod task;
pub mod test_run;
pub mod workspace;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use build::BuildError;
pub use build::BuildOpts;
pub use build::BuildOrchestrator;
pub use build::BuildRequest;
pub use build::build_args;
pub use build::build_targets;
pub use build::host_platform;
pub use log::LogLevel;
pub use log::MemoryLogSink;
pub use log::StderrLogSink;
pub use log::TaskLogEvent;
pub use log::TaskLogSink;
pub use packages::DebianInstaller;
pub use packages::DependencyError;
pub use packages::InstallerRegistry;
pub use packages::InstallerRegistryBuilder;
pub use packages::PackageInstaller;
pub use process::CommandRunner;
pub use process::Invocation;
pub use process::ProcessError;
pub use process::ProcessOutput;
pub use process::StreamMode;
pub use process::SystemCommandRunner;
pub use task::RunMode;
pub use task::TaskContext;
pub use task::TaskError;
pub use task::TaskOptions;
pub use task::run_task;
pub use test_run::EventParseError;
pub use test_run::PassOutcome;
pub use test_run::TestError;
pub use test_run::TestOrchestrator;
pub use test_run::TestRequest;
pub use test_run::TestScope;
pub use test_run::parse_event_stream;
pub use workspace::FallbackLinker;
pub use workspace::ResolvedWorkspace;
pub use workspace::SymlinkLinker;
pub use workspace::TreeLinker;
pub use workspace::WorkspaceError;
pub use workspace::WorkspaceMode;
pub use workspace::WorkspaceResolver;
pub use workspace::legacy_root_from_env;
pub use workspace::linker_for;
