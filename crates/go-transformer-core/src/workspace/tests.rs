// crates/go-transformer-core/src/workspace/tests.rs
// ============================================================================
// Module: Workspace Resolver Unit Tests
// Description: Mode detection, compatibility path reuse, and linking.
// Purpose: Pin the legacy shim's idempotence and failure reporting.
// Dependencies: go-transformer-core, tempfile
// ============================================================================

//! ## Overview
//! Drives [`WorkspaceResolver`] against scratch trees with an explicit legacy
//! root so no test touches the process environment.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use super::FallbackLinker;
use super::ResolvedWorkspace;
use super::TreeLinker;
use super::WorkspaceError;
use super::WorkspaceMode;
use super::WorkspaceResolver;
use crate::log::MemoryLogSink;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Linker that records requests and optionally fails after creating the
/// target directory.
#[derive(Default)]
struct RecordingLinker {
    calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    fail: bool,
}

impl RecordingLinker {
    fn failing() -> Self {
        Self {
            calls: RefCell::default(),
            fail: true,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl TreeLinker for RecordingLinker {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn link(&self, tree: &Path, target: &Path) -> Result<(), WorkspaceError> {
        self.calls.borrow_mut().push((tree.to_path_buf(), target.to_path_buf()));
        if self.fail {
            fs::create_dir(target).unwrap();
            return Err(WorkspaceError::Link {
                operation: "recording",
                source_path: tree.to_path_buf(),
                target: target.to_path_buf(),
                message: "refused".to_string(),
            });
        }
        assert!(!target.exists(), "target must not exist before linking");
        fs::create_dir(target).unwrap();
        Ok(())
    }
}

fn legacy_env() -> Vec<(String, String)> {
    vec![("GO111MODULE".to_string(), "off".to_string())]
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn module_tree_resolves_in_place_without_root() {
    let tree = tempfile::tempdir().unwrap();
    fs::write(tree.path().join("go.mod"), "module example.com/app\n").unwrap();
    let linker = RecordingLinker::default();
    let log = MemoryLogSink::new();

    let resolved = WorkspaceResolver::new(None, &linker, &log)
        .resolve(tree.path(), "example.com/app", None)
        .unwrap();

    assert_eq!(
        resolved,
        ResolvedWorkspace {
            mode: WorkspaceMode::Module,
            workdir: tree.path().to_path_buf(),
            env: Vec::new(),
        }
    );
    assert_eq!(linker.call_count(), 0);
}

#[test]
fn legacy_tree_without_root_is_an_error() {
    let tree = tempfile::tempdir().unwrap();
    let linker = RecordingLinker::default();
    let log = MemoryLogSink::new();

    let err = WorkspaceResolver::new(None, &linker, &log)
        .resolve(tree.path(), "example.com/app", None)
        .unwrap_err();

    assert_eq!(err, WorkspaceError::UndefinedWorkspaceRoot);
    assert_eq!(err.to_string(), "GOPATH undefined");
}

#[test]
fn existing_compatibility_path_is_reused() {
    let tree = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let existing = root.path().join("src").join("example.com").join("app");
    fs::create_dir_all(&existing).unwrap();
    let linker = RecordingLinker::default();
    let log = MemoryLogSink::new();
    let resolver = WorkspaceResolver::new(Some(root.path().to_path_buf()), &linker, &log);

    let first = resolver.resolve(tree.path(), "example.com/app", None).unwrap();
    let second = resolver.resolve(tree.path(), "example.com/app", None).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.mode, WorkspaceMode::Legacy);
    assert_eq!(first.workdir, existing);
    assert_eq!(first.env, legacy_env());
    assert_eq!(linker.call_count(), 0);
    assert!(log.contains("workspace_reused"));
}

#[test]
fn missing_compatibility_path_is_linked_once() {
    let tree = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let linker = RecordingLinker::default();
    let log = MemoryLogSink::new();
    let resolver = WorkspaceResolver::new(Some(root.path().to_path_buf()), &linker, &log);

    let first = resolver.resolve(tree.path(), "example.com/app", None).unwrap();
    let second = resolver.resolve(tree.path(), "example.com/app", None).unwrap();

    let expected = root.path().join("src/example.com/app");
    assert_eq!(first.workdir, expected);
    assert_eq!(second.workdir, expected);
    assert_eq!(*linker.calls.borrow(), vec![(tree.path().to_path_buf(), expected)]);
    assert!(log.contains("workspace_linked"));
}

#[test]
fn module_override_selects_compatibility_path() {
    let tree = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let linker = RecordingLinker::default();
    let log = MemoryLogSink::new();

    let resolved = WorkspaceResolver::new(Some(root.path().to_path_buf()), &linker, &log)
        .resolve(tree.path(), "app", Some("github.com/acme/app"))
        .unwrap();

    assert_eq!(resolved.workdir, root.path().join("src/github.com/acme/app"));
}

#[test]
fn escaping_module_paths_are_rejected() {
    let tree = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let linker = RecordingLinker::default();
    let log = MemoryLogSink::new();
    let resolver = WorkspaceResolver::new(Some(root.path().to_path_buf()), &linker, &log);

    for module in ["", "../outside", "/abs/app", "a/../../b"] {
        let err = resolver.resolve(tree.path(), module, None).unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidModulePath { .. }), "{module}: {err}");
    }
    assert_eq!(linker.call_count(), 0);
}

#[test]
fn fallback_runs_after_primary_failure_and_clears_target() {
    let tree = tempfile::tempdir().unwrap();
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("app");
    let linker = FallbackLinker::new(RecordingLinker::failing(), RecordingLinker::default());

    linker.link(tree.path(), &target).unwrap();

    assert_eq!(linker.primary.call_count(), 1);
    assert_eq!(linker.fallback.call_count(), 1);
    assert!(target.is_dir());
}

#[test]
fn fallback_failure_reports_both_causes() {
    let tree = tempfile::tempdir().unwrap();
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("app");
    let linker = FallbackLinker::new(RecordingLinker::failing(), RecordingLinker::failing());

    let err = linker.link(tree.path(), &target).unwrap_err();

    assert!(
        matches!(&err, WorkspaceError::Link { message, .. } if message.contains("after")),
        "{err}"
    );
}

#[cfg(unix)]
#[test]
fn symlink_linker_exposes_tree_contents() {
    use super::SymlinkLinker;

    let tree = tempfile::tempdir().unwrap();
    fs::write(tree.path().join("main.go"), "package main\n").unwrap();
    let root = tempfile::tempdir().unwrap();
    let log = MemoryLogSink::new();

    let resolved = WorkspaceResolver::new(Some(root.path().to_path_buf()), &SymlinkLinker, &log)
        .resolve(tree.path(), "example.com/app", None)
        .unwrap();

    let content = fs::read_to_string(resolved.workdir.join("main.go")).unwrap();
    assert_eq!(content, "package main\n");
}
