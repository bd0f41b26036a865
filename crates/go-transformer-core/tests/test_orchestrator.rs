// crates/go-transformer-core/tests/test_orchestrator.rs
// ============================================================================
// Module: Test Orchestrator Tests
// Description: Two-pass test runs against a scripted tool-chain.
// Purpose: Ensure pass ordering, skipping, and failure escalation hold.
// Dependencies: go-transformer-config, go-transformer-contract,
//               go-transformer-core, tempfile
// ============================================================================

//! ## Overview
//! The scripted runner answers `go list` with a fixed listing and writes a
//! canned event report wherever `--jsonfile` points.

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

use go_transformer_config::TransformerConfig;
use go_transformer_contract::SourceData;
use go_transformer_contract::SuiteResult;
use go_transformer_core::CommandRunner;
use go_transformer_core::Invocation;
use go_transformer_core::MemoryLogSink;
use go_transformer_core::ProcessError;
use go_transformer_core::ProcessOutput;
use go_transformer_core::SymlinkLinker;
use go_transformer_core::TestError;
use go_transformer_core::TestOrchestrator;
use go_transformer_core::TestRequest;
use go_transformer_core::TestScope;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const LISTING: &str = "example.com/app\nexample.com/app/integration/api\n";
const UNIT_REPORT: &str = "{\"Action\":\"pass\",\"Package\":\"example.com/app\"}\n";
const INTEGRATION_REPORT: &str = concat!(
    "{\"Action\":\"run\",\"Package\":\"example.com/app/integration/api\",\"Test\":\"TestAPI\"}\n",
    "{\"Action\":\"fail\",\"Package\":\"example.com/app/integration/api\",\"Test\":\"TestAPI\"}\n",
    "{\"Action\":\"fail\",\"Package\":\"example.com/app/integration/api\"}\n",
);

/// Scripted tool-chain.
struct ScriptedRunner {
    invocations: RefCell<Vec<Invocation>>,
    listing: &'static str,
    list_fails: bool,
    unit_report: &'static str,
    unit_fails: bool,
    integration_report: &'static str,
    integration_fails: bool,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self {
            invocations: RefCell::default(),
            listing: LISTING,
            list_fails: false,
            unit_report: UNIT_REPORT,
            unit_fails: false,
            integration_report: INTEGRATION_REPORT,
            integration_fails: false,
        }
    }
}

impl ScriptedRunner {
    fn runner_invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().iter().filter(|inv| inv.program == "gotestsum").cloned().collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        self.invocations.borrow_mut().push(invocation.clone());
        let failure = || ProcessError::Failed {
            program: invocation.program.clone(),
            code: 1,
            stderr: "FAIL".to_string(),
        };
        if invocation.program == "go" {
            if self.list_fails {
                return Err(failure());
            }
            return Ok(ProcessOutput {
                stdout: self.listing.as_bytes().to_vec(),
                ..ProcessOutput::default()
            });
        }

        let report_at = invocation.args.iter().position(|arg| arg == "--jsonfile").unwrap() + 1;
        let integration =
            invocation.args.last().is_some_and(|package| package.contains("integration"));
        let (report, fails) = if integration {
            (self.integration_report, self.integration_fails)
        } else {
            (self.unit_report, self.unit_fails)
        };
        fs::write(&invocation.args[report_at], report).unwrap();
        if fails { Err(failure()) } else { Ok(ProcessOutput::default()) }
    }
}

fn module_tree() -> tempfile::TempDir {
    let tree = tempfile::tempdir().unwrap();
    fs::write(tree.path().join("go.mod"), "module example.com/app\n").unwrap();
    tree
}

fn run_with(
    runner: &ScriptedRunner,
    log: &MemoryLogSink,
    source: &SourceData,
) -> Result<go_transformer_contract::TestRunData, TestError> {
    let config = TransformerConfig::default();
    let tree = module_tree();
    let resolver = go_transformer_core::WorkspaceResolver::new(None, &SymlinkLinker, log);
    TestOrchestrator::new(&config, runner, &resolver, log).run(&TestRequest {
        name: "example.com/app",
        source,
        tree: tree.path(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn unit_suites_precede_integration_suites() {
    let runner = ScriptedRunner::default();
    let log = MemoryLogSink::new();

    let data = run_with(&runner, &log, &SourceData::default()).unwrap();

    assert!(data.success);
    assert_eq!(
        data.suites,
        vec![
            SuiteResult::new("example.com/app", true),
            SuiteResult::new("example.com/app/integration/api", false),
        ]
    );
}

#[test]
fn integration_tag_only_applies_to_integration_pass() {
    let runner = ScriptedRunner::default();
    let log = MemoryLogSink::new();
    let source = SourceData {
        tags: vec!["netgo".to_string()],
        ..SourceData::default()
    };

    run_with(&runner, &log, &source).unwrap();

    let calls = runner.runner_invocations();
    assert_eq!(calls.len(), 2);
    let tags_of = |inv: &Invocation| {
        let at = inv.args.iter().position(|arg| arg == "-tags").unwrap();
        inv.args[at + 1].clone()
    };
    assert_eq!(tags_of(&calls[0]), "netgo");
    assert_eq!(tags_of(&calls[1]), "netgo,integration");
    assert_eq!(calls[0].args.last().unwrap(), "example.com/app");
    assert_eq!(source.tags, vec!["netgo"]);
}

#[test]
fn go_list_scans_resolved_workdir() {
    let runner = ScriptedRunner::default();
    let log = MemoryLogSink::new();

    run_with(&runner, &log, &SourceData::default()).unwrap();

    let list = runner.invocations.borrow()[0].clone();
    assert_eq!(list.args[0], "list");
    let workdir = list.dir.unwrap();
    assert_eq!(list.args.last().unwrap(), &format!("{}/...", workdir.display()));
}

#[test]
fn empty_scope_is_skipped_without_running_tests() {
    let runner = ScriptedRunner {
        listing: "example.com/app\n",
        ..ScriptedRunner::default()
    };
    let log = MemoryLogSink::new();

    let data = run_with(&runner, &log, &SourceData::default()).unwrap();

    assert!(data.success);
    assert_eq!(data.suites, vec![SuiteResult::new("example.com/app", true)]);
    assert_eq!(runner.runner_invocations().len(), 1);
    assert!(log.contains("test_pass_skipped"));
}

#[test]
fn nothing_to_test_at_all_is_a_clean_success() {
    let runner = ScriptedRunner {
        listing: "",
        ..ScriptedRunner::default()
    };
    let log = MemoryLogSink::new();

    let data = run_with(&runner, &log, &SourceData::default()).unwrap();

    assert!(data.success);
    assert!(data.suites.is_empty());
    assert!(runner.runner_invocations().is_empty());
}

#[test]
fn runner_error_with_suites_marks_run_unsuccessful() {
    let runner = ScriptedRunner {
        integration_fails: true,
        ..ScriptedRunner::default()
    };
    let log = MemoryLogSink::new();

    let data = run_with(&runner, &log, &SourceData::default()).unwrap();

    assert!(!data.success);
    assert_eq!(data.suites.len(), 2);
    assert!(log.contains("test_pass_incomplete"));
}

#[test]
fn runner_error_without_suites_is_fatal() {
    let runner = ScriptedRunner {
        unit_report: "",
        unit_fails: true,
        ..ScriptedRunner::default()
    };
    let log = MemoryLogSink::new();

    let err = run_with(&runner, &log, &SourceData::default()).unwrap_err();

    assert!(
        matches!(
            err,
            TestError::Pass {
                scope: TestScope::Unit,
                ..
            }
        ),
        "{err}"
    );
    assert_eq!(runner.runner_invocations().len(), 1);
}

#[test]
fn listing_failure_is_fatal() {
    let runner = ScriptedRunner {
        list_fails: true,
        ..ScriptedRunner::default()
    };
    let log = MemoryLogSink::new();

    let err = run_with(&runner, &log, &SourceData::default()).unwrap_err();

    assert!(matches!(err, TestError::List { .. }), "{err}");
}

#[test]
fn malformed_report_is_fatal() {
    let runner = ScriptedRunner {
        unit_report: "{\"Action\":\"pass\",\"Package\":\"example.com/app\"}\n{oops\n",
        ..ScriptedRunner::default()
    };
    let log = MemoryLogSink::new();

    let err = run_with(&runner, &log, &SourceData::default()).unwrap_err();

    assert!(
        matches!(&err, TestError::Parse { source, .. } if source.line == 2),
        "{err}"
    );
}
