// crates/go-transformer-core/src/test_run.rs
// ============================================================================
// Module: Test Orchestrator
// Description: Unit and integration test passes over a golang-source tree.
// Purpose: Run the test tool-chain and fold its event stream into suites.
// Dependencies: go-transformer-config, go-transformer-contract, serde,
//               serde_json, tempfile, thiserror
// ============================================================================

//! ## Overview
//! A test run is two passes, unit first. Each pass lists the tree's packages,
//! keeps those belonging to its scope (integration packages are recognised by
//! a substring of their import path), and hands them to `gotestsum`, which
//! writes a JSON-lines event report. Package-level `pass`/`fail` events become
//! [`SuiteResult`] values.
//!
//! Failing suites are data, not errors. A pass only fails the invocation when
//! the runner errored and produced no suites at all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use go_transformer_config::TestConfig;
use go_transformer_config::TransformerConfig;
use go_transformer_contract::SourceData;
use go_transformer_contract::SuiteResult;
use go_transformer_contract::TestRunData;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::log::TaskLogEvent;
use crate::log::TaskLogSink;
use crate::process::CommandRunner;
use crate::process::Invocation;
use crate::process::ProcessError;
use crate::workspace::WorkspaceError;
use crate::workspace::WorkspaceResolver;

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Which packages a pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestScope {
    /// Packages whose import path lacks the integration pattern.
    Unit,
    /// Packages whose import path contains the integration pattern.
    Integration,
}

impl TestScope {
    /// Passes in execution order.
    pub const ORDER: [Self; 2] = [Self::Unit, Self::Integration];

    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Integration => "integration",
        }
    }
}

impl fmt::Display for TestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the build tags for a pass. The source tags are copied; the
/// integration pass appends the configured integration tag.
#[must_use]
pub fn scope_tags(config: &TestConfig, tags: &[String], scope: TestScope) -> Vec<String> {
    let mut scoped = tags.to_vec();
    if scope == TestScope::Integration {
        scoped.push(config.integration_tag.clone());
    }
    scoped
}

/// Keeps the listed packages that belong to `scope`, in listing order.
#[must_use]
pub fn filter_packages(listing: &str, pattern: &str, scope: TestScope) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| line.contains(pattern) == (scope == TestScope::Integration))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Returns the `go list` arguments for a pass.
#[must_use]
pub fn list_args(tags: &[String], workdir: &Path) -> Vec<String> {
    let mut args = vec!["list".to_string()];
    push_tags(&mut args, tags);
    args.push(format!("{}/...", workdir.display()));
    args
}

/// Returns the `gotestsum` arguments for a pass.
#[must_use]
pub fn test_args(
    config: &TransformerConfig,
    tags: &[String],
    report: &Path,
    packages: &[String],
) -> Vec<String> {
    let mut args = vec![
        "--format".to_string(),
        "standard-verbose".to_string(),
        "--jsonfile".to_string(),
        report.display().to_string(),
        "--".to_string(),
        format!("-timeout={}", config.test.timeout),
        "-cover".to_string(),
        format!("-covermode={}", config.test.cover_mode.as_str()),
    ];
    push_tags(&mut args, tags);
    args.extend(packages.iter().cloned());
    args
}

/// Appends `-tags a,b` when any tags are set.
fn push_tags(args: &mut Vec<String>, tags: &[String]) {
    if !tags.is_empty() {
        args.push("-tags".to_string());
        args.push(tags.join(","));
    }
}

// ============================================================================
// SECTION: Event Stream
// ============================================================================

/// Malformed line in a test event report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("test report line {line}: {message}")]
pub struct EventParseError {
    /// One-based line number.
    pub line: usize,
    /// Parse failure detail.
    pub message: String,
}

/// The fields of a `go test -json` event this engine reads.
#[derive(Debug, Deserialize)]
struct TestEvent {
    /// Event action (`run`, `pass`, `fail`, `output`, ...).
    #[serde(rename = "Action", default)]
    action: Option<String>,
    /// Import path of the package.
    #[serde(rename = "Package", default)]
    package: Option<String>,
    /// Test name; absent or null for package-level events.
    #[serde(rename = "Test", default)]
    test: Option<Value>,
}

/// Folds a JSON-lines event report into package suite results.
///
/// Blank lines are ignored. Only package-level `pass` and `fail` events
/// produce suites, in report order.
///
/// # Errors
///
/// Returns [`EventParseError`] for the first line that is not a JSON object
/// or cannot be read.
pub fn parse_event_stream<R: BufRead>(reader: R) -> Result<Vec<SuiteResult>, EventParseError> {
    let mut suites = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|err| EventParseError {
            line: line_number,
            message: err.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TestEvent = serde_json::from_str(&line).map_err(|err| EventParseError {
            line: line_number,
            message: err.to_string(),
        })?;
        if event.test.is_some() {
            continue;
        }
        let success = match event.action.as_deref() {
            Some("pass") => true,
            Some("fail") => false,
            _ => continue,
        };
        suites.push(SuiteResult::new(event.package.unwrap_or_default(), success));
    }
    Ok(suites)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Test orchestration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestError {
    /// The workspace could not be prepared.
    #[error("{scope} tests: setting up workspace: {source}")]
    Workspace {
        /// Failing pass.
        scope: TestScope,
        /// Underlying resolver error.
        source: WorkspaceError,
    },
    /// Listing packages failed.
    #[error("{scope} tests: listing packages: {source}")]
    List {
        /// Failing pass.
        scope: TestScope,
        /// Underlying process error.
        source: ProcessError,
    },
    /// The report file could not be created or read.
    #[error("{scope} tests: test report: {message}")]
    Report {
        /// Failing pass.
        scope: TestScope,
        /// I/O failure detail.
        message: String,
    },
    /// The report held a malformed event.
    #[error("{scope} tests: {source}")]
    Parse {
        /// Failing pass.
        scope: TestScope,
        /// Underlying parse error.
        source: EventParseError,
    },
    /// The test runner failed without reporting any suite.
    #[error("{scope} tests failed: {source}")]
    Pass {
        /// Failing pass.
        scope: TestScope,
        /// Underlying process error.
        source: ProcessError,
    },
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// One test invocation.
#[derive(Debug, Clone, Copy)]
pub struct TestRequest<'a> {
    /// Contract name, used as the legacy module identifier.
    pub name: &'a str,
    /// Source payload.
    pub source: &'a SourceData,
    /// Absolute path of the source tree.
    pub tree: &'a Path,
}

/// Result of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// Pass that ran.
    pub scope: TestScope,
    /// Suites reported by the pass.
    pub suites: Vec<SuiteResult>,
    /// Runner failure that still produced suites.
    pub invocation_error: Option<ProcessError>,
}

/// Runs the unit and integration passes of a source contract.
pub struct TestOrchestrator<'a> {
    /// Tool-chain settings.
    config: &'a TransformerConfig,
    /// Process runner for `go list` and the test runner.
    runner: &'a dyn CommandRunner,
    /// Workspace resolver.
    resolver: &'a WorkspaceResolver<'a>,
    /// Task event sink.
    log: &'a dyn TaskLogSink,
}

impl<'a> TestOrchestrator<'a> {
    /// Creates a test orchestrator.
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

    /// Runs both passes and aggregates their suites, unit suites first.
    ///
    /// # Errors
    ///
    /// Returns [`TestError`] when either pass fails fatally.
    pub fn run(&self, request: &TestRequest<'_>) -> Result<TestRunData, TestError> {
        let mut success = true;
        let mut suites = Vec::new();
        for scope in TestScope::ORDER {
            let outcome = self.run_pass(request, scope)?;
            if let Some(err) = &outcome.invocation_error {
                success = false;
                self.log.record(
                    &TaskLogEvent::warn("test_pass_incomplete", err.to_string())
                        .with_field("scope", scope.as_str())
                        .with_field("suites", outcome.suites.len().to_string()),
                );
            }
            suites.extend(outcome.suites);
        }
        Ok(TestRunData {
            success,
            suites,
        })
    }

    /// Runs a single pass.
    ///
    /// # Errors
    ///
    /// Returns [`TestError`] when the workspace, package listing, or report
    /// handling fails, or when the runner fails without reporting suites.
    pub fn run_pass(
        &self,
        request: &TestRequest<'_>,
        scope: TestScope,
    ) -> Result<PassOutcome, TestError> {
        let workspace = self
            .resolver
            .resolve(request.tree, request.name, request.source.module_override())
            .map_err(|source| TestError::Workspace {
                scope,
                source,
            })?;
        let tags = scope_tags(&self.config.test, &request.source.tags, scope);

        let listing = self
            .runner
            .run(
                &Invocation::new(
                    self.config.toolchain.go.as_str(),
                    list_args(&tags, &workspace.workdir),
                )
                .in_dir(&workspace.workdir)
                .with_env(&workspace.env)
                .capture_stdout(),
            )
            .map_err(|source| TestError::List {
                scope,
                source,
            })?;
        let packages = filter_packages(
            &listing.stdout_text(),
            &self.config.test.integration_pattern,
            scope,
        );
        if packages.is_empty() {
            self.log.record(
                &TaskLogEvent::info("test_pass_skipped", "nothing to test")
                    .with_field("scope", scope.as_str()),
            );
            return Ok(PassOutcome {
                scope,
                suites: Vec::new(),
                invocation_error: None,
            });
        }

        let report = tempfile::Builder::new()
            .prefix("go-transformer-test-report-")
            .suffix(".json")
            .tempfile()
            .map_err(|err| TestError::Report {
                scope,
                message: err.to_string(),
            })?;
        let invocation = Invocation::new(
            self.config.toolchain.test_runner.as_str(),
            test_args(self.config, &tags, report.path(), &packages),
        )
        .in_dir(&workspace.workdir)
        .with_env(&workspace.env);
        self.log.record(
            &TaskLogEvent::info("test_pass_started", format!("running {scope} tests"))
                .with_field("scope", scope.as_str())
                .with_field("packages", packages.len().to_string())
                .with_field("command", invocation.command_line()),
        );
        let invocation_error = self.runner.run(&invocation).err();

        let file = File::open(report.path()).map_err(|err| TestError::Report {
            scope,
            message: format!("{}: {err}", report.path().display()),
        })?;
        let suites = parse_event_stream(BufReader::new(file)).map_err(|source| TestError::Parse {
            scope,
            source,
        })?;

        match invocation_error {
            Some(source) if suites.is_empty() => Err(TestError::Pass {
                scope,
                source,
            }),
            invocation_error => Ok(PassOutcome {
                scope,
                suites,
                invocation_error,
            }),
        }
    }
}
