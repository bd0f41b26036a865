// crates/go-transformer-core/tests/installer_registry.rs
// ============================================================================
// Module: Installer Registry Tests
// Description: Registration, lookup, and the Debian installer's commands.
// Purpose: Ensure unknown distributions fail before anything runs.
// Dependencies: go-transformer-core
// ============================================================================

//! ## Overview
//! Uses a recording [`CommandRunner`] so no package manager is touched.

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
use std::collections::BTreeMap;

use go_transformer_core::CommandRunner;
use go_transformer_core::DependencyError;
use go_transformer_core::InstallerRegistry;
use go_transformer_core::InstallerRegistryBuilder;
use go_transformer_core::Invocation;
use go_transformer_core::PackageInstaller;
use go_transformer_core::ProcessError;
use go_transformer_core::ProcessOutput;
use go_transformer_core::packages::DebianInstaller;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Runner recording every invocation; fails when the args contain `fail_on`.
#[derive(Default)]
struct RecordingRunner {
    invocations: RefCell<Vec<Invocation>>,
    fail_on: Option<&'static str>,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        self.invocations.borrow_mut().push(invocation.clone());
        if let Some(marker) = self.fail_on
            && invocation.args.iter().any(|arg| arg == marker)
        {
            return Err(ProcessError::Failed {
                program: invocation.program.clone(),
                code: 100,
                stderr: format!("E: Unable to locate package {marker}"),
            });
        }
        Ok(ProcessOutput::default())
    }
}

/// Installer that records package lists in the runner as a fake invocation.
struct EchoInstaller(&'static str);

impl PackageInstaller for EchoInstaller {
    fn install(&self, runner: &dyn CommandRunner, packages: &[String]) -> Result<(), ProcessError> {
        runner.run(&Invocation::new(self.0, packages.to_vec())).map(|_| ())
    }
}

fn pkgs(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn unknown_distribution_runs_nothing() {
    let runner = RecordingRunner::default();
    let registry = InstallerRegistry::with_builtin_installers();

    let err = registry.install(&runner, "alpine", &pkgs(&["git"])).unwrap_err();

    assert_eq!(
        err,
        DependencyError::UnknownDistribution {
            distro: "alpine".to_string(),
        }
    );
    assert!(runner.invocations.borrow().is_empty());
}

#[test]
fn debian_updates_then_installs_each_package_as_its_own_argument() {
    let runner = RecordingRunner::default();
    let registry = InstallerRegistry::with_builtin_installers();

    registry.install(&runner, "debian", &pkgs(&["libssl-dev", "pkg-config"])).unwrap();

    let invocations = runner.invocations.borrow();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0].program, "apt-get");
    assert_eq!(invocations[0].args, vec!["update"]);
    assert_eq!(
        invocations[1].args,
        vec!["install", "-y", "--no-install-recommends", "libssl-dev", "pkg-config"]
    );
    for invocation in invocations.iter() {
        assert!(
            invocation
                .env
                .contains(&("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string()))
        );
    }
    assert_eq!(DebianInstaller::invocations(&pkgs(&["git"]))[1].args.len(), 4);
}

#[test]
fn install_failure_names_the_distribution() {
    let runner = RecordingRunner {
        fail_on: Some("no-such-package"),
        ..RecordingRunner::default()
    };
    let registry = InstallerRegistry::with_builtin_installers();

    let err = registry.install(&runner, "debian", &pkgs(&["no-such-package"])).unwrap_err();

    let DependencyError::Install {
        distro,
        source,
    } = err
    else {
        panic!("expected install failure");
    };
    assert_eq!(distro, "debian");
    assert_eq!(source.exit_code(), 100);
}

#[test]
fn later_registration_replaces_earlier_one() {
    let runner = RecordingRunner::default();
    let builder = InstallerRegistryBuilder::new();
    builder.register("debian", DebianInstaller);
    builder.register("debian", EchoInstaller("custom-apt"));
    let registry = builder.build();

    registry.install(&runner, "debian", &pkgs(&["git"])).unwrap();

    let invocations = runner.invocations.borrow();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].program, "custom-apt");
}

#[test]
fn registration_is_safe_from_many_threads() {
    let builder = InstallerRegistryBuilder::new();
    let names = ["alpine", "arch", "debian", "fedora", "suse"];

    std::thread::scope(|scope| {
        for name in names {
            let builder = &builder;
            scope.spawn(move || builder.register(name, EchoInstaller(name)));
        }
    });

    assert_eq!(builder.build().distributions(), names.to_vec());
}

#[test]
fn install_all_walks_keys_in_order_and_skips_empty_lists() {
    let runner = RecordingRunner::default();
    let builder = InstallerRegistryBuilder::new();
    builder.register("alpine", EchoInstaller("apk"));
    builder.register("debian", EchoInstaller("apt"));
    builder.register("fedora", EchoInstaller("dnf"));
    let registry = builder.build();
    let mut depends_on = BTreeMap::new();
    depends_on.insert("debian".to_string(), pkgs(&["git"]));
    depends_on.insert("alpine".to_string(), pkgs(&["make"]));
    depends_on.insert("fedora".to_string(), Vec::new());

    registry.install_all(&runner, &depends_on).unwrap();

    let programs: Vec<String> =
        runner.invocations.borrow().iter().map(|invocation| invocation.program.clone()).collect();
    assert_eq!(programs, vec!["apk", "apt"]);
}

#[test]
fn install_all_rejects_unknown_distribution_with_empty_list() {
    let runner = RecordingRunner::default();
    let registry = InstallerRegistry::with_builtin_installers();
    let mut depends_on = BTreeMap::new();
    depends_on.insert("fedora".to_string(), Vec::new());

    let err = registry.install_all(&runner, &depends_on).unwrap_err();

    assert_eq!(
        err,
        DependencyError::UnknownDistribution {
            distro: "fedora".to_string(),
        }
    );
    assert!(runner.invocations.borrow().is_empty());
}

#[test]
fn install_all_stops_at_first_failure() {
    let runner = RecordingRunner::default();
    let registry = InstallerRegistry::with_builtin_installers();
    let mut depends_on = BTreeMap::new();
    depends_on.insert("centos".to_string(), pkgs(&["gcc"]));
    depends_on.insert("debian".to_string(), pkgs(&["git"]));

    let err = registry.install_all(&runner, &depends_on).unwrap_err();

    assert!(matches!(err, DependencyError::UnknownDistribution { .. }));
    assert!(runner.invocations.borrow().is_empty());
}
