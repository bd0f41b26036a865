// crates/go-transformer-core/src/packages.rs
// ============================================================================
// Module: Package Installer Registry
// Description: Distribution-keyed installers for declared system packages.
// Purpose: Satisfy a source contract's `dependsOn` map before building.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! Installers are registered by distribution identifier on an
//! [`InstallerRegistryBuilder`], which may be shared across threads during the
//! registration phase. [`InstallerRegistryBuilder::build`] freezes the map into
//! an [`InstallerRegistry`] that is read without locking for the rest of the
//! invocation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use thiserror::Error;

use crate::process::CommandRunner;
use crate::process::Invocation;
use crate::process::ProcessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Distribution identifier of the built-in Debian installer.
pub const DEBIAN_DISTRIBUTION: &str = "debian";

/// Debian package manager front end.
const APT_GET: &str = "apt-get";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dependency installation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// No installer is registered for the distribution.
    #[error("no installer registered for distribution {distro}")]
    UnknownDistribution {
        /// Requested distribution identifier.
        distro: String,
    },
    /// The installer ran and failed.
    #[error("installing {distro} packages failed: {source}")]
    Install {
        /// Distribution identifier.
        distro: String,
        /// Underlying process failure.
        source: ProcessError,
    },
}

// ============================================================================
// SECTION: Installers
// ============================================================================

/// Installs system packages for one distribution.
pub trait PackageInstaller: Send + Sync {
    /// Installs every package in `packages`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the package manager fails.
    fn install(&self, runner: &dyn CommandRunner, packages: &[String]) -> Result<(), ProcessError>;
}

/// Installer driving `apt-get` non-interactively.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebianInstaller;

impl DebianInstaller {
    /// Returns the update and install invocations for `packages`.
    #[must_use]
    pub fn invocations(packages: &[String]) -> [Invocation; 2] {
        let env = [("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())];
        let update = Invocation::new(APT_GET, ["update"]).with_env(&env);
        let mut args = vec![
            "install".to_string(),
            "-y".to_string(),
            "--no-install-recommends".to_string(),
        ];
        args.extend(packages.iter().cloned());
        let install = Invocation::new(APT_GET, args).with_env(&env);
        [update, install]
    }
}

impl PackageInstaller for DebianInstaller {
    fn install(&self, runner: &dyn CommandRunner, packages: &[String]) -> Result<(), ProcessError> {
        for invocation in Self::invocations(packages) {
            runner.run(&invocation)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Mutable registration phase for installers.
#[derive(Default)]
pub struct InstallerRegistryBuilder {
    /// Installers keyed by distribution identifier.
    installers: Mutex<BTreeMap<String, Box<dyn PackageInstaller>>>,
}

impl InstallerRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an installer; a later registration for the same
    /// distribution replaces the earlier one.
    pub fn register(&self, distro: impl Into<String>, installer: impl PackageInstaller + 'static) {
        let mut installers = self.installers.lock().unwrap_or_else(PoisonError::into_inner);
        installers.insert(distro.into(), Box::new(installer));
    }

    /// Freezes the registrations.
    #[must_use]
    pub fn build(self) -> InstallerRegistry {
        InstallerRegistry {
            installers: self.installers.into_inner().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Immutable installer lookup.
pub struct InstallerRegistry {
    /// Installers keyed by distribution identifier.
    installers: BTreeMap<String, Box<dyn PackageInstaller>>,
}

impl InstallerRegistry {
    /// Creates a registry holding the built-in installers.
    #[must_use]
    pub fn with_builtin_installers() -> Self {
        let builder = InstallerRegistryBuilder::new();
        builder.register(DEBIAN_DISTRIBUTION, DebianInstaller);
        builder.build()
    }

    /// Returns the registered distribution identifiers in order.
    #[must_use]
    pub fn distributions(&self) -> Vec<&str> {
        self.installers.keys().map(String::as_str).collect()
    }

    /// Installs `packages` with the installer registered for `distro`.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyError::UnknownDistribution`] without running
    /// anything when `distro` is unregistered, and
    /// [`DependencyError::Install`] when the installer fails.
    pub fn install(
        &self,
        runner: &dyn CommandRunner,
        distro: &str,
        packages: &[String],
    ) -> Result<(), DependencyError> {
        let installer = self.installer(distro)?;
        installer.install(runner, packages).map_err(|source| DependencyError::Install {
            distro: distro.to_string(),
            source,
        })
    }

    /// Installs the package lists of a `dependsOn` map in key order. Every
    /// key must name a registered distribution; an empty list runs nothing.
    /// Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`DependencyError`] encountered.
    pub fn install_all(
        &self,
        runner: &dyn CommandRunner,
        depends_on: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), DependencyError> {
        for (distro, packages) in depends_on {
            let installer = self.installer(distro)?;
            if packages.is_empty() {
                continue;
            }
            installer.install(runner, packages).map_err(|source| DependencyError::Install {
                distro: distro.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Looks up the installer registered for `distro`.
    fn installer(&self, distro: &str) -> Result<&dyn PackageInstaller, DependencyError> {
        self.installers.get(distro).map(|installer| &**installer).ok_or_else(|| {
            DependencyError::UnknownDistribution {
                distro: distro.to_string(),
            }
        })
    }
}
