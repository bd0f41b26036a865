// crates/go-transformer-core/src/process.rs
// ============================================================================
// Module: Process Runner
// Description: Blocking execution of external tool-chain commands.
// Purpose: Map spawn and exit failures to structured errors.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! Every external program (`go`, `gotestsum`, `apt-get`, `mount`) runs through
//! a [`CommandRunner`]. The child inherits the host environment extended by
//! the invocation's overrides. stdout is forwarded live unless captured;
//! stderr is captured unless forwarded, so failures can carry the tool's own
//! diagnostics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Synthetic exit code reported when a command cannot be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// Destination of a child output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Stream goes straight to the host's corresponding stream.
    Forward,
    /// Stream is buffered and returned to the caller.
    Capture,
}

/// A fully specified command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Program arguments.
    pub args: Vec<String>,
    /// Working directory; the host's when `None`.
    pub dir: Option<PathBuf>,
    /// Environment overrides layered on top of the host environment.
    pub env: Vec<(String, String)>,
    /// stdout handling.
    pub stdout: StreamMode,
    /// stderr handling.
    pub stderr: StreamMode,
}

impl Invocation {
    /// Creates an invocation forwarding stdout and capturing stderr.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            env: Vec::new(),
            stdout: StreamMode::Forward,
            stderr: StreamMode::Capture,
        }
    }

    /// Sets the working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    /// Appends environment overrides.
    #[must_use]
    pub fn with_env(mut self, env: &[(String, String)]) -> Self {
        self.env.extend_from_slice(env);
        self
    }

    /// Buffers stdout instead of forwarding it.
    #[must_use]
    pub const fn capture_stdout(mut self) -> Self {
        self.stdout = StreamMode::Capture;
        self
    }

    /// Forwards stderr instead of buffering it.
    #[must_use]
    pub const fn forward_stderr(mut self) -> Self {
        self.stderr = StreamMode::Forward;
        self
    }

    /// Returns the space-joined command line for diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code (always zero on success).
    pub exit_code: i32,
    /// Captured stdout; empty when forwarded.
    pub stdout: Vec<u8>,
    /// Captured stderr; empty when forwarded.
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Returns captured stdout as lossy UTF-8.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Process execution errors.
///
/// # Invariants
/// - [`ProcessError::exit_code`] is non-zero for every variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The executable could not be located.
    #[error("{program}: command not found")]
    NotFound {
        /// Program that was requested.
        program: String,
    },
    /// The child could not be started for another reason.
    #[error("{program}: failed to start: {message}")]
    Spawn {
        /// Program that was requested.
        program: String,
        /// Underlying I/O error text.
        message: String,
    },
    /// The child exited unsuccessfully.
    #[error("{program} exited with status {code}: {stderr}")]
    Failed {
        /// Program that was run.
        program: String,
        /// Child exit code.
        code: i32,
        /// Captured stderr text (trimmed); empty when stderr was forwarded.
        stderr: String,
    },
}

impl ProcessError {
    /// Returns the exit code associated with the failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound {
                ..
            }
            | Self::Spawn {
                ..
            } => SPAWN_FAILURE_EXIT_CODE,
            Self::Failed {
                code,
                ..
            } => *code,
        }
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Executes external commands to completion.
pub trait CommandRunner {
    /// Runs the invocation and blocks until the child exits.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the program is missing, cannot start, or
    /// exits with a non-zero status.
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError>;
}

/// Runner backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).stdin(Stdio::null());
        if let Some(dir) = &invocation.dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        cmd.stdout(stdio_for(invocation.stdout));
        cmd.stderr(stdio_for(invocation.stderr));

        let output = cmd.output().map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ProcessError::NotFound {
                    program: invocation.program.clone(),
                }
            } else {
                ProcessError::Spawn {
                    program: invocation.program.clone(),
                    message: err.to_string(),
                }
            }
        })?;

        if output.status.success() {
            return Ok(ProcessOutput {
                exit_code: 0,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        let code = match output.status.code() {
            Some(0) | None => SPAWN_FAILURE_EXIT_CODE,
            Some(code) => code,
        };
        Err(ProcessError::Failed {
            program: invocation.program.clone(),
            code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Maps a stream mode to the child's stdio configuration.
fn stdio_for(mode: StreamMode) -> Stdio {
    match mode {
        StreamMode::Forward => Stdio::inherit(),
        StreamMode::Capture => Stdio::piped(),
    }
}
