//! Tunnel control and process execution
//!
//! The reconciler never talks to the kernel directly. It goes through the
//! [`TunnelControl`] trait, whose production implementation drives the `wg`
//! and `ip` tools via a [`CommandRunner`].

mod linux;

pub use linux::WgCommandControl;

use crate::error::{ConvergeError, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Live interface management consumed by the reconciler
#[cfg_attr(test, mockall::automock)]
pub trait TunnelControl {
    /// Whether the interface currently exists; absence is `Ok(false)`
    fn exists(&self, name: &str) -> Result<bool>;

    /// Make the live interface match the rendered configuration
    ///
    /// Must be idempotent: applying the same text twice yields the same state.
    fn apply_config(&self, name: &str, rendered: &str) -> Result<()>;

    /// Remove the interface
    fn teardown(&self, name: &str) -> Result<()>;
}

/// Captured result of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// Runs external programs
pub trait CommandRunner {
    /// Run `program` with `args`, optionally feeding `stdin`
    ///
    /// Only a failure to spawn or wait is an `Err`; a non-zero exit is
    /// reported through [`CommandOutput::success`].
    fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> Result<CommandOutput> {
        debug!("Executing command: {} {:?}", program, args);

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ConvergeError::Command(format!(
                    "Failed to execute {} {}: {}",
                    program,
                    args.join(" "),
                    e
                ))
            })?;

        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).map_err(|e| {
                    ConvergeError::Command(format!("Failed to write stdin of {}: {}", program, e))
                })?;
            }
        }

        let output = child.wait_with_output().map_err(|e| {
            ConvergeError::Command(format!("Failed to wait for {}: {}", program, e))
        })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_system_runner_captures_output() {
        let output = SystemRunner
            .run("sh", &["-c".to_string(), "echo out; echo err >&2".to_string()], None)
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_system_runner_feeds_stdin() {
        let output = SystemRunner
            .run("cat", &[], Some("hello\n"))
            .unwrap();
        assert_eq!(output.stdout, "hello\n");
    }

    #[test]
    fn test_system_runner_reports_failure_status() {
        let output = SystemRunner
            .run("sh", &["-c".to_string(), "exit 3".to_string()], None)
            .unwrap();
        assert!(!output.success);
    }

    #[test]
    fn test_system_runner_missing_program() {
        let err = SystemRunner
            .run("definitely-not-a-real-binary-wg", &[], None)
            .unwrap_err();
        assert_eq!(err.kind(), "command");
    }
}
