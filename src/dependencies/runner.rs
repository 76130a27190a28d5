// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Runs introspection tools as subordinate processes with a timeout.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use wait_timeout::ChildExt;

/// Default timeout for introspection commands (30 seconds).
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while running an introspection command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    NotFound { command: String },
    #[error("Command failed: {command}")]
    Failed {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },
    #[error("Command exited with non-zero status {code}: {command}: {stderr}")]
    ExitStatus {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("Command produced output that is not valid UTF-8: {command}")]
    InvalidOutput {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
}

impl ToolCommand {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Capability to run a command and capture its standard output as text.
pub trait ToolRunner: Send + Sync {
    /// Run the command to completion.
    ///
    /// # Errors
    /// Returns an error if the command cannot be started, fails, times out or writes
    /// something other than UTF-8 to stdout.
    fn run(&self, command: &ToolCommand) -> Result<String, CommandError>;
}

impl<F> ToolRunner for F
where
    F: Fn(&ToolCommand) -> Result<String, CommandError> + Send + Sync,
{
    fn run(&self, command: &ToolCommand) -> Result<String, CommandError> {
        self(command)
    }
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl CommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ToolRunner for CommandRunner {
    fn run(&self, command: &ToolCommand) -> Result<String, CommandError> {
        let name = command.to_string();
        let mut child = match Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    return Err(CommandError::NotFound { command: name });
                }
                return Err(CommandError::Failed {
                    command: name,
                    source: e,
                });
            }
        };

        // Drain both pipes while waiting, a full pipe would otherwise block the child.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_timeout(&mut child, self.timeout, &name)?;
        let stdout = collect(stdout, &name)?;
        let stderr = collect(stderr, &name)?;

        if !status.success() {
            return Err(CommandError::ExitStatus {
                command: name,
                code: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        String::from_utf8(stdout).map_err(|e| CommandError::InvalidOutput {
            command: name,
            source: e,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut bytes)?;
        }
        Ok(bytes)
    })
}

fn collect(reader: JoinHandle<io::Result<Vec<u8>>>, command: &str) -> Result<Vec<u8>, CommandError> {
    reader
        .join()
        .map_err(|_| io::Error::other("Output reader panicked"))
        .and_then(|result| result)
        .map_err(|e| CommandError::Failed {
            command: command.to_string(),
            source: e,
        })
}

/// Wait for a child process to complete with a timeout.
///
/// If the timeout is reached, the process is killed.
///
/// # Returns
/// - `Ok(ExitStatus)` if the process exited within the timeout
/// - `Err(CommandError::Timeout)` if the process timed out
/// - `Err(CommandError::Failed)` if waiting failed or the process was terminated by a signal
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    command: &str,
) -> Result<ExitStatus, CommandError> {
    if let Some(status) = child
        .wait_timeout(timeout)
        .map_err(|e| CommandError::Failed {
            command: command.to_string(),
            source: e,
        })?
    {
        if status.code().is_some() {
            Ok(status)
        } else {
            Err(CommandError::Failed {
                command: command.to_string(),
                source: io::Error::other(termination_reason(status)),
            })
        }
    } else {
        let _ = child.kill();
        let _ = child.wait();
        Err(CommandError::Timeout {
            command: command.to_string(),
            timeout,
        })
    }
}

#[cfg(unix)]
fn termination_reason(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("Process terminated by signal: {signal}"),
        None => "Unknown process termination".to_string(),
    }
}

#[cfg(not(unix))]
fn termination_reason(_status: ExitStatus) -> String {
    "Unknown process termination".to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let runner = CommandRunner::default();
        let output = runner
            .run(&ToolCommand::new("sh").arg("-c").arg("echo hello"))
            .unwrap();
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn test_missing_command() {
        let runner = CommandRunner::default();
        let result = runner.run(&ToolCommand::new("definitely-not-a-real-tool-4711"));
        assert!(matches!(result, Err(CommandError::NotFound { .. })));
    }

    #[test]
    fn test_non_zero_exit_is_an_error() {
        let runner = CommandRunner::default();
        let result = runner.run(
            &ToolCommand::new("sh")
                .arg("-c")
                .arg("echo partial; echo broken >&2; exit 3"),
        );
        match result {
            Err(CommandError::ExitStatus { code, stderr, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("Expected ExitStatus error, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills_the_process() {
        let runner = CommandRunner::new(Duration::from_millis(200));
        let result = runner.run(&ToolCommand::new("sleep").arg("10"));
        assert!(matches!(result, Err(CommandError::Timeout { .. })));
    }

    #[test]
    fn test_large_output_does_not_block() {
        let runner = CommandRunner::default();
        let output = runner
            .run(
                &ToolCommand::new("sh")
                    .arg("-c")
                    .arg("i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done"),
            )
            .unwrap();
        assert_eq!(output.lines().count(), 20000);
    }

    #[test]
    fn test_closure_runner() {
        let runner = |command: &ToolCommand| -> Result<String, CommandError> {
            Ok(format!("ran {}", command.program()))
        };
        assert_eq!(runner.run(&ToolCommand::new("ldd")).unwrap(), "ran ldd");
    }

    #[test]
    fn test_command_display() {
        let command = ToolCommand::new("objdump").arg("-p").arg("/tmp/foo.dll");
        assert_eq!(command.to_string(), "objdump -p /tmp/foo.dll");
    }
}
