//! Raw status acquisition.
//!
//! The sampler only needs "give me the current status report as bytes", so that is all
//! [`StatusSource`] asks for. [`TirexStatusCommand`] is the production source: it runs
//! `tirex-status -r` and hands back its standard output.

use std::{
    future::Future,
    io,
    pin::Pin,
    process::{
        ExitStatus,
        Stdio,
    },
    time::Duration,
};
use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    ExitStatus {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Something that can produce one raw status report.
pub trait StatusSource: Send + Sync {
    /// Produce the report. No partial output is returned on failure.
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + '_>>;

    /// Human readable name, used in logs.
    fn name(&self) -> &str;
}

/// Runs the tirex status command and returns its stdout.
#[derive(Debug, Clone)]
pub struct TirexStatusCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    display: String,
}

impl TirexStatusCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        let program = program.into();
        let display = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            program,
            args,
            timeout,
            display,
        }
    }

    async fn run(&self) -> Result<Vec<u8>, FetchError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FetchError::Spawn {
                command: self.display.clone(),
                source,
            })?;

        // Dropping the `wait_with_output` future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|source| FetchError::Spawn {
                command: self.display.clone(),
                source,
            })?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    command: self.display.clone(),
                    timeout: self.timeout,
                })
            }
        };

        if !output.status.success() {
            return Err(FetchError::ExitStatus {
                command: self.display.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl StatusSource for TirexStatusCommand {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + '_>> {
        Box::pin(self.run())
    }

    fn name(&self) -> &str {
        &self.display
    }
}
