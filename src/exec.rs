//! Command execution for a single context.
//!
//! [`CommandExecutor`] is the seam between the worker pool and real
//! processes; tests substitute their own implementation.

use crate::errors::TaskError;
use crate::output::PrefixingWriter;
use async_trait::async_trait;
use std::io::{self, Write};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs one argument vector with its output bound to two writers.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `argv` to completion, or until `cancel` fires.
    async fn execute(
        &self,
        argv: &[String],
        stdout: PrefixingWriter,
        stderr: PrefixingWriter,
        cancel: &CancellationToken,
    ) -> Result<(), TaskError>;
}

/// Spawns the kubectl binary (or whatever program it was built with).
#[derive(Debug, Clone)]
pub struct KubectlExecutor {
    program: String,
}

impl KubectlExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl CommandExecutor for KubectlExecutor {
    async fn execute(
        &self,
        argv: &[String],
        stdout: PrefixingWriter,
        stderr: PrefixingWriter,
        cancel: &CancellationToken,
    ) -> Result<(), TaskError> {
        debug!(program = %self.program, args = ?argv, "spawn");

        let mut child = Command::new(&self.program)
            .args(argv)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TaskError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let out_pump = tokio::spawn(pump_lines(child.stdout.take(), stdout));
        let err_pump = tokio::spawn(pump_lines(child.stderr.take(), stderr));
        let out_abort = out_pump.abort_handle();
        let err_abort = err_pump.abort_handle();

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                debug!(program = %self.program, "cancelled; killing child");
                let _ = child.start_kill();
                let _ = child.wait().await;
                // A grandchild may still hold the pipes open.
                out_abort.abort();
                err_abort.abort();
                return Err(TaskError::Cancelled);
            }
        };

        // A background grandchild may keep the pipes open after the child exits.
        let drained = tokio::select! {
            joined = async { (out_pump.await, err_pump.await) } => joined,
            _ = cancel.cancelled() => {
                debug!(program = %self.program, "cancelled while draining output");
                out_abort.abort();
                err_abort.abort();
                return Err(TaskError::Cancelled);
            }
        };
        for pump in [drained.0, drained.1] {
            pump.map_err(io::Error::other)??;
        }

        debug!(program = %self.program, ?status, "exit");
        if status.success() {
            Ok(())
        } else {
            Err(status.code().map_or(TaskError::Signal, TaskError::Exit))
        }
    }
}

/// Forward `reader` to `writer` one line per write call.
///
/// A trailing fragment without a newline gets one, so the next label
/// always starts a fresh line.
async fn pump_lines<R>(reader: Option<R>, mut writer: PrefixingWriter) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(());
    };
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if line.last() != Some(&b'\n') {
            line.push(b'\n');
        }
        writer.write_all(&line)?;
    }
}
