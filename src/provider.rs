//! Discovery of the raw context list.

use crate::errors::AllctxError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Source of target names. Called once per run.
#[async_trait]
pub trait TargetProvider: Send + Sync {
    async fn targets(&self, cancel: &CancellationToken) -> Result<Vec<String>, AllctxError>;
}

/// Lists contexts with `kubectl config get-contexts -o=name`.
#[derive(Debug, Clone)]
pub struct KubectlContexts {
    program: String,
}

impl KubectlContexts {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl TargetProvider for KubectlContexts {
    async fn targets(&self, cancel: &CancellationToken) -> Result<Vec<String>, AllctxError> {
        debug!(program = %self.program, "listing contexts");

        let child = Command::new(&self.program)
            .args(["config", "get-contexts", "-o=name"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AllctxError::Provider(format!("{}: {}", self.program, e)))?;

        let output = tokio::select! {
            output = child.wait_with_output() => {
                output.map_err(|e| AllctxError::Provider(e.to_string()))?
            }
            _ = cancel.cancelled() => {
                return Err(AllctxError::Provider("canceled".to_string()));
            }
        };

        if !output.status.success() {
            return Err(AllctxError::Provider(match output.status.code() {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            }));
        }

        let names = parse_names(&String::from_utf8_lossy(&output.stdout));
        debug!(count = names.len(), "contexts listed");
        Ok(names)
    }
}

/// One name per line; blank lines dropped, first occurrence wins.
pub fn parse_names(stdout: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && seen.insert(*l))
        .map(String::from)
        .collect()
}
