//! Confirmation gate shown before any command runs.

use crate::config::PromptMode;
use console::style;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Approved,
    Refused,
    /// The cancellation token fired before an answer was read.
    Cancelled,
}

/// List the matched contexts on `diag` and, in interactive mode, wait for a
/// `[Y/n]` answer on `input`.
///
/// An empty line, `y` or `Y` approves. Anything else refuses, including end
/// of input. The pending read is dropped as soon as `cancel` fires.
pub async fn confirm<R, W>(
    targets: &[String],
    mode: PromptMode,
    mut input: R,
    diag: &mut W,
    cancel: &CancellationToken,
) -> io::Result<GateDecision>
where
    R: AsyncBufRead + Unpin,
    W: Write + ?Sized,
{
    if mode == PromptMode::Interactive {
        writeln!(diag, "Will run command in context(s):")?;
    }
    for target in targets {
        write!(diag, "{}", style(format!("  - {}\n", target)).dim().for_stderr())?;
    }
    if mode == PromptMode::Skip {
        diag.flush()?;
        return Ok(GateDecision::Approved);
    }
    write!(diag, "Continue? [Y/n]: ")?;
    diag.flush()?;

    let mut line = Vec::new();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(GateDecision::Cancelled),
        read = input.read_until(b'\n', &mut line) => match read? {
            0 => Ok(GateDecision::Refused),
            _ => Ok(decide(&line)),
        },
    }
}

fn decide(line: &[u8]) -> GateDecision {
    let answer = String::from_utf8_lossy(line);
    match answer.trim_end_matches(['\r', '\n']) {
        "" | "y" | "Y" => GateDecision::Approved,
        _ => GateDecision::Refused,
    }
}
