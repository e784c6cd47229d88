//! Output multiplexing for concurrently running commands.
//!
//! Every context gets a [`PrefixingWriter`] pair bound to the two
//! [`SharedSink`]s (stdout and stderr). Prefixes are computed once by
//! [`Labels`] from the match set: the context name in its [`Palette`] slot
//! style, right-aligned to the longest name, followed by `" | "`.

mod palette;
mod sink;

pub use palette::{Labels, Palette};
pub use sink::{PrefixingWriter, SharedSink};

#[cfg(test)]
pub(crate) use sink::Capture;

use std::sync::Arc;

/// The pair of shared streams all command output is multiplexed onto.
#[derive(Clone)]
pub struct Sinks {
    pub out: Arc<SharedSink>,
    pub err: Arc<SharedSink>,
}

impl Sinks {
    pub fn new(out: Arc<SharedSink>, err: Arc<SharedSink>) -> Self {
        Self { out, err }
    }

    /// The process's own stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(SharedSink::stdout(), SharedSink::stderr())
    }

    /// Writers for one context, both carrying the same label.
    pub fn writers(&self, label: Arc<[u8]>) -> (PrefixingWriter, PrefixingWriter) {
        (
            PrefixingWriter::new(label.clone(), self.out.clone()),
            PrefixingWriter::new(label, self.err.clone()),
        )
    }
}
