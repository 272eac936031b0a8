//! Seam between the shell bridge and the sandboxed runtime hosting the
//! shell process.
//!
//! The bridge never talks to a process API directly: a [`Sandbox`] hands it
//! a [`ShellProcess`] — a pair of channels carrying input writes and merged
//! output chunks. Tests script these channels; production uses
//! [`local::LocalSandbox`].

use tokio::sync::mpsc;

pub mod local;

/// Terminal geometry the shell is spawned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermGeometry {
    pub cols: u16,
    pub rows: u16,
}

impl Default for TermGeometry {
    /// Fallback dimensions used when the process is spawned before the
    /// terminal is attached and sized.
    fn default() -> Self {
        Self { cols: 80, rows: 15 }
    }
}

/// Handle to a spawned interactive shell process.
///
/// `input` delivers writes to the process input in order. `output` carries
/// output chunks (stdout and stderr merged) in arrival order and closes when
/// the process output ends.
pub struct ShellProcess {
    pub input: mpsc::UnboundedSender<String>,
    pub output: mpsc::UnboundedReceiver<String>,
}

/// A runtime capable of hosting the interactive shell.
pub trait Sandbox {
    /// Spawn one interactive shell process attached to the given geometry.
    fn spawn_shell(&self, geometry: TermGeometry) -> std::io::Result<ShellProcess>;
}
