//! The shell session bridge: one long-lived interactive shell process,
//! shared between programmatic command execution ([`bridge::ShellBridge`])
//! and live terminal use.

pub mod bridge;
pub mod control;
pub mod fanout;
pub mod state;

pub use bridge::{CommandOutput, ShellBridge, Terminal, UserInputHandle};
pub use state::ExecutionState;

/// Failures surfaced by the bridge.
///
/// Malformed control payloads are not errors — the scanner ignores them.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("shell bridge is not initialized")]
    NotInitialized,
    #[error("failed to spawn shell process")]
    Spawn(#[from] std::io::Error),
    #[error("shell output ended before the readiness marker")]
    NoReadySignal,
    #[error("shell input closed")]
    InputClosed,
    #[error("shell output ended while awaiting command completion")]
    OutputClosed,
}
