//! The shell session bridge.
//!
//! One long-lived interactive shell process is presented two ways at once:
//! as a request/response operation ([`ShellBridge::execute_command`]) and as
//! a live terminal (every output chunk is mirrored to the attached
//! [`Terminal`], and user keystrokes flow in through a gated
//! [`UserInputHandle`]). The process output is fanned out so command
//! execution and the live display each consume an independent copy.

use tokio::sync::{mpsc, watch};

use super::ShellError;
use super::control::{ControlEvent, ControlScanner};
use super::fanout::{Fanout, OutputCursor};
use super::state::{ExecutionState, ExecutionStateCell};
use crate::runtime::{Sandbox, TermGeometry};

/// Interrupt byte written to the shell before taking over from another
/// session's active command.
const INTERRUPT: &str = "\x03";

/// The live terminal attached to the shell: supplies geometry at spawn time
/// and receives every output chunk for display.
pub trait Terminal: Send + 'static {
    /// Current geometry, or `None` if the terminal is not yet sized.
    fn geometry(&self) -> Option<TermGeometry>;
    /// Display a raw output chunk.
    fn write(&mut self, chunk: &str);
}

/// Result of one command executed through the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Every output chunk seen from command submission up to and including
    /// the chunk carrying the completion marker.
    pub output: String,
    pub exit_code: i32,
}

/// Forwards user keystrokes to the shell input.
///
/// Writes are silently dropped until the shell has signalled readiness, so
/// nothing reaches the process during bootstrap.
#[derive(Clone)]
pub struct UserInputHandle {
    tx: mpsc::UnboundedSender<String>,
    ready: watch::Receiver<bool>,
}

impl UserInputHandle {
    pub fn send(&self, data: &str) {
        if *self.ready.borrow() {
            let _ = self.tx.send(data.to_string());
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }
}

/// Owns the interactive shell process and multiplexes it between
/// programmatic command execution and live user interaction.
///
/// Lifecycle: uninitialized → ready (readiness marker observed) → idle ⇄
/// running per command. There is no failure state; a shell that stops
/// producing output leaves a command wait pending indefinitely.
pub struct ShellBridge {
    input: Option<mpsc::UnboundedSender<String>>,
    exec_cursor: Option<OutputCursor>,
    user_tx: mpsc::UnboundedSender<String>,
    user_rx: Option<mpsc::UnboundedReceiver<String>>,
    ready_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
    state: ExecutionStateCell,
}

impl Default for ShellBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellBridge {
    pub fn new() -> Self {
        let (user_tx, user_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = watch::channel(false);
        let (closed_tx, closed_rx) = watch::channel(false);
        Self {
            input: None,
            exec_cursor: None,
            user_tx,
            user_rx: Some(user_rx),
            ready_tx,
            ready_rx,
            closed_tx,
            closed_rx,
            state: ExecutionStateCell::new(),
        }
    }

    /// Spawn the shell and wait for its readiness marker.
    ///
    /// The process output is split into two independent copies: one is
    /// pumped continuously to `terminal`, the other is retained for
    /// [`execute_command`](Self::execute_command). Returns only once the
    /// readiness marker has been observed; if the output stream ends first,
    /// the bridge is left uninitialized. There is no timeout — a process
    /// that stays silent but alive keeps this call pending.
    pub async fn initialize<S: Sandbox, T: Terminal>(
        &mut self,
        sandbox: &S,
        terminal: T,
    ) -> Result<(), ShellError> {
        let geometry = terminal.geometry().unwrap_or_default();
        let process = sandbox.spawn_shell(geometry)?;

        let mut fanout = Fanout::new();
        let display_cursor = fanout.subscribe();
        let exec_cursor = fanout.subscribe();

        // Producer: pump process output into both cursors, watching for the
        // readiness marker along the way. Readiness is published before the
        // closed flag, so a marker that arrives just before EOF still wins.
        let mut output = process.output;
        let ready_tx = self.ready_tx.clone();
        let closed_tx = self.closed_tx.clone();
        tokio::spawn(async move {
            let mut scanner = ControlScanner::new();
            while let Some(chunk) = output.recv().await {
                if !*ready_tx.borrow()
                    && scanner.feed(&chunk).contains(&ControlEvent::Interactive)
                {
                    let _ = ready_tx.send(true);
                }
                fanout.publish(&chunk);
            }
            let _ = closed_tx.send(true);
        });

        // Display pump: mirror every chunk to the live terminal.
        let mut display_cursor = display_cursor;
        let mut terminal = terminal;
        tokio::spawn(async move {
            while let Some(chunk) = display_cursor.next().await {
                terminal.write(&chunk);
            }
        });

        // Gated user input: keystrokes submitted through a handle reach the
        // process only once this forwarder runs (the handle itself drops
        // them until readiness).
        if let Some(mut user_rx) = self.user_rx.take() {
            let input = process.input.clone();
            tokio::spawn(async move {
                while let Some(data) = user_rx.recv().await {
                    if input.send(data).is_err() {
                        break;
                    }
                }
            });
        }

        let mut ready_rx = self.ready_rx.clone();
        let mut closed_rx = self.closed_rx.clone();
        loop {
            if *ready_rx.borrow_and_update() {
                break;
            }
            tokio::select! {
                changed = ready_rx.changed() => {
                    if changed.is_err() {
                        return Err(ShellError::NoReadySignal);
                    }
                }
                _ = closed_rx.changed() => {
                    if *ready_rx.borrow_and_update() {
                        break;
                    }
                    if *closed_rx.borrow() {
                        return Err(ShellError::NoReadySignal);
                    }
                }
            }
        }

        self.input = Some(process.input);
        self.exec_cursor = Some(exec_cursor);
        Ok(())
    }

    /// Handle for forwarding user keystrokes. Available before
    /// initialization; writes are dropped until the readiness marker has
    /// been observed.
    pub fn user_input_handle(&self) -> UserInputHandle {
        UserInputHandle {
            tx: self.user_tx.clone(),
            ready: self.ready_rx.clone(),
        }
    }

    /// Subscribe to the execution-state slot.
    pub fn execution_state(&self) -> watch::Receiver<Option<ExecutionState>> {
        self.state.subscribe()
    }

    /// Resolves once the shell's output stream has ended.
    pub async fn wait_closed(&self) {
        let mut rx = self.closed_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Run `command` through the shell and wait for its completion marker.
    ///
    /// If another session's command is still marked active, an interrupt is
    /// written first. Output accumulates until the scanner sees an exit
    /// marker; there is no timeout, and concurrent invocations are not made
    /// exclusive — callers are expected to serialize per session.
    pub async fn execute_command(
        &mut self,
        session_id: &str,
        command: &str,
    ) -> Result<CommandOutput, ShellError> {
        let input = self.input.as_ref().ok_or(ShellError::NotInitialized)?;

        if let Some(prev) = self.state.get()
            && prev.active
            && prev.session_id != session_id
        {
            input
                .send(INTERRUPT.to_string())
                .map_err(|_| ShellError::InputClosed)?;
        }

        self.state.set(session_id, true);
        input
            .send(format!("{}\n", command.trim()))
            .map_err(|_| ShellError::InputClosed)?;

        let cursor = self.exec_cursor.as_mut().ok_or(ShellError::NotInitialized)?;
        let mut scanner = ControlScanner::new();
        let mut output = String::new();
        let exit_code = 'scan: loop {
            let Some(chunk) = cursor.next().await else {
                return Err(ShellError::OutputClosed);
            };
            output.push_str(&chunk);
            for event in scanner.feed(&chunk) {
                if let ControlEvent::Exit(code) = event {
                    break 'scan code;
                }
            }
        };

        self.state.set(session_id, false);
        Ok(CommandOutput { output, exit_code })
    }
}
