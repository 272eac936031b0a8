//! End-to-end bridge tests against a scripted sandbox: the shell process is
//! a pair of channels, so tests control every output chunk and observe every
//! input write.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinder::runtime::{Sandbox, ShellProcess, TermGeometry};
use cinder::shell::{ExecutionState, ShellBridge, ShellError, Terminal};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

const READY: &str = "\x1b]654;interactive\x07";

fn exit_marker(code: i32) -> String {
    format!("\x1b]654;exit=1234:{code}\x07")
}

/// Hands out one pre-built channel-backed shell process.
struct ScriptedSandbox {
    process: Mutex<Option<ShellProcess>>,
}

impl Sandbox for ScriptedSandbox {
    fn spawn_shell(&self, _geometry: TermGeometry) -> std::io::Result<ShellProcess> {
        self.process
            .lock()
            .expect("sandbox lock")
            .take()
            .ok_or_else(|| std::io::Error::other("shell already spawned"))
    }
}

/// A scripted sandbox plus the test's ends of its channels: `feed` produces
/// shell output, `sink` observes shell input.
fn scripted() -> (
    ScriptedSandbox,
    mpsc::UnboundedSender<String>,
    mpsc::UnboundedReceiver<String>,
) {
    let (feed, output) = mpsc::unbounded_channel();
    let (input, sink) = mpsc::unbounded_channel();
    let sandbox = ScriptedSandbox {
        process: Mutex::new(Some(ShellProcess { input, output })),
    };
    (sandbox, feed, sink)
}

struct NullTerminal;

impl Terminal for NullTerminal {
    fn geometry(&self) -> Option<TermGeometry> {
        None
    }

    fn write(&mut self, _chunk: &str) {}
}

#[derive(Clone, Default)]
struct CollectingTerminal(Arc<Mutex<String>>);

impl CollectingTerminal {
    fn contents(&self) -> String {
        self.0.lock().expect("terminal lock").clone()
    }
}

impl Terminal for CollectingTerminal {
    fn geometry(&self) -> Option<TermGeometry> {
        Some(TermGeometry { cols: 120, rows: 40 })
    }

    fn write(&mut self, chunk: &str) {
        self.0.lock().expect("terminal lock").push_str(chunk);
    }
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 1s");
}

/// Initialize a bridge whose shell has already signalled readiness.
async fn ready_bridge(
    sandbox: &ScriptedSandbox,
    feed: &mpsc::UnboundedSender<String>,
) -> ShellBridge {
    let mut bridge = ShellBridge::new();
    feed.send(READY.to_string()).unwrap();
    timeout(Duration::from_secs(1), bridge.initialize(sandbox, NullTerminal))
        .await
        .expect("initialize timed out")
        .expect("initialize failed");
    bridge
}

#[tokio::test]
async fn initialize_waits_for_readiness_marker() {
    let (sandbox, feed, _sink) = scripted();
    let mut bridge = ShellBridge::new();

    let init = bridge.initialize(&sandbox, NullTerminal);
    tokio::pin!(init);
    // Output before the marker does not complete initialization.
    feed.send("login banner\n".to_string()).unwrap();
    assert!(
        timeout(Duration::from_millis(50), &mut init).await.is_err(),
        "initialize resolved before the readiness marker"
    );

    feed.send(READY.to_string()).unwrap();
    timeout(Duration::from_secs(1), &mut init)
        .await
        .expect("initialize timed out")
        .expect("initialize failed");
}

#[tokio::test]
async fn initialize_fails_when_output_closes_first() {
    let (sandbox, feed, _sink) = scripted();
    feed.send("no marker here\n".to_string()).unwrap();
    drop(feed);

    let mut bridge = ShellBridge::new();
    let result = timeout(
        Duration::from_secs(1),
        bridge.initialize(&sandbox, NullTerminal),
    )
    .await
    .expect("initialize timed out");
    assert!(matches!(result, Err(ShellError::NoReadySignal)));
}

#[tokio::test]
async fn readiness_marker_just_before_eof_still_wins() {
    let (sandbox, feed, _sink) = scripted();
    feed.send(READY.to_string()).unwrap();
    drop(feed);

    let mut bridge = ShellBridge::new();
    let result = timeout(
        Duration::from_secs(1),
        bridge.initialize(&sandbox, NullTerminal),
    )
    .await
    .expect("initialize timed out");
    assert!(result.is_ok());
}

#[tokio::test]
async fn keystrokes_gated_until_ready() {
    let (sandbox, feed, mut sink) = scripted();
    let mut bridge = ShellBridge::new();

    // Sent before the shell is ready: dropped, not queued.
    let handle = bridge.user_input_handle();
    assert!(!handle.is_ready());
    handle.send("early");

    feed.send(READY.to_string()).unwrap();
    timeout(Duration::from_secs(1), bridge.initialize(&sandbox, NullTerminal))
        .await
        .expect("initialize timed out")
        .expect("initialize failed");

    assert!(handle.is_ready());
    handle.send("late");
    let received = timeout(Duration::from_secs(1), sink.recv())
        .await
        .expect("no input arrived")
        .unwrap();
    assert_eq!(received, "late");
    assert!(sink.try_recv().is_err(), "pre-ready input leaked through");
}

#[tokio::test]
async fn execute_command_accumulates_until_exit_marker() {
    let (sandbox, feed, mut sink) = scripted();
    let mut bridge = ready_bridge(&sandbox, &feed).await;

    let exec = bridge.execute_command("session-a", "  echo hi  ");
    tokio::pin!(exec);
    assert!(
        timeout(Duration::from_millis(50), &mut exec).await.is_err(),
        "command completed without an exit marker"
    );

    // The command reaches the shell trimmed, with a trailing newline.
    assert_eq!(sink.recv().await.as_deref(), Some("echo hi\n"));

    feed.send("hi\n".to_string()).unwrap();
    feed.send(exit_marker(0)).unwrap();
    let result = timeout(Duration::from_secs(1), &mut exec)
        .await
        .expect("command timed out")
        .expect("command failed");

    assert_eq!(result.exit_code, 0);
    assert!(result.output.contains("hi\n"));
    // The chunk carrying the marker is part of the captured output.
    assert!(result.output.ends_with(&exit_marker(0)));
}

#[tokio::test]
async fn exit_marker_split_across_chunks() {
    let (sandbox, feed, _sink) = scripted();
    let mut bridge = ready_bridge(&sandbox, &feed).await;

    feed.send("partial".to_string()).unwrap();
    feed.send("\x1b]654;exi".to_string()).unwrap();
    feed.send("t=99:7\x07".to_string()).unwrap();

    let result = timeout(
        Duration::from_secs(1),
        bridge.execute_command("session-a", "false"),
    )
    .await
    .expect("command timed out")
    .expect("command failed");
    assert_eq!(result.exit_code, 7);
}

#[tokio::test]
async fn takeover_interrupts_other_sessions_command() {
    let (sandbox, feed, mut sink) = scripted();
    let mut bridge = ready_bridge(&sandbox, &feed).await;

    // Session A's command never completes; the caller gives up on waiting,
    // leaving the slot marked active.
    {
        let exec = bridge.execute_command("session-a", "sleep 100");
        tokio::pin!(exec);
        assert!(timeout(Duration::from_millis(50), &mut exec).await.is_err());
    }
    assert_eq!(sink.recv().await.as_deref(), Some("sleep 100\n"));

    feed.send(exit_marker(0)).unwrap();
    timeout(
        Duration::from_secs(1),
        bridge.execute_command("session-b", "whoami"),
    )
    .await
    .expect("command timed out")
    .expect("command failed");

    // The interrupt byte precedes session B's command.
    assert_eq!(sink.recv().await.as_deref(), Some("\x03"));
    assert_eq!(sink.recv().await.as_deref(), Some("whoami\n"));
}

#[tokio::test]
async fn same_session_takeover_does_not_interrupt() {
    let (sandbox, feed, mut sink) = scripted();
    let mut bridge = ready_bridge(&sandbox, &feed).await;

    {
        let exec = bridge.execute_command("session-a", "first");
        tokio::pin!(exec);
        assert!(timeout(Duration::from_millis(50), &mut exec).await.is_err());
    }
    assert_eq!(sink.recv().await.as_deref(), Some("first\n"));

    feed.send(exit_marker(0)).unwrap();
    timeout(
        Duration::from_secs(1),
        bridge.execute_command("session-a", "second"),
    )
    .await
    .expect("command timed out")
    .expect("command failed");

    assert_eq!(sink.recv().await.as_deref(), Some("second\n"));
}

#[tokio::test]
async fn execution_state_tracks_command_lifecycle() {
    let (sandbox, feed, _sink) = scripted();
    let mut bridge = ready_bridge(&sandbox, &feed).await;
    let state = bridge.execution_state();

    assert_eq!(*state.borrow(), None);

    let exec = bridge.execute_command("session-a", "true");
    tokio::pin!(exec);
    assert!(timeout(Duration::from_millis(50), &mut exec).await.is_err());
    assert_eq!(
        *state.borrow(),
        Some(ExecutionState {
            session_id: "session-a".to_string(),
            active: true,
        })
    );

    feed.send(exit_marker(0)).unwrap();
    timeout(Duration::from_secs(1), &mut exec)
        .await
        .expect("command timed out")
        .expect("command failed");
    assert_eq!(
        *state.borrow(),
        Some(ExecutionState {
            session_id: "session-a".to_string(),
            active: false,
        })
    );
}

#[tokio::test]
async fn output_closing_mid_command_is_an_error() {
    let (sandbox, feed, _sink) = scripted();
    let mut bridge = ready_bridge(&sandbox, &feed).await;

    let exec = bridge.execute_command("session-a", "true");
    tokio::pin!(exec);
    assert!(timeout(Duration::from_millis(50), &mut exec).await.is_err());

    drop(feed);
    let result = timeout(Duration::from_secs(1), &mut exec)
        .await
        .expect("command timed out");
    assert!(matches!(result, Err(ShellError::OutputClosed)));
}

#[tokio::test]
async fn execute_before_initialize_is_an_error() {
    let mut bridge = ShellBridge::new();
    let result = bridge.execute_command("session-a", "true").await;
    assert!(matches!(result, Err(ShellError::NotInitialized)));
}

#[tokio::test]
async fn terminal_mirrors_output_during_command() {
    let (sandbox, feed, _sink) = scripted();
    let terminal = CollectingTerminal::default();
    let view = terminal.clone();

    let mut bridge = ShellBridge::new();
    feed.send(READY.to_string()).unwrap();
    timeout(Duration::from_secs(1), bridge.initialize(&sandbox, terminal))
        .await
        .expect("initialize timed out")
        .expect("initialize failed");

    let exec = bridge.execute_command("session-a", "make build");
    tokio::pin!(exec);
    assert!(timeout(Duration::from_millis(50), &mut exec).await.is_err());

    feed.send("compiling...\n".to_string()).unwrap();
    // The live terminal sees output while the command is still running.
    eventually(|| view.contents().contains("compiling...")).await;

    feed.send(exit_marker(0)).unwrap();
    let result = timeout(Duration::from_secs(1), &mut exec)
        .await
        .expect("command timed out")
        .expect("command failed");
    assert!(result.output.contains("compiling...\n"));
}

#[tokio::test]
async fn wait_closed_resolves_on_shell_exit() {
    let (sandbox, feed, _sink) = scripted();
    let bridge = ready_bridge(&sandbox, &feed).await;

    drop(feed);
    timeout(Duration::from_secs(1), bridge.wait_closed())
        .await
        .expect("wait_closed timed out");
}
