//! Explicit fan-out of the shell output stream: one producer, independent
//! consumer cursors.
//!
//! Each cursor is an isolated buffered sequence — one feeds the live
//! terminal display, the other is consumed by command execution to detect
//! completion. Neither can starve the other.

use tokio::sync::mpsc;

/// Producer side of the fan-out.
#[derive(Default)]
pub struct Fanout {
    senders: Vec<mpsc::UnboundedSender<String>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new cursor that will observe every chunk published from
    /// this point on.
    pub fn subscribe(&mut self) -> OutputCursor {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        OutputCursor { rx }
    }

    /// Publish a chunk to every live cursor. Dropped cursors are pruned.
    pub fn publish(&mut self, chunk: &str) {
        self.senders
            .retain(|tx| tx.send(chunk.to_string()).is_ok());
    }
}

/// An independent consumer of the fanned-out stream.
///
/// Ends (yields `None`) once the producer is dropped and all buffered
/// chunks have been read.
pub struct OutputCursor {
    rx: mpsc::UnboundedReceiver<String>,
}

impl OutputCursor {
    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
