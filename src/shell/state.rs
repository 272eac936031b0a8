use tokio::sync::watch;

/// Which session last issued a command, and whether it is still running.
///
/// A single slot, last-writer-wins: created on the first command, overwritten
/// by every later one, never destroyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionState {
    pub session_id: String,
    pub active: bool,
}

/// Observable holder for the bridge's execution state.
pub struct ExecutionStateCell {
    tx: watch::Sender<Option<ExecutionState>>,
}

impl Default for ExecutionStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionStateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn set(&self, session_id: &str, active: bool) {
        self.tx.send_replace(Some(ExecutionState {
            session_id: session_id.to_string(),
            active,
        }));
    }

    pub fn get(&self) -> Option<ExecutionState> {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes. The receiver always reflects the latest
    /// value; intermediate writes may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<Option<ExecutionState>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let cell = ExecutionStateCell::new();
        assert_eq!(cell.get(), None);
    }

    #[test]
    fn last_writer_wins() {
        let cell = ExecutionStateCell::new();
        cell.set("a", true);
        cell.set("b", true);
        cell.set("b", false);
        assert_eq!(
            cell.get(),
            Some(ExecutionState {
                session_id: "b".to_string(),
                active: false,
            })
        );
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let cell = ExecutionStateCell::new();
        let mut rx = cell.subscribe();
        cell.set("a", true);
        rx.changed().await.unwrap();
        assert_eq!(
            *rx.borrow_and_update(),
            Some(ExecutionState {
                session_id: "a".to_string(),
                active: true,
            })
        );
    }
}
