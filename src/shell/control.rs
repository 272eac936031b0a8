//! Incremental scanner for the shell's out-of-band control markers.
//!
//! The shell embeds OSC sequences of the form `ESC ] 654 ; <payload> BEL`
//! in its output stream: payload `interactive` signals that the shell is
//! ready for input, and `exit=<pid>:<code>` signals command completion.
//! The scanner is a state machine fed chunk by chunk, so markers split
//! across chunk boundaries are still detected and nothing re-scans the
//! accumulated buffer.

/// Marker code used by the shell for bridge control sequences.
const MARKER_PREFIX: &str = "]654;";

/// Payloads longer than this cannot be control markers; the scanner
/// abandons the candidate so stray `]654;` text in ordinary output
/// cannot wedge it.
const MAX_PAYLOAD: usize = 256;

/// A control marker extracted from the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// The shell is interactive and ready for input.
    Interactive,
    /// A command finished with the given exit code.
    Exit(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Not inside a candidate marker.
    Ground,
    /// Saw ESC; a `]` would open a candidate.
    Esc,
    /// Matched the first `n` characters of `]654;`.
    Prefix(usize),
    /// Inside the payload, collecting until BEL or ST.
    Payload,
    /// Saw ESC inside the payload (possible `ESC \` terminator).
    PayloadEsc,
}

/// Incremental control-marker scanner.
#[derive(Debug)]
pub struct ControlScanner {
    state: ScanState,
    payload: String,
}

impl Default for ControlScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Ground,
            payload: String::new(),
        }
    }

    /// Feed a chunk of output text, returning any markers completed by it.
    pub fn feed(&mut self, chunk: &str) -> Vec<ControlEvent> {
        chunk.chars().filter_map(|c| self.push(c)).collect()
    }

    /// Advance the state machine by one character.
    ///
    /// A bare `]` also opens a candidate: some output paths strip the ESC,
    /// and the full `]654;` prefix keeps false positives rare.
    fn push(&mut self, c: char) -> Option<ControlEvent> {
        match self.state {
            ScanState::Ground => {
                match c {
                    '\x1b' => self.state = ScanState::Esc,
                    ']' => self.state = ScanState::Prefix(1),
                    _ => {}
                }
                None
            }
            ScanState::Esc => {
                match c {
                    ']' => self.state = ScanState::Prefix(1),
                    '\x1b' => {}
                    _ => self.state = ScanState::Ground,
                }
                None
            }
            ScanState::Prefix(n) => {
                if MARKER_PREFIX[n..].starts_with(c) {
                    if n + 1 == MARKER_PREFIX.len() {
                        self.state = ScanState::Payload;
                        self.payload.clear();
                    } else {
                        self.state = ScanState::Prefix(n + 1);
                    }
                    None
                } else {
                    // The mismatched character may itself open a candidate.
                    self.state = ScanState::Ground;
                    self.push(c)
                }
            }
            ScanState::Payload => match c {
                '\x07' => self.terminate(),
                '\x1b' => {
                    self.state = ScanState::PayloadEsc;
                    None
                }
                _ => {
                    if self.payload.len() >= MAX_PAYLOAD {
                        self.state = ScanState::Ground;
                        self.payload.clear();
                        None
                    } else {
                        self.payload.push(c);
                        None
                    }
                }
            },
            ScanState::PayloadEsc => {
                if c == '\\' {
                    self.terminate()
                } else {
                    // Not a terminator; the swallowed ESC starts over.
                    self.state = ScanState::Esc;
                    self.payload.clear();
                    self.push(c)
                }
            }
        }
    }

    fn terminate(&mut self) -> Option<ControlEvent> {
        self.state = ScanState::Ground;
        let event = classify(&self.payload);
        self.payload.clear();
        event
    }
}

/// Classify a completed marker payload. Unknown payloads yield `None`.
fn classify(payload: &str) -> Option<ControlEvent> {
    if payload == "interactive" {
        return Some(ControlEvent::Interactive);
    }
    let rest = payload.strip_prefix("exit=")?;
    let (pid, code) = rest.split_once(':')?;
    // The pid field may be negative; only its shape is validated.
    pid.parse::<i64>().ok()?;
    Some(ControlEvent::Exit(code.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_marker_in_one_chunk() {
        let mut scanner = ControlScanner::new();
        let events = scanner.feed("boot noise \x1b]654;interactive\x07$ ");
        assert_eq!(events, vec![ControlEvent::Interactive]);
    }

    #[test]
    fn marker_split_across_chunks() {
        let mut scanner = ControlScanner::new();
        assert!(scanner.feed("\x1b]6").is_empty());
        assert!(scanner.feed("54;interac").is_empty());
        assert_eq!(scanner.feed("tive\x07"), vec![ControlEvent::Interactive]);
    }

    #[test]
    fn exit_marker_with_negative_pid() {
        let mut scanner = ControlScanner::new();
        let events = scanner.feed("output\x1b]654;exit=-1:127\x07");
        assert_eq!(events, vec![ControlEvent::Exit(127)]);
    }

    #[test]
    fn exit_marker_without_leading_esc() {
        let mut scanner = ControlScanner::new();
        let events = scanner.feed("]654;exit=42:0\x07");
        assert_eq!(events, vec![ControlEvent::Exit(0)]);
    }

    #[test]
    fn st_terminator_accepted() {
        let mut scanner = ControlScanner::new();
        let events = scanner.feed("\x1b]654;exit=1:3\x1b\\");
        assert_eq!(events, vec![ControlEvent::Exit(3)]);
    }

    #[test]
    fn unknown_payload_ignored() {
        let mut scanner = ControlScanner::new();
        assert!(scanner.feed("\x1b]654;title=hello\x07").is_empty());
    }

    #[test]
    fn malformed_exit_payload_ignored() {
        let mut scanner = ControlScanner::new();
        assert!(scanner.feed("\x1b]654;exit=abc:def\x07").is_empty());
        assert!(scanner.feed("\x1b]654;exit=1\x07").is_empty());
    }

    #[test]
    fn bracket_noise_does_not_confuse() {
        let mut scanner = ControlScanner::new();
        let events = scanner.feed("arr[0] = ]6 ]65 ]654;exit=1:9\x07");
        assert_eq!(events, vec![ControlEvent::Exit(9)]);
    }

    #[test]
    fn restart_inside_prefix() {
        // A failed prefix whose breaking char opens a new candidate.
        let mut scanner = ControlScanner::new();
        let events = scanner.feed("]6]654;exit=1:5\x07");
        assert_eq!(events, vec![ControlEvent::Exit(5)]);
    }

    #[test]
    fn overlong_payload_abandoned() {
        let mut scanner = ControlScanner::new();
        let long = format!("]654;{}", "x".repeat(MAX_PAYLOAD + 10));
        assert!(scanner.feed(&long).is_empty());
        // Scanner recovers for later markers.
        let events = scanner.feed("\x07\x1b]654;interactive\x07");
        assert_eq!(events, vec![ControlEvent::Interactive]);
    }

    #[test]
    fn multiple_markers_in_one_chunk() {
        let mut scanner = ControlScanner::new();
        let events = scanner.feed("\x1b]654;interactive\x07ls\n\x1b]654;exit=7:0\x07");
        assert_eq!(
            events,
            vec![ControlEvent::Interactive, ControlEvent::Exit(0)]
        );
    }

    #[test]
    fn esc_inside_payload_restarts() {
        let mut scanner = ControlScanner::new();
        // Color codes interrupting a candidate abandon it cleanly.
        let events = scanner.feed("\x1b]654;par\x1b[31mtial\x1b]654;exit=1:2\x07");
        assert_eq!(events, vec![ControlEvent::Exit(2)]);
    }
}
