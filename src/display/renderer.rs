use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::Print;
use serde_json::Value;
use unicode_width::UnicodeWidthChar;

use super::{markdown, term_width, theme};
use crate::protocol::annotations::{self, TokenUsage};

/// Renders assistant messages and status lines to a terminal.
///
/// Annotation handling: at most one progress line (the highest-value
/// progress annotation) and one usage summary are shown, above the
/// markdown-formatted message body. Malformed annotations render nothing.
pub struct MessageRenderer<W: Write = io::Stdout> {
    out: W,
    /// Emit `\r\n` line endings (the terminal is in raw mode).
    raw_mode: bool,
}

impl Default for MessageRenderer<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRenderer<io::Stdout> {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            raw_mode: false,
        }
    }
}

impl<W: Write> MessageRenderer<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            out: writer,
            raw_mode: false,
        }
    }

    pub fn set_raw_mode(&mut self, raw: bool) {
        self.raw_mode = raw;
    }

    /// Render a full assistant message: progress line, usage summary, then
    /// the markdown body.
    pub fn render_assistant_message(&mut self, content: &str, annotations: &[Value]) {
        let annotations = annotations::filter_annotations(annotations);

        let mut wrote_meta = false;
        if let Some(progress) = annotations::latest_progress(&annotations) {
            let line = truncate_line(&format!("(i) {}", progress.message));
            queue!(self.out, Print(theme::progress().apply(&line))).ok();
            self.endline();
            wrote_meta = true;
        }
        if let Some(usage) = annotations::usage(&annotations) {
            self.render_usage_line(usage);
            wrote_meta = true;
        }
        if wrote_meta {
            self.endline();
        }

        let body = markdown::render(content);
        if !body.is_empty() {
            self.write_block(&body);
        }
        self.out.flush().ok();
    }

    /// `Tokens: {total} (prompt: {p}, completion: {c})` with cache
    /// indicators appended only when the corresponding flag is set.
    fn render_usage_line(&mut self, usage: &TokenUsage) {
        let summary = format!(
            "Tokens: {} (prompt: {}, completion: {})",
            usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
        );
        queue!(self.out, Print(theme::dim().apply(summary))).ok();
        if usage.is_cache_hit == Some(true) {
            queue!(
                self.out,
                Print(" "),
                Print(theme::cache_hit().apply("[Cache Hit]"))
            )
            .ok();
        }
        if usage.is_cache_miss == Some(true) {
            queue!(
                self.out,
                Print(" "),
                Print(theme::cache_miss().apply("[Cache Miss]"))
            )
            .ok();
        }
        self.endline();
    }

    // --- Shell session status lines ---

    pub fn render_exit_status(&mut self, exit_code: i32) {
        let line = format!("[exit {exit_code}]");
        queue!(self.out, Print(theme::dim().apply(line))).ok();
        self.endline();
        self.out.flush().ok();
    }

    pub fn render_status(&mut self, text: &str) {
        queue!(self.out, Print(theme::status().apply(text))).ok();
        self.endline();
        self.out.flush().ok();
    }

    pub fn render_warning(&mut self, warning: &str) {
        queue!(
            self.out,
            Print(theme::dim().apply(format!("[warn] {warning}")))
        )
        .ok();
        self.endline();
        self.out.flush().ok();
    }

    /// Write raw text untouched.
    pub fn write_raw(&mut self, text: &str) {
        queue!(self.out, Print(text)).ok();
        self.out.flush().ok();
    }

    /// Write multi-line text with the mode's line endings.
    fn write_block(&mut self, text: &str) {
        let mut first = true;
        for line in text.split('\n') {
            if !first {
                self.endline();
            }
            queue!(self.out, Print(line)).ok();
            first = false;
        }
        self.endline();
    }

    fn endline(&mut self) {
        let ending = if self.raw_mode { "\r\n" } else { "\n" };
        queue!(self.out, Print(ending)).ok();
    }
}

/// Truncate a string to fit within `max_width` display columns, appending
/// `...` if truncated.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    let ellipsis_width = 3; // "..."
    let mut width = 0;
    let mut cut_pos = 0;
    let mut result = String::new();
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width {
            if max_width >= ellipsis_width {
                result.truncate(cut_pos);
                result.push_str("...");
            } else {
                result.clear();
            }
            return result;
        }
        result.push(ch);
        width += ch_width;
        // Track the latest position that leaves room for "..."
        if width <= max_width.saturating_sub(ellipsis_width) {
            cut_pos = result.len();
        }
    }
    result
}

/// Truncate a line to the current terminal width.
fn truncate_line(line: &str) -> String {
    truncate_to_width(line, term_width())
}
