mod cli;

use std::io::{Read as _, Write as _};
use std::path::Path;

use anyhow::{Context, Result};
use cinder::config::{self, Config};
use cinder::display::renderer::MessageRenderer;
use cinder::protocol::AssistantMessage;
use cinder::runtime::TermGeometry;
use cinder::runtime::local::LocalSandbox;
use cinder::shell::{ShellBridge, Terminal};
use clap::Parser;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;

use cli::{Cli, Command};

/// Session id used for commands submitted via `-c` on the command line.
const CLI_SESSION: &str = "cli";

#[tokio::main]
async fn main() -> Result<()> {
    install_panic_hook();
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Render { file }) => render_message(file.as_deref()),
        None => run_shell(cli).await,
    }
}

/// Install a panic hook that restores terminal state before printing the panic.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        crossterm::terminal::disable_raw_mode().ok();
        default_hook(info);
    }));
}

/// Render an assistant message document from a file or stdin.
fn render_message(file: Option<&Path>) -> Result<()> {
    let contents = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    let message: AssistantMessage =
        serde_json::from_str(&contents).context("parsing message document")?;
    let mut renderer = MessageRenderer::new();
    renderer.render_assistant_message(&message.content, &message.annotations);
    Ok(())
}

async fn run_shell(cli: Cli) -> Result<()> {
    let config = match config::load(Path::new(".")) {
        Ok(config) => config,
        Err(err) => {
            MessageRenderer::new().render_warning(&format!("ignoring invalid config: {err:#}"));
            Config::default()
        }
    };
    let shell = cli.shell.clone().or_else(|| config.shell.clone());
    let sandbox = LocalSandbox::new(shell);

    // With no -c commands there is nothing to do except attach.
    let interactive = cli.attach || cli.commands.is_empty();

    crossterm::terminal::enable_raw_mode()?;
    let result = drive_shell(&cli.commands, interactive, &sandbox, config.geometry()).await;
    // Discard any unread typed-ahead input so it doesn't leak to the parent
    // shell after raw mode ends.
    // SAFETY: tcflush on STDIN_FILENO with TCIFLUSH is a POSIX syscall that
    // only discards pending input.
    unsafe { libc::tcflush(libc::STDIN_FILENO, libc::TCIFLUSH) };
    crossterm::terminal::disable_raw_mode()?;
    result
}

async fn drive_shell(
    commands: &[String],
    interactive: bool,
    sandbox: &LocalSandbox,
    fallback: TermGeometry,
) -> Result<()> {
    let mut bridge = ShellBridge::new();
    bridge
        .initialize(sandbox, StdoutTerminal::new(fallback))
        .await
        .context("starting shell session")?;

    // Forward terminal keystrokes to the shell; Ctrl+Q detaches.
    let handle = bridge.user_input_handle();
    let (quit_tx, mut quit_rx) = mpsc::unbounded_channel::<()>();
    tokio::spawn(async move {
        let mut stream = EventStream::new();
        while let Some(Ok(event)) = stream.next().await {
            let Event::Key(key) = event else { continue };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
                let _ = quit_tx.send(());
                return;
            }
            if let Some(data) = encode_key(&key) {
                handle.send(&data);
            }
        }
    });

    let mut renderer = MessageRenderer::new();
    renderer.set_raw_mode(true);
    for command in commands {
        let result = bridge
            .execute_command(CLI_SESSION, command)
            .await
            .with_context(|| format!("running `{command}`"))?;
        renderer.render_exit_status(result.exit_code);
    }

    if interactive {
        renderer.render_status("[attached, Ctrl+Q detaches]");
        tokio::select! {
            _ = quit_rx.recv() => {}
            () = bridge.wait_closed() => {
                renderer.render_status("[shell exited]");
            }
        }
    }
    Ok(())
}

/// Live terminal on stdout. Geometry comes from the real terminal when
/// available, falling back to the configured dimensions.
struct StdoutTerminal {
    fallback: TermGeometry,
}

impl StdoutTerminal {
    fn new(fallback: TermGeometry) -> Self {
        Self { fallback }
    }
}

impl Terminal for StdoutTerminal {
    fn geometry(&self) -> Option<TermGeometry> {
        crossterm::terminal::size()
            .ok()
            .map(|(cols, rows)| TermGeometry { cols, rows })
            .or(Some(self.fallback))
    }

    fn write(&mut self, chunk: &str) {
        // Raw mode needs explicit carriage returns.
        let normalized = chunk.replace("\r\n", "\n").replace('\n', "\r\n");
        let mut out = std::io::stdout();
        out.write_all(normalized.as_bytes()).ok();
        out.flush().ok();
    }
}

/// Translate a key event into the bytes an interactive shell expects, or
/// `None` for keys that have no input encoding.
fn encode_key(key: &KeyEvent) -> Option<String> {
    let sequence = match key.code {
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                let c = c.to_ascii_lowercase();
                if !c.is_ascii_lowercase() {
                    return None;
                }
                return Some(char::from(c as u8 - b'a' + 1).to_string());
            }
            return Some(c.to_string());
        }
        KeyCode::Enter => "\n",
        KeyCode::Backspace => "\x7f",
        KeyCode::Tab => "\t",
        KeyCode::Esc => "\x1b",
        KeyCode::Up => "\x1b[A",
        KeyCode::Down => "\x1b[B",
        KeyCode::Right => "\x1b[C",
        KeyCode::Left => "\x1b[D",
        KeyCode::Home => "\x1b[H",
        KeyCode::End => "\x1b[F",
        KeyCode::Delete => "\x1b[3~",
        _ => return None,
    };
    Some(sequence.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_chars_pass_through() {
        let encoded = encode_key(&key(KeyCode::Char('x'), KeyModifiers::NONE));
        assert_eq!(encoded.as_deref(), Some("x"));
    }

    #[test]
    fn ctrl_letters_map_to_control_bytes() {
        let encoded = encode_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(encoded.as_deref(), Some("\x03"));
        let encoded = encode_key(&key(KeyCode::Char('D'), KeyModifiers::CONTROL));
        assert_eq!(encoded.as_deref(), Some("\x04"));
    }

    #[test]
    fn ctrl_non_letter_is_dropped() {
        assert!(encode_key(&key(KeyCode::Char('1'), KeyModifiers::CONTROL)).is_none());
    }

    #[test]
    fn special_keys_encode_escape_sequences() {
        assert_eq!(
            encode_key(&key(KeyCode::Up, KeyModifiers::NONE)).as_deref(),
            Some("\x1b[A")
        );
        assert_eq!(
            encode_key(&key(KeyCode::Enter, KeyModifiers::NONE)).as_deref(),
            Some("\n")
        );
        assert_eq!(
            encode_key(&key(KeyCode::Backspace, KeyModifiers::NONE)).as_deref(),
            Some("\x7f")
        );
    }

    #[test]
    fn unmapped_keys_are_dropped() {
        assert!(encode_key(&key(KeyCode::F(5), KeyModifiers::NONE)).is_none());
    }
}
