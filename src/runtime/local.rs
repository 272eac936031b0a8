use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use super::{Sandbox, ShellProcess, TermGeometry};

/// Prompt hook that makes a stock shell speak the bridge's control protocol:
/// the readiness marker on the first prompt, then an `exit=<pid>:<code>`
/// marker before every later prompt.
const PROMPT_COMMAND: &str = r#"__cinder_code=$?; if [ -z "${__cinder_ready:-}" ]; then __cinder_ready=1; printf '\033]654;interactive\007'; else printf '\033]654;exit=%d:%d\007' "$$" "$__cinder_code"; fi"#;

const DEFAULT_SHELL: &str = "/bin/bash";

/// Hosts the interactive shell as a local child process with piped stdio.
pub struct LocalSandbox {
    shell: String,
}

impl LocalSandbox {
    pub fn new(shell: Option<String>) -> Self {
        Self {
            shell: shell.unwrap_or_else(|| DEFAULT_SHELL.to_string()),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl Sandbox for LocalSandbox {
    fn spawn_shell(&self, geometry: TermGeometry) -> std::io::Result<ShellProcess> {
        let mut cmd = tokio::process::Command::new(&self.shell);
        cmd.arg("-i")
            .env("PROMPT_COMMAND", PROMPT_COMMAND)
            .env("COLUMNS", geometry.cols.to_string())
            .env("LINES", geometry.rows.to_string())
            .env("TERM", "dumb")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("shell stdin not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("shell stdout not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("shell stderr not piped"))?;

        // Input pump: channel writes -> process stdin.
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(data) = input_rx.recv().await {
                if stdin.write_all(data.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        // Output pumps: stdout and stderr merged into one chunk channel.
        // The channel closes once both pipes reach EOF.
        let (output_tx, output_rx) = mpsc::unbounded_channel::<String>();
        spawn_output_pump(stdout, output_tx.clone());
        spawn_output_pump(stderr, output_tx);

        // Reap the child; kill_on_drop covers runtime shutdown.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        Ok(ShellProcess {
            input: input_tx,
            output: output_rx,
        })
    }
}

fn spawn_output_pump<R>(mut reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    // Lossy is fine here: chunks are display/scan material,
                    // and the control markers are pure ASCII.
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    if tx.send(chunk).is_err() {
                        break;
                    }
                }
            }
        }
    });
}
