use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cinder",
    about = "An interactive sandboxed shell bridge with an assistant message renderer",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Command to execute in the shell session (repeatable, run in order).
    #[arg(short = 'c', long = "command", value_name = "CMD")]
    pub commands: Vec<String>,

    /// Stay attached to the interactive shell after running commands.
    #[arg(long)]
    pub attach: bool,

    /// Shell binary to spawn (overrides configuration).
    #[arg(long, value_name = "PATH")]
    pub shell: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render an assistant message document to the terminal.
    Render {
        /// JSON message file to render (reads stdin when omitted).
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}
