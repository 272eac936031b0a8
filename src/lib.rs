//! Cinder bridges one sandboxed interactive shell between programmatic
//! command execution and live terminal use, and renders annotated assistant
//! messages to the terminal.
//!
//! The shell side lives in [`shell`] (bridge, control-sequence scanner,
//! output fan-out, execution state) on top of the [`runtime`] seam that
//! spawns the actual process. The rendering side lives in [`display`]
//! (markdown, styles, message renderer) over the wire types in [`protocol`].

pub mod config;
pub mod display;
pub mod protocol;
pub mod runtime;
pub mod shell;
