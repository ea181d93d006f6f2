//! `leftwatch-dashboard` library crate.
//!
//! Console shell for the left-object monitoring client: configuration,
//! the command language, plain-text panels and the [`shell::Shell`] that
//! wires the event feed and the stream connector together. The binary
//! entrypoint lives in `main.rs`.

pub mod command;
pub mod config;
pub mod console;
pub mod render;
pub mod shell;
