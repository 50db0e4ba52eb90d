//! Vizdeck CLI library
//!
//! Components for the vizdeck demo shell: argument parsing, shell command
//! parsing, and the application wiring that connects the session runtime to
//! the in-memory demo collaborators.

pub mod app;
pub mod cli;
pub mod commands;

pub use app::VizdeckApp;
pub use cli::Cli;
pub use commands::ShellCommand;
