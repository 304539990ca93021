//! Command Line Interface for ftc
// (c) 2025 Ross Younger
mod args;
mod cli_main;
pub mod styles;
pub use cli_main::cli;
