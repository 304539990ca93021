// (c) 2025 Ross Younger

#![allow(clippy::doc_markdown)]
//! `ftc` moves one file at a time across a serial line, between a Linux host and a device
//! at the far end running a small responder program.
//!
//! ## 📖 Documentation
//!
//! * [About the protocol](protocol)
//! * [Configuring ftc](config)
//!
//! ## Overview
//!
//! - 🔌 Works over any serial device: a USB adapter, an on-board UART, a null-modem cable
//! - 🐢 Fixed line settings: 19200 baud, 8 data bits, no parity, 1 stop bit, no flow control
//! - 🤝 Stop-and-wait: every chunk of up to 255 bytes is acknowledged before the next is sent
//! - 🪞 Can also act as the far end (`ftc --server`), e.g. for testing over a pair of adapters
//!
//! ## 🧰 Usage
//!
//! ```text
//! ftc [OPTIONS] <REMOTE_FILE> <LOCAL_FILE>        # fetch a file from the remote
//! ftc [OPTIONS] -s <LOCAL_FILE> <REMOTE_FILE>     # send a file to the remote
//! ftc [OPTIONS] --server                          # be the remote
//! ```
//!
//! The host keeps probing until the remote answers, so it is fine to start `ftc` first and
//! switch on (or start) the remote afterwards. Use `--handshake-attempts` to give up sooner,
//! and `--deadline` to put an upper bound on the whole session. Ctrl-C aborts cleanly.
//!
//! Remote file names are passed to the remote verbatim; they must be ASCII.
//!
//! ## Limitations
//!
//! - One file per session
//! - No integrity check on the wire. Use `--stats` to see the CRC-32 of what was transferred,
//!   and compare it with the other end.
//! - If the peer goes silent mid-transfer, the session waits for it indefinitely (or until the deadline).
//!
//! ## Crate structure
//!
//! * [`transport`] owns the serial line: opening it, and timed reads
//! * [`protocol`] defines the bytes on the wire and the handshake
//! * [`engine`] holds the sending and receiving state machines
//! * [`session`] ties one transfer together
//! * [`config`], [`cli`](mod@cli) and [`client`] make up the program around them

pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod protocol;
mod server;
pub mod session;
pub mod transport;
pub mod util;

pub use cli::cli;
pub use cli::styles;
pub use config::Configuration;
