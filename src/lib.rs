//! # chatline - Command Line Chat Client and Echo Bot
//!
//! Two thin clients for a chat server reachable over a bidirectional
//! message stream: an interactive client that turns typed commands into
//! protocol requests, and a bot that answers every message it receives.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  line   ┌──────────┐ Command ┌──────────┐ Outbound ┌──────────┐
//! │  stdin   │────────▶│ commands │────────▶│ requests │─────────▶│  queue   │
//! └──────────┘         └──────────┘         └──────────┘          └────┬─────┘
//!                                                ▲                     │
//!                                   bot replies  │                     ▼
//! ┌──────────┐  print  ┌──────────┐  routed ┌────┴─────┐  stream  ┌──────────┐
//! │  stdout  │◀────────│ handler  │◀────────│ session  │◀────────▶│transport │
//! └──────────┘         └──────────┘         └──────────┘          └──────────┘
//!                                      pending-callback table
//! ```
//!
//! The session loop is the only owner of the pending-callback table: it
//! registers a request's one-shot action before forwarding it and fires the
//! action when the matching control response reports success.

pub mod bot;
pub mod cmd_args;
pub mod commands;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod protocol;
pub mod requests;
pub mod session;

pub use error::ClientError;
