//! # chatline-bot Entry Point
//!
//! Echo bot with an account-event endpoint.

use std::sync::Arc;

use anyhow::{Context, Result};
use chatline::bot::{self, BotConfig, PluginServer};
use chatline::cmd_args::BotCommandLineArgs;
use chatline::io::{Console, TerminalConsole};
use chatline::protocol::JsonLinesTransport;
use chatline::session::CookieStore;

#[tokio::main]
async fn main() -> Result<()> {
    chatline::logging::init_tracing();
    let args = BotCommandLineArgs::parse();
    let console: Arc<dyn Console> = Arc::new(TerminalConsole::new());

    let plugin = PluginServer::bind(args.listen(), console.clone())
        .await
        .context("Account-event endpoint could not start")?;
    tokio::spawn(plugin.serve());

    let config = BotConfig {
        user: args.user().map(str::to_string),
        password: args.password().map(str::to_string),
        reply_prefix: args.reply_prefix().to_string(),
        cookies: args.cookie_path().map(CookieStore::new),
    };
    let transport = JsonLinesTransport::new(args.host());
    bot::run_with_policy(&transport, &config, args.reconnect(), console)
        .await
        .with_context(|| format!("Session with '{}' ended", args.host()))?;

    Ok(())
}
