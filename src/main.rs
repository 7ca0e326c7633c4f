//! # chatline Main Entry Point
//!
//! Interactive command line client.

use std::sync::Arc;

use anyhow::Result;
use chatline::cmd_args::CommandLineArgs;
use chatline::config;
use chatline::io::{TerminalConsole, TerminalLineSource};
use chatline::protocol::JsonLinesTransport;
use chatline::session::client::{resolve_credentials, InteractiveSession};
use chatline::session::CookieStore;

#[tokio::main]
async fn main() -> Result<()> {
    chatline::logging::init_tracing();
    let args = CommandLineArgs::parse();

    println!(
        "Command line chat client. Version {}.",
        config::APP_VERSION
    );
    println!("Server '{}'", args.host());

    let cookies = CookieStore::new(args.cookie_path());
    let cookie_secret = if args.login_cookie() {
        cookies.load_token_secret()
    } else {
        None
    };
    let credentials = resolve_credentials(cookie_secret, args.login_token(), args.login_basic());

    let transport = JsonLinesTransport::new(args.host());
    InteractiveSession::new(Arc::new(TerminalConsole::new()), cookies)
        .with_credentials(credentials)
        .run(&transport, TerminalLineSource::spawn())
        .await?;

    Ok(())
}
