//! # Interactive Client Session
//!
//! Joins the line-reading flow and the session loop. Lines become requests
//! on the outbound queue; server output is printed to the console.

use std::sync::Arc;

use crate::commands;
use crate::error::ClientError;
use crate::io::{Console, LineSource};
use crate::protocol::{ServerCtrl, ServerData, Transport};
use crate::requests::{RequestBuilder, RequestIds};
use serde_json::Value;

use super::cookie::{authenticated_user, TOKEN_SCHEME};
use super::pending::server_params_lines;
use super::{outbound_queue, CookieStore, InboundHandler, OutboundSender, PendingAction, SessionLoop};

/// Credentials used for the startup login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub scheme: String,
    pub secret: Vec<u8>,
}

impl Credentials {
    pub fn new(scheme: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            scheme: scheme.into(),
            secret: secret.into(),
        }
    }
}

/// Pick startup credentials: cookie token, then explicit token, then
/// `user:password`.
pub fn resolve_credentials(
    cookie_secret: Option<Vec<u8>>,
    token: Option<&str>,
    basic: Option<&str>,
) -> Option<Credentials> {
    if let Some(secret) = cookie_secret {
        return Some(Credentials::new(TOKEN_SCHEME, secret));
    }
    if let Some(token) = token {
        return Some(Credentials::new(TOKEN_SCHEME, token.as_bytes()));
    }
    basic.map(|basic| Credentials::new("basic", basic.as_bytes()))
}

/// Prints server output for a human
pub struct ConsoleHandler {
    console: Arc<dyn Console>,
    cookies: CookieStore,
}

impl ConsoleHandler {
    pub fn new(console: Arc<dyn Console>, cookies: CookieStore) -> Self {
        Self { console, cookies }
    }
}

impl InboundHandler for ConsoleHandler {
    fn on_status(&mut self, ctrl: &ServerCtrl) {
        self.console.print(&format!("{} {}", ctrl.code, ctrl.text));
    }

    fn on_completion(&mut self, action: PendingAction, ctrl: &ServerCtrl) {
        match action {
            PendingAction::PrintServerParams => {
                for line in server_params_lines(&ctrl.params) {
                    self.console.print(&line);
                }
            }
            PendingAction::SaveCookie => {
                self.console
                    .print(&format!("Authenticated as {}", authenticated_user(&ctrl.params)));
                if let Err(e) = self.cookies.save(&ctrl.params) {
                    tracing::warn!("Failed to save authentication cookie: {e}");
                    self.console
                        .print(&format!("Failed to save authentication cookie: {e}"));
                }
            }
        }
    }

    fn on_data(&mut self, data: &ServerData) {
        self.console.print(&format!(
            "\nMessage from {}:\n{}",
            data.from_user_id,
            data.content_text()
        ));
    }

    fn on_unhandled(&mut self, msg: &Value) {
        self.console.print(&format!("Message type not handled {msg}"));
    }
}

/// Interactive session: handshake, optional login, then one request per line
pub struct InteractiveSession {
    builder: RequestBuilder,
    ids: RequestIds,
    console: Arc<dyn Console>,
    cookies: CookieStore,
    credentials: Option<Credentials>,
}

impl InteractiveSession {
    pub fn new(console: Arc<dyn Console>, cookies: CookieStore) -> Self {
        Self {
            builder: RequestBuilder::default(),
            ids: RequestIds::random(),
            console,
            cookies,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_request_ids(mut self, ids: RequestIds) -> Self {
        self.ids = ids;
        self
    }

    /// Open a stream and run until input ends and the server finishes, or
    /// until the stream fails
    pub async fn run<T, L>(self, transport: &T, lines: L) -> Result<(), ClientError>
    where
        T: Transport,
        L: LineSource,
    {
        let channel = transport.open().await?;
        let (queue, queue_rx) = outbound_queue();

        let Self {
            builder,
            ids,
            console,
            cookies,
            credentials,
        } = self;

        let producer = feed_requests(lines, queue, ids, builder, credentials, console.clone());
        let mut handler = ConsoleHandler::new(console, cookies);
        let mut session_loop = SessionLoop::new();
        let session = session_loop.run(channel, queue_rx, &mut handler);
        tokio::pin!(producer);
        tokio::pin!(session);

        tokio::select! {
            () = &mut producer => session.await,
            result = &mut session => result,
        }
    }
}

/// Emit the handshake, the login if any, then one request per input line.
///
/// Every line consumes a request id, blank or not. Returns on end of input,
/// on `exit`/`quit`, or once the session stops taking requests; dropping
/// `queue` closes the session's outbound side.
pub async fn feed_requests<L: LineSource>(
    mut lines: L,
    queue: OutboundSender,
    ids: RequestIds,
    builder: RequestBuilder,
    credentials: Option<Credentials>,
    console: Arc<dyn Console>,
) {
    if queue.send(builder.hello(ids.next_id())).is_err() {
        return;
    }
    if let Some(Credentials { scheme, secret }) = credentials {
        if queue.send(builder.login(ids.next_id(), &scheme, secret)).is_err() {
            return;
        }
    }

    while let Some(line) = lines.next_line().await {
        let id = ids.next_id();
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if commands::is_exit_sentinel(line) {
            tracing::debug!("Exit requested");
            break;
        }
        match commands::parse(line).and_then(|command| builder.build(command, id)) {
            Ok(outbound) => {
                if queue.send(outbound).is_err() {
                    tracing::debug!("Session stopped taking requests");
                    break;
                }
            }
            Err(e) => console.print(&e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{CapturedConsole, ScriptedLineSource};
    use crate::protocol::{ClientMsg, MockTransport, Params};
    use serde_json::json;

    #[test]
    fn cookie_should_take_precedence_over_token_and_basic() {
        let credentials = resolve_credentials(Some(b"tok".to_vec()), Some("t2"), Some("a:b"));
        assert_eq!(credentials, Some(Credentials::new("token", b"tok".to_vec())));

        let credentials = resolve_credentials(None, Some("t2"), Some("a:b"));
        assert_eq!(credentials, Some(Credentials::new("token", b"t2".to_vec())));

        let credentials = resolve_credentials(None, None, Some("a:b"));
        assert_eq!(credentials, Some(Credentials::new("basic", b"a:b".to_vec())));

        assert_eq!(resolve_credentials(None, None, None), None);
    }

    #[tokio::test]
    async fn producer_should_number_every_line() {
        let (queue, mut queue_rx) = outbound_queue();
        let console = CapturedConsole::new();
        let lines = ScriptedLineSource::new(["", "note grp1", "bogus", "sub grp1", "quit", "sub x"]);

        feed_requests(
            lines,
            queue,
            RequestIds::starting_at(100),
            RequestBuilder::default(),
            Some(Credentials::new("basic", b"a:b".to_vec())),
            Arc::new(console.clone()),
        )
        .await;

        let mut ids = Vec::new();
        while let Some(outbound) = queue_rx.recv().await {
            ids.push((outbound.msg.kind(), outbound.msg.id().map(str::to_string)));
        }
        assert_eq!(
            ids,
            vec![
                ("hi", Some("100".to_string())),
                ("login", Some("101".to_string())),
                ("note", None),
                ("sub", Some("105".to_string())),
            ]
        );
        assert!(console.contains("Unrecognized: bogus"));
    }

    #[tokio::test]
    async fn session_should_print_status_and_messages() {
        let transport = MockTransport::new();
        let mut server = transport.push_session();
        let console = CapturedConsole::new();
        let dir = tempfile::tempdir().unwrap();
        let cookies = CookieStore::new(dir.path().join("cookie"));

        let server_side = async move {
            let Some(ClientMsg::Hi(hi)) = server.next_request().await else {
                panic!("handshake expected first");
            };
            let mut params = Params::new();
            params.insert("ver".to_string(), json!("0.14"));
            server.respond_ctrl(&hi.id, 201, "created", params);

            let sub = server.next_request().await.expect("sub expected");
            let id = sub.id().unwrap_or_default().to_string();
            server.respond_ctrl(&id, 200, "ok", Params::new());
            server.push_data("grp1", "usrAlice", json!("hello there"));

            assert_eq!(server.next_request().await, None);
            server.hang_up();
        };

        let session = InteractiveSession::new(Arc::new(console.clone()), cookies)
            .with_request_ids(RequestIds::starting_at(10_000));
        let lines = ScriptedLineSource::new(["sub grp1"]);
        let (result, ()) = tokio::join!(session.run(&transport, lines), server_side);

        result.unwrap();
        assert_eq!(
            console.lines(),
            vec![
                "Connected to server:",
                "\tver: 0.14",
                "201 created",
                "200 ok",
                "\nMessage from usrAlice:\nhello there",
            ]
        );
    }

    #[tokio::test]
    async fn successful_login_should_save_cookie() {
        let transport = MockTransport::new();
        let mut server = transport.push_session();
        let console = CapturedConsole::new();
        let dir = tempfile::tempdir().unwrap();
        let cookie_path = dir.path().join("cookie");

        let server_side = async move {
            server.next_request().await.expect("hello expected");
            let Some(ClientMsg::Login(login)) = server.next_request().await else {
                panic!("login expected");
            };
            assert_eq!(login.secret, b"bob:secret");
            let mut params = Params::new();
            params.insert("user".to_string(), json!("usrBob"));
            params.insert("token".to_string(), json!("dG9r"));
            server.respond_ctrl(&login.id, 200, "ok", params);
            server.next_request().await;
            server.hang_up();
        };

        let session = InteractiveSession::new(
            Arc::new(console.clone()),
            CookieStore::new(&cookie_path),
        )
        .with_request_ids(RequestIds::starting_at(20_000));
        let lines = ScriptedLineSource::new(["login --uname=bob --password=secret"]);
        let (result, ()) = tokio::join!(session.run(&transport, lines), server_side);

        result.unwrap();
        assert!(console.contains("Authenticated as usrBob"));
        assert!(!console.contains("Failed"));
        let saved = CookieStore::new(&cookie_path).load().expect("cookie expected");
        assert_eq!(saved.get("user"), Some(&json!("usrBob")));
        assert_eq!(
            CookieStore::new(&cookie_path).load_token_secret(),
            Some(b"tok".to_vec())
        );
    }
}
