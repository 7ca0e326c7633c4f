//! # Interactive Session Features
//!
//! Behaviour tests driving the interactive client against an in-process
//! mock server. Each scenario scripts the typed lines and the server's
//! answers, runs one session to completion, then inspects what was printed,
//! sent and persisted.
//!
//! Run with: cargo test --test session_features

use std::path::PathBuf;
use std::sync::Arc;

use cucumber::{given, then, when, World};
use serde_json::{json, Value};
use tempfile::TempDir;

use chatline::io::{CapturedConsole, ScriptedLineSource};
use chatline::protocol::{ClientMsg, MockServer, MockTransport, Params};
use chatline::session::client::{Credentials, InteractiveSession};
use chatline::session::CookieStore;
use chatline::ClientError;

/// How the mock server answers a login
#[derive(Debug, Clone)]
struct LoginReply {
    code: i32,
    text: String,
    params: Params,
}

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct ChatWorld {
    lines: Vec<String>,
    credentials: Option<Credentials>,
    login_reply: LoginReply,
    delivery: Option<(String, String)>,
    console: CapturedConsole,
    cookie_dir: TempDir,
    sent: Vec<ClientMsg>,
    outcome: Option<Result<(), ClientError>>,
}

impl ChatWorld {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            credentials: None,
            login_reply: LoginReply {
                code: 200,
                text: "ok".to_string(),
                params: Params::new(),
            },
            delivery: None,
            console: CapturedConsole::new(),
            cookie_dir: tempfile::tempdir().expect("temp dir"),
            sent: Vec::new(),
            outcome: None,
        }
    }

    fn cookie_path(&self) -> PathBuf {
        self.cookie_dir.path().join("cookie")
    }
}

/// Answer every request until the client half-closes, then hang up
async fn serve(
    mut server: MockServer,
    login_reply: LoginReply,
    delivery: Option<(String, String)>,
) -> Vec<ClientMsg> {
    let mut sent = Vec::new();
    while let Some(request) = server.next_request().await {
        let id = request.id().unwrap_or_default().to_string();
        match &request {
            ClientMsg::Hi(_) => {
                let mut params = Params::new();
                params.insert("ver".to_string(), json!("0.14"));
                server.respond_ctrl(&id, 201, "created", params);
            }
            ClientMsg::Login(_) => {
                server.respond_ctrl(
                    &id,
                    login_reply.code,
                    &login_reply.text,
                    login_reply.params.clone(),
                );
            }
            ClientMsg::Note(_) => {}
            ClientMsg::Sub(sub) => {
                server.respond_ctrl(&id, 200, "ok", Params::new());
                if let Some((from, text)) = &delivery {
                    let topic = sub.topic.clone().unwrap_or_default();
                    server.push_data(&topic, from, json!(text));
                }
            }
            _ => {
                server.respond_ctrl(&id, 200, "ok", Params::new());
            }
        }
        sent.push(request);
    }
    server.hang_up();
    sent
}

#[given(expr = "the server accepts logins as {string} with token {string}")]
async fn given_login_accepted(world: &mut ChatWorld, user: String, token: String) {
    let mut params = Params::new();
    params.insert("user".to_string(), json!(user));
    params.insert("token".to_string(), json!(token));
    world.login_reply = LoginReply {
        code: 200,
        text: "ok".to_string(),
        params,
    };
}

#[given(expr = "the server rejects logins with {int} {string}")]
async fn given_login_rejected(world: &mut ChatWorld, code: i32, text: String) {
    world.login_reply = LoginReply {
        code,
        text,
        params: Params::new(),
    };
}

#[given(expr = "the server delivers {string} from {string} after a subscription")]
async fn given_delivery(world: &mut ChatWorld, text: String, from: String) {
    world.delivery = Some((from, text));
}

#[given(expr = "the client starts with token {string}")]
async fn given_startup_token(world: &mut ChatWorld, token: String) {
    world.credentials = Some(Credentials::new("token", token.as_bytes()));
}

#[when(expr = "I type {string}")]
async fn when_type(world: &mut ChatWorld, line: String) {
    world.lines.push(line);
}

#[when("the session runs to completion")]
async fn when_session_runs(world: &mut ChatWorld) {
    let transport = MockTransport::new();
    let server = transport.push_session();
    let session = InteractiveSession::new(
        Arc::new(world.console.clone()),
        CookieStore::new(world.cookie_path()),
    )
    .with_credentials(world.credentials.clone());
    let lines = ScriptedLineSource::new(world.lines.clone());

    let (outcome, sent) = tokio::join!(
        session.run(&transport, lines),
        serve(server, world.login_reply.clone(), world.delivery.clone())
    );
    world.outcome = Some(outcome);
    world.sent = sent;
}

#[then("the session ends cleanly")]
async fn then_session_ok(world: &mut ChatWorld) {
    match &world.outcome {
        Some(Ok(())) => {}
        other => panic!("expected a clean session end, got {other:?}"),
    }
}

#[then(expr = "the console shows {string}")]
async fn then_console_shows(world: &mut ChatWorld, text: String) {
    let text = text.replace("\\t", "\t");
    assert!(
        world.console.contains(&text),
        "'{text}' not found in:\n{}",
        world.console.contents()
    );
}

#[then(expr = "the console does not show {string}")]
async fn then_console_lacks(world: &mut ChatWorld, text: String) {
    assert!(
        !world.console.contains(&text),
        "unexpected '{text}' in:\n{}",
        world.console.contents()
    );
}

#[then(expr = "the cookie file holds user {string}")]
async fn then_cookie_holds(world: &mut ChatWorld, user: String) {
    let params = CookieStore::new(world.cookie_path())
        .load()
        .expect("cookie file expected");
    assert_eq!(params.get("user"), Some(&Value::String(user)));
}

#[then("no cookie file is written")]
async fn then_no_cookie(world: &mut ChatWorld) {
    assert!(!world.cookie_path().exists());
}

#[then(expr = "the server received {int} requests")]
async fn then_request_count(world: &mut ChatWorld, count: usize) {
    assert_eq!(
        world.sent.len(),
        count,
        "sent: {:?}",
        world.sent.iter().map(ClientMsg::kind).collect::<Vec<_>>()
    );
}

#[then(expr = "request {int} is a {string} request")]
async fn then_request_kind(world: &mut ChatWorld, index: usize, kind: String) {
    let request = world
        .sent
        .get(index - 1)
        .unwrap_or_else(|| panic!("no request number {index}"));
    assert_eq!(request.kind(), kind);
}

#[then(expr = "the login secret is {string}")]
async fn then_login_secret(world: &mut ChatWorld, secret: String) {
    let login = world
        .sent
        .iter()
        .find_map(|msg| match msg {
            ClientMsg::Login(login) => Some(login),
            _ => None,
        })
        .expect("login request expected");
    assert_eq!(login.secret, secret.as_bytes());
}

#[tokio::main]
async fn main() {
    chatline::logging::init_tracing();
    ChatWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/features")
        .await;
}
