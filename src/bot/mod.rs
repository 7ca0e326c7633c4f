//! # Bot Responder
//!
//! A minimal chat bot: performs the handshake, logs in, then answers every
//! message it receives with the same text behind a fixed prefix. Requests
//! from any number of producers go through one outbound queue.

use std::sync::Arc;

use crate::config::{self, ReconnectPolicy};
use crate::error::ClientError;
use crate::io::Console;
use crate::protocol::{ClientMsg, ClientNote, NoteWhat, ServerCtrl, ServerData, Transport};
use crate::requests::{synthesize_secret, Outbound, RequestBuilder, RequestIds};
use crate::session::cookie::authenticated_user;
use crate::session::pending::server_params_lines;
use crate::session::{
    outbound_queue, CookieStore, InboundHandler, OutboundSender, PendingAction, SessionLoop,
};

pub mod plugin;

pub use plugin::{describe_account_event, PluginServer};

/// Bot identity and behavior
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub reply_prefix: String,
    /// Where to persist login parameters, if anywhere
    pub cookies: Option<CookieStore>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            reply_prefix: config::DEFAULT_REPLY_PREFIX.to_string(),
            cookies: None,
        }
    }
}

/// Handle for posting requests on the bot's session
#[derive(Debug, Clone)]
pub struct Chatbot {
    queue: OutboundSender,
    ids: RequestIds,
    builder: RequestBuilder,
}

impl Chatbot {
    pub fn new(queue: OutboundSender) -> Self {
        Self {
            queue,
            ids: RequestIds::random(),
            builder: RequestBuilder::default(),
        }
    }

    pub fn hello(&self) -> bool {
        self.post(self.builder.hello(self.ids.next_id()))
    }

    /// Basic-scheme login as `user:password`
    pub fn login(&self, user: &str, password: &str) -> bool {
        let secret = synthesize_secret(None, Some(user), Some(password));
        self.post(self.builder.login(self.ids.next_id(), "basic", secret))
    }

    pub fn publish(&self, topic: &str, text: &str) -> bool {
        self.post(self.builder.publish(self.ids.next_id(), topic, text))
    }

    /// Read receipt for message `seq` on `topic`
    pub fn note_read(&self, topic: &str, seq: i64) -> bool {
        self.post(Outbound::plain(ClientMsg::Note(ClientNote {
            topic: topic.to_string(),
            what: NoteWhat::Read,
            seq: Some(seq),
        })))
    }

    /// Enqueue a request; false once the session is gone
    pub fn post(&self, outbound: Outbound) -> bool {
        let queued = self.queue.send(outbound).is_ok();
        if !queued {
            tracing::warn!("Dropping request, session is closed");
        }
        queued
    }
}

/// Inbound handler replying to every data message
pub struct Responder {
    bot: Chatbot,
    reply_prefix: String,
    cookies: Option<CookieStore>,
    console: Arc<dyn Console>,
    greeted: bool,
}

impl Responder {
    pub fn new(bot: Chatbot, config: &BotConfig, console: Arc<dyn Console>) -> Self {
        Self {
            bot,
            reply_prefix: config.reply_prefix.clone(),
            cookies: config.cookies.clone(),
            console,
            greeted: false,
        }
    }

    /// Whether the server accepted the handshake on this session
    pub fn greeted(&self) -> bool {
        self.greeted
    }
}

impl InboundHandler for Responder {
    fn on_status(&mut self, ctrl: &ServerCtrl) {
        tracing::info!("Request {} finished: {} {}", ctrl.id, ctrl.code, ctrl.text);
    }

    fn on_completion(&mut self, action: PendingAction, ctrl: &ServerCtrl) {
        match action {
            PendingAction::PrintServerParams => {
                self.greeted = true;
                for line in server_params_lines(&ctrl.params) {
                    self.console.print(&line);
                }
            }
            PendingAction::SaveCookie => {
                self.console
                    .print(&format!("Authenticated as {}", authenticated_user(&ctrl.params)));
                if let Some(cookies) = &self.cookies {
                    if let Err(e) = cookies.save(&ctrl.params) {
                        tracing::warn!("Failed to save authentication cookie: {e}");
                    }
                }
            }
        }
    }

    fn on_data(&mut self, data: &ServerData) {
        let text = data.content_text();
        self.console
            .print(&format!("Message from {}: {text}", data.from_user_id));
        self.bot.note_read(&data.topic, data.seq);
        self.bot
            .publish(&data.topic, &format!("{}{text}", self.reply_prefix));
    }
}

/// One session: handshake, login when configured, then reply until the
/// stream ends
pub async fn run_session<T: Transport>(
    transport: &T,
    config: &BotConfig,
    console: Arc<dyn Console>,
) -> Result<(), ClientError> {
    let mut greeted = false;
    run_greeted_session(transport, config, console, &mut greeted).await
}

/// Like `run_session`, also reporting whether the handshake was accepted
async fn run_greeted_session<T: Transport>(
    transport: &T,
    config: &BotConfig,
    console: Arc<dyn Console>,
    greeted: &mut bool,
) -> Result<(), ClientError> {
    let channel = transport.open().await?;
    let (queue, queue_rx) = outbound_queue();
    let bot = Chatbot::new(queue);

    bot.hello();
    if let Some(user) = &config.user {
        bot.login(user, config.password.as_deref().unwrap_or_default());
    }

    let mut responder = Responder::new(bot, config, console);
    let result = SessionLoop::new().run(channel, queue_rx, &mut responder).await;
    *greeted = responder.greeted();
    result
}

/// Run sessions under `policy`; each retry opens a fresh stream and replays
/// the handshake and login.
///
/// The retry budget covers consecutive failures: a session whose handshake
/// was accepted starts the count over.
pub async fn run_with_policy<T: Transport>(
    transport: &T,
    config: &BotConfig,
    policy: ReconnectPolicy,
    console: Arc<dyn Console>,
) -> Result<(), ClientError> {
    let mut attempt = 0;
    loop {
        let mut greeted = false;
        let result = run_greeted_session(transport, config, console.clone(), &mut greeted).await;
        let error = match result {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if greeted {
            attempt = 0;
        }
        attempt += 1;
        let Some(delay) = policy.delay_before(attempt) else {
            return Err(error);
        };
        tracing::warn!("Session ended: {error}; reconnect attempt {attempt} in {delay:?}");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CapturedConsole;
    use crate::protocol::{MockServer, MockTransport, Params, ServerMsg};
    use serde_json::json;
    use std::time::Duration;

    async fn accept_handshake(server: &mut MockServer) -> ClientMsg {
        let hello = server.next_request().await.expect("hello expected");
        assert_eq!(hello.kind(), "hi");
        server.respond_ctrl(hello.id().unwrap_or_default(), 201, "created", Params::new());
        hello
    }

    #[tokio::test]
    async fn bot_should_reply_with_prefix() {
        let transport = MockTransport::new();
        let mut server = transport.push_session();
        let console = CapturedConsole::new();
        let config = BotConfig {
            user: Some("elf".to_string()),
            password: Some("pw".to_string()),
            ..BotConfig::default()
        };

        let server_side = async move {
            accept_handshake(&mut server).await;
            let Some(ClientMsg::Login(login)) = server.next_request().await else {
                panic!("login expected");
            };
            assert_eq!(login.secret, b"elf:pw");
            let mut params = Params::new();
            params.insert("user".to_string(), json!("usrElf"));
            server.respond_ctrl(&login.id, 200, "ok", params);

            server.respond(ServerMsg::Data(ServerData {
                topic: "p2pAbc".to_string(),
                from_user_id: "usrAlice".to_string(),
                seq: 12,
                content: json!("ping"),
            }));

            let Some(ClientMsg::Note(note)) = server.next_request().await else {
                panic!("read receipt expected");
            };
            assert_eq!(note.seq, Some(12));
            let Some(ClientMsg::Pub(reply)) = server.next_request().await else {
                panic!("reply expected");
            };
            server.hang_up();
            reply
        };

        let (result, reply) = tokio::join!(
            run_session(&transport, &config, Arc::new(console.clone())),
            server_side
        );

        assert!(matches!(result, Err(ClientError::StreamClosed)));
        assert_eq!(reply.topic.as_deref(), Some("p2pAbc"));
        assert!(reply.no_echo);
        assert_eq!(reply.content, r#""I hear you: ping""#);
        assert!(console.contains("Authenticated as usrElf"));
        assert!(console.contains("Message from usrAlice: ping"));
    }

    #[tokio::test]
    async fn exit_policy_should_surface_first_failure() {
        let transport = MockTransport::new();
        let mut server = transport.push_session();
        server.hang_up();

        let result = run_with_policy(
            &transport,
            &BotConfig::default(),
            ReconnectPolicy::Exit,
            Arc::new(CapturedConsole::new()),
        )
        .await;
        assert!(matches!(result, Err(ClientError::StreamClosed)));
    }

    #[tokio::test]
    async fn retry_policy_should_replay_handshake_on_new_stream() {
        let transport = MockTransport::new();
        let mut first = transport.push_session();
        let mut second = transport.push_session();

        let server_side = async move {
            accept_handshake(&mut first).await;
            first.fail(std::io::ErrorKind::ConnectionReset);
            accept_handshake(&mut second).await;
            second.hang_up();
        };

        let policy = ReconnectPolicy::Retry {
            attempts: 2,
            delay: Duration::from_millis(1),
        };
        let config = BotConfig::default();
        let (result, ()) = tokio::join!(
            run_with_policy(
                &transport,
                &config,
                policy,
                Arc::new(CapturedConsole::new())
            ),
            server_side
        );

        // Second stream closes, later opens find no session queued.
        assert!(matches!(result, Err(ClientError::Connect { .. })));
    }

    #[tokio::test]
    async fn accepted_handshake_should_restart_retry_budget() {
        let transport = MockTransport::new();
        let mut first = transport.push_session();
        let mut second = transport.push_session();

        let server_side = async move {
            accept_handshake(&mut first).await;
            first.fail(std::io::ErrorKind::ConnectionReset);
            accept_handshake(&mut second).await;
            second.fail(std::io::ErrorKind::ConnectionReset);
        };

        let policy = ReconnectPolicy::Retry {
            attempts: 1,
            delay: Duration::from_millis(1),
        };
        let config = BotConfig::default();
        let (result, ()) = tokio::join!(
            run_with_policy(
                &transport,
                &config,
                policy,
                Arc::new(CapturedConsole::new())
            ),
            server_side
        );

        // Both failures follow a greeted session, so the budget is only
        // spent once no third session can be opened.
        assert!(matches!(result, Err(ClientError::Connect { .. })));
    }
}
