//! # Request Builder
//!
//! Maps parsed commands onto protocol requests. The builder is stateless:
//! every call gets the request id to use and returns a fresh request,
//! optionally tagged with the action to run once the server confirms it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde_json::Value;

use crate::commands::{
    AccountCommand, Command, DeleteCommand, DeleteTarget, GetCommand, LeaveCommand, LoginCommand,
    NoteCommand, NoteKind, ProfileArgs, PublishCommand, SetCommand, SubscribeCommand,
};
use crate::config;
use crate::error::ClientError;
use crate::protocol::{
    ClientAcc, ClientDel, ClientGet, ClientHi, ClientLeave, ClientLogin, ClientMsg, ClientNote,
    ClientPub, ClientSet, ClientSub, DefaultAcsMode, DelQuery, DelWhat, GetQuery, NoteWhat,
    RequestId, SeqRange, SetDesc, SetQuery, SetSub,
};
use crate::session::PendingAction;

pub mod vcard;

pub use vcard::make_vcard;

/// Upper bound used when deleting every message of a topic
pub const MAX_SEQ_ID: i64 = 0x8FFFFFF;

/// A request ready for the outbound queue
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub msg: ClientMsg,
    /// Action to run when the server answers with a success status
    pub on_success: Option<PendingAction>,
}

impl Outbound {
    pub fn plain(msg: ClientMsg) -> Self {
        Self {
            msg,
            on_success: None,
        }
    }

    pub fn with_action(msg: ClientMsg, action: PendingAction) -> Self {
        Self {
            msg,
            on_success: Some(action),
        }
    }
}

/// Shared, monotonically increasing request id source
#[derive(Debug, Clone)]
pub struct RequestIds {
    next: Arc<AtomicU64>,
}

impl RequestIds {
    /// Start from a random seed so ids differ between sessions
    pub fn random() -> Self {
        Self::starting_at(rand::thread_rng().gen_range(10_000..60_000))
    }

    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(seed)),
        }
    }

    pub fn next_id(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Builds protocol requests from commands
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    user_agent: String,
    protocol_version: String,
    lang: String,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(
            config::user_agent(),
            config::PROTOCOL_VERSION,
            config::DEFAULT_LANGUAGE,
        )
    }
}

impl RequestBuilder {
    pub fn new(
        user_agent: impl Into<String>,
        protocol_version: impl Into<String>,
        lang: impl Into<String>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            protocol_version: protocol_version.into(),
            lang: lang.into(),
        }
    }

    /// Handshake; prints the server's parameters once accepted
    pub fn hello(&self, id: RequestId) -> Outbound {
        let msg = ClientMsg::Hi(ClientHi {
            id: id.to_string(),
            user_agent: self.user_agent.clone(),
            ver: self.protocol_version.clone(),
            lang: self.lang.clone(),
        });
        Outbound::with_action(msg, PendingAction::PrintServerParams)
    }

    /// Login with a ready-made secret; persists the cookie once accepted
    pub fn login(&self, id: RequestId, scheme: &str, secret: Vec<u8>) -> Outbound {
        let msg = ClientMsg::Login(ClientLogin {
            id: id.to_string(),
            scheme: scheme.to_string(),
            secret,
        });
        Outbound::with_action(msg, PendingAction::SaveCookie)
    }

    /// Post a text message to `topic`
    pub fn publish(&self, id: RequestId, topic: &str, text: &str) -> Outbound {
        Outbound::plain(ClientMsg::Pub(ClientPub {
            id: id.to_string(),
            topic: Some(topic.to_string()),
            no_echo: true,
            content: Value::from(text).to_string(),
        }))
    }

    /// Build the request for one parsed command
    pub fn build(&self, command: Command, id: RequestId) -> Result<Outbound, ClientError> {
        tracing::debug!("Building '{}' request {id}", command.verb());
        let id_text = id.to_string();
        let msg = match command {
            Command::Account(cmd) => account(id_text, cmd),
            Command::Login(cmd) => return Ok(self.login_command(id, cmd)),
            Command::Subscribe(cmd) => subscribe(id_text, cmd),
            Command::Leave(cmd) => leave(id_text, cmd),
            Command::Publish(cmd) => publish(id_text, cmd),
            Command::Get(cmd) => get(id_text, cmd),
            Command::Set(cmd) => set(id_text, cmd),
            Command::Delete(cmd) => delete(id_text, cmd)?,
            Command::Note(cmd) => note(cmd)?,
        };
        Ok(Outbound::plain(msg))
    }

    fn login_command(&self, id: RequestId, cmd: LoginCommand) -> Outbound {
        let secret = synthesize_secret(
            cmd.secret.as_deref(),
            cmd.uname.as_deref(),
            cmd.password.as_deref(),
        );
        self.login(id, &cmd.scheme, secret)
    }
}

/// Secret for `acc` and `login`: the explicit secret when given, otherwise
/// `uname:password` when a user name is given.
pub fn synthesize_secret(
    secret: Option<&str>,
    uname: Option<&str>,
    password: Option<&str>,
) -> Vec<u8> {
    match (secret.filter(|s| !s.is_empty()), uname) {
        (Some(secret), _) => secret.as_bytes().to_vec(),
        (None, Some(uname)) => format!("{uname}:{}", password.unwrap_or("")).into_bytes(),
        (None, None) => Vec::new(),
    }
}

/// Space-separated metadata classes requested by `get`
pub fn query_what(desc: bool, sub: bool, data: bool) -> String {
    [(desc, "desc"), (sub, "sub"), (data, "data")]
        .iter()
        .filter(|(wanted, _)| *wanted)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Message ids to delete: `all` or a comma separated list of integers
pub fn parse_seq_list(param: &str) -> Result<Vec<DelQuery>, ClientError> {
    if param == "all" {
        return Ok(vec![DelQuery::Range(SeqRange {
            low: 1,
            hi: MAX_SEQ_ID,
        })]);
    }
    param
        .split(',')
        .map(|entry| {
            let entry = entry.trim();
            entry
                .parse::<i64>()
                .map(DelQuery::SeqId)
                .map_err(|_| ClientError::value_conversion("message id", entry))
        })
        .collect()
}

fn describe(profile: &ProfileArgs) -> Option<SetDesc> {
    let default_acs = (profile.auth.is_some() || profile.anon.is_some()).then(|| DefaultAcsMode {
        auth: profile.auth.clone(),
        anon: profile.anon.clone(),
    });
    let desc = SetDesc {
        default_acs,
        public: make_vcard(profile.full_name.as_deref(), profile.photo.as_deref()),
        private: profile.private.clone(),
    };
    (!desc.is_empty()).then_some(desc)
}

fn account(id: String, cmd: AccountCommand) -> ClientMsg {
    let secret = synthesize_secret(
        cmd.secret.as_deref(),
        cmd.uname.as_deref(),
        cmd.password.as_deref(),
    );
    ClientMsg::Acc(ClientAcc {
        id,
        user: cmd.user,
        scheme: cmd.scheme,
        secret,
        login: cmd.do_login,
        tags: (!cmd.tags.is_empty()).then_some(cmd.tags),
        desc: describe(&cmd.profile),
    })
}

fn subscribe(id: String, cmd: SubscribeCommand) -> ClientMsg {
    ClientMsg::Sub(ClientSub {
        id,
        topic: cmd.topic,
        set: describe(&cmd.profile).map(|desc| SetQuery {
            desc: Some(desc),
            sub: None,
        }),
        get: cmd.get_query.map(|what| GetQuery { what }),
    })
}

fn leave(id: String, cmd: LeaveCommand) -> ClientMsg {
    ClientMsg::Leave(ClientLeave {
        id,
        topic: cmd.topic,
        unsub: cmd.unsub,
    })
}

fn publish(id: String, cmd: PublishCommand) -> ClientMsg {
    ClientMsg::Pub(ClientPub {
        id,
        topic: cmd.topic,
        no_echo: true,
        content: Value::from(cmd.content).to_string(),
    })
}

fn get(id: String, cmd: GetCommand) -> ClientMsg {
    ClientMsg::Get(ClientGet {
        id,
        topic: cmd.topic,
        query: GetQuery {
            what: query_what(cmd.desc, cmd.sub, cmd.data),
        },
    })
}

fn set(id: String, cmd: SetCommand) -> ClientMsg {
    let sub = (cmd.user.is_some() || cmd.mode.is_some()).then(|| SetSub {
        user: cmd.user,
        mode: cmd.mode,
    });
    ClientMsg::Set(ClientSet {
        id,
        topic: cmd.topic,
        query: SetQuery {
            desc: describe(&cmd.profile),
            sub,
        },
    })
}

fn delete(id: String, cmd: DeleteCommand) -> Result<ClientMsg, ClientError> {
    // A lone param with no topic was meant as the topic.
    let (topic, param) = match (cmd.topic, cmd.param) {
        (None, Some(param)) => (Some(param), None),
        resolved => resolved,
    };

    let mut del = ClientDel {
        id,
        topic,
        what: DelWhat::Msg,
        del_seq: Vec::new(),
        user: None,
        hard: cmd.hard,
    };
    match cmd.what {
        DeleteTarget::Msg => {
            if let Some(param) = param {
                del.del_seq = parse_seq_list(&param)?;
            }
        }
        DeleteTarget::Sub => {
            del.what = DelWhat::Sub;
            del.user = param;
        }
        DeleteTarget::Topic => del.what = DelWhat::Topic,
    }
    Ok(ClientMsg::Del(del))
}

fn note(cmd: NoteCommand) -> Result<ClientMsg, ClientError> {
    let (what, seq) = match cmd.what {
        NoteKind::Kp => (NoteWhat::Kp, None),
        NoteKind::Read => (NoteWhat::Read, Some(parse_seq(cmd.seq.as_deref())?)),
        NoteKind::Recv => (NoteWhat::Recv, Some(parse_seq(cmd.seq.as_deref())?)),
    };
    Ok(ClientMsg::Note(ClientNote {
        topic: cmd.topic,
        what,
        seq,
    }))
}

fn parse_seq(raw: Option<&str>) -> Result<i64, ClientError> {
    let raw = raw.unwrap_or_default();
    raw.trim()
        .parse()
        .map_err(|_| ClientError::value_conversion("seq", raw))
}
