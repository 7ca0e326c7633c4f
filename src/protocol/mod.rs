//! # Protocol Messages
//!
//! Request and response shapes exchanged with the chat server. These mirror
//! the server's message schema; this crate only builds and reads them; it
//! does not interpret them beyond routing.
//!
//! On the wire every message is a single-key object naming its kind, e.g.
//! `{"hi": {"id": "10001", "ver": "0.14"}}`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod mock;
pub mod transport;

pub use mock::{MockServer, MockTransport};
pub use transport::{JsonLinesTransport, MessageChannel, Transport};

/// Key/value parameters attached to a control response
pub type Params = BTreeMap<String, Value>;

/// Handle correlating a request with its control response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound request, one variant per protocol verb
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMsg {
    Hi(ClientHi),
    Acc(ClientAcc),
    Login(ClientLogin),
    Sub(ClientSub),
    Leave(ClientLeave),
    Pub(ClientPub),
    Get(ClientGet),
    Set(ClientSet),
    Del(ClientDel),
    Note(ClientNote),
}

impl ClientMsg {
    /// Request id, absent for fire-and-forget notifications
    pub fn id(&self) -> Option<&str> {
        match self {
            ClientMsg::Hi(m) => Some(&m.id),
            ClientMsg::Acc(m) => Some(&m.id),
            ClientMsg::Login(m) => Some(&m.id),
            ClientMsg::Sub(m) => Some(&m.id),
            ClientMsg::Leave(m) => Some(&m.id),
            ClientMsg::Pub(m) => Some(&m.id),
            ClientMsg::Get(m) => Some(&m.id),
            ClientMsg::Set(m) => Some(&m.id),
            ClientMsg::Del(m) => Some(&m.id),
            ClientMsg::Note(_) => None,
        }
    }

    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMsg::Hi(_) => "hi",
            ClientMsg::Acc(_) => "acc",
            ClientMsg::Login(_) => "login",
            ClientMsg::Sub(_) => "sub",
            ClientMsg::Leave(_) => "leave",
            ClientMsg::Pub(_) => "pub",
            ClientMsg::Get(_) => "get",
            ClientMsg::Set(_) => "set",
            ClientMsg::Del(_) => "del",
            ClientMsg::Note(_) => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientHi {
    pub id: String,
    #[serde(rename = "ua")]
    pub user_agent: String,
    pub ver: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientAcc {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub scheme: String,
    #[serde(
        serialize_with = "base64_bytes::serialize",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub secret: Vec<u8>,
    pub login: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<SetDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientLogin {
    pub id: String,
    pub scheme: String,
    #[serde(serialize_with = "base64_bytes::serialize")]
    pub secret: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSub {
    pub id: String,
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<SetQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<GetQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientLeave {
    pub id: String,
    pub topic: Option<String>,
    pub unsub: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientPub {
    pub id: String,
    pub topic: Option<String>,
    #[serde(rename = "noecho")]
    pub no_echo: bool,
    /// JSON-encoded message body
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientGet {
    pub id: String,
    pub topic: Option<String>,
    #[serde(flatten)]
    pub query: GetQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSet {
    pub id: String,
    pub topic: String,
    #[serde(flatten)]
    pub query: SetQuery,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientDel {
    pub id: String,
    pub topic: Option<String>,
    pub what: DelWhat,
    #[serde(rename = "delseq", skip_serializing_if = "Vec::is_empty")]
    pub del_seq: Vec<DelQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub hard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientNote {
    pub topic: String,
    pub what: NoteWhat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetQuery {
    /// Space-separated list of metadata classes to fetch
    pub what: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SetQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<SetDesc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<SetSub>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SetDesc {
    #[serde(rename = "defacs", skip_serializing_if = "Option::is_none")]
    pub default_acs: Option<DefaultAcsMode>,
    /// Serialized vcard
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
}

impl SetDesc {
    pub fn is_empty(&self) -> bool {
        self.default_acs.is_none() && self.public.is_none() && self.private.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DefaultAcsMode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetSub {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DelWhat {
    Msg,
    Sub,
    Topic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteWhat {
    Kp,
    Read,
    Recv,
}

/// One entry of a message deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelQuery {
    SeqId(i64),
    Range(SeqRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeqRange {
    pub low: i64,
    pub hi: i64,
}

/// Inbound message from the server.
///
/// Payload kinds this client does not route are kept in `Unhandled` so they
/// can be reported without ending the session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawServerMsg")]
pub enum ServerMsg {
    Ctrl(ServerCtrl),
    Data(ServerData),
    Pres(ServerPres),
    Unhandled(Value),
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ServerCtrl {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: Params,
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ServerData {
    #[serde(default)]
    pub topic: String,
    #[serde(rename = "from", default)]
    pub from_user_id: String,
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub content: Value,
}

impl ServerData {
    /// Message body as text: JSON strings unwrapped, anything else rendered as JSON
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ServerPres {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub what: String,
}

#[derive(Deserialize)]
struct RawServerMsg {
    ctrl: Option<ServerCtrl>,
    data: Option<ServerData>,
    pres: Option<ServerPres>,
    #[serde(flatten)]
    rest: serde_json::Map<String, Value>,
}

impl From<RawServerMsg> for ServerMsg {
    fn from(raw: RawServerMsg) -> Self {
        if let Some(ctrl) = raw.ctrl {
            ServerMsg::Ctrl(ctrl)
        } else if let Some(data) = raw.data {
            ServerMsg::Data(data)
        } else if let Some(pres) = raw.pres {
            ServerMsg::Pres(pres)
        } else {
            ServerMsg::Unhandled(Value::Object(raw.rest))
        }
    }
}

/// Account lifecycle notification delivered to the bot's callback endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountEvent {
    #[serde(default)]
    pub action: AccountAction,
    #[serde(rename = "user", default)]
    pub user_id: String,
    #[serde(default)]
    pub public: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountAction {
    Create,
    Update,
    Delete,
    #[default]
    #[serde(other)]
    Unknown,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }
}
