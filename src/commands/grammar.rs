//! Per-verb argument grammars.
//!
//! Each verb is a small clap parser. Positional arguments that also have a
//! named flag are declared twice and merged on conversion; the flag wins.

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, ValueEnum};

use super::{
    AccountCommand, DeleteCommand, DeleteTarget, GetCommand, LeaveCommand, LoginCommand,
    NoteCommand, NoteKind, PublishCommand, SetCommand, SubscribeCommand,
};
use crate::error::ClientError;

/// Profile options shared by `acc`, `sub` and `set`
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileArgs {
    /// Human-readable name
    #[arg(long = "fn", value_name = "NAME")]
    pub full_name: Option<String>,
    /// Avatar file name
    #[arg(long, value_name = "FILE")]
    pub photo: Option<String>,
    /// Private info
    #[arg(long)]
    pub private: Option<String>,
    /// Default access mode for authenticated users
    #[arg(long)]
    pub auth: Option<String>,
    /// Default access mode for anonymous users
    #[arg(long)]
    pub anon: Option<String>,
}

/// Parse `tokens` (verb first) with grammar `T`, rendering clap's own
/// usage or error text on failure
pub(super) fn parse_args<T: Parser>(tokens: &[String]) -> Result<T, ClientError> {
    T::try_parse_from(tokens).map_err(|e| ClientError::CommandSyntax(e.render().to_string()))
}

fn invalid_value<T: CommandFactory>(message: String) -> ClientError {
    let mut command = T::command();
    ClientError::CommandSyntax(command.error(ErrorKind::InvalidValue, message).render().to_string())
}

#[derive(Parser, Debug)]
#[command(name = "acc", about = "Create or alter an account")]
pub(super) struct AccArgs {
    /// ID of the account to update
    #[arg(long)]
    user: Option<String>,
    /// Authentication scheme
    #[arg(long, default_value = "basic")]
    scheme: String,
    /// Secret for authentication
    #[arg(long)]
    secret: Option<String>,
    /// User name for basic authentication
    #[arg(long)]
    uname: Option<String>,
    /// Password for basic authentication
    #[arg(long)]
    password: Option<String>,
    /// Login with the newly created account
    #[arg(long)]
    do_login: bool,
    /// Tags for user discovery, comma separated list without spaces
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,
    #[command(flatten)]
    profile: ProfileArgs,
}

impl From<AccArgs> for AccountCommand {
    fn from(args: AccArgs) -> Self {
        Self {
            user: args.user,
            scheme: args.scheme,
            secret: args.secret,
            uname: args.uname,
            password: args.password,
            do_login: args.do_login,
            tags: args.tags,
            profile: args.profile,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "login", about = "Authenticate current session")]
pub(super) struct LoginArgs {
    /// Secret for authentication
    #[arg(value_name = "SECRET")]
    secret_arg: Option<String>,
    /// Secret for authentication
    #[arg(long)]
    secret: Option<String>,
    /// Authentication scheme
    #[arg(long, default_value = "basic")]
    scheme: String,
    /// User name for basic authentication
    #[arg(long)]
    uname: Option<String>,
    /// Password for basic authentication
    #[arg(long)]
    password: Option<String>,
}

impl From<LoginArgs> for LoginCommand {
    fn from(args: LoginArgs) -> Self {
        Self {
            scheme: args.scheme,
            secret: args.secret.or(args.secret_arg),
            uname: args.uname,
            password: args.password,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sub", about = "Subscribe to topic")]
pub(super) struct SubArgs {
    /// Topic to subscribe to
    #[arg(value_name = "TOPIC")]
    topic_arg: Option<String>,
    /// Topic to subscribe to
    #[arg(long)]
    topic: Option<String>,
    #[command(flatten)]
    profile: ProfileArgs,
    /// Query for topic metadata or messages
    #[arg(long)]
    get_query: Option<String>,
}

impl From<SubArgs> for SubscribeCommand {
    fn from(args: SubArgs) -> Self {
        Self {
            topic: args.topic.or(args.topic_arg),
            profile: args.profile,
            get_query: args.get_query,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "leave", about = "Detach or unsubscribe from topic")]
pub(super) struct LeaveArgs {
    /// Topic to detach from
    #[arg(value_name = "TOPIC")]
    topic_arg: Option<String>,
    /// Topic to detach from
    #[arg(long)]
    topic: Option<String>,
    /// Detach and unsubscribe from topic
    #[arg(long)]
    unsub: bool,
}

impl From<LeaveArgs> for LeaveCommand {
    fn from(args: LeaveArgs) -> Self {
        Self {
            topic: args.topic.or(args.topic_arg),
            unsub: args.unsub,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pub", about = "Send message to topic")]
pub(super) struct PubArgs {
    /// Topic to publish to
    #[arg(value_name = "TOPIC")]
    topic_arg: Option<String>,
    /// Message to send
    #[arg(value_name = "CONTENT")]
    content_arg: Option<String>,
    /// Topic to publish to
    #[arg(long)]
    topic: Option<String>,
    /// Message to send
    #[arg(long)]
    content: Option<String>,
}

impl From<PubArgs> for PublishCommand {
    fn from(args: PubArgs) -> Self {
        Self {
            topic: args.topic.or(args.topic_arg),
            content: args.content.or(args.content_arg),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "get", about = "Query topic for messages or metadata")]
pub(super) struct GetArgs {
    /// Topic to query
    #[arg(value_name = "TOPIC")]
    topic_arg: Option<String>,
    /// Topic to query
    #[arg(long)]
    topic: Option<String>,
    /// Query topic description
    #[arg(long)]
    desc: bool,
    /// Query topic subscriptions
    #[arg(long)]
    sub: bool,
    /// Query topic messages
    #[arg(long)]
    data: bool,
}

impl From<GetArgs> for GetCommand {
    fn from(args: GetArgs) -> Self {
        Self {
            topic: args.topic.or(args.topic_arg),
            desc: args.desc,
            sub: args.sub,
            data: args.data,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "set", about = "Update topic metadata")]
pub(super) struct SetArgs {
    /// Topic to update
    topic: String,
    #[command(flatten)]
    profile: ProfileArgs,
    /// ID of the account to update
    #[arg(long)]
    user: Option<String>,
    /// New value of access mode
    #[arg(long)]
    mode: Option<String>,
}

impl From<SetArgs> for SetCommand {
    fn from(args: SetArgs) -> Self {
        Self {
            topic: args.topic,
            profile: args.profile,
            user: args.user,
            mode: args.mode,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "del",
    about = "Delete message(s), subscription or topic",
    override_usage = "del [TOPIC] [msg|sub|topic] [--user <USER> | --list <LIST>] [--hard]"
)]
pub(super) struct DelArgs {
    /// Topic being affected, or what to delete when given alone
    #[arg(value_name = "TOPIC")]
    first: Option<String>,
    /// What to delete: msg, sub or topic
    #[arg(value_name = "WHAT")]
    second: Option<String>,
    /// Topic being affected
    #[arg(long)]
    topic: Option<String>,
    /// Delete subscription with the given user id
    #[arg(long, conflicts_with = "list")]
    user: Option<String>,
    /// Comma separated list of message IDs to delete
    #[arg(long)]
    list: Option<String>,
    /// Hard-delete messages
    #[arg(long)]
    hard: bool,
}

impl DelArgs {
    pub(super) fn into_command(self) -> Result<DeleteCommand, ClientError> {
        let (topic_arg, what) = match (self.first, self.second) {
            (Some(topic), Some(what)) => (Some(topic), Some(what)),
            (what, None) => (None, what),
            (None, Some(what)) => (None, Some(what)),
        };
        let what = match what {
            Some(raw) => DeleteTarget::from_str(&raw, false).map_err(|_| {
                invalid_value::<DelArgs>(format!(
                    "invalid value '{raw}' for [WHAT]: choose from msg, sub, topic"
                ))
            })?,
            None => DeleteTarget::Msg,
        };
        Ok(DeleteCommand {
            topic: self.topic.or(topic_arg),
            what,
            param: self.user.or(self.list),
            hard: self.hard,
        })
    }
}

#[derive(Parser, Debug)]
#[command(name = "note", about = "Send notification to topic, ex \"note kp\"")]
pub(super) struct NoteArgs {
    /// Topic to notify
    topic: String,
    /// Notification type
    #[arg(value_enum, default_value_t = NoteKind::Kp)]
    what: NoteKind,
    /// Value being reported
    #[arg(long)]
    seq: Option<String>,
}

impl From<NoteArgs> for NoteCommand {
    fn from(args: NoteArgs) -> Self {
        Self {
            topic: args.topic,
            what: args.what,
            seq: args.seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammars_should_pass_clap_debug_asserts() {
        AccArgs::command().debug_assert();
        LoginArgs::command().debug_assert();
        SubArgs::command().debug_assert();
        LeaveArgs::command().debug_assert();
        PubArgs::command().debug_assert();
        GetArgs::command().debug_assert();
        SetArgs::command().debug_assert();
        DelArgs::command().debug_assert();
        NoteArgs::command().debug_assert();
    }
}
