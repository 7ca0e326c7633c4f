//! # Command Parser
//!
//! Turns one line of interactive input into a typed [`Command`]. The line is
//! split into shell-like tokens; the first token picks the verb grammar.
//!
//! Parse failures are [`ClientError::CommandSyntax`] values carrying the text
//! to show the user. The caller prints it and keeps reading input.

use clap::ValueEnum;

use crate::error::ClientError;

mod grammar;

pub use grammar::ProfileArgs;

use grammar::{
    parse_args, AccArgs, DelArgs, GetArgs, LeaveArgs, LoginArgs, NoteArgs, PubArgs, SetArgs,
    SubArgs,
};

/// Listing shown for an unrecognized verb
pub const USAGE: &str = "\
Possible commands:
\tacc\t- create account
\tlogin\t- authenticate
\tsub\t- subscribe to topic
\tleave\t- detach or unsubscribe from topic
\tpub\t- post message to topic
\tget\t- query topic for metadata or messages
\tset\t- update topic metadata
\tdel\t- delete message(s), topic or subscription
\tnote\t- send notification

\tType <command> -h for help";

/// One parsed interactive command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Account(AccountCommand),
    Login(LoginCommand),
    Subscribe(SubscribeCommand),
    Leave(LeaveCommand),
    Publish(PublishCommand),
    Get(GetCommand),
    Set(SetCommand),
    Delete(DeleteCommand),
    Note(NoteCommand),
}

impl Command {
    /// Verb the command was parsed from
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Account(_) => "acc",
            Command::Login(_) => "login",
            Command::Subscribe(_) => "sub",
            Command::Leave(_) => "leave",
            Command::Publish(_) => "pub",
            Command::Get(_) => "get",
            Command::Set(_) => "set",
            Command::Delete(_) => "del",
            Command::Note(_) => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCommand {
    pub user: Option<String>,
    pub scheme: String,
    pub secret: Option<String>,
    pub uname: Option<String>,
    pub password: Option<String>,
    pub do_login: bool,
    pub tags: Vec<String>,
    pub profile: ProfileArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCommand {
    pub scheme: String,
    pub secret: Option<String>,
    pub uname: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeCommand {
    pub topic: Option<String>,
    pub profile: ProfileArgs,
    pub get_query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveCommand {
    pub topic: Option<String>,
    pub unsub: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCommand {
    pub topic: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCommand {
    pub topic: Option<String>,
    pub desc: bool,
    pub sub: bool,
    pub data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCommand {
    pub topic: String,
    pub profile: ProfileArgs,
    pub user: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCommand {
    pub topic: Option<String>,
    pub what: DeleteTarget,
    /// User id (`--user`) or message id list (`--list`)
    pub param: Option<String>,
    pub hard: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCommand {
    pub topic: String,
    pub what: NoteKind,
    /// Raw sequence number, validated when the request is built
    pub seq: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeleteTarget {
    Msg,
    Sub,
    Topic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NoteKind {
    Kp,
    Read,
    Recv,
}

/// True for the tokens that end an interactive session
pub fn is_exit_sentinel(line: &str) -> bool {
    matches!(line.trim(), "exit" | "quit")
}

/// Parse one line of input into a command
pub fn parse(line: &str) -> Result<Command, ClientError> {
    let tokens = shell_words::split(line)
        .map_err(|e| ClientError::CommandSyntax(format!("Cannot parse '{line}': {e}")))?;
    let Some(verb) = tokens.first() else {
        return Err(ClientError::CommandSyntax(USAGE.to_string()));
    };

    let command = match verb.as_str() {
        "acc" => Command::Account(parse_args::<AccArgs>(&tokens)?.into()),
        "login" => Command::Login(parse_args::<LoginArgs>(&tokens)?.into()),
        "sub" => Command::Subscribe(parse_args::<SubArgs>(&tokens)?.into()),
        "leave" => Command::Leave(parse_args::<LeaveArgs>(&tokens)?.into()),
        "pub" => Command::Publish(parse_args::<PubArgs>(&tokens)?.into()),
        "get" => Command::Get(parse_args::<GetArgs>(&tokens)?.into()),
        "set" => Command::Set(parse_args::<SetArgs>(&tokens)?.into()),
        "del" => Command::Delete(parse_args::<DelArgs>(&tokens)?.into_command()?),
        "note" => Command::Note(parse_args::<NoteArgs>(&tokens)?.into()),
        other => {
            tracing::debug!("Unrecognized verb '{other}'");
            return Err(ClientError::CommandSyntax(format!(
                "Unrecognized: {other}\n{USAGE}"
            )));
        }
    };

    tracing::debug!("Parsed '{}' command", command.verb());
    Ok(command)
}
