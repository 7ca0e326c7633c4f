use std::ffi::OsString;
use std::path::PathBuf;

pub use clap::Parser;

use crate::config::{self, ReconnectPolicy};

#[derive(Parser, Debug)]
#[command(name = "chatline", version, about = "Command line chat client", long_about = None)]
struct ClapArgs {
    /// Address of the chat server
    #[clap(long, default_value = config::DEFAULT_HOST)]
    host: String,

    /// Login using basic authentication username:password
    #[clap(long, value_name = "USER:PASSWORD")]
    login_basic: Option<String>,

    /// Login using token authentication
    #[clap(long, value_name = "TOKEN")]
    login_token: Option<String>,

    /// Read token from the cookie file and use it for authentication
    #[clap(long)]
    login_cookie: bool,

    /// Cookie file location, overrides CHATLINE_COOKIE_PATH
    #[clap(long, value_name = "PATH")]
    cookie: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommandLineArgs {
    host: String,
    login_basic: Option<String>,
    login_token: Option<String>,
    login_cookie: bool,
    cookie: Option<String>,
}

impl From<ClapArgs> for CommandLineArgs {
    fn from(args: ClapArgs) -> Self {
        Self {
            host: args.host,
            login_basic: args.login_basic,
            login_token: args.login_token,
            login_cookie: args.login_cookie,
            cookie: args.cookie,
        }
    }
}

impl CommandLineArgs {
    pub fn parse() -> Self {
        ClapArgs::parse().into()
    }

    pub fn parse_from<I, T>(itr: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        ClapArgs::parse_from(itr).into()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn login_basic(&self) -> Option<&str> {
        self.login_basic.as_deref()
    }

    pub fn login_token(&self) -> Option<&str> {
        self.login_token.as_deref()
    }

    pub fn login_cookie(&self) -> bool {
        self.login_cookie
    }

    /// Cookie file: the flag, then the environment, then the default
    pub fn cookie_path(&self) -> PathBuf {
        cookie_path(self.cookie.as_deref())
    }
}

fn cookie_path(flag: Option<&str>) -> PathBuf {
    match flag {
        Some(path) => config::expand_path(path),
        None => config::get_cookie_path(),
    }
}

#[derive(Parser, Debug)]
#[command(name = "chatline-bot", version, about = "Echo bot for the chat server", long_about = None)]
struct ClapBotArgs {
    /// Address of the chat server
    #[clap(long, default_value = config::DEFAULT_HOST)]
    host: String,

    /// Address the account-event endpoint listens on
    #[clap(long, default_value = config::DEFAULT_LISTEN)]
    listen: String,

    /// User name to log in with
    #[clap(long)]
    user: Option<String>,

    /// Password for the user
    #[clap(long, requires = "user")]
    password: Option<String>,

    /// Text put in front of every reply
    #[clap(long, default_value = config::DEFAULT_REPLY_PREFIX)]
    reply_prefix: String,

    /// Reconnect attempts after consecutive failures; a session that completes
    /// the handshake resets the count. 0 exits on first failure
    #[clap(long, default_value_t = 0)]
    reconnect: u32,

    /// Delay between reconnect attempts in milliseconds
    #[clap(long, default_value_t = 1000)]
    reconnect_delay_ms: u64,

    /// Persist login parameters to this cookie file
    #[clap(long, value_name = "PATH")]
    cookie: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BotCommandLineArgs {
    host: String,
    listen: String,
    user: Option<String>,
    password: Option<String>,
    reply_prefix: String,
    reconnect: ReconnectPolicy,
    cookie: Option<String>,
}

impl From<ClapBotArgs> for BotCommandLineArgs {
    fn from(args: ClapBotArgs) -> Self {
        Self {
            host: args.host,
            listen: args.listen,
            user: args.user,
            password: args.password,
            reply_prefix: args.reply_prefix,
            reconnect: ReconnectPolicy::from_args(args.reconnect, args.reconnect_delay_ms),
            cookie: args.cookie,
        }
    }
}

impl BotCommandLineArgs {
    pub fn parse() -> Self {
        ClapBotArgs::parse().into()
    }

    pub fn parse_from<I, T>(itr: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        ClapBotArgs::parse_from(itr).into()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn listen(&self) -> &str {
        &self.listen
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn reply_prefix(&self) -> &str {
        &self.reply_prefix
    }

    pub fn reconnect(&self) -> ReconnectPolicy {
        self.reconnect
    }

    /// Cookie file, only when asked for on the command line
    pub fn cookie_path(&self) -> Option<PathBuf> {
        self.cookie.as_deref().map(config::expand_path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_values() {
        let args = CommandLineArgs::parse_from(["chatline"]);
        assert_eq!(args.host(), "localhost:6061");
        assert_eq!(args.login_basic(), None);
        assert_eq!(args.login_token(), None);
        assert!(!args.login_cookie());
    }

    #[test]
    fn test_parse_login_flags() {
        let args = CommandLineArgs::parse_from([
            "chatline",
            "--host",
            "chat.example.com:16060",
            "--login-basic",
            "alice:pw",
            "--login-token",
            "abc",
            "--login-cookie",
        ]);
        assert_eq!(args.host(), "chat.example.com:16060");
        assert_eq!(args.login_basic(), Some("alice:pw"));
        assert_eq!(args.login_token(), Some("abc"));
        assert!(args.login_cookie());
    }

    #[test]
    fn test_cookie_flag_overrides_location() {
        let args = CommandLineArgs::parse_from(["chatline", "--cookie", "/tmp/my-cookie"]);
        assert_eq!(args.cookie_path(), PathBuf::from("/tmp/my-cookie"));
    }

    #[test]
    fn test_bot_defaults() {
        let args = BotCommandLineArgs::parse_from(["chatline-bot"]);
        assert_eq!(args.host(), "localhost:6061");
        assert_eq!(args.listen(), "0.0.0.0:40051");
        assert_eq!(args.user(), None);
        assert_eq!(args.reply_prefix(), "I hear you: ");
        assert_eq!(args.reconnect(), ReconnectPolicy::Exit);
        assert_eq!(args.cookie_path(), None);
    }

    #[test]
    fn test_bot_reconnect_flags() {
        let args = BotCommandLineArgs::parse_from([
            "chatline-bot",
            "--user",
            "elf",
            "--password",
            "pw",
            "--reconnect",
            "3",
            "--reconnect-delay-ms",
            "250",
        ]);
        assert_eq!(args.user(), Some("elf"));
        assert_eq!(args.password(), Some("pw"));
        assert_eq!(
            args.reconnect(),
            ReconnectPolicy::Retry {
                attempts: 3,
                delay: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn test_clap_definitions() {
        use clap::CommandFactory;
        ClapArgs::command().debug_assert();
        ClapBotArgs::command().debug_assert();
    }
}
