//! Minimal parsing of the Twitch IRC lines the bot cares about.

use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcLine {
    Ping(String),
    PrivMsg {
        username: String,
        channel: String,
        text: String,
    },
    Joined {
        username: String,
        channel: String,
    },
    Notice(String),
    /// The server is about to drop the connection and asks clients to reconnect.
    Reconnect,
    Other(String),
}

/// Parses one raw line. Returns `None` for blank or malformed lines.
pub fn parse_line(line: &str) -> Option<IrcLine> {
    let mut rest = line.trim_end_matches(['\r', '\n']);
    if rest.is_empty() {
        return None;
    }

    // Message tags are only present when requested; skip them if they are.
    if rest.starts_with('@') {
        rest = rest.split_once(' ')?.1;
    }

    let mut prefix = None;
    if let Some(stripped) = rest.strip_prefix(':') {
        let (p, r) = stripped.split_once(' ')?;
        prefix = Some(p);
        rest = r;
    }

    let (command, params) = rest.split_once(' ').unwrap_or((rest, ""));
    let line = match command {
        "PING" => IrcLine::Ping(params.trim_start_matches(':').to_string()),
        "PRIVMSG" => {
            let (channel, text) = params.split_once(" :")?;
            IrcLine::PrivMsg {
                username: nick(prefix?)?.to_string(),
                channel: channel.trim().trim_start_matches('#').to_string(),
                text: text.trim().to_string(),
            }
        }
        "JOIN" => IrcLine::Joined {
            username: nick(prefix?)?.to_string(),
            channel: params.trim().trim_start_matches('#').to_string(),
        },
        "NOTICE" => {
            let text = params.split_once(" :").map(|(_, t)| t).unwrap_or(params);
            IrcLine::Notice(text.to_string())
        }
        "RECONNECT" => IrcLine::Reconnect,
        other => IrcLine::Other(other.to_string()),
    };
    Some(line)
}

fn nick(prefix: &str) -> Option<&str> {
    let nick = prefix.split('!').next()?;
    (!nick.is_empty()).then_some(nick)
}

/// The lines that authenticate and join `channel`, in send order.
pub fn login_lines(nick: &str, token: &SecretString, channel: &str) -> Vec<String> {
    let token = token.expose_secret();
    let pass = if token.starts_with("oauth:") {
        format!("PASS {token}")
    } else {
        format!("PASS oauth:{token}")
    };
    vec![
        pass,
        format!("NICK {}", nick.to_lowercase()),
        format!("JOIN #{}", channel.to_lowercase()),
    ]
}

/// A single-line PRIVMSG. IRC cannot carry newlines, so they become spaces.
pub fn privmsg(channel: &str, text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("PRIVMSG #{} :{}", channel.to_lowercase(), flat)
}
