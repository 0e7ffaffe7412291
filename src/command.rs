//! Inbound command parsing
//!
//! Turns one decoded, trimmed input unit into a typed command. Client units
//! are chat text unless they start with the `/` sigil; operator units on the
//! admin console are always commands. Verbs are matched case-insensitively.
//! Malformed arguments degrade to a usage notice, never an error.

/// Usage notice for an incomplete `/whisper`
pub const WHISPER_USAGE: &str = "Usage: /whisper <user> <message>";

/// Usage notice for an incomplete `/sysmsg`
pub const SYSMSG_USAGE: &str = "Usage: /sysmsg <message>";

/// One parsed unit received from a client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Plain chat text, relayed to everyone else
    Chat(String),
    /// `/list` - names of all connected sessions
    List,
    /// `/whisper <target> <text>` - private message to one named session
    Whisper { target: String, text: String },
    /// `/help` - static command list
    Help,
    /// `/exit` - end this session
    Exit,
    /// A `/` unit whose arguments are missing or incomplete
    Malformed { usage: &'static str },
    /// A `/` unit with an unrecognized verb (lower-cased)
    Unknown(String),
}

impl ClientCommand {
    /// Parse one trimmed inbound unit
    pub fn parse(unit: &str) -> Self {
        let Some(command) = unit.strip_prefix('/') else {
            return ClientCommand::Chat(unit.to_string());
        };

        let (verb, arg) = split_verb(command);

        match verb.to_lowercase().as_str() {
            "list" => ClientCommand::List,
            "help" => ClientCommand::Help,
            "exit" => ClientCommand::Exit,
            "whisper" => parse_whisper(arg),
            other => ClientCommand::Unknown(other.to_string()),
        }
    }
}

/// One parsed unit read from the operator console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// `/list` - print connected names locally
    List,
    /// `/sysmsg <text>` - broadcast a server announcement to everyone
    Sysmsg(String),
    /// `/exit` or `/shutdown` - stop the server
    Shutdown,
    /// A unit whose arguments are missing or incomplete
    Malformed { usage: &'static str },
    /// Anything unrecognized, including non-command text
    Unknown(String),
}

impl AdminCommand {
    /// Parse one trimmed console line; `None` for an empty line
    pub fn parse(line: &str) -> Option<Self> {
        if line.is_empty() {
            return None;
        }

        let Some(command) = line.strip_prefix('/') else {
            let (word, _) = split_verb(line);
            return Some(AdminCommand::Unknown(word.to_string()));
        };

        let (verb, arg) = split_verb(command);

        let parsed = match verb.to_lowercase().as_str() {
            "list" => AdminCommand::List,
            "sysmsg" => {
                let text = arg.trim();
                if text.is_empty() {
                    AdminCommand::Malformed {
                        usage: SYSMSG_USAGE,
                    }
                } else {
                    AdminCommand::Sysmsg(text.to_string())
                }
            }
            "exit" | "shutdown" => AdminCommand::Shutdown,
            other => AdminCommand::Unknown(other.to_string()),
        };
        Some(parsed)
    }
}

/// Split a unit at the first whitespace: verb and the untouched remainder
fn split_verb(unit: &str) -> (&str, &str) {
    match unit.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest),
        None => (unit, ""),
    }
}

fn parse_whisper(arg: &str) -> ClientCommand {
    let arg = arg.trim();
    let Some((target, text)) = arg.split_once(char::is_whitespace) else {
        // No target at all, or a target with no message
        return ClientCommand::Malformed {
            usage: WHISPER_USAGE,
        };
    };

    let text = text.trim();
    if text.is_empty() {
        return ClientCommand::Malformed {
            usage: WHISPER_USAGE,
        };
    }

    ClientCommand::Whisper {
        target: target.to_string(),
        text: text.to_string(),
    }
}
