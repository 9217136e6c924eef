use std::path::PathBuf;

use crate::error::SessionError;

/// One line of user input, already classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Chat(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Exit,
    Pwd,
    Ls(Option<PathBuf>),
    Tree(Option<PathBuf>),
    Cat(PathBuf),
    Write(PathBuf),
    Append(PathBuf),
    Cd(PathBuf),
    Mkdir(PathBuf),
    Config(ConfigOp),
    Context(Option<PathBuf>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOp {
    Set { key: String, value: String },
    List,
    Show,
}

/// Splits a raw line into a command or plain chat text. Only lines whose
/// first non-whitespace character is `/` are treated as commands; everything
/// else goes to the assistant verbatim.
pub fn classify(line: &str) -> Result<Input, SessionError> {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Ok(Input::Chat(trimmed.to_string()));
    }
    parse_command(trimmed).map(Input::Command)
}

fn parse_command(line: &str) -> Result<Command, SessionError> {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Err(SessionError::usage("empty command"));
    };
    let rest: Vec<&str> = parts.collect();

    match cmd {
        "/help" => zero_args(cmd, &rest, Command::Help),
        "/exit" | "/quit" => zero_args(cmd, &rest, Command::Exit),
        "/pwd" | "/cwd" => zero_args(cmd, &rest, Command::Pwd),
        "/ls" => Ok(Command::Ls(optional_path(&rest))),
        "/tree" => Ok(Command::Tree(optional_path(&rest))),
        "/cat" => Ok(Command::Cat(required_path(cmd, "<file>", &rest)?)),
        "/write" => Ok(Command::Write(required_path(cmd, "<file>", &rest)?)),
        "/append" => Ok(Command::Append(required_path(cmd, "<file>", &rest)?)),
        "/cd" => Ok(Command::Cd(required_path(cmd, "<dir>", &rest)?)),
        "/mkdir" => Ok(Command::Mkdir(required_path(cmd, "<dir>", &rest)?)),
        "/config" => parse_config(&rest),
        "/context" | "/#" => Ok(Command::Context(optional_path(&rest))),
        other => Err(SessionError::usage(format!(
            "unknown command: {other} (type /help for commands)"
        ))),
    }
}

fn zero_args(cmd: &str, rest: &[&str], out: Command) -> Result<Command, SessionError> {
    if rest.is_empty() {
        Ok(out)
    } else {
        Err(SessionError::usage(format!("usage: {cmd}")))
    }
}

fn optional_path(rest: &[&str]) -> Option<PathBuf> {
    if rest.is_empty() {
        None
    } else {
        Some(PathBuf::from(rest.join(" ")))
    }
}

fn required_path(cmd: &str, arg: &str, rest: &[&str]) -> Result<PathBuf, SessionError> {
    if rest.is_empty() {
        return Err(SessionError::usage(format!("usage: {cmd} {arg}")));
    }
    Ok(PathBuf::from(rest.join(" ")))
}

fn parse_config(rest: &[&str]) -> Result<Command, SessionError> {
    match rest.first().copied() {
        Some("set") => {
            if rest.len() < 3 {
                return Err(SessionError::usage("usage: /config set <key> <value>"));
            }
            Ok(Command::Config(ConfigOp::Set {
                key: rest[1].to_string(),
                value: rest[2..].join(" "),
            }))
        }
        Some("list") => zero_args("/config list", &rest[1..], Command::Config(ConfigOp::List)),
        Some("show") => zero_args("/config show", &rest[1..], Command::Config(ConfigOp::Show)),
        Some(other) => Err(SessionError::usage(format!(
            "unknown config action: {other} (expected set, list, or show)"
        ))),
        None => Err(SessionError::usage("usage: /config <set|list|show>")),
    }
}
