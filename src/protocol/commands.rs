//! Typed commands extracted from decoded RESP frames
//!
//! A request is either a single bulk string (bare verb) or an array whose
//! first element is the verb. Verb matching is case-insensitive. Anything
//! that fails to extract here severs the connection; no error is ever
//! encoded back onto the wire.

use crate::core::errors::{ServerError, ServerResult};
use crate::protocol::value::RespValue;

/// A fully parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PING`
    Ping,
    /// `ECHO <arg>`
    Echo(Vec<u8>),
    /// `SET <key> <value> [PX <millis>]`
    Set {
        key: String,
        value: Vec<u8>,
        expire_ms: Option<i64>,
    },
    /// `GET <key>`
    Get(String),
    /// `KEYS <pattern>`
    Keys(String),
    /// `CONFIG GET <name>`
    ConfigGet(String),
    /// `INFO [section]`
    Info,
}

impl Command {
    /// Extract a command from a decoded request frame
    pub fn from_resp(request: RespValue) -> ServerResult<Self> {
        let items = match request {
            RespValue::BulkString(Some(verb)) => vec![RespValue::BulkString(Some(verb))],
            RespValue::Array(Some(items)) if !items.is_empty() => items,
            other => {
                return Err(ServerError::command(format!(
                    "Request must be a bulk string or non-empty array, got {:?}",
                    other
                )));
            }
        };

        let verb = bulk_text(&items[0], "verb")?;
        let args = &items[1..];

        match verb.to_ascii_uppercase().as_str() {
            "PING" => {
                expect_arity(args, 0, "PING")?;
                Ok(Command::Ping)
            }
            "ECHO" => {
                expect_arity(args, 1, "ECHO")?;
                Ok(Command::Echo(bulk_bytes(&args[0], "ECHO argument")?))
            }
            "SET" => Self::parse_set(args),
            "GET" => {
                expect_arity(args, 1, "GET")?;
                Ok(Command::Get(bulk_text(&args[0], "GET key")?))
            }
            "KEYS" => {
                expect_arity(args, 1, "KEYS")?;
                Ok(Command::Keys(bulk_text(&args[0], "KEYS pattern")?))
            }
            "CONFIG" => {
                expect_arity(args, 2, "CONFIG")?;
                let subcommand = bulk_text(&args[0], "CONFIG subcommand")?;
                if !subcommand.eq_ignore_ascii_case("GET") {
                    return Err(ServerError::command(format!(
                        "Unsupported CONFIG subcommand: {}",
                        subcommand
                    )));
                }
                Ok(Command::ConfigGet(bulk_text(&args[1], "CONFIG parameter")?))
            }
            "INFO" => {
                if args.len() > 1 {
                    return Err(ServerError::command("INFO takes at most one section"));
                }
                if let Some(section) = args.first() {
                    let section = bulk_text(section, "INFO section")?;
                    if !section.eq_ignore_ascii_case("replication") {
                        return Err(ServerError::command(format!(
                            "Unsupported INFO section: {}",
                            section
                        )));
                    }
                }
                Ok(Command::Info)
            }
            other => Err(ServerError::command(format!("Unknown command: {}", other))),
        }
    }

    /// `SET` accepts exactly `key value` or `key value PX millis`
    fn parse_set(args: &[RespValue]) -> ServerResult<Self> {
        if args.len() != 2 && args.len() != 4 {
            return Err(ServerError::command(format!(
                "SET expects 2 or 4 arguments, got {}",
                args.len()
            )));
        }

        let key = bulk_text(&args[0], "SET key")?;
        let value = bulk_bytes(&args[1], "SET value")?;

        let expire_ms = if args.len() == 4 {
            let keyword = bulk_text(&args[2], "SET option")?;
            if !keyword.eq_ignore_ascii_case("PX") {
                return Err(ServerError::command(format!(
                    "Unsupported SET option: {}",
                    keyword
                )));
            }
            // the PX argument arrives as a bulk string and must parse as i64
            let millis = bulk_text(&args[3], "PX milliseconds")?;
            let millis: i64 = millis.parse().map_err(|_| {
                ServerError::command(format!("PX milliseconds is not an integer: {}", millis))
            })?;
            Some(millis)
        } else {
            None
        };

        Ok(Command::Set {
            key,
            value,
            expire_ms,
        })
    }
}

fn bulk_bytes(value: &RespValue, what: &str) -> ServerResult<Vec<u8>> {
    match value {
        RespValue::BulkString(Some(bytes)) => Ok(bytes.clone()),
        other => Err(ServerError::command(format!(
            "{} must be a bulk string, got {:?}",
            what, other
        ))),
    }
}

fn bulk_text(value: &RespValue, what: &str) -> ServerResult<String> {
    let bytes = bulk_bytes(value, what)?;
    String::from_utf8(bytes)
        .map_err(|_| ServerError::command(format!("{} is not valid UTF-8", what)))
}

fn expect_arity(args: &[RespValue], expected: usize, verb: &str) -> ServerResult<()> {
    if args.len() != expected {
        return Err(ServerError::command(format!(
            "{} expects {} argument(s), got {}",
            verb,
            expected,
            args.len()
        )));
    }
    Ok(())
}
