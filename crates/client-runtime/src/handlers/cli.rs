//! # Console Commands
//!
//! One line of stdin per command:
//!
//! ```text
//! create <name>          createRoom
//! enter <room> <name>    enterRoom
//! move <x> <y>           move (client coordinates)
//! rooms                  list rooms
//! players                list occupants of the current room (from the ledger)
//! state                  print the local entity store
//! metrics                print Prometheus metrics
//! help
//! quit | exit
//! ```

use shared_types::{RoomId, U256};
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "commands: create <name> | enter <room> <name> | move <x> <y> | rooms | players | state | metrics | help | quit";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Create { name: String },
    Enter { room: RoomId, name: String },
    Move { x: f64, y: f64 },
    Rooms,
    Players,
    State,
    Metrics,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
}

impl FromStr for ClientCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

        match verb.to_lowercase().as_str() {
            "" => Err(CommandParseError::Empty),
            "create" => {
                if rest.is_empty() {
                    return Err(CommandParseError::Usage("create <name>"));
                }
                Ok(Self::Create {
                    name: rest.to_string(),
                })
            }
            "enter" => {
                let (room, name) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(CommandParseError::Usage("enter <room> <name>"))?;
                let room = U256::from_dec_str(room)
                    .map_err(|_| CommandParseError::InvalidNumber(room.to_string()))?;
                Ok(Self::Enter {
                    room,
                    name: name.trim().to_string(),
                })
            }
            "move" => {
                let mut parts = rest.split_whitespace();
                let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
                    return Err(CommandParseError::Usage("move <x> <y>"));
                };
                Ok(Self::Move {
                    x: parse_f64(x)?,
                    y: parse_f64(y)?,
                })
            }
            "rooms" => Ok(Self::Rooms),
            "players" => Ok(Self::Players),
            "state" => Ok(Self::State),
            "metrics" => Ok(Self::Metrics),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}

fn parse_f64(s: &str) -> Result<f64, CommandParseError> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandParseError::InvalidNumber(s.to_string()))
}
