use duelsweeper_core::{Coord, Coord2, GameState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::*;

/// Broadcast event names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// The freshly generated board, sent once by the first mover.
    Init,
    /// A mirrored reveal.
    Send,
    /// Active seconds of a side that has cleared the board.
    Judge,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Init, EventKind::Send, EventKind::Judge];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Send => "send",
            Self::Judge => "judge",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ProtocolError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| ProtocolError::UnknownEvent(name.to_owned()))
    }
}

/// A reveal action, the body of `send`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub row: Coord,
    pub col: Coord,
}

impl Move {
    pub const fn coords(self) -> Coord2 {
        (self.row, self.col)
    }
}

impl From<Coord2> for Move {
    fn from((row, col): Coord2) -> Self {
        Self { row, col }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct JudgePayload {
    counter: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProtocolMessage {
    Init(GameState),
    Send(Move),
    Judge { elapsed_seconds: u32 },
}

impl ProtocolMessage {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Init(_) => EventKind::Init,
            Self::Send(_) => EventKind::Send,
            Self::Judge { .. } => EventKind::Judge,
        }
    }

    pub fn to_payload(&self) -> Result<Value> {
        Ok(match self {
            Self::Init(state) => serde_json::to_value(state)?,
            Self::Send(mv) => serde_json::to_value(mv)?,
            Self::Judge { elapsed_seconds } => serde_json::to_value(JudgePayload {
                counter: *elapsed_seconds,
            })?,
        })
    }

    pub fn from_payload(kind: EventKind, payload: Value) -> Result<Self> {
        Ok(match kind {
            EventKind::Init => Self::Init(serde_json::from_value(payload)?),
            EventKind::Send => Self::Send(serde_json::from_value(payload)?),
            EventKind::Judge => {
                let JudgePayload { counter } = serde_json::from_value(payload)?;
                Self::Judge {
                    elapsed_seconds: counter,
                }
            }
        })
    }

    /// Decodes a broadcast by its event name.
    pub fn decode(event: &str, payload: Value) -> Result<Self> {
        Self::from_payload(event.parse()?, payload)
    }
}
