//! Wire contract between the two peers of a room: presence records and the `init`, `send` and
//! `judge` broadcast payloads.

pub use error::*;
pub use message::*;
pub use presence::*;

mod error;
mod message;
mod presence;
