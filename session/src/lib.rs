//! Turn synchronization for two-player matches: presence-based turn order, mirrored moves over
//! a broadcast channel, and the judge handshake that settles who cleared the board faster.

pub use channel::*;
pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use memory::*;
pub use modal::*;
pub use session::*;
pub use timer::*;

mod channel;
mod config;
mod coordinator;
mod error;
mod memory;
mod modal;
mod session;
mod timer;
