use duelsweeper_core::GameError;
use duelsweeper_protocol::ProtocolError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel is not subscribed")]
    NotSubscribed,
    #[error("Channel is already subscribed")]
    AlreadySubscribed,
    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Room is already full")]
    RoomFull,
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Game(#[from] GameError),
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
