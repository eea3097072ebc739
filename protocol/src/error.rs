use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unknown broadcast event {0:?}")]
    UnknownEvent(String),
    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
