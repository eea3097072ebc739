use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// What each peer tracks on the room's presence channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub user: Uuid,
    /// Join time, milliseconds since the Unix epoch.
    pub create_at: i64,
}

impl PresenceRecord {
    pub const fn new(user: Uuid, create_at: i64) -> Self {
        Self { user, create_at }
    }

    /// Presence key this record is published under.
    pub fn key(&self) -> String {
        self.user.to_string()
    }
}

/// Snapshot of a room's presence, presence key to the records published under it.
pub type PresenceState = BTreeMap<String, Vec<PresenceRecord>>;
