use core::time::Duration;
use duelsweeper_core::GameState;
use duelsweeper_protocol::{Move, PresenceRecord, PresenceState, ProtocolMessage};
use rand::Rng;
use uuid::Uuid;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OnlineStatus {
    /// No opponent yet
    #[default]
    Wait,
    Connect,
    /// The opponent left; the match cannot continue.
    Disconnect,
}

/// What an inbound channel event meant for the match.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    OpponentJoined { my_turn: bool },
    OpponentLeft,
    Init(GameState),
    Move(Move),
    Judge(u32),
}

/// Fresh presence record: random participant id, joined now.
pub fn join_record<R: Rng + ?Sized>(rng: &mut R) -> PresenceRecord {
    let user = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
    let create_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_millis() as i64);
    PresenceRecord::new(user, create_at)
}

/// One participant's view of a room: who is here, whose turn it is, and the last message of each
/// kind received from the opponent.
#[derive(Debug)]
pub struct RealtimeSession<C, S> {
    channel: C,
    sleeper: S,
    config: SessionConfig,
    me: PresenceRecord,
    opponent_key: Option<String>,
    turn: Option<bool>,
    moves_first: bool,
    online: OnlineStatus,
    judge_sent: bool,
    closed: bool,
    opponent_init: Option<GameState>,
    opponent_move: Option<Move>,
    opponent_judge: Option<u32>,
}

impl<C: Channel, S: Sleeper> RealtimeSession<C, S> {
    pub fn new(channel: C, sleeper: S, config: SessionConfig, me: PresenceRecord) -> Self {
        Self {
            channel,
            sleeper,
            config,
            me,
            opponent_key: None,
            turn: None,
            moves_first: false,
            online: OnlineStatus::Wait,
            judge_sent: false,
            closed: false,
            opponent_init: None,
            opponent_move: None,
            opponent_judge: None,
        }
    }

    /// Subscribes to the room. Presence is tracked once the transport confirms the subscription.
    pub fn connect(&mut self) -> Result<C::Events> {
        log::debug!("Joining room {} as {}", self.config.room_id, self.me.user);
        Ok(self.channel.subscribe()?)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn me(&self) -> &PresenceRecord {
        &self.me
    }

    pub fn user(&self) -> Uuid {
        self.me.user
    }

    pub fn opponent_key(&self) -> Option<&str> {
        self.opponent_key.as_deref()
    }

    /// `None` until an opponent has joined.
    pub fn turn(&self) -> Option<bool> {
        self.turn
    }

    pub fn is_my_turn(&self) -> bool {
        self.turn == Some(true)
    }

    /// Whether join order made this side the first mover, the only one that generates the board.
    pub fn moves_first(&self) -> bool {
        self.moves_first
    }

    pub fn online(&self) -> OnlineStatus {
        self.online
    }

    pub fn judge_sent(&self) -> bool {
        self.judge_sent
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn opponent_init(&self) -> Option<&GameState> {
        self.opponent_init.as_ref()
    }

    pub fn opponent_move(&self) -> Option<Move> {
        self.opponent_move
    }

    pub fn opponent_judge(&self) -> Option<u32> {
        self.opponent_judge
    }

    pub fn presence(&self) -> PresenceState {
        self.channel.presence_state()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn status_line(&self) -> &'static str {
        match self.online {
            OnlineStatus::Disconnect => "disconnect",
            OnlineStatus::Wait => "Looking for...",
            OnlineStatus::Connect if self.is_my_turn() => "Your turn",
            OnlineStatus::Connect => "Opponent turn",
        }
    }

    pub fn handle(&mut self, event: ChannelEvent) -> Result<Option<Inbound>> {
        if self.closed {
            log::trace!("Dropping {:?} after close", event);
            return Ok(None);
        }

        match event {
            ChannelEvent::Status(SubscriptionStatus::Subscribed) => {
                self.channel.track(self.me)?;
                Ok(None)
            }
            ChannelEvent::Status(status) => {
                log::debug!("Channel status {:?}", status);
                Ok(None)
            }
            ChannelEvent::Sync => self.on_sync().map(|()| None),
            ChannelEvent::Join { key, new_presences } => Ok(self.on_join(key, &new_presences)),
            ChannelEvent::Leave { key, .. } => Ok(self.on_leave(&key)),
            ChannelEvent::Broadcast { event, payload } => {
                match ProtocolMessage::decode(&event, payload) {
                    Ok(message) => Ok(Some(self.on_message(message))),
                    Err(err) => {
                        log::warn!("Dropping {} broadcast: {}", event, err);
                        Ok(None)
                    }
                }
            }
        }
    }

    fn on_sync(&mut self) -> Result<()> {
        let joined_before = self
            .channel
            .presence_state()
            .values()
            .filter_map(|records| records.first())
            .filter(|record| record.create_at <= self.me.create_at)
            .count();

        if joined_before > ROOM_CAPACITY {
            log::warn!(
                "Room {} already has {} participants, leaving",
                self.config.room_id,
                joined_before - 1
            );
            self.channel.untrack();
            self.channel.unsubscribe();
            self.closed = true;
            return Err(SessionError::RoomFull);
        }
        Ok(())
    }

    fn on_join(&mut self, key: String, new_presences: &[PresenceRecord]) -> Option<Inbound> {
        if new_presences.iter().any(|record| record.user == self.me.user) {
            return None;
        }
        if self.opponent_key.is_some() {
            return None;
        }
        let opponent = new_presences.first()?;

        // the earlier joiner moves first
        let my_turn = self.me.create_at <= opponent.create_at;
        log::info!(
            "Opponent {} joined, {}",
            key,
            if my_turn { "moving first" } else { "moving second" }
        );
        self.opponent_key = Some(key);
        self.turn = Some(my_turn);
        self.moves_first = my_turn;
        self.online = OnlineStatus::Connect;
        Some(Inbound::OpponentJoined { my_turn })
    }

    fn on_leave(&mut self, key: &str) -> Option<Inbound> {
        if self.opponent_key.as_deref() != Some(key) {
            return None;
        }
        log::warn!("Opponent {} left", key);
        self.online = OnlineStatus::Disconnect;
        Some(Inbound::OpponentLeft)
    }

    fn on_message(&mut self, message: ProtocolMessage) -> Inbound {
        log::debug!("Received {}", message.kind());
        match message {
            ProtocolMessage::Init(state) => {
                self.opponent_init = Some(state.clone());
                Inbound::Init(state)
            }
            ProtocolMessage::Send(mv) => {
                self.turn = Some(true);
                self.opponent_move = Some(mv);
                Inbound::Move(mv)
            }
            ProtocolMessage::Judge { elapsed_seconds } => {
                self.opponent_judge = Some(elapsed_seconds);
                Inbound::Judge(elapsed_seconds)
            }
        }
    }

    /// Hands the freshly generated board to the opponent.
    pub async fn send_init(&mut self, state: &GameState) {
        self.turn = Some(false);
        self.broadcast(ProtocolMessage::Init(state.clone())).await;
    }

    pub async fn send_move(&mut self, mv: Move) {
        self.turn = Some(false);
        self.sleeper.sleep(self.config.pacing()).await;
        self.broadcast(ProtocolMessage::Send(mv)).await;
    }

    pub async fn send_judge(&mut self, elapsed_seconds: u32) {
        self.judge_sent = true;
        self.sleeper.sleep(self.config.pacing()).await;
        self.broadcast(ProtocolMessage::Judge { elapsed_seconds }).await;
    }

    /// Stops tracking and leaves the room after `wait`. Later calls do nothing.
    pub async fn close_connection(&mut self, wait: Duration) {
        if self.closed {
            return;
        }
        self.sleeper.sleep(wait).await;
        if self.closed {
            return;
        }
        self.channel.untrack();
        self.channel.unsubscribe();
        self.closed = true;
        log::debug!("Left room {}", self.config.room_id);
    }

    async fn broadcast(&mut self, message: ProtocolMessage) {
        let kind = message.kind();
        let payload = match message.to_payload() {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("Cannot encode {}: {}", kind, err);
                return;
            }
        };
        log::debug!("Sending {}", kind);
        if let Err(err) = self.channel.broadcast(kind, payload).await {
            log::warn!("Broadcasting {} failed: {}", kind, err);
        }
    }
}
