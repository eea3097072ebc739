#![allow(dead_code)]

use core::cell::RefCell;
use core::future::{self, Future};
use core::time::Duration;
use duelsweeper_core::{Coord2, GameConfig};
use duelsweeper_protocol::PresenceRecord;
use duelsweeper_session::*;
use futures_channel::mpsc::UnboundedReceiver;
use futures_util::{FutureExt, StreamExt};
use std::rc::Rc;
use uuid::Uuid;

pub const ROOM: &str = "test-room";
pub const PACING: Duration = Duration::from_millis(100);
pub const GRACE: Duration = Duration::from_millis(250);

/// Modal that keeps every message it was asked to show.
#[derive(Clone, Debug, Default)]
pub struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl Modal for Recorder {
    fn open(&mut self, message: &str) {
        self.0.borrow_mut().push(message.to_owned());
    }
}

/// Sleeper that completes at once but remembers every delay it was asked for.
#[derive(Clone, Debug, Default)]
pub struct SleepLog(Rc<RefCell<Vec<Duration>>>);

impl SleepLog {
    /// Delays requested since the last call.
    pub fn take(&self) -> Vec<Duration> {
        self.0.borrow_mut().drain(..).collect()
    }
}

impl Sleeper for SleepLog {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        self.0.borrow_mut().push(duration);
        future::ready(())
    }
}

pub type Coordinator = TurnCoordinator<LocalChannel, SleepLog, TickCounter, Recorder>;

pub struct Peer {
    pub game: Coordinator,
    pub events: UnboundedReceiver<ChannelEvent>,
    pub modal: Recorder,
    pub sleeps: SleepLog,
}

impl Peer {
    pub fn join(hub: &LocalHub, user: u128, create_at: i64, config: GameConfig) -> Self {
        let sleeps = SleepLog::default();
        let session_config = SessionConfig {
            grace_ms: GRACE.as_millis() as u64,
            ..SessionConfig::new(ROOM)
        };
        let session = RealtimeSession::new(
            hub.channel(ROOM),
            sleeps.clone(),
            session_config,
            PresenceRecord::new(Uuid::from_u128(user), create_at),
        );
        let modal = Recorder::default();
        let mut game = TurnCoordinator::builder(config)
            .seed(user as u64)
            .session(session)
            .timer(TickCounter::new())
            .modal(modal.clone())
            .build()
            .unwrap();
        let events = game.connect().unwrap().unwrap();

        Self {
            game,
            events,
            modal,
            sleeps,
        }
    }

    pub fn session(&self) -> &RealtimeSession<LocalChannel, SleepLog> {
        self.game.session().unwrap()
    }

    pub fn check(&mut self, coords: Coord2) -> duelsweeper_core::CheckOutcome {
        self.game.check(coords).now_or_never().unwrap().unwrap()
    }

    /// Some hidden cell without a mine, if any is left.
    pub fn hidden_safe_cell(&self) -> Option<Coord2> {
        self.game
            .game()
            .board()
            .iter()
            .find(|cell| cell.is_hidden() && !cell.is_mine)
            .map(|cell| cell.coords())
    }
}

/// Lets every peer handle its queued events until the room goes quiet; returns the errors.
pub fn settle(peers: &mut [&mut Peer]) -> Vec<SessionError> {
    let mut errors = Vec::new();
    loop {
        let mut idle = true;
        for peer in peers.iter_mut() {
            while let Some(Some(event)) = peer.events.next().now_or_never() {
                idle = false;
                if let Err(err) = peer.game.handle_event(event).now_or_never().unwrap() {
                    errors.push(err);
                }
            }
        }
        if idle {
            return errors;
        }
    }
}

/// Two connected peers; `a` joined first and moves first.
pub fn duel(config: GameConfig) -> (LocalHub, Peer, Peer) {
    let hub = LocalHub::new();
    let mut a = Peer::join(&hub, 1, 100, config);
    let mut b = Peer::join(&hub, 2, 200, config);
    let errors = settle(&mut [&mut a, &mut b]);
    assert!(errors.is_empty(), "{errors:?}");
    (hub, a, b)
}
