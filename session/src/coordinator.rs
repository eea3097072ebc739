use core::time::Duration;
use duelsweeper_core::{
    Actor, CheckOutcome, Coord2, GameConfig, GameError, GameStateMachine, MarkOutcome, PlayMode,
    Status,
};
use futures_util::{Stream, StreamExt};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::*;

/// A coordinator without a room.
pub type SoloCoordinator<T, M> = TurnCoordinator<LocalChannel, NoDelay, T, M>;

fn entropy_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_nanos() as u64)
}

pub struct CoordinatorBuilder<C, S, T, M> {
    config: GameConfig,
    seed: Option<u64>,
    session: Option<RealtimeSession<C, S>>,
    timer: Option<T>,
    modal: Option<M>,
}

impl<C: Channel, S: Sleeper, T: Timer, M: Modal> CoordinatorBuilder<C, S, T, M> {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            seed: None,
            session: None,
            timer: None,
            modal: None,
        }
    }

    /// Takes the board and seed; the session still has to be supplied since it owns a channel.
    pub fn from_config(config: &MatchConfig) -> Self {
        let mut builder = Self::new(config.game);
        builder.seed = config.seed;
        builder
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Turns the match into a duel played over `session`.
    pub fn session(mut self, session: RealtimeSession<C, S>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn timer(mut self, timer: T) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn modal(mut self, modal: M) -> Self {
        self.modal = Some(modal);
        self
    }

    pub fn build(self) -> Result<TurnCoordinator<C, S, T, M>> {
        let timer = self.timer.ok_or(SessionError::MissingCollaborator("timer"))?;
        let modal = self.modal.ok_or(SessionError::MissingCollaborator("modal"))?;
        self.config.validate()?;

        let mode = if self.session.is_some() {
            PlayMode::Duel
        } else {
            PlayMode::Solo
        };
        let seed = self.seed.unwrap_or_else(entropy_seed);
        log::debug!("New {:?} match {:?}, seed {}", mode, self.config, seed);

        Ok(TurnCoordinator {
            game: GameStateMachine::new(self.config, mode),
            session: self.session,
            timer,
            modal,
            rng: SmallRng::seed_from_u64(seed),
        })
    }
}

/// Glue between the local game, the room and the player: enforces turn order, mirrors moves
/// both ways and runs the judge handshake once a board is cleared.
#[derive(Debug)]
pub struct TurnCoordinator<C, S, T, M> {
    game: GameStateMachine,
    session: Option<RealtimeSession<C, S>>,
    timer: T,
    modal: M,
    rng: SmallRng,
}

impl<C: Channel, S: Sleeper, T: Timer, M: Modal> TurnCoordinator<C, S, T, M> {
    pub fn builder(config: GameConfig) -> CoordinatorBuilder<C, S, T, M> {
        CoordinatorBuilder::new(config)
    }

    pub fn game(&self) -> &GameStateMachine {
        &self.game
    }

    pub fn session(&self) -> Option<&RealtimeSession<C, S>> {
        self.session.as_ref()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn modal(&self) -> &M {
        &self.modal
    }

    /// `None` in solo mode.
    pub fn status_line(&self) -> Option<&'static str> {
        self.session.as_ref().map(RealtimeSession::status_line)
    }

    fn is_my_turn(&self) -> bool {
        self.session
            .as_ref()
            .is_none_or(RealtimeSession::is_my_turn)
    }

    /// Joins the room. Solo coordinators have nothing to connect to.
    pub fn connect(&mut self) -> Result<Option<C::Events>> {
        self.session.as_mut().map(RealtimeSession::connect).transpose()
    }

    /// New local game with `config`. Not possible once an opponent has been seen.
    pub fn restart(&mut self, config: GameConfig) -> Result<()> {
        if self.session.as_ref().is_some_and(|s| s.turn().is_some()) {
            return Err(GameError::AlreadyStarted.into());
        }
        config.validate()?;
        self.game.restart(config);
        self.timer.pause();
        self.timer.reset();
        Ok(())
    }

    /// Local reveal.
    pub async fn check(&mut self, coords: Coord2) -> Result<CheckOutcome> {
        self.apply(coords, Actor::Local).await
    }

    pub fn flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        if !self.is_my_turn() {
            return Ok(MarkOutcome::NoChange);
        }
        Ok(self.game.flag(coords)?)
    }

    async fn apply(&mut self, coords: Coord2, actor: Actor) -> Result<CheckOutcome> {
        if actor == Actor::Local && !self.is_my_turn() {
            log::debug!("Not our turn, ignoring {:?}", coords);
            return Ok(CheckOutcome::NoChange);
        }
        if self.game.status().is_final() {
            return Ok(CheckOutcome::NoChange);
        }
        let coords = self.game.board().validate_coords(coords)?;

        if self.game.status().is_initial() {
            match actor {
                Actor::Local => {
                    // the second mover waits for the first mover's board
                    if self.session.as_ref().is_some_and(|s| !s.moves_first()) {
                        return Err(GameError::BoardNotReceived.into());
                    }
                    self.game.start(coords, &mut self.rng)?;
                    if let Some(session) = self.session.as_mut() {
                        session.send_init(self.game.state()).await;
                    }
                }
                Actor::Opponent => return Err(GameError::BoardNotReceived.into()),
            }
        }

        // flags never leave this side, the opponent's reveal wins over them
        if actor == Actor::Opponent && self.game.board()[coords].is_flagged {
            self.game.flag(coords)?;
        }
        if !self.game.board()[coords].is_hidden() {
            return Ok(CheckOutcome::NoChange);
        }

        if actor == Actor::Local {
            match self.session.as_mut() {
                Some(session) => {
                    session.send_move(coords.into()).await;
                    self.timer.pause();
                }
                None => self.timer.resume(),
            }
        }

        let outcome = self.game.check(coords, actor, &mut self.rng)?;
        match outcome {
            CheckOutcome::Exploded(status) => {
                self.modal.open(status.as_str());
                self.timer.pause();
                self.close_after_grace().await;
            }
            CheckOutcome::Cleared => {
                self.timer.pause();
                match self.session.as_mut() {
                    None => self.modal.open(self.game.status().as_str()),
                    Some(session) if !session.judge_sent() => {
                        session.send_judge(self.timer.counter()).await;
                    }
                    Some(_) => {}
                }
            }
            CheckOutcome::Revealed if actor == Actor::Opponent => self.timer.resume(),
            CheckOutcome::Revealed | CheckOutcome::NoChange => {}
        }
        Ok(outcome)
    }

    async fn on_judge(&mut self, opponent_secs: u32) {
        if self.game.status() != Status::Playing {
            log::debug!("Judge arrived in status {}, ignoring", self.game.status());
            return;
        }

        let local_secs = self.timer.counter();
        let status = self.game.judge(local_secs, opponent_secs);
        self.timer.pause();
        log::info!("Match over: {} ({}s vs {}s)", status, local_secs, opponent_secs);
        self.modal.open(&format!(
            "[{}] my: {}s, opponent: {}s",
            status, local_secs, opponent_secs
        ));

        if let Some(session) = self.session.as_mut()
            && !session.judge_sent()
        {
            session.send_judge(local_secs).await;
        }
        self.close_after_grace().await;
    }

    async fn close_after_grace(&mut self) {
        if let Some(session) = self.session.as_mut() {
            let grace = session.config().grace();
            session.close_connection(grace).await;
        }
    }

    /// Applies one inbound channel event.
    pub async fn handle_event(&mut self, event: ChannelEvent) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let inbound = match session.handle(event) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => return Ok(()),
            Err(SessionError::RoomFull) => {
                self.modal.open("already room filled");
                return Err(SessionError::RoomFull);
            }
            Err(err) => return Err(err),
        };

        match inbound {
            Inbound::OpponentJoined { .. } => {}
            Inbound::OpponentLeft => log::warn!("Opponent disconnected, the match cannot go on"),
            Inbound::Init(state) => {
                if let Err(err) = self.game.load(state) {
                    log::warn!("Ignoring second board: {}", err);
                }
            }
            Inbound::Move(mv) => {
                self.apply(mv.coords(), Actor::Opponent).await?;
            }
            Inbound::Judge(opponent_secs) => self.on_judge(opponent_secs).await,
        }
        Ok(())
    }

    /// Drives `events` until the room is left. Bad opponent moves are logged and skipped.
    pub async fn run<E>(&mut self, mut events: E) -> Result<()>
    where
        E: Stream<Item = ChannelEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            match self.handle_event(event).await {
                Ok(()) => {}
                Err(SessionError::Game(err)) => log::warn!("Skipping opponent move: {}", err),
                Err(err) => return Err(err),
            }
            if self.session.as_ref().is_none_or(RealtimeSession::is_closed) {
                break;
            }
        }
        Ok(())
    }

    /// Leaves the room right away.
    pub async fn dispose(&mut self) {
        self.timer.pause();
        if let Some(session) = self.session.as_mut() {
            session.close_connection(Duration::ZERO).await;
        }
    }
}
