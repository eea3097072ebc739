use core::fmt;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::*;

/// Valid transitions:
/// - Init -> Playing
/// - Playing -> Win
/// - Playing -> Lose
/// - Playing -> Draw
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No mines placed yet
    #[default]
    Init,
    Playing,
    Win,
    Lose,
    Draw,
}

impl Status {
    pub const fn is_initial(self) -> bool {
        matches!(self, Self::Init)
    }

    /// Indicates the game has ended and no moves can be made anymore
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Win | Self::Lose | Self::Draw)
    }

    /// Race verdict from the local side's point of view: less active time wins.
    pub const fn from_elapsed(local_secs: u32, opponent_secs: u32) -> Self {
        if local_secs < opponent_secs {
            Self::Win
        } else if local_secs == opponent_secs {
            Self::Draw
        } else {
            Self::Lose
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Playing => "playing",
            Self::Win => "win",
            Self::Lose => "lose",
            Self::Draw => "draw",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Board plus status, exactly what the first mover broadcasts in `init`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub fields: Board,
    pub status: Status,
}

/// Who originated a reveal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    Local,
    /// A mirrored move replayed from the remote peer.
    Opponent,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlayMode {
    #[default]
    Solo,
    Duel,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    NoChange,
    Revealed,
    /// A mine was opened, carrying the terminal status it produced.
    Exploded(Status),
    /// Every safe cell is open. Solo games are won at this point, duels go to the judge handshake.
    Cleared,
}

impl CheckOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// One player's view of a match: the board and the rules for what may happen to it next.
#[derive(Clone, Debug, PartialEq)]
pub struct GameStateMachine {
    config: GameConfig,
    mode: PlayMode,
    state: GameState,
}

impl GameStateMachine {
    pub fn new(config: GameConfig, mode: PlayMode) -> Self {
        Self {
            config,
            mode,
            state: GameState {
                fields: Board::new(config.size()),
                status: Status::Init,
            },
        }
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn status(&self) -> Status {
        self.state.status
    }

    pub fn board(&self) -> &Board {
        &self.state.fields
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    pub fn remaining_safe_cells(&self) -> CellCount {
        self.state.fields.remaining_safe_cells()
    }

    /// Throws the current board away and starts over with `config`.
    pub fn restart(&mut self, config: GameConfig) {
        log::debug!("Restarting with {:?}", config);
        *self = Self::new(config, self.mode);
    }

    /// Places the mines around the first click and moves to `Playing`.
    pub fn start<R: Rng + ?Sized>(&mut self, first: Coord2, rng: &mut R) -> Result<()> {
        if !self.state.status.is_initial() {
            return Err(GameError::AlreadyStarted);
        }
        self.config.validate()?;
        self.state
            .fields
            .place_mines(first, self.config.mines, rng)?;
        self.state.status = Status::Playing;
        log::debug!("Game started at {:?}", first);
        Ok(())
    }

    /// Adopts the board generated by the other side.
    pub fn load(&mut self, state: GameState) -> Result<()> {
        if !self.state.status.is_initial() {
            return Err(GameError::AlreadyStarted);
        }
        if state.status != Status::Playing {
            log::warn!("Received board in status {}, treating as playing", state.status);
        }

        let (rows, cols) = state.fields.size();
        self.config = GameConfig::new_unchecked(rows, cols, state.fields.mine_count());
        self.state = GameState {
            fields: state.fields,
            status: Status::Playing,
        };
        log::debug!("Loaded remote board {:?}", self.config);
        Ok(())
    }

    /// Reveal. Only acts while the game is not over and the target cell is still hidden.
    pub fn check<R: Rng + ?Sized>(
        &mut self,
        coords: Coord2,
        actor: Actor,
        rng: &mut R,
    ) -> Result<CheckOutcome> {
        if self.state.status.is_final() {
            return Ok(CheckOutcome::NoChange);
        }
        let coords = self.state.fields.validate_coords(coords)?;

        if self.state.status.is_initial() {
            match actor {
                Actor::Local => self.start(coords, rng)?,
                Actor::Opponent => return Err(GameError::BoardNotReceived),
            }
        }

        Ok(match self.state.fields.reveal(coords) {
            RevealOutcome::NoChange => CheckOutcome::NoChange,
            RevealOutcome::Revealed => CheckOutcome::Revealed,
            RevealOutcome::HitMine => {
                // judged from the acting side: an opponent blowing up is our win
                let status = match actor {
                    Actor::Local => Status::Lose,
                    Actor::Opponent => Status::Win,
                };
                self.state.status = status;
                self.state.fields.reveal_mines();
                log::debug!("{:?} hit a mine at {:?}, status {}", actor, coords, status);
                CheckOutcome::Exploded(status)
            }
            RevealOutcome::Cleared => {
                if self.mode == PlayMode::Solo {
                    self.state.status = Status::Win;
                }
                log::debug!("Board cleared by {:?}", actor);
                CheckOutcome::Cleared
            }
        })
    }

    pub fn flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        if self.state.status != Status::Playing {
            return Ok(MarkOutcome::NoChange);
        }
        self.state.fields.toggle_flag(coords)
    }

    /// Settles a duel from both sides' active seconds. Only a game in progress can be judged.
    pub fn judge(&mut self, local_secs: u32, opponent_secs: u32) -> Status {
        if self.state.status != Status::Playing {
            log::debug!("Judge ignored in status {}", self.state.status);
            return self.state.status;
        }
        self.state.status = Status::from_elapsed(local_secs, opponent_secs);
        self.state.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn machine(rows: Coord, cols: Coord, mines: CellCount, mode: PlayMode) -> GameStateMachine {
        GameStateMachine::new(GameConfig::new(rows, cols, mines).unwrap(), mode)
    }

    fn first_mine(game: &GameStateMachine) -> Coord2 {
        game.board().iter().find(|cell| cell.is_mine).unwrap().coords()
    }

    #[test]
    fn first_check_places_mines_and_plays() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut game = machine(9, 9, 10, PlayMode::Solo);

        let outcome = game.check((4, 4), Actor::Local, &mut rng).unwrap();

        assert!(outcome.has_update());
        assert_ne!(game.status(), Status::Init);
        assert_eq!(game.board().mine_count(), 10);
        assert_eq!(game.board()[(4, 4)].adjacent_mine_count, 0);
        assert!(game.board().iter().filter(|c| c.is_open).count() > 1);
    }

    #[test]
    fn solo_clear_wins() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut game = machine(9, 9, 10, PlayMode::Solo);
        let mut last = game.check((4, 4), Actor::Local, &mut rng).unwrap();

        let safe: alloc::vec::Vec<_> = game
            .board()
            .iter()
            .filter(|c| !c.is_mine)
            .map(Cell::coords)
            .collect();
        for coords in safe {
            let outcome = game.check(coords, Actor::Local, &mut rng).unwrap();
            if outcome.has_update() {
                last = outcome;
            }
        }

        assert_eq!(last, CheckOutcome::Cleared);
        assert_eq!(game.remaining_safe_cells(), 0);
        assert_eq!(game.status(), Status::Win);
    }

    #[test]
    fn duel_clear_waits_for_judge() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut game = machine(9, 9, 10, PlayMode::Duel);
        game.check((4, 4), Actor::Local, &mut rng).unwrap();

        let safe: alloc::vec::Vec<_> = game
            .board()
            .iter()
            .filter(|c| !c.is_mine)
            .map(Cell::coords)
            .collect();
        for coords in safe {
            game.check(coords, Actor::Local, &mut rng).unwrap();
        }

        assert_eq!(game.status(), Status::Playing);
        assert_eq!(game.judge(10, 15), Status::Win);
        assert_eq!(game.judge(20, 9), Status::Win);
    }

    #[test]
    fn mine_outcome_depends_on_actor() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut mine = machine(9, 9, 10, PlayMode::Duel);
        mine.start((0, 0), &mut rng).unwrap();
        let mut theirs = mine.clone();
        let target = first_mine(&mine);

        let local = mine.check(target, Actor::Local, &mut rng).unwrap();
        let remote = theirs.check(target, Actor::Opponent, &mut rng).unwrap();

        assert_eq!(local, CheckOutcome::Exploded(Status::Lose));
        assert_eq!(remote, CheckOutcome::Exploded(Status::Win));
        for game in [&mine, &theirs] {
            assert!(game.board().iter().filter(|c| c.is_mine).all(|c| c.is_open));
        }
    }

    #[test]
    fn finished_game_rejects_moves() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut game = machine(9, 9, 10, PlayMode::Solo);
        game.start((0, 0), &mut rng).unwrap();
        let target = first_mine(&game);
        game.check(target, Actor::Local, &mut rng).unwrap();
        let before = game.clone();

        assert_eq!(
            game.check((8, 8), Actor::Local, &mut rng).unwrap(),
            CheckOutcome::NoChange
        );
        assert_eq!(game.flag((8, 8)).unwrap(), MarkOutcome::NoChange);
        assert_eq!(game, before);
    }

    #[test]
    fn flag_requires_playing() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut game = machine(9, 9, 10, PlayMode::Solo);

        assert_eq!(game.flag((0, 0)).unwrap(), MarkOutcome::NoChange);
        assert!(!game.board()[(0, 0)].is_flagged);

        game.start((4, 4), &mut rng).unwrap();
        assert_eq!(game.flag((0, 0)).unwrap(), MarkOutcome::Changed);
        assert!(game.board()[(0, 0)].is_flagged);
    }

    #[test]
    fn check_on_open_cell_is_noop() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut game = machine(9, 9, 10, PlayMode::Duel);
        game.check((4, 4), Actor::Local, &mut rng).unwrap();
        let before = game.clone();

        assert_eq!(
            game.check((4, 4), Actor::Local, &mut rng).unwrap(),
            CheckOutcome::NoChange
        );
        assert_eq!(game, before);
    }

    #[test]
    fn opponent_move_before_board_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut game = machine(9, 9, 10, PlayMode::Duel);

        assert_eq!(
            game.check((4, 4), Actor::Opponent, &mut rng),
            Err(GameError::BoardNotReceived)
        );
        assert_eq!(game.status(), Status::Init);
    }

    #[test]
    fn loaded_board_is_played_as_is() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut host = machine(16, 16, 40, PlayMode::Duel);
        host.start((2, 3), &mut rng).unwrap();
        let mut guest = machine(9, 9, 10, PlayMode::Duel);

        guest.load(host.snapshot()).unwrap();

        assert_eq!(guest.status(), Status::Playing);
        assert_eq!(guest.board(), host.board());
        assert_eq!(guest.config(), host.config());
        assert_eq!(guest.load(host.snapshot()), Err(GameError::AlreadyStarted));
    }

    #[test]
    fn out_of_bounds_check_is_an_error() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut game = machine(9, 9, 10, PlayMode::Solo);

        assert_eq!(
            game.check((9, 0), Actor::Local, &mut rng),
            Err(GameError::InvalidCoords)
        );
        assert_eq!(game.status(), Status::Init);
    }

    #[test]
    fn elapsed_verdicts() {
        assert_eq!(Status::from_elapsed(10, 15), Status::Win);
        assert_eq!(Status::from_elapsed(12, 12), Status::Draw);
        assert_eq!(Status::from_elapsed(20, 9), Status::Lose);
    }

    #[test]
    fn restart_resets_to_init() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut game = machine(9, 9, 10, PlayMode::Solo);
        game.check((4, 4), Actor::Local, &mut rng).unwrap();

        game.restart(GameConfig::intermediate());

        assert_eq!(game.status(), Status::Init);
        assert_eq!(game.board().size(), (16, 16));
        assert_eq!(game.board().mine_count(), 0);
    }
}
