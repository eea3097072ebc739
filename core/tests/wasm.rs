#![cfg(target_arch = "wasm32")]

use duelsweeper_core::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use wasm_bindgen_test::wasm_bindgen_test;

#[wasm_bindgen_test]
fn first_reveal_is_safe_in_the_browser() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut game = GameStateMachine::new(GameConfig::expert(), PlayMode::Solo);

    let outcome = game.check((8, 15), Actor::Local, &mut rng).unwrap();

    assert!(outcome.has_update());
    assert_eq!(game.status(), Status::Playing);
    assert_eq!(game.board().mine_count(), 99);
    assert!(!game.board()[(8, 15)].is_mine);
    assert_eq!(game.board()[(8, 15)].adjacent_mine_count, 0);
}
