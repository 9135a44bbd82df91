use delve_core::*;
use rand::prelude::*;
use rand::rngs::SmallRng;

const STEP_LIMIT: usize = 20_000;

fn count_revealed(board: &Board, owner: Owner) -> CellCount {
    let count = board
        .iter()
        .filter(|(_, tile)| tile.owner == owner && tile.revealed)
        .count();
    CellCount::try_from(count).unwrap()
}

fn count_total(board: &Board, owner: Owner) -> CellCount {
    let count = board.iter().filter(|(_, tile)| tile.owner == owner).count();
    CellCount::try_from(count).unwrap()
}

fn check_invariants(engine: &RunEngine) {
    let state = engine.state();
    let board = &state.board;

    assert_eq!(board.player_revealed(), count_revealed(board, Owner::Player));
    assert_eq!(board.opponent_revealed(), count_revealed(board, Owner::Opponent));
    assert_eq!(board.player_total(), count_total(board, Owner::Player));
    assert_eq!(board.opponent_total(), count_total(board, Owner::Opponent));

    let won = board.player_revealed() == board.player_total();
    let lost = board.opponent_total() > 0 && board.opponent_revealed() == board.opponent_total();
    assert!(!(won && lost), "board both won and lost");
    match state.board_status {
        BoardStatus::Won => assert!(won),
        BoardStatus::Lost => assert!(lost),
        BoardStatus::InProgress => {}
    }

    let run = &state.run;
    assert!(run.mana() <= run.max_mana());
    assert!(run.hp() >= 0 && run.hp() <= run.max_hp());
    assert!(run.inventory.slots().len() == run.inventory.capacity());
    if state.game_status == GameStatus::Playing && run.is_dead() {
        panic!("dead player still playing");
    }
    if state.targeting.is_some() {
        assert_eq!(state.current_turn, Turn::Player);
    }
}

/// Plays a run to the end with a driver that usually, but not always,
/// knows where its own tiles are.
fn play(seed: u64, character: CharacterId, cheat_percent: u32) -> (RunEngine, usize) {
    let mut engine = RunEngine::new(RunConfig::new(seed, 5, 2)).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);

    for step in 0..STEP_LIMIT {
        check_invariants(&engine);
        let state = engine.state();

        let outcome = match state.game_status {
            GameStatus::CharacterSelect => engine.select_character(character),
            status if status.is_terminal() => return (engine, step),
            _ if state.upgrade_choice.is_some() => engine.choose_upgrade(Some(0)),
            _ if state.shop.open => {
                if !state.shop.offers.is_empty() && engine.buy(0).success {
                    continue;
                }
                engine.close_shop()
            }
            _ if state.board_status.is_finished() => engine.progress_board(),
            _ if state.targeting.is_some() => engine.cancel_targeting(),
            _ if state.current_turn == Turn::Opponent => engine.opponent_move(),
            _ => {
                let own = state.board.revealable_of(Owner::Player);
                let any: Vec<Coord2> = state
                    .board
                    .coords()
                    .filter(|&coords| state.board.can_reveal(coords))
                    .collect();
                // own tiles may all sit behind keys somewhere else
                let pick = if rng.random_range(0..100) < cheat_percent && !own.is_empty() {
                    own.choose(&mut rng)
                } else {
                    any.choose(&mut rng)
                };
                match pick.copied() {
                    Some(coords) => engine.reveal(coords),
                    None => engine.end_turn(),
                }
            }
        };
        assert!(
            outcome.success,
            "step {} rejected: {:?}",
            step, outcome.message
        );
    }
    panic!("run with seed {} did not finish", seed);
}

#[test]
fn cheating_driver_completes_runs() {
    for seed in 0..6 {
        let (engine, _) = play(seed, CharacterId::Warrior, 100);
        let state = engine.state();
        assert!(state.game_status.is_terminal());
        if state.game_status == GameStatus::RunComplete {
            assert_eq!(state.run.level, 5);
            assert!(state.run.trophy_count() >= 1);
        }
    }
}

#[test]
fn mixed_driver_always_reaches_an_ending() {
    for (seed, character) in (100..112).zip(CharacterId::ALL.into_iter().cycle()) {
        let (engine, steps) = play(seed, character, 60);
        assert!(engine.state().game_status.is_terminal());
        assert!(steps > 0);
    }
}

#[test]
fn finished_runs_reject_every_board_intent() {
    let (mut engine, _) = play(7, CharacterId::Mage, 40);
    let before = engine.state().clone();

    for outcome in [
        engine.reveal((0, 0)),
        engine.end_turn(),
        engine.opponent_move(),
        engine.use_item(0),
        engine.cast_spell(0, Some((0, 0))),
        engine.progress_board(),
        engine.select_character(CharacterId::Mage),
    ] {
        assert!(!outcome.success);
        assert!(outcome.events.is_empty());
        assert!(!outcome.should_trigger_ai);
    }
    assert_eq!(engine.state(), &before);

    assert!(engine.reset().success);
    assert_eq!(engine.state().game_status, GameStatus::CharacterSelect);
}

#[test]
fn same_seed_same_run() {
    let (first, first_steps) = play(42, CharacterId::Merchant, 70);
    let (second, second_steps) = play(42, CharacterId::Merchant, 70);
    assert_eq!(first_steps, second_steps);
    assert_eq!(first.state(), second.state());
}

#[test]
fn outcome_flags_drive_the_host_loop() {
    let mut engine = RunEngine::with_policy(
        RunConfig::new(3, 2, 3),
        Box::new(RandomPolicy::new(3)),
    )
    .unwrap();
    assert_eq!(engine.policy_name(), "random");
    engine.select_character(CharacterId::Wanderer);

    let board = &engine.state().board;
    let Some(coords) = board
        .revealable_of(Owner::Neutral)
        .into_iter()
        .find(|&coords| board[coords].content.is_empty())
    else {
        return;
    };
    let outcome = engine.reveal(coords);
    assert!(outcome.should_trigger_ai);
    assert!(!outcome.next_board_delay);

    let outcome = engine.opponent_move();
    assert!(outcome.success);
    assert!(!outcome.should_trigger_ai);
}

/// Wins the current board through the debug surface, dismissing whatever
/// upgrade caches or shops turn up on the way.
fn clear_board(engine: &mut RunEngine) {
    while !engine.state().board_status.is_finished() {
        if engine.state().upgrade_choice.is_some() {
            assert!(engine.choose_upgrade(None).success);
        } else if engine.state().shop.open {
            assert!(engine.close_shop().success);
        } else {
            assert!(engine.debug_reveal_own_tiles().success);
        }
    }
}

#[test]
fn config_from_json_drives_a_run() {
    let config = RunConfig::from_json(r#"{ "seed": 11, "max_level": 2 }"#).unwrap();
    assert_eq!(config.shop_cadence, 3);
    let mut engine = RunEngine::new(config).unwrap();
    assert!(engine.select_character(CharacterId::Warrior).success);
    clear_board(&mut engine);
    assert_eq!(engine.state().board_status, BoardStatus::Won);
    assert!(engine.progress_board().success);
    clear_board(&mut engine);
    let outcome = engine.progress_board();
    assert!(outcome.has_event(|e| *e == Event::RunComplete));

    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("RunComplete"));
}

#[test]
fn bad_config_is_refused_up_front() {
    assert!(RunConfig::from_json(r#"{ "levels": [] }"#).is_err());
    assert!(RunConfig::from_json("not json").is_err());
}
