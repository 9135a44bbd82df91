use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::*;

pub const UPGRADE_CHOICES: usize = 3;

const POLICY_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    CharacterSelect,
    Playing,
    OpponentWon,
    RunComplete,
    PlayerDied,
}

impl GameStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::OpponentWon | Self::RunComplete | Self::PlayerDied
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopState {
    pub open: bool,
    pub offers: Vec<ShopOffer>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetingMode {
    Transmute { slot: usize },
    Detector { slot: usize },
    Key { slot: usize },
    Staff { slot: usize },
    Ring { slot: usize },
    Spell { slot: usize },
}

impl TargetingMode {
    pub const fn for_item(item: ItemKind, slot: usize) -> Option<Self> {
        match item {
            ItemKind::Transmute => Some(Self::Transmute { slot }),
            ItemKind::Detector => Some(Self::Detector { slot }),
            ItemKind::Key => Some(Self::Key { slot }),
            ItemKind::Staff { .. } => Some(Self::Staff { slot }),
            ItemKind::Ring { .. } => Some(Self::Ring { slot }),
            _ => None,
        }
    }

    pub const fn slot(self) -> usize {
        match self {
            Self::Transmute { slot }
            | Self::Detector { slot }
            | Self::Key { slot }
            | Self::Staff { slot }
            | Self::Ring { slot }
            | Self::Spell { slot } => slot,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub current_turn: Turn,
    pub game_status: GameStatus,
    pub board_status: BoardStatus,
    pub clues: Vec<Clue>,
    pub run: RunState,
    pub shop: ShopState,
    pub targeting: Option<TargetingMode>,
    pub upgrade_choice: Option<Vec<UpgradeId>>,
}

impl GameState {
    fn new(board: Board, run: RunState) -> Self {
        Self {
            board,
            current_turn: Turn::Player,
            game_status: GameStatus::CharacterSelect,
            board_status: BoardStatus::InProgress,
            clues: Vec::new(),
            run,
            shop: ShopState::default(),
            targeting: None,
            upgrade_choice: None,
        }
    }

    pub fn should_trigger_ai(&self) -> bool {
        self.game_status == GameStatus::Playing
            && self.board_status == BoardStatus::InProgress
            && self.current_turn == Turn::Opponent
            && !self.shop.open
            && self.upgrade_choice.is_none()
    }

    pub fn next_board_delay(&self) -> bool {
        self.game_status == GameStatus::Playing
            && self.board_status.is_finished()
            && !self.shop.open
            && self.upgrade_choice.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    CharacterSelected(CharacterId),
    TileRevealed { at: Coord2, by: Turn },
    TileAnnotated { at: Coord2, annotation: Annotation },
    TurnEnded { next: Turn },
    ProtectionUsed,
    MonsterFought { kind: MonsterKind, damage: i32, rounds: u32 },
    MonsterDamaged { at: Coord2, kind: MonsterKind, damage: i32 },
    MonsterDefeated { kind: MonsterKind, gold: u32 },
    ItemCollected { item: ItemKind, pickup: Pickup },
    ItemLost(ItemKind),
    ItemDropped(Slot),
    GoldCollected(u32),
    Healed(i32),
    TrapTriggered { damage: i32 },
    UpgradeChoiceOffered(Vec<UpgradeId>),
    UpgradeApplied(UpgradeId),
    UpgradeSkipped,
    ShopOpened,
    ShopClosed,
    ItemPurchased { kind: OfferKind, cost: u32 },
    SpellCast(SpellId),
    ItemUsed(ItemKind),
    TargetingStarted(TargetingMode),
    TargetingCancelled,
    ClueAdded,
    TrophyEarned(TrophySource),
    TrophyStolen(Trophy),
    BoardWon,
    BoardLost,
    NextBoard { level: u8 },
    PlayerDied,
    OpponentWon,
    RunComplete,
    GameReset,
}

/// Result of every intent. Rejections carry a reason and no events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: Option<String>,
    pub events: Vec<Event>,
    pub should_trigger_ai: bool,
    pub next_board_delay: bool,
}

impl Outcome {
    pub fn rejected(reason: ActionError) -> Self {
        Self {
            success: false,
            message: Some(reason.to_string()),
            events: Vec::new(),
            should_trigger_ai: false,
            next_board_delay: false,
        }
    }

    pub fn has_event(&self, predicate: impl Fn(&Event) -> bool) -> bool {
        self.events.iter().any(predicate)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut()>;

/// Owns one run and is the only way to change it.
///
/// Every intent validates against the current phase before touching
/// anything, so a rejected intent leaves the state exactly as it was and
/// does not notify subscribers.
pub struct RunEngine {
    config: RunConfig,
    state: GameState,
    rng: SmallRng,
    policy: Box<dyn OpponentPolicy>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl fmt::Debug for RunEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("policy", &self.policy.name())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

fn generate_board(
    rng: &mut SmallRng,
    config: &RunConfig,
    level: u8,
    run: &RunState,
) -> Result<Board> {
    let context = GenerationContext {
        level,
        carried_gold: run.gold,
        seen_monsters: &run.seen_monsters,
    };
    generate_level(RandomBoardGenerator::new(rng.random()), config, &context)
}

impl RunEngine {
    pub fn new(config: RunConfig) -> Result<Self> {
        let policy = Box::new(ConstraintPolicy::new(config.seed ^ POLICY_SEED_SALT));
        Self::with_policy(config, policy)
    }

    pub fn with_policy(config: RunConfig, policy: Box<dyn OpponentPolicy>) -> Result<Self> {
        let config = config.validated()?;
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let run = RunState::default();
        let board = generate_board(&mut rng, &config, 1, &run)?;
        log::debug!("Engine ready with {} opponent", policy.name());

        Ok(Self {
            config,
            state: GameState::new(board, run),
            rng,
            policy,
            subscribers: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn set_policy(&mut self, policy: Box<dyn OpponentPolicy>) {
        self.policy = policy;
    }

    pub fn subscribe(&mut self, callback: Box<dyn FnMut()>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, callback));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self) {
        for (_, callback) in &mut self.subscribers {
            callback();
        }
    }

    fn commit<F>(&mut self, intent: &str, apply: F) -> Outcome
    where
        F: FnOnce(&mut Self, &mut Vec<Event>) -> ActionResult<Option<String>>,
    {
        let mut events = Vec::new();
        match apply(self, &mut events) {
            Ok(message) => {
                log::trace!("{} applied: {:?}", intent, events);
                let outcome = Outcome {
                    success: true,
                    message,
                    events,
                    should_trigger_ai: self.state.should_trigger_ai(),
                    next_board_delay: self.state.next_board_delay(),
                };
                self.notify();
                outcome
            }
            Err(reason) => {
                log::debug!("{} rejected: {}", intent, reason);
                Outcome::rejected(reason)
            }
        }
    }

    // Guards

    fn ensure_playing(&self) -> ActionResult<()> {
        if self.state.game_status == GameStatus::Playing {
            Ok(())
        } else {
            Err(ActionError::NotPlaying)
        }
    }

    fn ensure_board_action(&self) -> ActionResult<()> {
        self.ensure_playing()?;
        if self.state.board_status.is_finished() {
            return Err(ActionError::BoardFinished);
        }
        if self.state.upgrade_choice.is_some() {
            return Err(ActionError::UpgradePending);
        }
        if self.state.shop.open {
            return Err(ActionError::ShopOpen);
        }
        Ok(())
    }

    fn ensure_turn(&self, turn: Turn) -> ActionResult<()> {
        if self.state.current_turn == turn {
            Ok(())
        } else {
            Err(ActionError::WrongTurn(self.state.current_turn))
        }
    }

    fn ensure_not_targeting(&self) -> ActionResult<()> {
        match self.state.targeting {
            Some(_) => Err(ActionError::TargetingActive),
            None => Ok(()),
        }
    }

    // Intents

    pub fn select_character(&mut self, character: CharacterId) -> Outcome {
        self.commit("select_character", |engine, events| {
            if engine.state.game_status != GameStatus::CharacterSelect {
                return Err(ActionError::AlreadyStarted);
            }
            let run = RunState::new(character);
            let board = generate_board(&mut engine.rng, &engine.config, 1, &run)?;

            engine.state.run = run;
            engine.state.game_status = GameStatus::Playing;
            events.push(Event::CharacterSelected(character));
            engine.install_board(board, 1, events);
            log::info!("Run started as {}", character.profile().name);
            Ok(None)
        })
    }

    pub fn reveal(&mut self, coords: Coord2) -> Outcome {
        self.commit("reveal", |engine, events| {
            engine.ensure_board_action()?;
            engine.ensure_turn(Turn::Player)?;
            match engine.state.targeting {
                Some(mode) => engine.resolve_targeting(mode, coords, events),
                None => engine.player_reveal(coords, events).map(|()| None),
            }
        })
    }

    pub fn annotate(&mut self, coords: Coord2) -> Outcome {
        self.commit("annotate", |engine, events| {
            engine.ensure_playing()?;
            let tile = engine
                .state
                .board
                .tile(coords)
                .ok_or(ActionError::OutOfBounds(coords))?;
            if tile.is_wall() {
                return Err(ActionError::Wall(coords));
            }
            if tile.revealed {
                return Err(ActionError::AlreadyRevealed(coords));
            }

            let annotation = tile.annotation.next();
            if let Some(tile) = engine.state.board.tile_mut(coords) {
                tile.annotation = annotation;
            }
            events.push(Event::TileAnnotated {
                at: coords,
                annotation,
            });
            Ok(None)
        })
    }

    pub fn end_turn(&mut self) -> Outcome {
        self.commit("end_turn", |engine, events| {
            engine.ensure_board_action()?;
            engine.ensure_turn(Turn::Player)?;
            engine.ensure_not_targeting()?;
            engine.pass_turn(events);
            Ok(None)
        })
    }

    /// Runs the opponent's whole turn: area effects tick, then one tile is
    /// revealed and the turn goes back to the player.
    pub fn opponent_move(&mut self) -> Outcome {
        self.commit("opponent_move", |engine, events| {
            engine.ensure_board_action()?;
            engine.ensure_turn(Turn::Opponent)?;

            let hits = tick_spell_effects(&mut engine.state.run, &mut engine.state.board);
            for hit in hits {
                engine.record_hit(hit, events);
            }

            let state = &mut engine.state;
            match engine.policy.choose_move(&state.board) {
                Some(coords) if state.board.reveal(coords, Turn::Opponent) => {
                    events.push(Event::TileRevealed {
                        at: coords,
                        by: Turn::Opponent,
                    });
                }
                Some(coords) => {
                    log::warn!(
                        "{} opponent chose unrevealable {:?}, passing",
                        engine.policy.name(),
                        coords
                    );
                }
                None => log::warn!("Opponent has no legal move, passing"),
            }

            engine.check_board_finished(events);
            if engine.state.board_status == BoardStatus::InProgress {
                engine.pass_turn(events);
            }
            Ok(None)
        })
    }

    pub fn use_item(&mut self, slot: usize) -> Outcome {
        self.commit("use_item", |engine, events| {
            engine.ensure_board_action()?;
            engine.ensure_turn(Turn::Player)?;
            engine.ensure_not_targeting()?;

            let item = match engine.state.run.inventory.get(slot) {
                Some(Slot::Item(item)) => item,
                Some(Slot::Spell(_)) => return Err(ActionError::NotAnItem(slot)),
                None => return Err(ActionError::EmptySlot(slot)),
            };

            match resolve_item(item, &engine.state.board, None) {
                Err(ActionError::TargetingRequired) => {
                    let mode =
                        TargetingMode::for_item(item, slot).ok_or(ActionError::NotAnItem(slot))?;
                    engine.start_targeting(mode, events);
                    Ok(Some(String::from("Choose a target")))
                }
                Err(reason) => Err(reason),
                Ok(effects) => {
                    engine.state.run.inventory.take(slot);
                    engine.apply_effects(effects, events);
                    events.push(Event::ItemUsed(item));
                    engine.after_player_action(events);
                    Ok(Some(format!("Used {:?}", item)))
                }
            }
        })
    }

    pub fn cast_spell(&mut self, slot: usize, target: Option<Coord2>) -> Outcome {
        self.commit("cast_spell", |engine, events| {
            engine.ensure_board_action()?;
            engine.ensure_turn(Turn::Player)?;
            engine.ensure_not_targeting()?;

            let spell = engine.spell_in(slot)?;
            match resolve_spell(spell, &engine.state.run, &engine.state.board, target) {
                Err(ActionError::TargetingRequired) => {
                    engine.start_targeting(TargetingMode::Spell { slot }, events);
                    Ok(Some(String::from("Choose a target")))
                }
                Err(reason) => Err(reason),
                Ok(effects) => Ok(Some(engine.finish_cast(spell, effects, events)?)),
            }
        })
    }

    pub fn cancel_targeting(&mut self) -> Outcome {
        self.commit("cancel_targeting", |engine, events| {
            engine.ensure_playing()?;
            if engine.state.targeting.take().is_none() {
                return Err(ActionError::NotTargeting);
            }
            events.push(Event::TargetingCancelled);
            Ok(None)
        })
    }

    pub fn drop_item(&mut self, slot: usize) -> Outcome {
        self.commit("drop_item", |engine, events| {
            engine.ensure_playing()?;
            engine.ensure_not_targeting()?;
            let dropped = engine
                .state
                .run
                .inventory
                .take(slot)
                .ok_or(ActionError::EmptySlot(slot))?;
            events.push(Event::ItemDropped(dropped));
            Ok(None)
        })
    }

    pub fn choose_upgrade(&mut self, choice: Option<usize>) -> Outcome {
        self.commit("choose_upgrade", |engine, events| {
            engine.ensure_playing()?;
            let choices = engine
                .state
                .upgrade_choice
                .as_ref()
                .ok_or(ActionError::NoUpgradePending)?;

            let picked = match choice {
                Some(index) => Some(
                    *choices
                        .get(index)
                        .ok_or(ActionError::InvalidChoice(index))?,
                ),
                None => None,
            };

            engine.state.upgrade_choice = None;
            match picked {
                Some(upgrade) => {
                    apply_upgrade(&mut engine.state.run, upgrade);
                    events.push(Event::UpgradeApplied(upgrade));
                }
                None => events.push(Event::UpgradeSkipped),
            }
            Ok(None)
        })
    }

    pub fn buy(&mut self, index: usize) -> Outcome {
        self.commit("buy", |engine, events| {
            engine.ensure_playing()?;
            if !engine.state.shop.open {
                return Err(ActionError::ShopClosed);
            }
            let offer = *engine
                .state
                .shop
                .offers
                .get(index)
                .ok_or(ActionError::InvalidOffer(index))?;

            let purchase = buy(&mut engine.state.run, &mut engine.state.shop.offers, index)?;
            events.push(Event::ItemPurchased {
                kind: offer.kind,
                cost: offer.cost,
            });
            match purchase {
                Purchase::Upgrade(upgrade) => events.push(Event::UpgradeApplied(upgrade)),
                Purchase::Item(item, pickup) => record_pickup(item, pickup, events),
            }
            Ok(Some(format!("Bought {:?} for {} gold", offer.kind, offer.cost)))
        })
    }

    pub fn close_shop(&mut self) -> Outcome {
        self.commit("close_shop", |engine, events| {
            engine.ensure_playing()?;
            if !engine.state.shop.open {
                return Err(ActionError::ShopClosed);
            }
            engine.state.shop = ShopState::default();
            events.push(Event::ShopClosed);
            Ok(None)
        })
    }

    pub fn progress_board(&mut self) -> Outcome {
        self.commit("progress_board", |engine, events| {
            engine.ensure_playing()?;
            if !engine.state.board_status.is_finished() {
                return Err(ActionError::BoardInProgress);
            }
            if engine.state.upgrade_choice.is_some() {
                return Err(ActionError::UpgradePending);
            }
            if engine.state.shop.open {
                return Err(ActionError::ShopOpen);
            }

            let next = engine.state.run.level.saturating_add(1);
            if next > engine.config.max_level {
                engine.state.game_status = GameStatus::RunComplete;
                events.push(Event::RunComplete);
                log::info!(
                    "Run complete with {} trophies",
                    engine.state.run.trophy_count()
                );
                return Ok(Some(String::from("Run complete")));
            }

            let board = generate_board(&mut engine.rng, &engine.config, next, &engine.state.run)?;
            engine.install_board(board, next, events);
            Ok(None)
        })
    }

    pub fn reset(&mut self) -> Outcome {
        self.commit("reset", |engine, events| {
            let run = RunState::default();
            let board = generate_board(&mut engine.rng, &engine.config, 1, &run)?;
            engine.state = GameState::new(board, run);
            events.push(Event::GameReset);
            Ok(None)
        })
    }

    // Debug surface, guarded like the intents it imitates

    /// Reveals every hidden tile of the player's, locks ignored, stopping
    /// early if something modal comes up or the run ends.
    pub fn debug_reveal_own_tiles(&mut self) -> Outcome {
        self.commit("debug_reveal_own_tiles", |engine, events| {
            engine.ensure_board_action()?;
            engine.ensure_turn(Turn::Player)?;
            engine.ensure_not_targeting()?;

            let pending: Vec<Coord2> = engine
                .state
                .board
                .iter()
                .filter(|(_, tile)| tile.owner == Owner::Player && !tile.revealed)
                .map(|(coords, _)| coords)
                .collect();
            for coords in pending {
                if engine.ensure_board_action().is_err() {
                    break;
                }
                engine.state.board.unlock(coords);
                if engine.state.board.can_reveal(coords) {
                    engine.reveal_as_player(coords, events)?;
                }
            }
            Ok(None)
        })
    }

    pub fn debug_add_gold(&mut self, amount: u32) -> Outcome {
        self.commit("debug_add_gold", |engine, events| {
            engine.ensure_playing()?;
            engine.state.run.gold = engine.state.run.gold.saturating_add(amount);
            events.push(Event::GoldCollected(amount));
            Ok(None)
        })
    }

    pub fn debug_add_health(&mut self, amount: i32) -> Outcome {
        self.commit("debug_add_health", |engine, events| {
            engine.ensure_playing()?;
            engine.state.run.heal(amount);
            events.push(Event::Healed(amount));
            Ok(None)
        })
    }

    pub fn debug_force_upgrade_choice(&mut self) -> Outcome {
        self.commit("debug_force_upgrade_choice", |engine, events| {
            engine.ensure_board_action()?;
            let choices = roll_upgrade_choices(&engine.state.run, UPGRADE_CHOICES, &mut engine.rng);
            if choices.is_empty() {
                return Err(ActionError::NoUpgradePending);
            }
            engine.offer_upgrades(choices, events);
            Ok(None)
        })
    }

    // Transitions

    fn install_board(&mut self, board: Board, level: u8, events: &mut Vec<Event>) {
        let state = &mut self.state;
        state.board = board;
        state.run.level = level;
        state.board_status = BoardStatus::InProgress;
        state.current_turn = Turn::Player;
        state.clues.clear();
        state.targeting = None;
        state.shop = ShopState::default();
        state.upgrade_choice = None;
        state.run.spell_effects.clear();
        state.run.refill_mana();
        let bulwark = state.run.upgrade_count(UpgradeId::Bulwark);
        state.run.buffs.protection = state.run.buffs.protection.saturating_add(bulwark);

        events.push(Event::NextBoard { level });
        self.add_clue(false, events);
        log::info!(
            "Level {} ({}x{})",
            level,
            self.state.board.width(),
            self.state.board.height()
        );
    }

    fn pass_turn(&mut self, events: &mut Vec<Event>) {
        let next = self.state.current_turn.other();
        self.state.current_turn = next;
        events.push(Event::TurnEnded { next });
    }

    fn player_reveal(&mut self, coords: Coord2, events: &mut Vec<Event>) -> ActionResult<()> {
        let owner = self
            .state
            .board
            .tile(coords)
            .map(|tile| tile.owner)
            .ok_or(ActionError::OutOfBounds(coords))?;
        self.reveal_as_player(coords, events)?;

        if !self.board_live() || owner == Owner::Player {
            return Ok(());
        }
        if self.state.run.buffs.protection > 0 {
            self.state.run.buffs.protection -= 1;
            events.push(Event::ProtectionUsed);
        } else {
            self.pass_turn(events);
        }
        Ok(())
    }

    fn reveal_as_player(&mut self, coords: Coord2, events: &mut Vec<Event>) -> ActionResult<()> {
        self.state
            .board
            .check_revealable(coords)
            .map_err(|reason| reason.into_action_error(coords))?;
        self.state.board.reveal(coords, Turn::Player);
        events.push(Event::TileRevealed {
            at: coords,
            by: Turn::Player,
        });

        let resolution = resolve_reveal(
            &mut self.state.run,
            &mut self.state.board,
            coords,
            &mut self.rng,
        );
        self.record_resolution(resolution, events);
        self.after_player_action(events);
        Ok(())
    }

    fn board_live(&self) -> bool {
        self.state.game_status == GameStatus::Playing
            && self.state.board_status == BoardStatus::InProgress
    }

    fn after_player_action(&mut self, events: &mut Vec<Event>) {
        if self.state.game_status != GameStatus::Playing {
            return;
        }
        if self.state.run.is_dead() {
            self.state.game_status = GameStatus::PlayerDied;
            self.state.targeting = None;
            events.push(Event::PlayerDied);
            log::info!("Player died on level {}", self.state.run.level);
            return;
        }
        self.check_board_finished(events);
    }

    fn check_board_finished(&mut self, events: &mut Vec<Event>) {
        if self.state.board_status.is_finished() {
            return;
        }
        match self.state.board.status() {
            BoardStatus::InProgress => {}
            BoardStatus::Won => {
                self.state.board_status = BoardStatus::Won;
                self.state.targeting = None;
                self.state.run.earn_trophy(TrophySource::Board);
                events.push(Event::BoardWon);
                events.push(Event::TrophyEarned(TrophySource::Board));
                log::info!("Board {} won", self.state.run.level);
                if self.config.is_shop_level(self.state.run.level) {
                    self.open_shop_now(events);
                }
            }
            BoardStatus::Lost => {
                self.state.board_status = BoardStatus::Lost;
                self.state.targeting = None;
                events.push(Event::BoardLost);
                match self.state.run.steal_trophy() {
                    Some(trophy) => {
                        log::info!("Board {} lost, trophy stolen", self.state.run.level);
                        events.push(Event::TrophyStolen(trophy));
                    }
                    None => {
                        log::info!("Board {} lost with no trophy left", self.state.run.level);
                        self.state.game_status = GameStatus::OpponentWon;
                        events.push(Event::OpponentWon);
                    }
                }
            }
        }
    }

    fn open_shop_now(&mut self, events: &mut Vec<Event>) {
        let offers = open_shop(
            &self.state.run,
            self.state.run.level,
            self.config.shop_cadence,
            &mut self.rng,
        );
        self.state.shop = ShopState { open: true, offers };
        events.push(Event::ShopOpened);
    }

    fn offer_upgrades(&mut self, choices: Vec<UpgradeId>, events: &mut Vec<Event>) {
        events.push(Event::UpgradeChoiceOffered(choices.clone()));
        self.state.upgrade_choice = Some(choices);
    }

    fn add_clue(&mut self, glimpse: bool, events: &mut Vec<Event>) {
        let spec = self.state.run.clue_spec(glimpse);
        match generate_clue(&self.state.board, spec, &mut self.rng) {
            Some(clue) => {
                self.state.clues.push(clue);
                events.push(Event::ClueAdded);
            }
            None => log::debug!("No clue left to draw"),
        }
    }

    fn start_targeting(&mut self, mode: TargetingMode, events: &mut Vec<Event>) {
        self.state.targeting = Some(mode);
        events.push(Event::TargetingStarted(mode));
    }

    fn spell_in(&self, slot: usize) -> ActionResult<SpellId> {
        match self.state.run.inventory.get(slot) {
            Some(Slot::Spell(spell)) => Ok(spell),
            Some(Slot::Item(_)) => Err(ActionError::NotASpell(slot)),
            None => Err(ActionError::EmptySlot(slot)),
        }
    }

    fn finish_cast(
        &mut self,
        spell: SpellId,
        effects: Vec<Effect>,
        events: &mut Vec<Event>,
    ) -> ActionResult<String> {
        self.state.run.spend_mana(spell.mana_cost())?;
        let first = events.len();
        self.apply_effects(effects, events);
        events.push(Event::SpellCast(spell));

        let mut message = format!("Cast {:?}", spell);
        for event in &events[first..] {
            match event {
                Event::MonsterDamaged { kind, damage, .. } => {
                    message.push_str(&format!(", {:?} takes {}", kind, damage));
                }
                Event::MonsterDefeated { kind, .. } => {
                    message.push_str(&format!(", {:?} defeated", kind));
                }
                _ => {}
            }
        }
        self.after_player_action(events);
        Ok(message)
    }

    fn resolve_targeting(
        &mut self,
        mode: TargetingMode,
        coords: Coord2,
        events: &mut Vec<Event>,
    ) -> ActionResult<Option<String>> {
        let slot = mode.slot();
        if let TargetingMode::Spell { .. } = mode {
            let spell = self.spell_in(slot)?;
            let effects = resolve_spell(spell, &self.state.run, &self.state.board, Some(coords))?;
            let message = self.finish_cast(spell, effects, events)?;
            self.state.targeting = None;
            return Ok(Some(message));
        }

        let item = match self.state.run.inventory.get(slot) {
            Some(Slot::Item(item)) => item,
            Some(Slot::Spell(_)) => return Err(ActionError::NotAnItem(slot)),
            None => return Err(ActionError::EmptySlot(slot)),
        };
        let effects = resolve_item(item, &self.state.board, Some(coords))?;

        self.state.targeting = None;
        self.consume_item(slot, item);
        events.push(Event::ItemUsed(item));
        self.apply_effects(effects, events);
        self.after_player_action(events);
        Ok(Some(format!("Used {:?} on {:?}", item, coords)))
    }

    fn consume_item(&mut self, slot: usize, item: ItemKind) {
        let remaining = match item {
            ItemKind::Staff { charges } if charges > 1 => Some(ItemKind::Staff {
                charges: charges - 1,
            }),
            ItemKind::Ring { charges } if charges > 1 => Some(ItemKind::Ring {
                charges: charges - 1,
            }),
            _ => None,
        };
        self.state
            .run
            .inventory
            .replace(slot, remaining.map(Slot::Item));
    }

    fn apply_effects(&mut self, effects: Vec<Effect>, events: &mut Vec<Event>) {
        for effect in effects {
            self.apply_effect(effect, events);
        }
    }

    fn apply_effect(&mut self, effect: Effect, events: &mut Vec<Event>) {
        let state = &mut self.state;
        match effect {
            Effect::Damage { at, amount } => {
                if let Some(hit) = damage_monster(&mut state.run, &mut state.board, at, amount) {
                    self.record_hit(hit, events);
                }
            }
            Effect::Heal(amount) => {
                state.run.heal(amount);
                events.push(Event::Healed(amount));
            }
            Effect::RestoreMana(amount) => state.run.restore_mana(amount),
            Effect::AddSpellEffect(spell_effect) => state.run.spell_effects.push(spell_effect),
            Effect::Clue { glimpse } => self.add_clue(glimpse, events),
            Effect::Scan { at } => {
                let scan = state.board.scan(at);
                if let Some(tile) = state.board.tile_mut(at) {
                    tile.detector_scan = Some(scan);
                }
            }
            Effect::Unlock { at } => {
                state.board.unlock(at);
            }
            Effect::Transmute { at } => {
                if state.board.set_owner(at, Owner::Player) {
                    if let Err(reason) = self.reveal_as_player(at, events) {
                        log::warn!("Transmuted tile {:?} could not be revealed: {}", at, reason);
                    }
                }
            }
            Effect::ClearFog { at } => {
                for pos in state.board.iter_area(at) {
                    if let Some(tile) = state.board.tile_mut(pos) {
                        tile.fogged = false;
                    }
                }
            }
            Effect::Buff(buff) => grant_buff(&mut state.run, buff),
        }
    }

    fn record_hit(&mut self, hit: MonsterHit, events: &mut Vec<Event>) {
        events.push(Event::MonsterDamaged {
            at: hit.at,
            kind: hit.kind,
            damage: hit.damage,
        });
        if let Some(defeat) = hit.defeat {
            record_defeat(defeat, events);
        }
    }

    fn record_resolution(&mut self, resolution: Resolution, events: &mut Vec<Event>) {
        match resolution {
            Resolution::Nothing => {}
            Resolution::Fight {
                kind,
                report,
                damage,
                defeat,
            } => {
                events.push(Event::MonsterFought {
                    kind,
                    damage,
                    rounds: report.rounds,
                });
                if let Some(defeat) = defeat {
                    record_defeat(defeat, events);
                }
            }
            Resolution::Trap { damage } => events.push(Event::TrapTriggered { damage }),
            Resolution::Gold(amount) | Resolution::Loot(amount) => {
                events.push(Event::GoldCollected(amount));
            }
            Resolution::Item(item, pickup) => record_pickup(item, pickup, events),
            Resolution::UpgradeChoice(choices) => {
                if !choices.is_empty() {
                    self.offer_upgrades(choices, events);
                }
            }
            Resolution::Shop => self.open_shop_now(events),
        }
    }
}

fn record_defeat(defeat: Defeat, events: &mut Vec<Event>) {
    events.push(Event::MonsterDefeated {
        kind: defeat.kind,
        gold: defeat.gold,
    });
    if defeat.trophy {
        events.push(Event::TrophyEarned(TrophySource::Boss(defeat.kind)));
    }
}

fn record_pickup(item: ItemKind, pickup: Pickup, events: &mut Vec<Event>) {
    match pickup {
        Pickup::Lost => events.push(Event::ItemLost(item)),
        pickup => events.push(Event::ItemCollected { item, pickup }),
    }
}
