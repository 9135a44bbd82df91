use alloc::string::String;
use thiserror::Error;

use crate::{Coord2, ItemKind, Turn};

/// Hard failures: the request can never succeed as given.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Level {level} is not configured (1..={max})")]
    InvalidLevel { level: u8, max: u8 },
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = core::result::Result<T, EngineError>;

pub type ActionResult<T> = core::result::Result<T, ActionError>;

/// Recoverable rejections of a single intent. Never changes state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("No run in progress")]
    NotPlaying,
    #[error("A character has already been chosen")]
    AlreadyStarted,
    #[error("The board is already finished")]
    BoardFinished,
    #[error("The board is still in progress")]
    BoardInProgress,
    #[error("It is the {0:?} turn")]
    WrongTurn(Turn),
    #[error("Choose an upgrade first")]
    UpgradePending,
    #[error("No upgrade choice is pending")]
    NoUpgradePending,
    #[error("Upgrade choice {0} does not exist")]
    InvalidChoice(usize),
    #[error("The shop is open")]
    ShopOpen,
    #[error("The shop is closed")]
    ShopClosed,
    #[error("Shop offer {0} does not exist")]
    InvalidOffer(usize),
    #[error("Finish or cancel targeting first")]
    TargetingActive,
    #[error("Nothing is being targeted")]
    NotTargeting,
    #[error("Pick a target first")]
    TargetingRequired,
    #[error("Tile {0:?} is out of bounds")]
    OutOfBounds(Coord2),
    #[error("Tile {0:?} is already revealed")]
    AlreadyRevealed(Coord2),
    #[error("Tile {0:?} is locked")]
    Blocked(Coord2),
    #[error("Tile {0:?} is a wall")]
    Wall(Coord2),
    #[error("Invalid target at {0:?}: {1}")]
    InvalidTarget(Coord2, &'static str),
    #[error("Inventory slot {0} is empty")]
    EmptySlot(usize),
    #[error("Inventory slot {0} does not hold a spell")]
    NotASpell(usize),
    #[error("Inventory slot {0} holds a spell")]
    NotAnItem(usize),
    #[error("{0:?} cannot be used")]
    NotUsable(ItemKind),
    #[error("Not enough mana: needs {needed}, you have {available}")]
    InsufficientMana { needed: u32, available: u32 },
    #[error("Not enough gold: needs {needed} gold, you have {available}")]
    InsufficientGold { needed: u32, available: u32 },
    #[error("Board generation failed: {0}")]
    Generation(#[from] EngineError),
}
