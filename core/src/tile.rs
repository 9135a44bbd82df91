use serde::{Deserialize, Serialize};

use crate::{Coord2, ItemKind, Monster};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Opponent,
    Neutral,
    Wall,
}

impl Owner {
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'P' | 'p' => Some(Self::Player),
            'O' | 'o' => Some(Self::Opponent),
            'N' | 'n' | '.' => Some(Self::Neutral),
            'W' | 'w' | '#' => Some(Self::Wall),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Turn {
    Player,
    Opponent,
}

impl Turn {
    pub const fn owner(self) -> Owner {
        match self {
            Self::Player => Owner::Player,
            Self::Opponent => Owner::Opponent,
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Annotation {
    #[default]
    None,
    Slash,
    DogEar,
}

impl Annotation {
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::Slash,
            Self::Slash => Self::DogEar,
            Self::DogEar => Self::None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeCache {
    pub choice_count: u8,
}

impl Default for UpgradeCache {
    fn default() -> Self {
        Self { choice_count: 3 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Content {
    #[default]
    Empty,
    Monster(Monster),
    Trap,
    Gold(u32),
    Item(ItemKind),
    Upgrade(UpgradeCache),
    Shop,
}

impl Content {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub const fn monster(&self) -> Option<&Monster> {
        match self {
            Self::Monster(monster) => Some(monster),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorScan {
    pub player: u8,
    pub opponent: u8,
    pub neutral: u8,
    pub wall: u8,
}

impl DetectorScan {
    pub fn record(&mut self, owner: Owner) {
        match owner {
            Owner::Player => self.player += 1,
            Owner::Opponent => self.opponent += 1,
            Owner::Neutral => self.neutral += 1,
            Owner::Wall => self.wall += 1,
        }
    }
}

/// Lock/key link. `requires` must be revealed before this tile can be;
/// `unlocks` is the tile this one holds the key for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub id: u8,
    pub requires: Option<Coord2>,
    pub unlocks: Option<Coord2>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub owner: Owner,
    pub content: Content,
    pub revealed: bool,
    pub revealed_by: Option<Turn>,
    pub annotation: Annotation,
    pub fogged: bool,
    pub detector_scan: Option<DetectorScan>,
    pub chain: Option<Chain>,
}

impl Tile {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            content: Content::Empty,
            revealed: false,
            revealed_by: None,
            annotation: Annotation::None,
            fogged: false,
            detector_scan: None,
            chain: None,
        }
    }

    pub const fn is_wall(&self) -> bool {
        matches!(self.owner, Owner::Wall)
    }

    /// What the player can see on this tile; fog hides unrevealed content.
    pub fn visible_content(&self) -> Option<&Content> {
        if self.fogged && !self.revealed {
            None
        } else {
            Some(&self.content)
        }
    }

    pub fn visible_owner(&self) -> Option<Owner> {
        (self.revealed || self.is_wall()).then_some(self.owner)
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::new(Owner::Neutral)
    }
}
