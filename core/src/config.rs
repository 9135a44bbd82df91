use alloc::string::ToString;
use alloc::vec::Vec;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::*;

pub const DEFAULT_MAX_LEVEL: u8 = 12;
pub const DEFAULT_SHOP_CADENCE: u8 = 3;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRange {
    pub min: u8,
    pub max: u8,
}

impl SpawnRange {
    pub const NONE: Self = Self::new(0, 0);

    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub const fn exactly(count: u8) -> Self {
        Self::new(count, count)
    }

    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> u8 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        rng.random_range(lo..=hi)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpawn {
    pub item: ItemKind,
    pub count: SpawnRange,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub width: Coord,
    pub height: Coord,
    pub player_percent: u8,
    pub opponent_percent: u8,
    pub walls: SpawnRange,
    pub fog: SpawnRange,
    pub monsters: SpawnRange,
    pub traps: SpawnRange,
    pub gold: SpawnRange,
    pub upgrades: SpawnRange,
    pub shops: SpawnRange,
    pub chains: SpawnRange,
    pub rare_items: SpawnRange,
    pub consumables: Vec<ItemSpawn>,
    #[serde(default)]
    pub guaranteed_new_monster: bool,
}

impl LevelSpec {
    pub fn builtin(level: u8) -> Self {
        let l = level.max(1);
        let unlocked = |from: u8| SpawnRange::new(0, u8::from(l >= from));
        let consumables = [
            (ItemKind::Potion, unlocked(1)),
            (ItemKind::CrystalBall, unlocked(1)),
            (ItemKind::Ward, unlocked(1)),
            (ItemKind::Detector, unlocked(2)),
            (ItemKind::Spyglass, unlocked(2)),
            (ItemKind::Ether, unlocked(3)),
            (ItemKind::Blaze, unlocked(3)),
            (ItemKind::Key, unlocked(4)),
            (ItemKind::Shield, unlocked(5)),
            (ItemKind::Transmute, unlocked(6)),
        ]
        .into_iter()
        .filter(|(_, count)| count.max > 0)
        .map(|(item, count)| ItemSpawn { item, count })
        .collect();

        Self {
            width: 6 + (l - 1) / 2,
            height: 6 + l / 3,
            player_percent: 38,
            opponent_percent: 30 + l.min(20),
            walls: SpawnRange::new(0, l / 3),
            fog: SpawnRange::new(l / 2, l),
            monsters: SpawnRange::new(1 + l / 2, 2 + l),
            traps: SpawnRange::new(l / 3, 1 + l / 2),
            gold: SpawnRange::new(2, 3 + l / 2),
            upgrades: if l % 2 == 0 {
                SpawnRange::exactly(1)
            } else {
                SpawnRange::new(0, 1)
            },
            shops: if l >= 5 && l % 4 == 1 {
                SpawnRange::new(0, 1)
            } else {
                SpawnRange::NONE
            },
            chains: SpawnRange::new(l / 8, l / 4),
            rare_items: unlocked(4),
            consumables,
            guaranteed_new_monster: l % 3 == 1,
        }
    }

    pub fn area(&self) -> CellCount {
        mult(self.width, self.height)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub seed: u64,
    pub max_level: u8,
    pub shop_cadence: u8,
    pub levels: Vec<LevelSpec>,
}

impl RunConfig {
    pub fn new(seed: u64, max_level: u8, shop_cadence: u8) -> Self {
        let max_level = max_level.max(1);
        let levels = (1..=max_level).map(LevelSpec::builtin).collect();
        Self {
            seed,
            max_level,
            shop_cadence: shop_cadence.max(1),
            levels,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| EngineError::InvalidConfig(err.to_string()))?;
        config.validated()
    }

    /// Clamps out-of-range values and rejects tables that cannot be played.
    pub fn validated(mut self) -> Result<Self> {
        if self.levels.is_empty() {
            return Err(EngineError::InvalidConfig("no levels configured".to_string()));
        }
        for (index, spec) in self.levels.iter().enumerate() {
            if spec.width == 0 || spec.height == 0 || spec.area() < 2 {
                return Err(EngineError::InvalidConfig(alloc::format!(
                    "level {} is too small",
                    index + 1
                )));
            }
            let claimed = u16::from(spec.player_percent) + u16::from(spec.opponent_percent);
            if spec.player_percent > 100 || spec.opponent_percent > 100 || claimed > 100 {
                return Err(EngineError::InvalidConfig(alloc::format!(
                    "level {} gives out {}% of its tiles",
                    index + 1,
                    claimed
                )));
            }
        }

        let available = u8::try_from(self.levels.len()).unwrap_or(u8::MAX);
        if self.max_level == 0 || self.max_level > available {
            log::warn!(
                "max_level {} clamped to the {} configured levels",
                self.max_level,
                available
            );
            self.max_level = self.max_level.clamp(1, available);
        }
        if self.shop_cadence == 0 {
            log::warn!("shop_cadence of 0 clamped to 1");
            self.shop_cadence = 1;
        }
        Ok(self)
    }

    pub fn level_spec(&self, level: u8) -> Result<&LevelSpec> {
        if level == 0 || level > self.max_level {
            return Err(EngineError::InvalidLevel {
                level,
                max: self.max_level,
            });
        }
        self.levels
            .get(usize::from(level - 1))
            .ok_or(EngineError::InvalidLevel {
                level,
                max: self.max_level,
            })
    }

    pub fn is_shop_level(&self, level: u8) -> bool {
        level % self.shop_cadence.max(1) == 0
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(0, DEFAULT_MAX_LEVEL, DEFAULT_SHOP_CADENCE)
    }
}
