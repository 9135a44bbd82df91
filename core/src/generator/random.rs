use alloc::vec::Vec;
use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::SmallRng;

use super::*;

pub const PLACEMENT_ATTEMPTS: u32 = 64;

/// Purely random layout: shuffled ownership, then content dropped on random
/// free tiles, then lock/key chains and fog.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomBoardGenerator {
    seed: u64,
}

impl RandomBoardGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

/// Player and opponent tile counts for `spec`: both at least one, together
/// never more than the area.
pub fn ownership_counts(spec: &LevelSpec) -> (CellCount, CellCount) {
    let area = spec.area();
    let mut player = percent_of(area, spec.player_percent).max(1);
    let mut opponent = percent_of(area, spec.opponent_percent).max(1);

    while player.saturating_add(opponent) > area {
        if player >= opponent && player > 1 {
            player -= 1;
        } else if opponent > 1 {
            opponent -= 1;
        } else {
            break;
        }
    }
    (player, opponent)
}

impl BoardGenerator for RandomBoardGenerator {
    fn generate(self, spec: &LevelSpec, context: &GenerationContext<'_>) -> Result<Board> {
        let area = spec.area();
        if spec.width == 0 || spec.height == 0 || area < 2 {
            return Err(EngineError::InvalidBoardShape);
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let owners = layout_owners(spec, &mut rng)?;
        let mut board = Board::from_owners(owners);
        let level = context.level;

        let mut placer = Placer {
            board: &mut board,
            rng: &mut rng,
        };

        let monsters = spec.monsters.sample(placer.rng);
        let mut pool: Vec<MonsterKind> = MonsterKind::available_at(level).collect();
        if pool.is_empty() {
            pool.push(MonsterKind::Rat);
        }
        for index in 0..monsters {
            let kind = if index == 0 && spec.guaranteed_new_monster {
                new_monster_kind(&pool, context.seen_monsters)
            } else {
                pool.choose(placer.rng).copied().unwrap_or(MonsterKind::Rat)
            };
            if !placer.place(Content::Monster(Monster::spawn(kind, level)), "monster") {
                break;
            }
        }

        placer.place_many(spec.traps, "trap", |_| Content::Trap);

        let rich = u8::try_from(context.carried_gold / 25).unwrap_or(u8::MAX);
        let gold = SpawnRange::new(spec.gold.min, spec.gold.max.saturating_sub(rich).max(spec.gold.min));
        let (gold_lo, gold_hi) = (1 + u32::from(level / 3), 2 + u32::from(level / 2));
        placer.place_many(gold, "gold", |rng| Content::Gold(rng.random_range(gold_lo..=gold_hi)));

        for spawn in &spec.consumables {
            let item = spawn.item;
            placer.place_many(spawn.count, "consumable", |_| Content::Item(item));
        }
        placer.place_many(spec.rare_items, "rare item", |rng| {
            Content::Item(if rng.random_bool(0.5) {
                ItemKind::staff()
            } else {
                ItemKind::ring()
            })
        });
        placer.place_many(spec.upgrades, "upgrade", |_| {
            Content::Upgrade(UpgradeCache::default())
        });
        placer.place_many(spec.shops, "shop", |_| Content::Shop);

        let chains = spec.chains.sample(&mut rng);
        place_chains(&mut board, &mut rng, chains);

        let fog = usize::from(spec.fog.sample(&mut rng));
        let mut open: Vec<Coord2> = board
            .iter()
            .filter(|(_, tile)| !tile.is_wall())
            .map(|(coords, _)| coords)
            .collect();
        open.shuffle(&mut rng);
        for &coords in open.iter().take(fog) {
            if let Some(tile) = board.tile_mut(coords) {
                tile.fogged = true;
            }
        }

        log::debug!(
            "Generated level {} board {}x{}: {} player, {} opponent tiles",
            level,
            spec.width,
            spec.height,
            board.player_total(),
            board.opponent_total()
        );
        Ok(board)
    }
}

fn layout_owners(spec: &LevelSpec, rng: &mut SmallRng) -> Result<Array2<Owner>> {
    let area = usize::from(spec.area());
    let (player, opponent) = ownership_counts(spec);

    let mut owners = Vec::with_capacity(area);
    owners.resize(usize::from(player), Owner::Player);
    owners.resize(usize::from(player + opponent), Owner::Opponent);
    owners.resize(area, Owner::Neutral);
    owners.shuffle(rng);

    // walls only replace neutral tiles so ownership totals stay exact
    let walls = usize::from(spec.walls.sample(rng));
    let mut neutral: Vec<usize> = owners
        .iter()
        .enumerate()
        .filter(|(_, owner)| **owner == Owner::Neutral)
        .map(|(index, _)| index)
        .collect();
    neutral.shuffle(rng);
    for &index in neutral.iter().take(walls) {
        owners[index] = Owner::Wall;
    }

    let shape = [usize::from(spec.width), usize::from(spec.height)];
    Array2::from_shape_vec(shape, owners).map_err(|_| EngineError::InvalidBoardShape)
}

fn new_monster_kind(pool: &[MonsterKind], seen: &HashSet<MonsterKind>) -> MonsterKind {
    pool.iter()
        .copied()
        .find(|kind| !seen.contains(kind))
        .or_else(|| MONSTERS.iter().map(|t| t.kind).find(|kind| !seen.contains(kind)))
        .or_else(|| pool.first().copied())
        .unwrap_or(MonsterKind::Rat)
}

struct Placer<'a> {
    board: &'a mut Board,
    rng: &'a mut SmallRng,
}

impl Placer<'_> {
    fn place(&mut self, content: Content, category: &str) -> bool {
        let (width, height) = self.board.size();
        for _ in 0..PLACEMENT_ATTEMPTS {
            let coords = (
                self.rng.random_range(0..width),
                self.rng.random_range(0..height),
            );
            let Some(tile) = self.board.tile_mut(coords) else {
                continue;
            };
            if tile.is_wall() || tile.revealed || !tile.content.is_empty() {
                continue;
            }
            tile.content = content;
            return true;
        }
        log::warn!(
            "Could not place {} after {} attempts, dropping the rest",
            category,
            PLACEMENT_ATTEMPTS
        );
        false
    }

    fn place_many(
        &mut self,
        range: SpawnRange,
        category: &str,
        mut make: impl FnMut(&mut SmallRng) -> Content,
    ) -> u8 {
        let count = range.sample(self.rng);
        for placed in 0..count {
            let content = make(self.rng);
            if !self.place(content, category) {
                return placed;
            }
        }
        count
    }
}

fn place_chains(board: &mut Board, rng: &mut SmallRng, chains: u8) {
    let mut free: Vec<Coord2> = board
        .iter()
        .filter(|(_, tile)| !tile.is_wall() && tile.chain.is_none())
        .map(|(coords, _)| coords)
        .collect();
    free.shuffle(rng);

    for id in 0..chains {
        let len = if free.len() >= 3 && rng.random_bool(0.5) {
            3
        } else {
            2
        };
        if free.len() < len {
            log::warn!("Only room for {} of {} chains", id, chains);
            return;
        }
        let links = free.split_off(free.len() - len);

        for (index, &coords) in links.iter().enumerate() {
            let requires = index.checked_sub(1).map(|prev| links[prev]);
            let unlocks = links.get(index + 1).copied();
            if let Some(tile) = board.tile_mut(coords) {
                tile.chain = Some(Chain {
                    id,
                    requires,
                    unlocks,
                });
            }
        }
    }
}
