use hashbrown::HashSet;

use crate::*;
pub use random::*;

mod random;

#[derive(Copy, Clone, Debug)]
pub struct GenerationContext<'a> {
    pub level: u8,
    pub carried_gold: u32,
    pub seen_monsters: &'a HashSet<MonsterKind>,
}

pub trait BoardGenerator {
    fn generate(self, spec: &LevelSpec, context: &GenerationContext<'_>) -> Result<Board>;
}

/// Looks up `level` in `config` and generates it, rejecting unknown levels.
pub fn generate_level<G: BoardGenerator>(
    generator: G,
    config: &RunConfig,
    context: &GenerationContext<'_>,
) -> Result<Board> {
    let spec = config.level_spec(context.level)?;
    generator.generate(spec, context)
}
