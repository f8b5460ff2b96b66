//! Minecraft block type definitions and property lookups.
//!
//! BlockId values are MC 1.21.11 block state IDs, so the view's contents can
//! be fed directly into protocol chunk data without a mapping layer. Blocks
//! with multiple states list their default-state ID plus the state range
//! where a whole family matters (water levels, piston orientations).

use shroud_engine::world::block::BlockId;

// -- Common terrain --

pub const AIR: BlockId = BlockId(0);
pub const STONE: BlockId = BlockId(1);
pub const DIRT: BlockId = BlockId(10);
/// level=0 (source); flowing states run through 95.
pub const WATER: BlockId = BlockId(80);
pub const BEDROCK: BlockId = BlockId(85);
pub const NETHERRACK: BlockId = BlockId(7568);
pub const END_STONE: BlockId = BlockId(9222);

// -- Ores (the default candidate set) --

pub const GOLD_ORE: BlockId = BlockId(125);
pub const DEEPSLATE_GOLD_ORE: BlockId = BlockId(126);
pub const IRON_ORE: BlockId = BlockId(127);
pub const DEEPSLATE_IRON_ORE: BlockId = BlockId(128);
pub const COAL_ORE: BlockId = BlockId(129);
pub const DEEPSLATE_COAL_ORE: BlockId = BlockId(130);
pub const NETHER_GOLD_ORE: BlockId = BlockId(131);
pub const LAPIS_ORE: BlockId = BlockId(520);
pub const DEEPSLATE_LAPIS_ORE: BlockId = BlockId(521);
pub const DIAMOND_ORE: BlockId = BlockId(4274);
pub const DEEPSLATE_DIAMOND_ORE: BlockId = BlockId(4275);
pub const COPPER_ORE: BlockId = BlockId(5342);
pub const DEEPSLATE_COPPER_ORE: BlockId = BlockId(5343);
/// lit=false.
pub const REDSTONE_ORE: BlockId = BlockId(5735);
/// lit=false.
pub const DEEPSLATE_REDSTONE_ORE: BlockId = BlockId(5737);
pub const EMERALD_ORE: BlockId = BlockId(5963);
pub const DEEPSLATE_EMERALD_ORE: BlockId = BlockId(5964);
pub const NETHER_QUARTZ_ORE: BlockId = BlockId(7569);
pub const ANCIENT_DEBRIS: BlockId = BlockId(18324);

// -- Decoy / whitelist blocks --

pub const REDSTONE_BLOCK: BlockId = BlockId(5867);
/// extended=false, facing=north; the family spans 12 states each.
pub const STICKY_PISTON: BlockId = BlockId(1892);
pub const PISTON: BlockId = BlockId(1904);
pub const PISTON_HEAD: BlockId = BlockId(1916);
pub const MOVING_PISTON: BlockId = BlockId(1941);

/// Is this block an ore (sensitive by default)?
pub fn is_ore(id: BlockId) -> bool {
    default_candidates().contains(&id)
}

/// All water states, source and flowing.
pub fn is_water(id: BlockId) -> bool {
    (WATER.0..WATER.0 + 16).contains(&id.0)
}

/// Blocks whose appearance (as the final state of a break) reveals no
/// terrain: breaking into air or a piston's moving parts says nothing about
/// what was mined, so no radius reveal is warranted.
pub fn is_reveal_exempt(id: BlockId) -> bool {
    id == AIR
        || (STICKY_PISTON.0..STICKY_PISTON.0 + 12).contains(&id.0)
        || (PISTON.0..PISTON.0 + 12).contains(&id.0)
        || (PISTON_HEAD.0..PISTON_HEAD.0 + 24).contains(&id.0)
        || (MOVING_PISTON.0..MOVING_PISTON.0 + 12).contains(&id.0)
}

/// The ore set masked when a world's config lists no candidates of its own.
pub fn default_candidates() -> &'static [BlockId] {
    &[
        GOLD_ORE,
        DEEPSLATE_GOLD_ORE,
        IRON_ORE,
        DEEPSLATE_IRON_ORE,
        COAL_ORE,
        DEEPSLATE_COAL_ORE,
        NETHER_GOLD_ORE,
        LAPIS_ORE,
        DEEPSLATE_LAPIS_ORE,
        DIAMOND_ORE,
        DEEPSLATE_DIAMOND_ORE,
        COPPER_ORE,
        DEEPSLATE_COPPER_ORE,
        REDSTONE_ORE,
        DEEPSLATE_REDSTONE_ORE,
        EMERALD_ORE,
        DEEPSLATE_EMERALD_ORE,
        NETHER_QUARTZ_ORE,
        ANCIENT_DEBRIS,
    ]
}

/// All water states, for modifier rule construction.
pub fn water_states() -> impl Iterator<Item = BlockId> {
    (WATER.0..WATER.0 + 16).map(BlockId)
}

/// Which dimension a world is, for filler selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

/// The context-plausible filler shown for enclosed candidates: whatever the
/// bulk terrain of the dimension is.
pub fn dimension_filler(dimension: Dimension) -> BlockId {
    match dimension {
        Dimension::Overworld => STONE,
        Dimension::Nether => NETHERRACK,
        Dimension::End => END_STONE,
    }
}

/// Resolve a block name from configuration. Accepts the bare name or the
/// `minecraft:` form. Unknown names return `None`; callers treat those as
/// non-candidate rather than failing.
pub fn by_name(name: &str) -> Option<BlockId> {
    let name = name.strip_prefix("minecraft:").unwrap_or(name);
    let id = match name {
        "air" => AIR,
        "stone" => STONE,
        "dirt" => DIRT,
        "water" => WATER,
        "bedrock" => BEDROCK,
        "netherrack" => NETHERRACK,
        "end_stone" => END_STONE,
        "gold_ore" => GOLD_ORE,
        "deepslate_gold_ore" => DEEPSLATE_GOLD_ORE,
        "iron_ore" => IRON_ORE,
        "deepslate_iron_ore" => DEEPSLATE_IRON_ORE,
        "coal_ore" => COAL_ORE,
        "deepslate_coal_ore" => DEEPSLATE_COAL_ORE,
        "nether_gold_ore" => NETHER_GOLD_ORE,
        "lapis_ore" => LAPIS_ORE,
        "deepslate_lapis_ore" => DEEPSLATE_LAPIS_ORE,
        "diamond_ore" => DIAMOND_ORE,
        "deepslate_diamond_ore" => DEEPSLATE_DIAMOND_ORE,
        "copper_ore" => COPPER_ORE,
        "deepslate_copper_ore" => DEEPSLATE_COPPER_ORE,
        "redstone_ore" => REDSTONE_ORE,
        "deepslate_redstone_ore" => DEEPSLATE_REDSTONE_ORE,
        "emerald_ore" => EMERALD_ORE,
        "deepslate_emerald_ore" => DEEPSLATE_EMERALD_ORE,
        "nether_quartz_ore" => NETHER_QUARTZ_ORE,
        "ancient_debris" => ANCIENT_DEBRIS,
        "redstone_block" => REDSTONE_BLOCK,
        "sticky_piston" => STICKY_PISTON,
        "piston" => PISTON,
        "piston_head" => PISTON_HEAD,
        "moving_piston" => MOVING_PISTON,
        _ => return None,
    };
    Some(id)
}
