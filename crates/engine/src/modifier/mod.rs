//! Masking policy: which blocks are sensitive, and what a masked cell shows.
//!
//! Exactly one modifier is active per world, chosen at registration time and
//! shared immutably afterwards. The bundled policies cover the common cases;
//! hosts can implement [`ChunkModifier`] for anything else.

mod decoy;
mod standard;

pub use decoy::DecoyModifier;
pub use standard::CavityModifier;

use std::collections::HashSet;

use crate::world::block::BlockId;
use crate::world::position::BlockPos;

/// Snapshot of the six axis-aligned neighbor cells, in the same order as
/// [`BlockPos::neighbors`]. `None` means the neighbor is not loaded (or is
/// outside the world) and must be treated as opaque, never as air -- an
/// unloaded neighbor must not reveal anything.
pub type NeighborSnapshot = [Option<BlockId>; 6];

/// Pluggable masking policy.
pub trait ChunkModifier: Send + Sync {
    /// Is this block type sensitive (subject to masking)?
    fn is_candidate(&self, block: BlockId) -> bool;

    /// Compute the visible value for one cell. Non-candidate blocks must
    /// pass through unchanged.
    fn decide(&self, original: BlockId, pos: BlockPos, neighbors: &NeighborSnapshot) -> BlockId;
}

/// Environment queries a policy may need beyond raw block data. Consumed,
/// not owned: the host engine answers these.
pub trait EnvironmentProbe: Send + Sync {
    /// Block light level at a position (0 = fully dark).
    fn light_level(&self, pos: BlockPos) -> u8;

    /// Whether the position has an unobstructed view of the sky.
    fn sees_sky(&self, pos: BlockPos) -> bool;
}

/// Block classification shared by the bundled modifiers. All of this is
/// world configuration -- the engine has no opinion on which IDs are ores
/// or water.
#[derive(Debug, Clone, Default)]
pub struct MaskingRules {
    /// Sensitive block types.
    pub candidates: HashSet<BlockId>,
    /// Water block types (all flow levels).
    pub water: HashSet<BlockId>,
    /// Substitute shown for enclosed candidates.
    pub filler: BlockId,
}

/// How a cell relates to the cavities around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    /// At least one water neighbor. Water adjacency already reveals the
    /// terrain shape, so masking the cell gains nothing and desyncs fluid
    /// rendering; such cells keep their real value.
    Water,
    /// No water, but at least one air neighbor: the cell faces a cavity a
    /// player could be looking into.
    Cavity,
    /// Fully enclosed by loaded, non-air, non-water neighbors (unloaded
    /// neighbors count as enclosing).
    Enclosed,
}

/// Classify a cell's exposure from its neighbor snapshot. Water takes
/// precedence over air when both are adjacent.
pub fn classify_exposure(rules: &MaskingRules, neighbors: &NeighborSnapshot) -> Exposure {
    let mut cavity = false;
    for block in neighbors.iter().flatten() {
        if rules.water.contains(block) {
            return Exposure::Water;
        }
        if block.is_air() {
            cavity = true;
        }
    }
    if cavity { Exposure::Cavity } else { Exposure::Enclosed }
}

/// A modifier that masks nothing. Used for worlds that opt out while keeping
/// the rest of the machinery (state tracking, reveal bookkeeping) uniform.
#[derive(Debug, Default)]
pub struct PassthroughModifier;

impl ChunkModifier for PassthroughModifier {
    fn is_candidate(&self, _block: BlockId) -> bool {
        false
    }

    fn decide(&self, original: BlockId, _pos: BlockPos, _neighbors: &NeighborSnapshot) -> BlockId {
        original
    }
}
