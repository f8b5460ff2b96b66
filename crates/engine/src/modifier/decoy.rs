use std::sync::Arc;

use super::{
    ChunkModifier, EnvironmentProbe, Exposure, MaskingRules, NeighborSnapshot, classify_exposure,
};
use crate::world::block::BlockId;
use crate::world::position::BlockPos;

/// Like [`CavityModifier`](super::CavityModifier), but cavity-exposed
/// candidates in player-unreachable-looking spots become decoys.
///
/// A cavity that is completely unlit and hidden from the sky has, in
/// practice, never been visited -- torches and daylight are how legitimate
/// players see ores. Showing a conspicuous decoy block there baits x-ray
/// users into mining toward it.
pub struct DecoyModifier {
    rules: MaskingRules,
    probe: Arc<dyn EnvironmentProbe>,
    decoy: BlockId,
}

impl DecoyModifier {
    pub fn new(rules: MaskingRules, probe: Arc<dyn EnvironmentProbe>, decoy: BlockId) -> Self {
        Self {
            rules,
            probe,
            decoy,
        }
    }
}

impl ChunkModifier for DecoyModifier {
    fn is_candidate(&self, block: BlockId) -> bool {
        self.rules.candidates.contains(&block)
    }

    fn decide(&self, original: BlockId, pos: BlockPos, neighbors: &NeighborSnapshot) -> BlockId {
        if !self.is_candidate(original) {
            return original;
        }
        match classify_exposure(&self.rules, neighbors) {
            Exposure::Water => original,
            Exposure::Cavity => {
                if self.probe.light_level(pos) == 0 && !self.probe.sees_sky(pos) {
                    self.decoy
                } else {
                    original
                }
            }
            Exposure::Enclosed => self.rules.filler,
        }
    }
}
