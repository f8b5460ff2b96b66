/// Opaque block identifier. The view stores these without interpreting them.
/// Game-specific layers assign meaning to specific IDs (e.g. which IDs are
/// ores, which are water).
///
/// The only semantic this crate enforces is that `BlockId::AIR` (0) is the
/// "empty" block: sections containing nothing else are never materialized,
/// and an air neighbor marks a cell as exposed to a cavity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The universal "empty" block.
    pub const AIR: BlockId = BlockId(0);

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn is_air(self) -> bool {
        self.0 == 0
    }
}
