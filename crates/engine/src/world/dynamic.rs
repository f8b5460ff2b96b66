use super::position::ChunkPos;

/// The bounded square of chunks one player currently keeps "warm".
///
/// Worlds with dynamism enabled use these to focus engine cost: chunks
/// inside some player's dynamic view are obfuscated first, chunks inside
/// nobody's can wait. Membership is pure geometry (Chebyshev distance from
/// the center), recomputed as the player crosses chunk borders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicView {
    center: ChunkPos,
    radius: i32,
}

/// Chunks gained and lost by one center move.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CenterShift {
    pub entered: Vec<ChunkPos>,
    pub left: Vec<ChunkPos>,
}

impl DynamicView {
    pub fn new(center: ChunkPos, radius: i32) -> Self {
        Self {
            center,
            radius: radius.max(0),
        }
    }

    pub fn center(&self) -> ChunkPos {
        self.center
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.center.chebyshev(pos) <= self.radius
    }

    /// All chunk positions currently inside the view.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        let r = self.radius;
        (-r..=r).flat_map(move |dx| {
            (-r..=r).map(move |dz| ChunkPos::new(self.center.x + dx, self.center.z + dz))
        })
    }

    /// Move the center, reporting which chunks entered and left the view.
    /// A move to the same center reports nothing.
    pub fn update_center(&mut self, new_center: ChunkPos) -> CenterShift {
        if new_center == self.center {
            return CenterShift::default();
        }
        let old = self.clone();
        self.center = new_center;

        CenterShift {
            entered: self.chunks().filter(|pos| !old.contains(*pos)).collect(),
            left: old.chunks().filter(|pos| !self.contains(*pos)).collect(),
        }
    }
}
