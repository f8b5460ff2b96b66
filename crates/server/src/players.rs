//! Per-player dynamic view tracking.
//!
//! Keyed by an opaque player id; populated and cleared by explicit
//! join/leave hooks from the host integration layer. Movement updates
//! arrive on the tick thread and are cheap (a map write under a briefly
//! held lock); the sweep consults membership read-only.

use std::collections::HashMap;
use std::sync::RwLock;

use shroud_engine::world::dynamic::{CenterShift, DynamicView};
use shroud_engine::world::position::ChunkPos;
use uuid::Uuid;

/// Thread-safe registry of connected players' dynamic views.
///
/// Uses `std::sync::RwLock` because every operation is brief (no awaits
/// while the lock is held) and the access pattern is read-heavy.
pub struct PlayerTracker {
    players: RwLock<HashMap<Uuid, DynamicView>>,
    chunk_radius: i32,
}

impl PlayerTracker {
    pub fn new(chunk_radius: i32) -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            chunk_radius,
        }
    }

    /// Register a player at their spawn chunk. Rejoining replaces the old
    /// view.
    pub fn join(&self, player: Uuid, center: ChunkPos) {
        self.players
            .write()
            .expect("player tracker poisoned")
            .insert(player, DynamicView::new(center, self.chunk_radius));
    }

    pub fn leave(&self, player: Uuid) {
        self.players
            .write()
            .expect("player tracker poisoned")
            .remove(&player);
    }

    /// Update a player's center chunk, returning the membership change.
    /// Unknown players (moved before join) are registered on the spot.
    pub fn update_center(&self, player: Uuid, center: ChunkPos) -> CenterShift {
        let mut players = self.players.write().expect("player tracker poisoned");
        match players.get_mut(&player) {
            Some(view) => view.update_center(center),
            None => {
                let view = DynamicView::new(center, self.chunk_radius);
                let shift = CenterShift {
                    entered: view.chunks().collect(),
                    left: Vec::new(),
                };
                players.insert(player, view);
                shift
            }
        }
    }

    /// Is this chunk inside any player's dynamic view?
    pub fn tracked(&self, pos: ChunkPos) -> bool {
        self.players
            .read()
            .expect("player tracker poisoned")
            .values()
            .any(|view| view.contains(pos))
    }

    pub fn player_count(&self) -> usize {
        self.players
            .read()
            .expect("player tracker poisoned")
            .len()
    }
}
