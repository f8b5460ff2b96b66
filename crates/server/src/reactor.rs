//! Gameplay event reactor: translates host events into deobfuscation.
//!
//! Runs synchronously on the tick thread. Every entry point is O(r^3)
//! in-memory work plus one authoritative lookup per revealed cell; storage
//! failures are logged and skipped, never propagated into gameplay.

use std::collections::HashSet;
use std::sync::Arc;

use shroud_engine::world::WorldView;
use shroud_engine::world::block::BlockId;
use shroud_engine::world::position::{BlockPos, ChunkPos, cube_around};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::block;
use crate::event_bus::{RevealBatch, RevealCause, ViewEvent};

/// One entry of a block-break event's transaction list. Only location,
/// validity and the final block type are consumed; everything else in the
/// host's event payload is ignored.
///
/// `final_block` is the type the event pipeline resolved as broken -- other
/// handlers may rewrite what actually got destroyed, so the raw original is
/// not authoritative. Breaking air or a piston's moving parts reveals no
/// terrain and triggers nothing.
#[derive(Debug, Clone, Copy)]
pub struct BlockTransaction {
    pub location: BlockPos,
    pub valid: bool,
    pub final_block: BlockId,
}

/// Who performed an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Player(Uuid),
    /// Dispensers, pistons, mob griefing -- anything not player-driven.
    Environment,
}

/// Translates gameplay signals into view mutations and publishes the
/// resulting reveal batches for the network layer.
pub struct EventReactor {
    world: Uuid,
    view: Arc<WorldView>,
    bus: broadcast::Sender<ViewEvent>,
}

impl EventReactor {
    pub fn new(world: Uuid, view: Arc<WorldView>, bus: broadcast::Sender<ViewEvent>) -> Self {
        Self { world, view, bus }
    }

    /// A chunk entered the loaded set: register its view in
    /// `Preobfuscated` state. The background sweep does the rest.
    pub fn on_chunk_load(&self, pos: ChunkPos) {
        self.view.add_chunk(pos);
        tracing::trace!(chunk.x = pos.x, chunk.z = pos.z, "chunk registered");
    }

    /// A chunk left the loaded set: drop its view.
    pub fn on_chunk_unload(&self, pos: ChunkPos) {
        self.view.remove_chunk(pos);
    }

    /// Blocks were broken. Each valid transaction whose final type is not
    /// in the benign whitelist reveals the radius around it; the broken
    /// cell itself is already revealed by the break and is skipped.
    pub fn on_block_break(&self, transactions: &[BlockTransaction]) {
        let mut changes = Vec::new();
        for t in transactions {
            if !t.valid || block::is_reveal_exempt(t.final_block) {
                continue;
            }
            self.reveal_around(t.location, &mut changes);
        }
        self.publish(RevealCause::BlockBreak, changes);
    }

    /// A block was interacted with (bucket, tool use). Only player actors
    /// reveal terrain.
    pub fn on_block_interact(&self, actor: Actor, location: BlockPos) {
        if !matches!(actor, Actor::Player(_)) {
            return;
        }
        let mut changes = Vec::new();
        self.reveal_around(location, &mut changes);
        self.publish(RevealCause::Interaction, changes);
    }

    /// An explosion detonated. Every location within radius of any affected
    /// cell -- excluding the affected cells themselves, which the explosion
    /// already rewrites -- is revealed exactly once, however many centers it
    /// neighbors.
    pub fn on_explosion(&self, affected: &[BlockPos]) {
        let radius = self.view.config().deobfuscation_radius;
        let exploded: HashSet<BlockPos> = affected.iter().copied().collect();
        let mut seen: HashSet<BlockPos> = HashSet::new();
        let mut changes = Vec::new();
        let mut storage_errors = 0usize;

        for &center in affected {
            for pos in cube_around(center, radius) {
                if exploded.contains(&pos) || !seen.insert(pos) {
                    continue;
                }
                self.reveal_one(pos, &mut changes, &mut storage_errors);
            }
        }

        self.warn_errors(storage_errors);
        self.publish(RevealCause::Explosion, changes);
    }

    /// Reveal the configured radius around one cell, excluding the center.
    fn reveal_around(&self, center: BlockPos, changes: &mut Vec<(BlockPos, BlockId)>) {
        let radius = self.view.config().deobfuscation_radius;
        let mut storage_errors = 0usize;
        for pos in cube_around(center, radius) {
            self.reveal_one(pos, changes, &mut storage_errors);
        }
        self.warn_errors(storage_errors);
    }

    fn reveal_one(
        &self,
        pos: BlockPos,
        changes: &mut Vec<(BlockPos, BlockId)>,
        storage_errors: &mut usize,
    ) {
        match self.view.deobfuscate(pos) {
            Ok(true) => {
                if let Some(block) = self.view.get(pos) {
                    changes.push((pos, block));
                }
            }
            Ok(false) => {}
            Err(e) => {
                // One warning per event, not per cell; the cell stays
                // masked, which is the safe direction.
                *storage_errors += 1;
                tracing::trace!(?pos, error = %e, "deobfuscation read failed");
            }
        }
    }

    fn warn_errors(&self, storage_errors: usize) {
        if storage_errors > 0 {
            tracing::warn!(
                world = %self.world,
                cells = storage_errors,
                "storage reads failed during reveal; cells left masked"
            );
        }
    }

    fn publish(&self, cause: RevealCause, changes: Vec<(BlockPos, BlockId)>) {
        if changes.is_empty() {
            return;
        }
        tracing::debug!(world = %self.world, ?cause, cells = changes.len(), "reveal batch");
        // Ignore send errors (no subscribers = no problem).
        let _ = self.bus.send(ViewEvent::CellsRevealed(RevealBatch {
            world: self.world,
            cause,
            changes: changes.into(),
        }));
    }
}
