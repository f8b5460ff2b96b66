//! Background obfuscation sweep.
//!
//! Newly registered chunks sit in `Preobfuscated` until this task processes
//! them; the tick thread never pays for a pass. Each pass is bounded so a
//! burst of chunk loads (players traveling fast) amortizes across passes
//! instead of stalling everything else. Obfuscation is idempotent and
//! resumable, so shutdown just stops scheduling -- an in-flight pass may
//! finish or be abandoned without correctness impact.

use std::sync::Arc;
use std::time::Duration;

use shroud_engine::world::WorldView;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::event_bus::ViewEvent;
use crate::players::PlayerTracker;

/// What one pass accomplished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    /// Chunks that reached `Obfuscated` this pass.
    pub obfuscated: usize,
    /// Chunks whose pass failed against storage; left `Preobfuscated` for
    /// retry.
    pub failed: usize,
    /// Pending chunks beyond this pass's budget.
    pub deferred: usize,
}

/// Run one bounded obfuscation pass.
///
/// With a tracker, chunks inside some player's dynamic view fill the budget
/// first; the rest wait their turn. This is what keeps large worlds cheap:
/// the engine spends its budget where players actually are.
pub fn run_pass(
    world: Uuid,
    view: &WorldView,
    tracker: Option<&PlayerTracker>,
    max_chunks: usize,
    bus: &broadcast::Sender<ViewEvent>,
) -> PassStats {
    let mut pending = view.pending_chunks();
    if let Some(tracker) = tracker {
        pending.sort_by_key(|pos| !tracker.tracked(*pos));
    }

    let mut stats = PassStats {
        deferred: pending.len().saturating_sub(max_chunks),
        ..PassStats::default()
    };

    for pos in pending.into_iter().take(max_chunks) {
        match view.obfuscate_chunk(pos) {
            Ok(true) => {
                stats.obfuscated += 1;
                let _ = bus.send(ViewEvent::ChunkReady { world, pos });
            }
            // Raced with an unload or another pass; nothing to do.
            Ok(false) => {}
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    world = %world,
                    chunk.x = pos.x,
                    chunk.z = pos.z,
                    error = %e,
                    "obfuscation pass failed; chunk stays unserved until retry"
                );
            }
        }
    }

    stats
}

/// Spawn the sweep task for one world.
///
/// The task loops on `interval`, running one bounded pass per tick. Abort
/// the returned handle to stop scheduling further work.
pub fn start(
    world: Uuid,
    view: Arc<WorldView>,
    tracker: Option<Arc<PlayerTracker>>,
    bus: broadcast::Sender<ViewEvent>,
    interval: Duration,
    max_chunks_per_pass: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so registration settles.
        ticker.tick().await;

        tracing::info!(world = %world, ?interval, max_chunks_per_pass, "obfuscation sweep started");

        loop {
            ticker.tick().await;

            let stats = run_pass(
                world,
                &view,
                tracker.as_deref(),
                max_chunks_per_pass,
                &bus,
            );
            if stats.obfuscated > 0 || stats.failed > 0 {
                tracing::debug!(
                    world = %world,
                    obfuscated = stats.obfuscated,
                    failed = stats.failed,
                    deferred = stats.deferred,
                    "sweep pass"
                );
            }
        }
    })
}
