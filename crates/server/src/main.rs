use std::sync::Arc;
use std::time::Duration;

use shroud_engine::world::block::BlockId;
use shroud_engine::world::position::{BlockPos, ChunkPos};
use shroud_server::block;
use shroud_server::config::WorldConfig;
use shroud_server::reactor::BlockTransaction;
use shroud_server::service::ObfuscationService;
use shroud_server::storage::MemoryStore;
use uuid::Uuid;

/// How long the demo waits for the background sweep to finish all chunks.
const SWEEP_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    tracing::info!("Shroud -- network-view obfuscation demo");

    // ── Build an authoritative world with buried ores ───────────────────
    let store = Arc::new(MemoryStore::new());
    tracing::info!("Generating stone slab with ore veins...");
    for cx in -2..2 {
        for cz in -2..2 {
            let origin = BlockPos::new((cx as i64) << 4, 0, (cz as i64) << 4);
            store.fill_box(
                origin,
                BlockPos::new(origin.x + 15, 79, origin.z + 15),
                block::STONE,
            );
        }
    }

    // A buried diamond vein, an ore facing a hidden air pocket, and an ore
    // touching water.
    let buried = BlockPos::new(10, 40, 10);
    store.set_block(buried, block::DIAMOND_ORE);
    store.set_block(BlockPos::new(11, 40, 10), block::DIAMOND_ORE);

    let pocket_ore = BlockPos::new(-20, 30, 5);
    store.set_block(pocket_ore, block::GOLD_ORE);
    store.set_block(BlockPos::new(-20, 30, 6), block::AIR);

    let wet_ore = BlockPos::new(5, 60, -14);
    store.set_block(wet_ore, block::IRON_ORE);
    store.set_block(BlockPos::new(5, 61, -14), block::WATER);

    // ── Register the world and let the sweep run ────────────────────────
    let service = ObfuscationService::new();
    let world_id = Uuid::new_v4();
    let handle = service.register_world(
        world_id,
        block::Dimension::Overworld,
        store,
        None,
        WorldConfig::default(),
    );

    let mut bus = handle.subscribe();
    for cx in -2..2 {
        for cz in -2..2 {
            handle.reactor().on_chunk_load(ChunkPos::new(cx, cz));
        }
    }

    let total = handle.view().chunk_count();
    tracing::info!("Registered {} chunks, waiting for the sweep...", total);

    let mut ready = 0usize;
    let deadline = tokio::time::sleep(SWEEP_DEADLINE);
    tokio::pin!(deadline);
    while ready < total {
        tokio::select! {
            event = bus.recv() => {
                if let Ok(shroud_server::event_bus::ViewEvent::ChunkReady { .. }) = event {
                    ready += 1;
                }
            }
            _ = &mut deadline => {
                tracing::error!("sweep did not finish within {:?}", SWEEP_DEADLINE);
                return;
            }
        }
    }
    tracing::info!("All {} chunks obfuscated", ready);

    // ── What a client would see ─────────────────────────────────────────
    let show = |label: &str, pos: BlockPos| {
        let visible = handle.view().get(pos).unwrap_or(BlockId::AIR);
        tracing::info!("{label} at {pos:?}: client sees {visible:?}");
    };
    show("buried diamond", buried);
    show("pocket-facing gold", pocket_ore);
    show("water-touching iron", wet_ore);

    // ── Mine next to the buried vein and watch it reveal ────────────────
    let mined = BlockPos::new(10, 41, 10);
    tracing::info!("Breaking stone at {mined:?}...");
    handle.reactor().on_block_break(&[BlockTransaction {
        location: mined,
        valid: true,
        final_block: block::STONE,
    }]);

    match bus.recv().await {
        Ok(shroud_server::event_bus::ViewEvent::CellsRevealed(batch)) => {
            tracing::info!(
                "Reveal batch: {} cells restored around the break",
                batch.changes.len()
            );
        }
        other => tracing::warn!("unexpected bus message: {other:?}"),
    }
    show("buried diamond", buried);

    service.unregister_world(world_id);
}
