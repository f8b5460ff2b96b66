//! End-to-end properties of the obfuscation pipeline with real Minecraft
//! block semantics: no-leak, reveal radii, explosion dedup, whitelists,
//! configuration recovery and the background sweep.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shroud_engine::modifier::{DecoyModifier, EnvironmentProbe};
use shroud_engine::storage::{BlockSource, StorageError};
use shroud_engine::world::block::BlockId;
use shroud_engine::world::chunk::ObfuscationState;
use shroud_engine::world::container::SectionCells;
use shroud_engine::world::position::{BlockPos, ChunkPos, cube_around};
use shroud_engine::world::{ViewConfig, WorldView};
use tokio::sync::broadcast;
use uuid::Uuid;

use shroud_server::block;
use shroud_server::config::{self, WorldConfig};
use shroud_server::event_bus::{self, RevealCause, ViewEvent};
use shroud_server::players::PlayerTracker;
use shroud_server::reactor::{Actor, BlockTransaction, EventReactor};
use shroud_server::storage::MemoryStore;
use shroud_server::sweep;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    view: Arc<WorldView>,
    reactor: EventReactor,
    bus: broadcast::Receiver<ViewEvent>,
}

/// Wire a view + reactor around a store, register `chunks`, and run the
/// sweep until nothing is pending.
fn harness(store: Arc<dyn BlockSource>, radius: i32, chunks: &[ChunkPos]) -> Harness {
    let world = Uuid::new_v4();
    let modifier = Arc::new(shroud_engine::modifier::CavityModifier::new(
        WorldConfig::default().masking_rules(block::Dimension::Overworld),
    ));
    let view = Arc::new(WorldView::new(
        modifier,
        store,
        ViewConfig {
            deobfuscation_radius: radius,
        },
    ));
    let (tx, rx) = broadcast::channel(event_bus::BUS_CAPACITY);
    let reactor = EventReactor::new(world, Arc::clone(&view), tx.clone());

    for &pos in chunks {
        reactor.on_chunk_load(pos);
    }
    while !view.pending_chunks().is_empty() {
        sweep::run_pass(world, &view, None, usize::MAX, &tx);
    }
    // Drain the ChunkReady noise so tests see only reveal batches.
    let mut h = Harness { view, reactor, bus: rx };
    while h.bus.try_recv().is_ok() {}
    h
}

/// A solid stone chunk column (y 0..=127) at every listed chunk position.
fn stone_slab(chunks: &[ChunkPos]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for pos in chunks {
        let origin = BlockPos::new((pos.x as i64) << 4, 0, (pos.z as i64) << 4);
        store.fill_box(
            origin,
            BlockPos::new(origin.x + 15, 127, origin.z + 15),
            block::STONE,
        );
    }
    store
}

fn reveal_batch(bus: &mut broadcast::Receiver<ViewEvent>) -> Option<event_bus::RevealBatch> {
    while let Ok(event) = bus.try_recv() {
        if let ViewEvent::CellsRevealed(batch) = event {
            return Some(batch);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// No-leak and exposure policy
// ---------------------------------------------------------------------------

#[test]
fn buried_ores_never_reach_the_view() {
    let chunks = [ChunkPos::new(0, 0), ChunkPos::new(1, 0)];
    let store = stone_slab(&chunks);
    // Scatter buried ores through both chunks, none touching air or water.
    let mut ores = Vec::new();
    for i in 0..12i64 {
        let pos = BlockPos::new(2 + i * 2, 20 + i * 7, 3 + (i % 9));
        store.set_block(pos, block::DIAMOND_ORE);
        ores.push(pos);
    }

    let h = harness(store, 2, &chunks);
    for pos in &ores {
        assert_eq!(h.view.get(*pos), Some(block::STONE), "leak at {pos:?}");
    }
    // Full scan: no candidate anywhere in the served data.
    for x in 0..32 {
        for y in 0..128 {
            for z in 0..16 {
                let visible = h
                    .view
                    .get(BlockPos::new(x, y, z))
                    .unwrap_or(block::AIR);
                assert!(!block::is_ore(visible), "ore leaked at ({x}, {y}, {z})");
            }
        }
    }
}

#[test]
fn exposure_policy_cavity_enclosed_water() {
    let chunks = [ChunkPos::new(0, 0)];
    let store = stone_slab(&chunks);

    let cavity_ore = BlockPos::new(4, 40, 4);
    store.set_block(cavity_ore, block::GOLD_ORE);
    store.set_block(BlockPos::new(4, 41, 4), block::AIR);

    let enclosed_ore = BlockPos::new(10, 40, 10);
    store.set_block(enclosed_ore, block::GOLD_ORE);

    let wet_ore = BlockPos::new(4, 80, 10);
    store.set_block(wet_ore, block::IRON_ORE);
    store.set_block(BlockPos::new(5, 80, 10), block::WATER);

    let h = harness(store, 2, &chunks);
    assert_eq!(h.view.get(cavity_ore), Some(block::GOLD_ORE));
    assert_eq!(h.view.get(enclosed_ore), Some(block::STONE));
    assert_eq!(h.view.get(wet_ore), Some(block::IRON_ORE));
}

#[test]
fn water_beats_air_when_both_are_adjacent() {
    let chunks = [ChunkPos::new(0, 0)];
    let store = stone_slab(&chunks);
    let ore = BlockPos::new(8, 60, 8);
    store.set_block(ore, block::DIAMOND_ORE);
    store.set_block(BlockPos::new(9, 60, 8), block::AIR);
    store.set_block(BlockPos::new(7, 60, 8), block::WATER);

    let h = harness(store, 2, &chunks);
    assert_eq!(h.view.get(ore), Some(block::DIAMOND_ORE));
}

// ---------------------------------------------------------------------------
// Break-radius reveal
// ---------------------------------------------------------------------------

/// Stone chunk with an all-ore core so every deobfuscated cell visibly
/// changes (masked stone -> ore).
fn ore_core_store() -> Arc<MemoryStore> {
    let store = stone_slab(&[ChunkPos::new(0, 0)]);
    store.fill_box(
        BlockPos::new(4, 56, 4),
        BlockPos::new(14, 72, 14),
        block::DIAMOND_ORE,
    );
    store
}

#[test]
fn break_reveals_exactly_the_radius_cube() {
    let mut h = harness(ore_core_store(), 2, &[ChunkPos::new(0, 0)]);
    let center = BlockPos::new(10, 64, 10);

    // Everything in the core is masked before the break.
    assert_eq!(h.view.get(center), Some(block::STONE));

    h.reactor.on_block_break(&[BlockTransaction {
        location: center,
        valid: true,
        final_block: block::STONE,
    }]);

    let batch = reveal_batch(&mut h.bus).expect("break should publish a batch");
    assert_eq!(batch.cause, RevealCause::BlockBreak);
    assert_eq!(batch.changes.len(), 124);

    let revealed: HashSet<BlockPos> = batch.changes.iter().map(|(p, _)| *p).collect();
    let expected: HashSet<BlockPos> = cube_around(center, 2).collect();
    assert_eq!(revealed, expected);
    assert!(!revealed.contains(&center));

    for (_, block_id) in batch.changes.iter() {
        assert_eq!(*block_id, block::DIAMOND_ORE);
    }

    // The center itself was not deobfuscated, and the ring just outside the
    // cube is still masked.
    assert_eq!(h.view.get(center), Some(block::STONE));
    assert_eq!(h.view.get(BlockPos::new(13, 64, 10)), Some(block::STONE));
    assert_eq!(h.view.get(BlockPos::new(10, 67, 10)), Some(block::STONE));
}

#[test]
fn break_is_idempotent_per_cell() {
    let mut h = harness(ore_core_store(), 1, &[ChunkPos::new(0, 0)]);
    let center = BlockPos::new(10, 64, 10);
    let t = BlockTransaction {
        location: center,
        valid: true,
        final_block: block::STONE,
    };

    h.reactor.on_block_break(&[t]);
    assert_eq!(reveal_batch(&mut h.bus).unwrap().changes.len(), 26);

    // Same break again: every cell already shows its true value, so there
    // is nothing to publish.
    h.reactor.on_block_break(&[t]);
    assert!(reveal_batch(&mut h.bus).is_none());
}

#[test]
fn invalid_and_whitelisted_breaks_reveal_nothing() {
    let mut h = harness(ore_core_store(), 2, &[ChunkPos::new(0, 0)]);
    let center = BlockPos::new(10, 64, 10);

    h.reactor.on_block_break(&[
        BlockTransaction {
            location: center,
            valid: false,
            final_block: block::STONE,
        },
        BlockTransaction {
            location: center,
            valid: true,
            final_block: block::AIR,
        },
        BlockTransaction {
            location: center,
            valid: true,
            final_block: block::PISTON,
        },
        BlockTransaction {
            location: center,
            valid: true,
            final_block: block::MOVING_PISTON,
        },
    ]);
    assert!(reveal_batch(&mut h.bus).is_none());
    assert_eq!(h.view.get(BlockPos::new(10, 65, 10)), Some(block::STONE));
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

#[test]
fn only_player_interactions_reveal() {
    let mut h = harness(ore_core_store(), 1, &[ChunkPos::new(0, 0)]);
    let target = BlockPos::new(10, 64, 10);

    h.reactor.on_block_interact(Actor::Environment, target);
    assert!(reveal_batch(&mut h.bus).is_none());

    h.reactor
        .on_block_interact(Actor::Player(Uuid::new_v4()), target);
    let batch = reveal_batch(&mut h.bus).expect("player interaction reveals");
    assert_eq!(batch.cause, RevealCause::Interaction);
    assert_eq!(batch.changes.len(), 26);
}

// ---------------------------------------------------------------------------
// Explosion dedup
// ---------------------------------------------------------------------------

#[test]
fn explosion_reveals_union_minus_affected_exactly_once() {
    let mut h = harness(ore_core_store(), 1, &[ChunkPos::new(0, 0)]);
    let a = BlockPos::new(10, 64, 10);
    let b = BlockPos::new(11, 64, 10);

    h.reactor.on_explosion(&[a, b]);

    let batch = reveal_batch(&mut h.bus).expect("explosion should publish a batch");
    assert_eq!(batch.cause, RevealCause::Explosion);

    let revealed: Vec<BlockPos> = batch.changes.iter().map(|(p, _)| *p).collect();
    let unique: HashSet<BlockPos> = revealed.iter().copied().collect();
    assert_eq!(revealed.len(), unique.len(), "a cell was revealed twice");

    let mut expected: HashSet<BlockPos> = cube_around(a, 1).collect();
    expected.extend(cube_around(b, 1));
    expected.remove(&a);
    expected.remove(&b);
    assert_eq!(unique, expected);
    assert_eq!(unique.len(), 34);
}

// ---------------------------------------------------------------------------
// Concurrent read safety
// ---------------------------------------------------------------------------

#[test]
fn reader_never_observes_a_torn_cell() {
    let h = harness(ore_core_store(), 2, &[ChunkPos::new(0, 0)]);
    let pos = BlockPos::new(10, 64, 10);
    let view = Arc::clone(&h.view);

    std::thread::scope(|scope| {
        let writer_view = Arc::clone(&view);
        scope.spawn(move || {
            for i in 0..50_000u32 {
                let block_id = if i % 2 == 0 {
                    block::DIAMOND_ORE
                } else {
                    block::STONE
                };
                writer_view.set(pos, block_id);
            }
        });

        for _ in 0..50_000 {
            let seen = view.get(pos).unwrap();
            assert!(
                seen == block::STONE || seen == block::DIAMOND_ORE,
                "torn read: {seen:?}"
            );
        }
    });
}

// ---------------------------------------------------------------------------
// Sweep throttling, prioritization and failure retry
// ---------------------------------------------------------------------------

#[test]
fn sweep_respects_the_per_pass_budget() {
    let chunks: Vec<ChunkPos> = (0..4).map(|x| ChunkPos::new(x, 0)).collect();
    let store = stone_slab(&chunks);
    let view = WorldView::new(
        Arc::new(shroud_engine::modifier::CavityModifier::new(
            WorldConfig::default().masking_rules(block::Dimension::Overworld),
        )),
        store,
        ViewConfig::default(),
    );
    for &pos in &chunks {
        view.add_chunk(pos);
    }

    let (tx, mut rx) = broadcast::channel(event_bus::BUS_CAPACITY);
    let stats = sweep::run_pass(Uuid::new_v4(), &view, None, 2, &tx);
    assert_eq!(stats.obfuscated, 2);
    assert_eq!(stats.deferred, 2);
    assert_eq!(view.pending_chunks().len(), 2);

    let mut ready = 0;
    while let Ok(ViewEvent::ChunkReady { .. }) = rx.try_recv() {
        ready += 1;
    }
    assert_eq!(ready, 2);
}

#[test]
fn sweep_prioritizes_chunks_near_players() {
    let near = ChunkPos::new(8, 8);
    let far = ChunkPos::new(0, 0);
    let store = stone_slab(&[far, near]);
    let view = WorldView::new(
        Arc::new(shroud_engine::modifier::CavityModifier::new(
            WorldConfig::default().masking_rules(block::Dimension::Overworld),
        )),
        store,
        ViewConfig::default(),
    );
    view.add_chunk(far);
    view.add_chunk(near);

    let tracker = PlayerTracker::new(1);
    tracker.join(Uuid::new_v4(), near);

    let (tx, _rx) = broadcast::channel(event_bus::BUS_CAPACITY);
    let stats = sweep::run_pass(Uuid::new_v4(), &view, Some(&tracker), 1, &tx);
    assert_eq!(stats.obfuscated, 1);

    assert_eq!(
        view.chunk_view(near).unwrap().state(),
        ObfuscationState::Obfuscated
    );
    assert_eq!(
        view.chunk_view(far).unwrap().state(),
        ObfuscationState::Preobfuscated
    );
}

/// Storage wrapper that fails on demand, for the retry path.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing: AtomicBool,
}

impl BlockSource for FlakyStore {
    fn block_at(&self, pos: BlockPos) -> Result<BlockId, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("disk on fire".into()));
        }
        self.inner.block_at(pos)
    }

    fn chunk_sections(
        &self,
        pos: ChunkPos,
    ) -> Result<Vec<(u8, Box<SectionCells>)>, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("disk on fire".into()));
        }
        self.inner.chunk_sections(pos)
    }
}

#[test]
fn failed_chunks_are_retried_by_the_next_pass() {
    let pos = ChunkPos::new(0, 0);
    let store = Arc::new(FlakyStore {
        inner: stone_slab(&[pos]),
        failing: AtomicBool::new(true),
    });
    let view = WorldView::new(
        Arc::new(shroud_engine::modifier::CavityModifier::new(
            WorldConfig::default().masking_rules(block::Dimension::Overworld),
        )),
        Arc::clone(&store) as Arc<dyn BlockSource>,
        ViewConfig::default(),
    );
    view.add_chunk(pos);

    let (tx, _rx) = broadcast::channel(event_bus::BUS_CAPACITY);
    let world = Uuid::new_v4();

    let stats = sweep::run_pass(world, &view, None, usize::MAX, &tx);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.obfuscated, 0);
    assert_eq!(view.pending_chunks(), vec![pos]);

    store.failing.store(false, Ordering::SeqCst);
    let stats = sweep::run_pass(world, &view, None, usize::MAX, &tx);
    assert_eq!(stats.obfuscated, 1);
    assert!(view.pending_chunks().is_empty());
}

// ---------------------------------------------------------------------------
// Decoy strategy
// ---------------------------------------------------------------------------

struct FixedProbe {
    light: u8,
    sky: bool,
}

impl EnvironmentProbe for FixedProbe {
    fn light_level(&self, _pos: BlockPos) -> u8 {
        self.light
    }

    fn sees_sky(&self, _pos: BlockPos) -> bool {
        self.sky
    }
}

fn decoy_view(probe: FixedProbe, store: Arc<MemoryStore>) -> WorldView {
    let cfg = WorldConfig::default();
    WorldView::new(
        Arc::new(DecoyModifier::new(
            cfg.masking_rules(block::Dimension::Overworld),
            Arc::new(probe),
            block::REDSTONE_BLOCK,
        )),
        store,
        ViewConfig::default(),
    )
}

#[test]
fn unlit_hidden_cavity_gets_a_decoy() {
    let chunks = [ChunkPos::new(0, 0)];
    let store = stone_slab(&chunks);
    let ore = BlockPos::new(6, 40, 6);
    store.set_block(ore, block::DIAMOND_ORE);
    store.set_block(BlockPos::new(7, 40, 6), block::AIR);

    let view = decoy_view(FixedProbe { light: 0, sky: false }, Arc::clone(&store));
    view.add_chunk(chunks[0]);
    view.obfuscate_chunk(chunks[0]).unwrap();
    assert_eq!(view.get(ore), Some(block::REDSTONE_BLOCK));

    // A lit cavity has plausibly been visited: no decoy, keep the ore.
    let view = decoy_view(FixedProbe { light: 9, sky: false }, Arc::clone(&store));
    view.add_chunk(chunks[0]);
    view.obfuscate_chunk(chunks[0]).unwrap();
    assert_eq!(view.get(ore), Some(block::DIAMOND_ORE));

    // Enclosed cells never get decoys, just filler.
    let buried = BlockPos::new(12, 40, 12);
    store.set_block(buried, block::DIAMOND_ORE);
    let view = decoy_view(FixedProbe { light: 0, sky: false }, store);
    view.add_chunk(chunks[0]);
    view.obfuscate_chunk(chunks[0]).unwrap();
    assert_eq!(view.get(buried), Some(block::STONE));
}

// ---------------------------------------------------------------------------
// Block tables and configuration
// ---------------------------------------------------------------------------

#[test]
fn unknown_block_names_fail_open() {
    let cfg = WorldConfig {
        candidate_blocks: vec![
            "diamond_ore".into(),
            "minecraft:gold_ore".into(),
            "definitely_not_a_block".into(),
        ],
        ..WorldConfig::default()
    };
    let rules = cfg.masking_rules(block::Dimension::Overworld);
    assert_eq!(rules.candidates.len(), 2);
    assert!(rules.candidates.contains(&block::DIAMOND_ORE));
    assert!(rules.candidates.contains(&block::GOLD_ORE));
}

#[test]
fn dimension_fillers_and_overrides() {
    let cfg = WorldConfig::default();
    assert_eq!(
        cfg.masking_rules(block::Dimension::Nether).filler,
        block::NETHERRACK
    );
    assert_eq!(
        cfg.masking_rules(block::Dimension::End).filler,
        block::END_STONE
    );

    let cfg = WorldConfig {
        filler: Some("bedrock".into()),
        ..WorldConfig::default()
    };
    assert_eq!(
        cfg.masking_rules(block::Dimension::Overworld).filler,
        block::BEDROCK
    );
}

#[test]
fn negative_radius_clamps_to_zero() {
    let cfg = WorldConfig {
        deobfuscation_radius: -3,
        ..WorldConfig::default()
    };
    assert_eq!(cfg.view_config().deobfuscation_radius, 0);
}

fn temp_config_dir(test: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("shroud-{}-{}", std::process::id(), test));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn missing_config_is_created_with_defaults() {
    let dir = temp_config_dir("missing");
    let path = dir.join("world.json");

    let cfg = config::load_or_create(&path).unwrap();
    assert_eq!(cfg.config_version, config::CURRENT_CONFIG_VERSION);
    assert!(path.exists());

    // A second load reads the file we just wrote.
    let again = config::load_or_create(&path).unwrap();
    assert_eq!(again.deobfuscation_radius, cfg.deobfuscation_radius);
}

#[test]
fn malformed_config_is_backed_up_and_regenerated() {
    let dir = temp_config_dir("malformed");
    let path = dir.join("world.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let cfg = config::load_or_create(&path).unwrap();
    assert_eq!(cfg.config_version, config::CURRENT_CONFIG_VERSION);
    assert!(dir.join("world.json.broken").exists());
    assert!(
        serde_json::from_str::<serde_json::Value>(&std::fs::read_to_string(&path).unwrap())
            .is_ok()
    );
}

#[test]
fn unsupported_version_is_backed_up_and_regenerated() {
    let dir = temp_config_dir("version");
    let path = dir.join("world.json");
    let future = WorldConfig {
        config_version: config::CURRENT_CONFIG_VERSION + 1,
        deobfuscation_radius: 7,
        ..WorldConfig::default()
    };
    std::fs::write(&path, serde_json::to_string(&future).unwrap()).unwrap();

    let cfg = config::load_or_create(&path).unwrap();
    assert_eq!(cfg.config_version, config::CURRENT_CONFIG_VERSION);
    assert_ne!(cfg.deobfuscation_radius, 7);
    assert!(dir.join("world.json.broken").exists());
}

// ---------------------------------------------------------------------------
// Service lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn service_registers_sweeps_and_unregisters() {
    use shroud_server::service::ObfuscationService;

    let chunks = [ChunkPos::new(0, 0), ChunkPos::new(0, 1)];
    let store = stone_slab(&chunks);
    let ore = BlockPos::new(8, 40, 8);
    store.set_block(ore, block::DIAMOND_ORE);

    let service = ObfuscationService::new();
    let world = Uuid::new_v4();
    let handle = service.register_world(
        world,
        block::Dimension::Overworld,
        store,
        None,
        WorldConfig::default(),
    );
    assert_eq!(service.world_count(), 1);

    let mut bus = handle.subscribe();
    for pos in chunks {
        handle.reactor().on_chunk_load(pos);
    }

    let mut ready = 0;
    while ready < chunks.len() {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), bus.recv())
            .await
            .expect("sweep should finish well within the deadline")
            .unwrap();
        if matches!(event, ViewEvent::ChunkReady { .. }) {
            ready += 1;
        }
    }

    assert_eq!(handle.view().get(ore), Some(block::STONE));

    service.unregister_world(world);
    assert!(service.world(world).is_none());
    assert_eq!(service.world_count(), 0);
}
