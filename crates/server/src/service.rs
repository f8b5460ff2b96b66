//! The embeddable obfuscation service.
//!
//! An explicitly constructed object owning one network view per registered
//! world -- no global state, no ambient singletons. The host integration
//! layer calls in through the per-world handle: gameplay events go to the
//! reactor, player lifecycle to the tracker, and the network layer
//! subscribes to the view bus.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use shroud_engine::modifier::{
    CavityModifier, ChunkModifier, DecoyModifier, EnvironmentProbe, PassthroughModifier,
};
use shroud_engine::storage::BlockSource;
use shroud_engine::world::WorldView;
use shroud_engine::world::position::ChunkPos;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::block::Dimension;
use crate::config::{self, WorldConfig};
use crate::event_bus::{self, ViewEvent};
use crate::players::PlayerTracker;
use crate::reactor::EventReactor;
use crate::sweep;

/// Everything the host needs to drive one world's obfuscation.
pub struct WorldHandle {
    id: Uuid,
    view: Arc<WorldView>,
    reactor: EventReactor,
    players: Option<Arc<PlayerTracker>>,
    bus: broadcast::Sender<ViewEvent>,
    sweep: JoinHandle<()>,
}

impl WorldHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn view(&self) -> &Arc<WorldView> {
        &self.view
    }

    /// Gameplay event entry points.
    pub fn reactor(&self) -> &EventReactor {
        &self.reactor
    }

    /// Subscribe to reveal batches and chunk-ready notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.bus.subscribe()
    }

    /// Player lifecycle hooks. No-ops when dynamism is disabled.
    pub fn player_joined(&self, player: Uuid, center: ChunkPos) {
        if let Some(players) = &self.players {
            players.join(player, center);
        }
    }

    pub fn player_moved(&self, player: Uuid, center: ChunkPos) {
        if let Some(players) = &self.players {
            players.update_center(player, center);
        }
    }

    pub fn player_left(&self, player: Uuid) {
        if let Some(players) = &self.players {
            players.leave(player);
        }
    }
}

impl Drop for WorldHandle {
    fn drop(&mut self) {
        // Stop scheduling sweep work; an in-flight pass may finish on its
        // own and is harmless (obfuscation is idempotent).
        self.sweep.abort();
    }
}

/// Registry of per-world handles. Construct one, share it by reference.
pub struct ObfuscationService {
    worlds: RwLock<HashMap<Uuid, Arc<WorldHandle>>>,
}

impl ObfuscationService {
    pub fn new() -> Self {
        Self {
            worlds: RwLock::new(HashMap::new()),
        }
    }

    /// Register a world and start its background sweep. Must be called from
    /// within a tokio runtime. The probe is only consulted by the "decoy"
    /// strategy; worlds without one fall back to the cavity strategy.
    pub fn register_world(
        &self,
        id: Uuid,
        dimension: Dimension,
        storage: Arc<dyn BlockSource>,
        probe: Option<Arc<dyn EnvironmentProbe>>,
        config: WorldConfig,
    ) -> Arc<WorldHandle> {
        let modifier = build_modifier(&config, dimension, probe);
        let view = Arc::new(WorldView::new(modifier, storage, config.view_config()));

        let players = config
            .dynamism
            .enabled
            .then(|| Arc::new(PlayerTracker::new(config.dynamism.chunk_radius)));

        let (bus, _) = broadcast::channel(event_bus::BUS_CAPACITY);
        let reactor = EventReactor::new(id, Arc::clone(&view), bus.clone());

        let sweep = sweep::start(
            id,
            Arc::clone(&view),
            players.clone(),
            bus.clone(),
            Duration::from_millis(config.sweep.interval_ms),
            config.sweep.max_chunks_per_pass,
        );

        let handle = Arc::new(WorldHandle {
            id,
            view,
            reactor,
            players,
            bus,
            sweep,
        });

        tracing::info!(
            world = %id,
            ?dimension,
            modifier = %config.modifier,
            radius = config.deobfuscation_radius,
            dynamism = config.dynamism.enabled,
            "world registered"
        );

        self.worlds
            .write()
            .expect("world registry poisoned")
            .insert(id, Arc::clone(&handle));
        handle
    }

    /// Drop a world's view and stop its sweep.
    pub fn unregister_world(&self, id: Uuid) {
        let removed = self
            .worlds
            .write()
            .expect("world registry poisoned")
            .remove(&id);
        if removed.is_some() {
            tracing::info!(world = %id, "world unregistered");
        }
    }

    pub fn world(&self, id: Uuid) -> Option<Arc<WorldHandle>> {
        self.worlds
            .read()
            .expect("world registry poisoned")
            .get(&id)
            .cloned()
    }

    pub fn world_count(&self) -> usize {
        self.worlds.read().expect("world registry poisoned").len()
    }
}

impl Default for ObfuscationService {
    fn default() -> Self {
        Self::new()
    }
}

fn build_modifier(
    config: &WorldConfig,
    dimension: Dimension,
    probe: Option<Arc<dyn EnvironmentProbe>>,
) -> Arc<dyn ChunkModifier> {
    let rules = config.masking_rules(dimension);
    match config.modifier.as_str() {
        config::MODIFIER_NONE => Arc::new(PassthroughModifier),
        config::MODIFIER_DECOY => match probe {
            Some(probe) => Arc::new(DecoyModifier::new(rules, probe, config.decoy_block())),
            None => {
                tracing::warn!(
                    "decoy strategy configured but no environment probe provided; \
                     falling back to cavity strategy"
                );
                Arc::new(CavityModifier::new(rules))
            }
        },
        config::MODIFIER_CAVITY => Arc::new(CavityModifier::new(rules)),
        other => {
            tracing::warn!(modifier = %other, "unknown modifier id, using cavity strategy");
            Arc::new(CavityModifier::new(rules))
        }
    }
}
