//! Collectible spawning and the pickup protocol.
//!
//! Pickups arrive as untrusted requests. The service re-checks that the
//! entity is still live before crediting anyone, so when two players
//! touch the same collectible only the first request has any effect.

use std::collections::BTreeMap;

use coinrush_protocol::{Collectible, EntityId, PlayerId, Vec2};
use coinrush_replication::ScoreReplicator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::SpawnArea;

/// What a pickup request did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickupOutcome {
    /// The collectible was destroyed by this request. `credited` is false
    /// only when the requester has no score record.
    Collected {
        collectible: Collectible,
        credited: bool,
    },
    /// The entity was already gone. Nothing changed.
    Stale,
}

/// Owns every live collectible.
#[derive(Debug)]
pub struct CollectibleService {
    rng: StdRng,
    next_id: u64,
    live: BTreeMap<EntityId, Collectible>,
}

impl CollectibleService {
    /// Creates a service. A seed makes spawn positions reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            next_id: 1,
            live: BTreeMap::new(),
        }
    }

    /// Spawns one collectible at a uniformly random point in `area`.
    ///
    /// Corners may be given in either order.
    ///
    /// # Panics
    /// If a corner coordinate is NaN or infinite. [`SessionConfig::validate`]
    /// rejects such areas before a session starts.
    ///
    /// [`SessionConfig::validate`]: crate::SessionConfig::validate
    pub fn spawn_one(&mut self, area: &SpawnArea) -> Collectible {
        let (min_x, max_x) = ordered(area.min.x, area.max.x);
        let (min_y, max_y) = ordered(area.min.y, area.max.y);
        let position = Vec2::new(
            self.rng.random_range(min_x..=max_x),
            self.rng.random_range(min_y..=max_y),
        );
        let entity_id = EntityId(self.next_id);
        self.next_id += 1;

        let collectible = Collectible {
            entity_id,
            position,
        };
        self.live.insert(entity_id, collectible);
        trace!(%entity_id, x = position.x, y = position.y, "collectible spawned");
        collectible
    }

    /// Handles "`player_id` touched `entity_id`".
    ///
    /// Credits +1 through `scores`, then destroys the entity. A request for
    /// an entity that no longer exists is a no-op.
    pub fn request_pickup(
        &mut self,
        entity_id: EntityId,
        player_id: PlayerId,
        scores: &mut ScoreReplicator,
    ) -> PickupOutcome {
        if !self.live.contains_key(&entity_id) {
            debug!(%entity_id, %player_id, "stale pickup ignored");
            return PickupOutcome::Stale;
        }
        let credited = scores.increase_score(player_id, 1).is_some();
        let Some(collectible) = self.live.remove(&entity_id) else {
            return PickupOutcome::Stale;
        };
        debug!(%entity_id, %player_id, credited, "collectible picked up");
        PickupOutcome::Collected {
            collectible,
            credited,
        }
    }

    /// Destroys every live collectible without crediting anyone.
    ///
    /// Returns them in entity-id order.
    pub fn force_destroy_all(&mut self) -> Vec<Collectible> {
        let swept: Vec<Collectible> = std::mem::take(&mut self.live).into_values().collect();
        if !swept.is_empty() {
            debug!(count = swept.len(), "collectibles swept");
        }
        swept
    }

    pub fn is_live(&self, entity_id: EntityId) -> bool {
        self.live.contains_key(&entity_id)
    }

    pub fn live(&self) -> impl Iterator<Item = &Collectible> {
        self.live.values()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}
