use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::component::ComponentList;
use super::tilemap::{TilePos, Tilemap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityId(pub u64);

/// Validated output of a content factory, ready to be anchored in a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thing {
    pub origin_id: u32,
    pub components: ComponentList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub origin_id: u32,
    pub position: TilePos,
    pub components: ComponentList,
    applied_spawn_order: u64,
}

impl Entity {
    pub fn applied_spawn_order(&self) -> u64 {
        self.applied_spawn_order
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }

    pub fn peek_next(&self) -> EntityId {
        EntityId(self.next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cost {cost} exceeds available gold {available}")]
pub struct InsufficientGold {
    pub cost: u32,
    pub available: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalSiteReason {
    #[error("tile is outside the map")]
    OutOfBounds,
    #[error("tile is not walkable")]
    NotWalkable,
    #[error("tile is already occupied by entity {0}")]
    Occupied(u64),
}

/// Everything a failed world-build step has to restore.
#[derive(Debug, Clone)]
pub struct SceneCheckpoint {
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    fields_of_view: BTreeMap<EntityId, BTreeSet<TilePos>>,
    allocator: EntityIdAllocator,
    next_applied_spawn_order: u64,
    gold: u32,
    tilemap: Option<Tilemap>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneSnapshot<'a> {
    pub gold: u32,
    pub next_entity_id: u64,
    pub tilemap: Option<&'a Tilemap>,
    pub entities: &'a [Entity],
    pub pending_spawns: &'a [Entity],
}

#[derive(Debug, Clone, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    next_applied_spawn_order: u64,
    gold: u32,
    tilemap: Option<Tilemap>,
    fields_of_view: BTreeMap<EntityId, BTreeSet<TilePos>>,
}

impl SceneWorld {
    pub fn with_gold(gold: u32) -> Self {
        Self {
            gold,
            ..Self::default()
        }
    }

    pub fn gold(&self) -> u32 {
        self.gold
    }

    pub fn credit_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    pub fn can_afford(&self, cost: u32) -> Result<(), InsufficientGold> {
        if cost > self.gold {
            return Err(InsufficientGold {
                cost,
                available: self.gold,
            });
        }
        Ok(())
    }

    pub fn debit_gold(&mut self, cost: u32) -> Result<u32, InsufficientGold> {
        self.can_afford(cost)?;
        self.gold -= cost;
        Ok(self.gold)
    }

    pub fn set_tilemap(&mut self, tilemap: Tilemap) {
        self.tilemap = Some(tilemap);
        self.invalidate_fields_of_view();
    }

    pub fn tilemap(&self) -> Option<&Tilemap> {
        self.tilemap.as_ref()
    }

    /// Placement legality policy shared by abilities and world-build listeners.
    ///
    /// Without a tilemap the scene is an unbounded open field and only
    /// occupancy is checked. Staged spawns count as occupants.
    pub fn check_placement_site(&self, pos: TilePos) -> Result<(), IllegalSiteReason> {
        if let Some(tilemap) = &self.tilemap {
            match tilemap.tile_at(pos) {
                None => return Err(IllegalSiteReason::OutOfBounds),
                Some(tile) if !tile.is_walkable() => return Err(IllegalSiteReason::NotWalkable),
                Some(_) => {}
            }
        }
        if let Some(occupant) = self
            .entities
            .iter()
            .chain(self.pending_spawns.iter())
            .find(|entity| entity.position == pos)
        {
            return Err(IllegalSiteReason::Occupied(occupant.id.0));
        }
        Ok(())
    }

    /// Stages a spawn; the entity becomes visible in [`SceneWorld::entities`]
    /// after the next [`SceneWorld::apply_pending`].
    pub fn spawn_thing(&mut self, position: TilePos, thing: Thing) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            origin_id: thing.origin_id,
            position,
            components: thing.components,
            applied_spawn_order: 0,
        });
        id
    }

    /// Inserts directly, leaving any staged spawns untouched.
    pub fn spawn_now(&mut self, position: TilePos, thing: Thing) -> EntityId {
        let id = self.allocator.allocate();
        self.entities.push(Entity {
            id,
            origin_id: thing.origin_id,
            position,
            components: thing.components,
            applied_spawn_order: self.next_applied_spawn_order,
        });
        self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
        id
    }

    pub fn apply_pending(&mut self) -> usize {
        let applied = self.pending_spawns.len();
        for mut entity in self.pending_spawns.drain(..) {
            entity.applied_spawn_order = self.next_applied_spawn_order;
            self.next_applied_spawn_order = self.next_applied_spawn_order.saturating_add(1);
            self.entities.push(entity);
        }
        applied
    }

    pub fn pending_spawn_count(&self) -> usize {
        self.pending_spawns.len()
    }

    pub fn checkpoint(&self) -> SceneCheckpoint {
        SceneCheckpoint {
            entities: self.entities.clone(),
            pending_spawns: self.pending_spawns.clone(),
            fields_of_view: self.fields_of_view.clone(),
            allocator: self.allocator.clone(),
            next_applied_spawn_order: self.next_applied_spawn_order,
            gold: self.gold,
            tilemap: self.tilemap.clone(),
        }
    }

    /// Restores the scene exactly as it was at `checkpoint`: live and staged
    /// entities with their components, the field-of-view cache, gold, map and
    /// id counters.
    pub fn rollback_to(&mut self, checkpoint: SceneCheckpoint) {
        self.entities = checkpoint.entities;
        self.pending_spawns = checkpoint.pending_spawns;
        self.fields_of_view = checkpoint.fields_of_view;
        self.allocator = checkpoint.allocator;
        self.next_applied_spawn_order = checkpoint.next_applied_spawn_order;
        self.gold = checkpoint.gold;
        self.tilemap = checkpoint.tilemap;
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn entities_at(&self, pos: TilePos) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .filter(move |entity| entity.position == pos)
    }

    /// Returns false when the entity is missing or has no sight component.
    pub fn set_sight_radius(&mut self, id: EntityId, radius: u32) -> bool {
        let Some(entity) = self.entities.iter_mut().find(|entity| entity.id == id) else {
            return false;
        };
        match entity.components.sight_radius_mut() {
            Some(sight) => {
                sight.set_radius(radius);
                true
            }
            None => false,
        }
    }

    pub fn field_of_view(&self, id: EntityId) -> Option<&BTreeSet<TilePos>> {
        self.fields_of_view.get(&id)
    }

    pub(crate) fn entities_and_fov_cache_mut(
        &mut self,
    ) -> (
        &mut [Entity],
        Option<&Tilemap>,
        &mut BTreeMap<EntityId, BTreeSet<TilePos>>,
    ) {
        (
            &mut self.entities,
            self.tilemap.as_ref(),
            &mut self.fields_of_view,
        )
    }

    fn invalidate_fields_of_view(&mut self) {
        for entity in &mut self.entities {
            if let Some(sight) = entity.components.sight_radius_mut() {
                sight.mark_dirty();
            }
        }
    }

    pub fn snapshot(&self) -> SceneSnapshot<'_> {
        SceneSnapshot {
            gold: self.gold,
            next_entity_id: self.allocator.peek_next().0,
            tilemap: self.tilemap.as_ref(),
            entities: &self.entities,
            pending_spawns: &self.pending_spawns,
        }
    }

    /// SHA-256 over the serialized snapshot. Equal fingerprints mean equal
    /// entities, staged spawns, gold, map and id counter.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(&self.snapshot())?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(to_hex_lower(&hasher.finalize()))
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::component::{Component, SightRadius};
    use crate::world::tilemap::TileKind;

    fn thing(origin_id: u32) -> Thing {
        Thing {
            origin_id,
            components: ComponentList::new(origin_id, vec![Component::Blocker]).expect("list"),
        }
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        assert_eq!(allocator.allocate(), EntityId(0));
        assert_eq!(allocator.allocate(), EntityId(1));
        assert_eq!(allocator.peek_next(), EntityId(2));
    }

    #[test]
    fn staged_spawns_appear_after_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn_thing(TilePos::new(1, 1), thing(9));
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.pending_spawn_count(), 1);

        assert_eq!(world.apply_pending(), 1);
        let entity = world.find_entity(id).expect("entity");
        assert_eq!(entity.origin_id, 9);
        assert_eq!(entity.position, TilePos::new(1, 1));
        assert_eq!(entity.applied_spawn_order(), 0);
    }

    #[test]
    fn debit_refuses_overdraft_and_leaves_gold() {
        let mut world = SceneWorld::with_gold(3);
        let err = world.debit_gold(5).expect_err("overdraft");
        assert_eq!(
            err,
            InsufficientGold {
                cost: 5,
                available: 3
            }
        );
        assert_eq!(world.gold(), 3);
        assert_eq!(world.debit_gold(3).expect("exact"), 0);
    }

    #[test]
    fn placement_site_checks_bounds_walls_and_occupancy() {
        let mut world = SceneWorld::default();
        world.set_tilemap(Tilemap::walled_room(6, 6));
        assert_eq!(
            world.check_placement_site(TilePos::new(9, 1)),
            Err(IllegalSiteReason::OutOfBounds)
        );
        assert_eq!(
            world.check_placement_site(TilePos::new(0, 2)),
            Err(IllegalSiteReason::NotWalkable)
        );
        assert_eq!(world.check_placement_site(TilePos::new(2, 2)), Ok(()));

        let staged = world.spawn_thing(TilePos::new(2, 2), thing(1));
        assert_eq!(
            world.check_placement_site(TilePos::new(2, 2)),
            Err(IllegalSiteReason::Occupied(staged.0))
        );
    }

    #[test]
    fn open_field_without_tilemap_accepts_any_free_tile() {
        let world = SceneWorld::default();
        assert_eq!(world.check_placement_site(TilePos::new(-40, 900)), Ok(()));
    }

    #[test]
    fn rollback_restores_fingerprint() {
        let mut world = SceneWorld::with_gold(10);
        world.set_tilemap(Tilemap::walled_room(8, 8));
        world.spawn_thing(TilePos::new(1, 1), thing(1));
        world.apply_pending();
        let before = world.fingerprint().expect("fingerprint");

        let checkpoint = world.checkpoint();
        world.spawn_thing(TilePos::new(2, 2), thing(2));
        world.apply_pending();
        world.spawn_thing(TilePos::new(3, 3), thing(3));
        world.credit_gold(50);
        let mut carved = Tilemap::walled_room(8, 8);
        carved.set_tile(TilePos::new(4, 4), TileKind::Wall);
        world.set_tilemap(carved);
        assert_ne!(world.fingerprint().expect("fingerprint"), before);

        world.rollback_to(checkpoint);
        assert_eq!(world.fingerprint().expect("fingerprint"), before);
        assert_eq!(world.spawn_thing(TilePos::new(5, 5), thing(5)), EntityId(1));
    }

    #[test]
    fn rollback_restores_staged_spawns_and_component_edits() {
        let mut world = SceneWorld::default();
        let watcher = world.spawn_now(
            TilePos::new(1, 1),
            Thing {
                origin_id: 7,
                components: ComponentList::new(
                    7,
                    vec![Component::SightRadius(SightRadius::new(2))],
                )
                .expect("list"),
            },
        );
        let staged = world.spawn_thing(TilePos::new(2, 2), thing(2));
        let before = world.fingerprint().expect("fingerprint");

        let checkpoint = world.checkpoint();
        assert_eq!(world.apply_pending(), 1);
        assert!(world.set_sight_radius(watcher, 9));
        world.rollback_to(checkpoint);

        assert_eq!(world.fingerprint().expect("fingerprint"), before);
        assert_eq!(world.pending_spawn_count(), 1);
        assert!(world.find_entity(staged).is_none());
        let sight = world
            .find_entity(watcher)
            .and_then(|entity| entity.components.sight_radius())
            .expect("sight");
        assert_eq!(sight.radius(), 2);
    }

    #[test]
    fn fingerprint_tracks_gold() {
        let mut world = SceneWorld::with_gold(4);
        let before = world.fingerprint().expect("fingerprint");
        world.credit_gold(1);
        assert_ne!(world.fingerprint().expect("fingerprint"), before);
    }
}
