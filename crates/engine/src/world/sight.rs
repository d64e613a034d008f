use std::collections::BTreeSet;

use tracing::debug;

use super::scene::SceneWorld;
use super::tilemap::{TilePos, Tilemap};

/// Recomputes cached fields of view for entities whose sight radius is dirty.
///
/// Returns how many entities were recomputed. Clean entities keep their cache.
pub fn refresh_fields_of_view(world: &mut SceneWorld) -> usize {
    let (entities, tilemap, cache) = world.entities_and_fov_cache_mut();
    let mut recomputed = 0usize;
    for entity in entities.iter_mut() {
        let Some(sight) = entity.components.sight_radius_mut() else {
            continue;
        };
        if !sight.is_dirty() {
            continue;
        }
        let visible = compute_visible_tiles(tilemap, entity.position, sight.radius());
        cache.insert(entity.id, visible);
        sight.mark_clean();
        recomputed += 1;
    }
    if recomputed > 0 {
        debug!(recomputed, "fields_of_view_refreshed");
    }
    recomputed
}

pub fn compute_visible_tiles(
    tilemap: Option<&Tilemap>,
    origin: TilePos,
    radius: u32,
) -> BTreeSet<TilePos> {
    let mut visible = BTreeSet::new();
    let r = radius.min(i32::MAX as u32) as i32;
    let radius_sq = i64::from(r) * i64::from(r);
    for dy in -r..=r {
        for dx in -r..=r {
            if i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy) > radius_sq {
                continue;
            }
            let target = TilePos::new(origin.x.saturating_add(dx), origin.y.saturating_add(dy));
            if let Some(map) = tilemap {
                if !map.contains(target) {
                    continue;
                }
            }
            if has_line_of_sight(tilemap, origin, target) {
                visible.insert(target);
            }
        }
    }
    visible
}

// Opaque tiles are visible themselves but hide what lies behind them.
fn has_line_of_sight(tilemap: Option<&Tilemap>, from: TilePos, to: TilePos) -> bool {
    let Some(map) = tilemap else {
        return true;
    };
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    while (x, y) != (to.x, to.y) {
        if (x, y) != (from.x, from.y) {
            let opaque = map
                .tile_at(TilePos::new(x, y))
                .map_or(true, |tile| tile.is_opaque());
            if opaque {
                return false;
            }
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::component::{Component, ComponentList, SightRadius};
    use crate::world::scene::Thing;
    use crate::world::tilemap::TileKind;

    fn watcher(radius: u32) -> Thing {
        Thing {
            origin_id: 1,
            components: ComponentList::new(1, vec![Component::SightRadius(SightRadius::new(radius))])
                .expect("list"),
        }
    }

    #[test]
    fn radius_zero_sees_only_own_tile() {
        let visible = compute_visible_tiles(None, TilePos::new(3, 3), 0);
        assert_eq!(visible.len(), 1);
        assert!(visible.contains(&TilePos::new(3, 3)));
    }

    #[test]
    fn walls_block_tiles_behind_them() {
        let mut map = Tilemap::filled(9, 3, TileKind::Floor);
        map.set_tile(TilePos::new(4, 1), TileKind::Wall);
        let visible = compute_visible_tiles(Some(&map), TilePos::new(2, 1), 4);
        assert!(visible.contains(&TilePos::new(3, 1)));
        assert!(visible.contains(&TilePos::new(4, 1)));
        assert!(!visible.contains(&TilePos::new(5, 1)));
        assert!(!visible.contains(&TilePos::new(6, 1)));
    }

    #[test]
    fn refresh_only_recomputes_dirty_entities() {
        let mut world = SceneWorld::default();
        world.set_tilemap(Tilemap::walled_room(12, 12));
        let id = world.spawn_thing(TilePos::new(5, 5), watcher(2));
        world.apply_pending();

        assert_eq!(refresh_fields_of_view(&mut world), 1);
        let narrow = world.field_of_view(id).expect("fov").len();
        assert_eq!(refresh_fields_of_view(&mut world), 0);

        assert!(world.set_sight_radius(id, 4));
        assert_eq!(refresh_fields_of_view(&mut world), 1);
        let wide = world.field_of_view(id).expect("fov").len();
        assert!(wide > narrow);
    }

    #[test]
    fn replacing_tilemap_marks_sight_dirty() {
        let mut world = SceneWorld::default();
        world.set_tilemap(Tilemap::walled_room(12, 12));
        world.spawn_thing(TilePos::new(5, 5), watcher(3));
        world.apply_pending();
        refresh_fields_of_view(&mut world);

        world.set_tilemap(Tilemap::walled_room(14, 14));
        assert_eq!(refresh_fields_of_view(&mut world), 1);
    }
}
