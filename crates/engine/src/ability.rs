//! Player-targeted placement abilities.
//!
//! Every ability goes through [`attempt_placement`]: affordability and site
//! legality are checked and the factory output is validated before the scene
//! is touched, so the gold debit, the new entity and the confirmation popup
//! either all happen or none of them do.

use std::collections::BTreeMap;

use rand::RngCore;
use thiserror::Error;
use tracing::{info, warn};

use crate::content::{ContentFactory, ThingRecipe};
use crate::registry::RegistryError;
use crate::ui::{PopupConfig, PopupHandle, UiContext, UiElement};
use crate::world::{
    ConfigurationError, EntityId, IllegalSiteReason, SceneWorld, Thing, TilePos,
};

pub trait AbilityActor {
    fn label(&self) -> &str;
    fn cost(&self) -> u32;
    fn make_thing(&self, x: i32, y: i32, rng: &mut dyn RngCore) -> ThingRecipe;
}

/// Binds a cost and a label to any content factory.
#[derive(Debug, Clone)]
pub struct FactoryAbility<F> {
    label: String,
    cost: u32,
    factory: F,
}

impl<F: ContentFactory> FactoryAbility<F> {
    pub fn new(label: impl Into<String>, cost: u32, factory: F) -> Self {
        Self {
            label: label.into(),
            cost,
            factory,
        }
    }
}

impl<F: ContentFactory> AbilityActor for FactoryAbility<F> {
    fn label(&self) -> &str {
        &self.label
    }

    fn cost(&self) -> u32 {
        self.cost
    }

    fn make_thing(&self, x: i32, y: i32, rng: &mut dyn RngCore) -> ThingRecipe {
        self.factory.make_thing(x, y, rng)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("not enough gold: costs {cost}, have {available}")]
    InsufficientGold { cost: u32, available: u32 },
    #[error("cannot place at ({x}, {y}): {reason}")]
    IllegalSite {
        x: i32,
        y: i32,
        reason: IllegalSiteReason,
    },
    #[error("unknown ability '{id}'")]
    UnknownAbility { id: String },
    #[error("ability content is malformed: {0}")]
    Configuration(#[from] ConfigurationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementReceipt {
    pub entity_id: EntityId,
    pub origin_id: u32,
    pub position: TilePos,
    pub cost: u32,
    pub remaining_gold: u32,
    pub popup: PopupHandle,
}

pub fn attempt_placement(
    actor: &dyn AbilityActor,
    scene: &mut SceneWorld,
    x: i32,
    y: i32,
    rng: &mut dyn RngCore,
    ui: &mut dyn UiContext,
) -> Result<PlacementReceipt, PlacementError> {
    let position = TilePos::new(x, y);
    let thing = match compose_thing(actor, scene, position, rng) {
        Ok(thing) => thing,
        Err(err) => return Err(report_rejection(actor.label(), position, err, ui)),
    };

    let cost = actor.cost();
    let remaining_gold = match scene.debit_gold(cost) {
        Ok(remaining) => remaining,
        Err(shortfall) => {
            let err = PlacementError::InsufficientGold {
                cost: shortfall.cost,
                available: shortfall.available,
            };
            return Err(report_rejection(actor.label(), position, err, ui));
        }
    };
    let origin_id = thing.origin_id;
    let entity_id = scene.spawn_now(position, thing);

    let popup = ui.create_popup(
        &format!("{} placed at ({}, {})", actor.label(), x, y),
        PopupConfig::confirmation(actor.label()),
    );
    ui.render_element(UiElement::status("gold", remaining_gold));
    info!(
        ability = actor.label(),
        x,
        y,
        entity_id = entity_id.0,
        origin_id,
        cost,
        gold_remaining = remaining_gold,
        "placement_succeeded"
    );

    Ok(PlacementReceipt {
        entity_id,
        origin_id,
        position,
        cost,
        remaining_gold,
        popup,
    })
}

// Read-only with respect to the scene.
fn compose_thing(
    actor: &dyn AbilityActor,
    scene: &SceneWorld,
    position: TilePos,
    rng: &mut dyn RngCore,
) -> Result<Thing, PlacementError> {
    scene
        .can_afford(actor.cost())
        .map_err(|shortfall| PlacementError::InsufficientGold {
            cost: shortfall.cost,
            available: shortfall.available,
        })?;
    scene
        .check_placement_site(position)
        .map_err(|reason| PlacementError::IllegalSite {
            x: position.x,
            y: position.y,
            reason,
        })?;
    Ok(actor.make_thing(position.x, position.y, rng).validate()?)
}

fn report_rejection(
    label: &str,
    position: TilePos,
    err: PlacementError,
    ui: &mut dyn UiContext,
) -> PlacementError {
    warn!(
        ability = label,
        x = position.x,
        y = position.y,
        error = %err,
        "placement_rejected"
    );
    ui.create_popup(&err.to_string(), PopupConfig::error(label));
    err
}

/// Ability id to actor lookup. Adding an ability never touches the dispatch path.
#[derive(Default)]
pub struct AbilityRegistry {
    actors: BTreeMap<String, Box<dyn AbilityActor>>,
}

impl AbilityRegistry {
    pub fn register(
        &mut self,
        id: impl Into<String>,
        actor: Box<dyn AbilityActor>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if self.actors.contains_key(&id) {
            return Err(RegistryError::DuplicateId {
                registry: "ability",
                id,
            });
        }
        self.actors.insert(id, actor);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn AbilityActor> {
        self.actors.get(id).map(|actor| actor.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.actors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn resolve(
        &self,
        id: &str,
        scene: &mut SceneWorld,
        x: i32,
        y: i32,
        rng: &mut dyn RngCore,
        ui: &mut dyn UiContext,
    ) -> Result<PlacementReceipt, PlacementError> {
        match self.get(id) {
            Some(actor) => attempt_placement(actor, scene, x, y, rng, ui),
            None => {
                let err = PlacementError::UnknownAbility { id: id.to_string() };
                Err(report_rejection(id, TilePos::new(x, y), err, ui))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::test_support::{
        trap_components, EmptyFactory, RecordingUi, TrapFactory, TRAP_ORIGIN_ID,
    };
    use crate::ui::PopupKind;
    use crate::world::{Component, ComponentList, Tilemap};

    fn trap_ability() -> FactoryAbility<TrapFactory> {
        FactoryAbility::new("Spike trap", 5, TrapFactory)
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn placing_trap_with_enough_gold_debits_cost_and_spawns_one_entity() {
        let mut scene = SceneWorld::with_gold(10);
        let mut ui = RecordingUi::default();

        let receipt = attempt_placement(&trap_ability(), &mut scene, 4, 4, &mut rng(), &mut ui)
            .expect("placement");

        assert_eq!(scene.gold(), 5);
        assert_eq!(receipt.remaining_gold, 5);
        assert_eq!(scene.entity_count(), 1);
        let entity = scene.find_entity(receipt.entity_id).expect("entity");
        assert_eq!(entity.position, TilePos::new(4, 4));
        assert_eq!(entity.origin_id, TRAP_ORIGIN_ID);
        assert_eq!(
            entity.components,
            ComponentList::new(TRAP_ORIGIN_ID, trap_components()).expect("list")
        );
        assert_eq!(ui.popup_kinds(), vec![PopupKind::Confirmation]);
        assert_eq!(ui.popups[0].0, receipt.popup);
    }

    #[test]
    fn placing_trap_without_enough_gold_changes_nothing() {
        let mut scene = SceneWorld::with_gold(3);
        let before = scene.fingerprint().expect("fingerprint");
        let mut ui = RecordingUi::default();

        let err = attempt_placement(&trap_ability(), &mut scene, 4, 4, &mut rng(), &mut ui)
            .expect_err("insufficient");

        assert_eq!(
            err,
            PlacementError::InsufficientGold {
                cost: 5,
                available: 3
            }
        );
        assert_eq!(scene.gold(), 3);
        assert_eq!(scene.entity_count(), 0);
        assert_eq!(scene.fingerprint().expect("fingerprint"), before);
        assert_eq!(ui.popup_kinds(), vec![PopupKind::Error]);
        assert!(ui.elements.is_empty());
    }

    #[test]
    fn illegal_site_is_rejected_before_the_factory_runs() {
        let mut scene = SceneWorld::with_gold(50);
        scene.set_tilemap(Tilemap::walled_room(8, 8));
        let mut ui = RecordingUi::default();
        let before = scene.fingerprint().expect("fingerprint");

        for (x, y, expected) in [
            (0, 3, IllegalSiteReason::NotWalkable),
            (20, 3, IllegalSiteReason::OutOfBounds),
        ] {
            let err = attempt_placement(&trap_ability(), &mut scene, x, y, &mut rng(), &mut ui)
                .expect_err("illegal");
            assert_eq!(err, PlacementError::IllegalSite { x, y, reason: expected });
        }
        assert_eq!(scene.fingerprint().expect("fingerprint"), before);
    }

    #[test]
    fn occupied_tile_is_rejected() {
        let mut scene = SceneWorld::with_gold(50);
        let mut ui = RecordingUi::default();
        let first = attempt_placement(&trap_ability(), &mut scene, 2, 2, &mut rng(), &mut ui)
            .expect("first");
        let err = attempt_placement(&trap_ability(), &mut scene, 2, 2, &mut rng(), &mut ui)
            .expect_err("occupied");
        assert_eq!(
            err,
            PlacementError::IllegalSite {
                x: 2,
                y: 2,
                reason: IllegalSiteReason::Occupied(first.entity_id.0)
            }
        );
        assert_eq!(scene.gold(), 45);
    }

    #[test]
    fn malformed_factory_output_surfaces_as_configuration_error() {
        let mut scene = SceneWorld::with_gold(10);
        let before = scene.fingerprint().expect("fingerprint");
        let mut ui = RecordingUi::default();
        let broken = FactoryAbility::new("Broken", 1, EmptyFactory);

        let err = attempt_placement(&broken, &mut scene, 1, 1, &mut rng(), &mut ui)
            .expect_err("configuration");

        assert_eq!(
            err,
            PlacementError::Configuration(ConfigurationError::EmptyComponents { origin_id: 999 })
        );
        assert_eq!(scene.fingerprint().expect("fingerprint"), before);
        assert_eq!(ui.popup_kinds(), vec![PopupKind::Error]);
    }

    #[test]
    fn balance_and_entity_count_move_together_across_costs() {
        for gold in 0..8u32 {
            for cost in 0..8u32 {
                let mut scene = SceneWorld::with_gold(gold);
                let mut ui = RecordingUi::default();
                let actor = FactoryAbility::new("Trap", cost, TrapFactory);
                let result = attempt_placement(&actor, &mut scene, 0, 0, &mut rng(), &mut ui);
                if cost <= gold {
                    assert!(result.is_ok());
                    assert_eq!(scene.gold(), gold - cost);
                    assert_eq!(scene.entity_count(), 1);
                } else {
                    assert!(result.is_err());
                    assert_eq!(scene.gold(), gold);
                    assert_eq!(scene.entity_count(), 0);
                }
            }
        }
    }

    #[test]
    fn placement_leaves_staged_spawns_alone() {
        let mut scene = SceneWorld::with_gold(10);
        scene.spawn_thing(
            TilePos::new(9, 9),
            ThingRecipe::new(1, vec![Component::Blocker])
                .validate()
                .expect("valid"),
        );
        let mut ui = RecordingUi::default();
        attempt_placement(&trap_ability(), &mut scene, 4, 4, &mut rng(), &mut ui)
            .expect("placement");
        assert_eq!(scene.entity_count(), 1);
        assert_eq!(scene.pending_spawn_count(), 1);
    }

    #[test]
    fn registry_dispatches_by_id_and_rejects_unknown_ids() {
        let mut registry = AbilityRegistry::default();
        registry
            .register("place_trap", Box::new(trap_ability()))
            .expect("register");
        let duplicate = registry
            .register("place_trap", Box::new(trap_ability()))
            .expect_err("duplicate");
        assert!(matches!(duplicate, RegistryError::DuplicateId { .. }));

        let mut scene = SceneWorld::with_gold(10);
        let mut ui = RecordingUi::default();
        registry
            .resolve("place_trap", &mut scene, 4, 4, &mut rng(), &mut ui)
            .expect("resolve");
        let err = registry
            .resolve("summon_dragon", &mut scene, 5, 5, &mut rng(), &mut ui)
            .expect_err("unknown");
        assert_eq!(
            err,
            PlacementError::UnknownAbility {
                id: "summon_dragon".to_string()
            }
        );
        assert_eq!(scene.gold(), 5);
        assert_eq!(
            ui.popup_kinds(),
            vec![PopupKind::Confirmation, PopupKind::Error]
        );
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["place_trap"]);
    }
}
