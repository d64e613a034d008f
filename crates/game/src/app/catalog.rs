//! Concrete abilities, world-build listeners and code-side factories.

use std::rc::Rc;

use engine::{
    place_anywhere, AbilityRegistry, BuildWorldListener, Component, ContentFactory, DefFactory,
    FactoryAbility, ListenerError, ListenerRegistry, NameGrammar, SceneWorld, ThingDef,
    ThingDefDatabase, ThingRecipe,
};
use rand::{Rng, RngCore};

use super::bootstrap::GameError;

pub(crate) const TRAP_DEF: &str = "trap.spike";
pub(crate) const BARRICADE_DEF: &str = "structure.barricade";
pub(crate) const TOTEM_DEF: &str = "structure.totem";
pub(crate) const WATCHTOWER_DEF: &str = "structure.watchtower";
pub(crate) const GOBLIN_DEF: &str = "monster.goblin";
pub(crate) const GOLD_PILE_DEF: &str = "treasure.gold_pile";

pub(crate) const WATCHTOWER_COUNT: usize = 3;
const TREASURE_PILES: std::ops::RangeInclusive<usize> = 2..=4;
const TREASURE_GOLD: std::ops::RangeInclusive<u32> = 5..=25;
const MONSTER_COUNT: std::ops::RangeInclusive<usize> = 1..=3;

/// `(ability id, def name, label, cost)`
const ABILITIES: [(&str, &str, &str, u32); 3] = [
    ("place_trap", TRAP_DEF, "Spike trap", 5),
    ("raise_barricade", BARRICADE_DEF, "Barricade", 3),
    ("summon_totem", TOTEM_DEF, "Warding totem", 8),
];

pub(crate) fn build_ability_registry(
    database: &ThingDefDatabase,
) -> Result<AbilityRegistry, GameError> {
    let mut registry = AbilityRegistry::default();
    for (id, def_name, label, cost) in ABILITIES {
        let factory = DefFactory::from_database(database, def_name)?;
        registry.register(id, Box::new(FactoryAbility::new(label, cost, factory)))?;
    }
    Ok(registry)
}

pub(crate) fn build_listener_registry(
    database: &ThingDefDatabase,
    grammar: Rc<NameGrammar>,
) -> Result<ListenerRegistry, GameError> {
    let mut registry = ListenerRegistry::default();
    registry.register(
        RaiseWatchtowers::ID,
        Rc::new(RaiseWatchtowers {
            factory: DefFactory::from_database(database, WATCHTOWER_DEF)?,
        }),
    )?;
    registry.register(
        ScatterTreasure::ID,
        Rc::new(ScatterTreasure {
            factory: TreasureFactory::new(lookup(database, GOLD_PILE_DEF)?),
        }),
    )?;
    registry.register(
        SpawnMonsters::ID,
        Rc::new(SpawnMonsters {
            factory: MonsterFactory::new(lookup(database, GOBLIN_DEF)?, grammar),
        }),
    )?;
    Ok(registry)
}

fn lookup(database: &ThingDefDatabase, def_name: &str) -> Result<ThingDef, GameError> {
    Ok(DefFactory::from_database(database, def_name)?.def().clone())
}

/// Gold pile with a randomly rolled amount.
pub(crate) struct TreasureFactory {
    def: ThingDef,
}

impl TreasureFactory {
    pub(crate) fn new(def: ThingDef) -> Self {
        Self { def }
    }
}

impl ContentFactory for TreasureFactory {
    fn make_thing(&self, _x: i32, _y: i32, rng: &mut dyn RngCore) -> ThingRecipe {
        let gold = rng.gen_range(TREASURE_GOLD);
        let components = self
            .def
            .components
            .iter()
            .map(|component| match component {
                Component::Treasure { .. } => Component::Treasure { gold },
                other => other.clone(),
            })
            .collect();
        ThingRecipe::new(self.def.origin_id, components)
    }
}

/// Monster whose display name comes from the name grammar.
pub(crate) struct MonsterFactory {
    def: ThingDef,
    grammar: Rc<NameGrammar>,
}

impl MonsterFactory {
    pub(crate) fn new(def: ThingDef, grammar: Rc<NameGrammar>) -> Self {
        Self { def, grammar }
    }
}

impl ContentFactory for MonsterFactory {
    fn make_thing(&self, _x: i32, _y: i32, rng: &mut dyn RngCore) -> ThingRecipe {
        let name = engine::generate_name(&self.grammar, rng);
        let mut components: Vec<Component> = self
            .def
            .components
            .iter()
            .filter(|component| !matches!(component, Component::Named { .. }))
            .cloned()
            .collect();
        components.insert(0, Component::Named { name });
        ThingRecipe::new(self.def.origin_id, components)
    }
}

pub(crate) struct RaiseWatchtowers {
    factory: DefFactory,
}

impl RaiseWatchtowers {
    pub(crate) const ID: &'static str = "raise_watchtowers";
}

impl BuildWorldListener for RaiseWatchtowers {
    fn on_build_world(
        &self,
        scene: &mut SceneWorld,
        rng: &mut dyn RngCore,
    ) -> Result<(), ListenerError> {
        for _ in 0..WATCHTOWER_COUNT {
            place_anywhere(Self::ID, WATCHTOWER_DEF, scene, &self.factory, rng)?;
        }
        Ok(())
    }
}

pub(crate) struct ScatterTreasure {
    factory: TreasureFactory,
}

impl ScatterTreasure {
    pub(crate) const ID: &'static str = "scatter_treasure";
}

impl BuildWorldListener for ScatterTreasure {
    fn on_build_world(
        &self,
        scene: &mut SceneWorld,
        rng: &mut dyn RngCore,
    ) -> Result<(), ListenerError> {
        let piles = rng.gen_range(TREASURE_PILES);
        for _ in 0..piles {
            place_anywhere(Self::ID, GOLD_PILE_DEF, scene, &self.factory, rng)?;
        }
        Ok(())
    }
}

pub(crate) struct SpawnMonsters {
    factory: MonsterFactory,
}

impl SpawnMonsters {
    pub(crate) const ID: &'static str = "spawn_monsters";
}

impl BuildWorldListener for SpawnMonsters {
    fn on_build_world(
        &self,
        scene: &mut SceneWorld,
        rng: &mut dyn RngCore,
    ) -> Result<(), ListenerError> {
        let count = rng.gen_range(MONSTER_COUNT);
        for _ in 0..count {
            place_anywhere(Self::ID, GOBLIN_DEF, scene, &self.factory, rng)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use engine::{compile_thing_defs, AppPaths, ComponentKind, ContentRequest, Tilemap};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    pub(crate) fn shipped_database() -> ThingDefDatabase {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..");
        compile_thing_defs(&AppPaths::under_root(root), &ContentRequest::default())
            .expect("shipped content")
    }

    #[test]
    fn every_ability_resolves_to_shipped_content() {
        let registry = build_ability_registry(&shipped_database()).expect("abilities");
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec!["place_trap", "raise_barricade", "summon_totem"]
        );
        assert_eq!(registry.get("place_trap").expect("trap").cost(), 5);
        assert_eq!(registry.get("raise_barricade").expect("barricade").cost(), 3);
        assert_eq!(registry.get("summon_totem").expect("totem").cost(), 8);
    }

    #[test]
    fn missing_def_fails_registry_construction() {
        let err = build_ability_registry(&ThingDefDatabase::default())
            .err()
            .expect("missing defs");
        assert!(matches!(err, GameError::Configuration(_)));
    }

    #[test]
    fn watchtower_listener_places_exactly_three() {
        let database = shipped_database();
        let registry =
            build_listener_registry(&database, Rc::new(NameGrammar::default())).expect("listeners");
        let pipeline = registry
            .pipeline_for(&[RaiseWatchtowers::ID])
            .expect("pipeline");
        let mut scene = SceneWorld::default();
        scene.set_tilemap(Tilemap::walled_room(10, 10));
        let mut ui = crate::app::headless_ui::HeadlessUi::default();

        let report = pipeline.run(&mut scene, 4, &mut ui);

        assert_eq!(scene.entity_count(), WATCHTOWER_COUNT);
        assert_eq!(report.total_placed(), WATCHTOWER_COUNT);
        assert!(scene
            .entities()
            .iter()
            .all(|entity| entity.components.contains(ComponentKind::Structure)));
    }

    #[test]
    fn treasure_amount_is_rolled_within_range() {
        let factory = TreasureFactory::new(lookup(&shipped_database(), GOLD_PILE_DEF).expect("def"));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let thing = factory.make_thing(0, 0, &mut rng).validate().expect("valid");
            match thing.components.get(ComponentKind::Treasure) {
                Some(Component::Treasure { gold }) => assert!(TREASURE_GOLD.contains(gold)),
                other => panic!("unexpected treasure component: {other:?}"),
            }
        }
    }

    #[test]
    fn monsters_carry_a_generated_name() {
        let grammar = Rc::new(NameGrammar::default());
        let factory =
            MonsterFactory::new(lookup(&shipped_database(), GOBLIN_DEF).expect("def"), grammar);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let thing = factory.make_thing(1, 1, &mut rng).validate().expect("valid");

        let name = thing.components.name().expect("name");
        assert_ne!(name, "Goblin");
        assert!(name.contains(' '));
        assert!(thing.components.contains(ComponentKind::Health));
    }
}
