use rand::RngCore;

use crate::world::{Component, ComponentList, ConfigurationError, Thing};

use super::database::{ThingDef, ThingDefDatabase};

/// Raw factory output. Becomes a [`Thing`] only after [`ThingRecipe::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThingRecipe {
    pub origin_id: u32,
    pub components: Vec<Component>,
}

impl ThingRecipe {
    pub fn new(origin_id: u32, components: Vec<Component>) -> Self {
        Self {
            origin_id,
            components,
        }
    }

    pub fn validate(self) -> Result<Thing, ConfigurationError> {
        let components = ComponentList::new(self.origin_id, self.components)?;
        Ok(Thing {
            origin_id: self.origin_id,
            components,
        })
    }
}

/// Builds the component makeup of a placeable object at a tile.
///
/// Implementations must be pure given `(x, y)` and `rng`: they never see the scene.
pub trait ContentFactory {
    fn make_thing(&self, x: i32, y: i32, rng: &mut dyn RngCore) -> ThingRecipe;
}

/// Factory backed by a compiled `<ThingDef>`.
#[derive(Debug, Clone)]
pub struct DefFactory {
    def: ThingDef,
}

impl DefFactory {
    pub fn new(def: ThingDef) -> Self {
        Self { def }
    }

    pub fn from_database(
        database: &ThingDefDatabase,
        def_name: &str,
    ) -> Result<Self, ConfigurationError> {
        database
            .thing_def_by_name(def_name)
            .cloned()
            .map(Self::new)
            .ok_or_else(|| ConfigurationError::UnknownDef {
                def_name: def_name.to_string(),
            })
    }

    pub fn def(&self) -> &ThingDef {
        &self.def
    }
}

impl ContentFactory for DefFactory {
    fn make_thing(&self, _x: i32, _y: i32, _rng: &mut dyn RngCore) -> ThingRecipe {
        ThingRecipe::new(self.def.origin_id, self.def.components.clone())
    }
}
