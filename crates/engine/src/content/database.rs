use std::collections::HashMap;

use crate::world::Component;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThingDefId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThingDef {
    pub id: ThingDefId,
    pub def_name: String,
    pub origin_id: u32,
    pub label: String,
    pub components: Vec<Component>,
}

#[derive(Debug, Default, Clone)]
pub struct ThingDefDatabase {
    thing_defs: Vec<ThingDef>,
    thing_ids_by_name: HashMap<String, ThingDefId>,
}

impl ThingDefDatabase {
    pub fn from_thing_defs(mut thing_defs: Vec<ThingDef>) -> Self {
        let mut thing_ids_by_name = HashMap::with_capacity(thing_defs.len());
        for (idx, def) in thing_defs.iter_mut().enumerate() {
            let id = ThingDefId(idx as u32);
            def.id = id;
            thing_ids_by_name.insert(def.def_name.clone(), id);
        }
        Self {
            thing_defs,
            thing_ids_by_name,
        }
    }

    pub fn thing_def_id_by_name(&self, name: &str) -> Option<ThingDefId> {
        self.thing_ids_by_name.get(name).copied()
    }

    pub fn thing_def(&self, id: ThingDefId) -> Option<&ThingDef> {
        self.thing_defs.get(id.0 as usize)
    }

    pub fn thing_def_by_name(&self, name: &str) -> Option<&ThingDef> {
        self.thing_def_id_by_name(name)
            .and_then(|id| self.thing_def(id))
    }

    pub fn thing_defs(&self) -> &[ThingDef] {
        &self.thing_defs
    }

    pub fn len(&self) -> usize {
        self.thing_defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thing_defs.is_empty()
    }
}
