use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub text: String,
    pub color: Option<Rgb>,
}

impl DisplayMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    pub fn colored(text: impl Into<String>, color: Rgb) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
        }
    }
}

/// Vision range of an entity.
///
/// The radius is only reachable through mutators that raise `dirty`, so a
/// cached field of view is never reused after the radius changed. The
/// field-of-view refresh is the only caller of [`SightRadius::mark_clean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SightRadius {
    radius: u32,
    #[serde(skip, default = "start_dirty")]
    dirty: bool,
}

fn start_dirty() -> bool {
    true
}

impl SightRadius {
    pub fn new(radius: u32) -> Self {
        Self {
            radius,
            dirty: true,
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: u32) {
        if self.radius != radius {
            self.radius = radius;
            self.dirty = true;
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Renderable,
    Named,
    Trap,
    Structure,
    Health,
    Blocker,
    SightRadius,
    UiOption,
    Message,
    Treasure,
}

impl ComponentKind {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Renderable => "Renderable",
            Self::Named => "Named",
            Self::Trap => "Trap",
            Self::Structure => "Structure",
            Self::Health => "Health",
            Self::Blocker => "Blocker",
            Self::SightRadius => "SightRadius",
            Self::UiOption => "UiOption",
            Self::Message => "Message",
            Self::Treasure => "Treasure",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Renderable { glyph: char, color: Rgb },
    Named { name: String },
    Trap { damage: u32, armed: bool },
    Structure { kind: String },
    Health { current: u32, max: u32 },
    Blocker,
    SightRadius(SightRadius),
    UiOption { key: String, enabled: bool },
    Message(DisplayMessage),
    Treasure { gold: u32 },
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Renderable { .. } => ComponentKind::Renderable,
            Self::Named { .. } => ComponentKind::Named,
            Self::Trap { .. } => ComponentKind::Trap,
            Self::Structure { .. } => ComponentKind::Structure,
            Self::Health { .. } => ComponentKind::Health,
            Self::Blocker => ComponentKind::Blocker,
            Self::SightRadius(_) => ComponentKind::SightRadius,
            Self::UiOption { .. } => ComponentKind::UiOption,
            Self::Message(_) => ComponentKind::Message,
            Self::Treasure { .. } => ComponentKind::Treasure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("content factory for origin {origin_id} returned no components")]
    EmptyComponents { origin_id: u32 },
    #[error("content factory for origin {origin_id} returned more than one {kind} component")]
    DuplicateComponent { origin_id: u32, kind: ComponentKind },
    #[error("no thing def named '{def_name}' is loaded")]
    UnknownDef { def_name: String },
}

/// Ordered, non-empty component sequence with at most one component per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentList {
    components: Vec<Component>,
}

impl ComponentList {
    pub fn new(origin_id: u32, components: Vec<Component>) -> Result<Self, ConfigurationError> {
        if components.is_empty() {
            return Err(ConfigurationError::EmptyComponents { origin_id });
        }
        for (idx, component) in components.iter().enumerate() {
            let kind = component.kind();
            if components[..idx].iter().any(|prior| prior.kind() == kind) {
                return Err(ConfigurationError::DuplicateComponent { origin_id, kind });
            }
        }
        Ok(Self { components })
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    // A validated list is never empty; kept for clippy's len_without_is_empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn as_slice(&self) -> &[Component] {
        &self.components
    }

    pub fn get(&self, kind: ComponentKind) -> Option<&Component> {
        self.components
            .iter()
            .find(|component| component.kind() == kind)
    }

    pub(crate) fn get_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components
            .iter_mut()
            .find(|component| component.kind() == kind)
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn sight_radius(&self) -> Option<&SightRadius> {
        match self.get(ComponentKind::SightRadius) {
            Some(Component::SightRadius(sight)) => Some(sight),
            _ => None,
        }
    }

    pub(crate) fn sight_radius_mut(&mut self) -> Option<&mut SightRadius> {
        match self.get_mut(ComponentKind::SightRadius) {
            Some(Component::SightRadius(sight)) => Some(sight),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self.get(ComponentKind::Named) {
            Some(Component::Named { name }) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn kinds(&self) -> Vec<ComponentKind> {
        self.components.iter().map(Component::kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_component_list_is_rejected() {
        let err = ComponentList::new(7, Vec::new()).expect_err("empty");
        assert_eq!(err, ConfigurationError::EmptyComponents { origin_id: 7 });
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let err = ComponentList::new(
            3,
            vec![
                Component::Blocker,
                Component::Treasure { gold: 1 },
                Component::Blocker,
            ],
        )
        .expect_err("duplicate");
        assert_eq!(
            err,
            ConfigurationError::DuplicateComponent {
                origin_id: 3,
                kind: ComponentKind::Blocker
            }
        );
    }

    #[test]
    fn list_preserves_order_and_looks_up_by_kind() {
        let list = ComponentList::new(
            1,
            vec![
                Component::Named {
                    name: "Spike trap".to_string(),
                },
                Component::Trap {
                    damage: 4,
                    armed: true,
                },
            ],
        )
        .expect("valid");
        assert_eq!(list.kinds(), vec![ComponentKind::Named, ComponentKind::Trap]);
        assert_eq!(list.name(), Some("Spike trap"));
        assert!(list.contains(ComponentKind::Trap));
        assert!(!list.contains(ComponentKind::Blocker));
    }

    #[test]
    fn sight_radius_starts_dirty_and_only_real_changes_dirty_it() {
        let mut sight = SightRadius::new(5);
        assert!(sight.is_dirty());
        sight.mark_clean();
        sight.set_radius(5);
        assert!(!sight.is_dirty());
        sight.set_radius(6);
        assert!(sight.is_dirty());
        assert_eq!(sight.radius(), 6);
    }
}
