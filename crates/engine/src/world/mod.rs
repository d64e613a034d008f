mod component;
mod scene;
mod sight;
mod tilemap;

pub use component::{
    Component, ComponentKind, ComponentList, ConfigurationError, DisplayMessage, Rgb, SightRadius,
};
pub use scene::{
    Entity, EntityId, EntityIdAllocator, IllegalSiteReason, InsufficientGold, SceneCheckpoint,
    SceneSnapshot, SceneWorld, Thing,
};
pub use sight::{compute_visible_tiles, refresh_fields_of_view};
pub use tilemap::{TileKind, TilePos, Tilemap, TilemapError};
