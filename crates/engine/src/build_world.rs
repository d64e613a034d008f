//! Ordered world-population hooks run once per world-generation pass.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::ContentFactory;
use crate::registry::RegistryError;
use crate::ui::{UiContext, UiElement, ERROR_COLOR};
use crate::world::{
    ConfigurationError, DisplayMessage, EntityId, IllegalSiteReason, SceneWorld, TilePos,
};

/// Search area used when the scene has no tilemap.
pub const OPEN_FIELD_EXTENT: i32 = 32;
const RANDOM_SITE_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    #[error("listener '{listener}' produced malformed content: {source}")]
    Configuration {
        listener: String,
        #[source]
        source: ConfigurationError,
    },
    #[error("listener '{listener}' found no legal site for '{def}'")]
    NoLegalSite { listener: String, def: String },
    #[error("listener '{listener}' cannot place at ({x}, {y}): {reason}")]
    Placement {
        listener: String,
        x: i32,
        y: i32,
        reason: IllegalSiteReason,
    },
    #[error("listener '{listener}' failed: {message}")]
    Failed { listener: String, message: String },
}

pub trait BuildWorldListener {
    /// Called exactly once per pass. Spawns go through [`place_thing`] and are
    /// applied by the pipeline only when this returns `Ok`. On `Err` every
    /// scene change made during the call is rolled back.
    fn on_build_world(
        &self,
        scene: &mut SceneWorld,
        rng: &mut dyn RngCore,
    ) -> Result<(), ListenerError>;
}

/// Validates the site and the factory output, then stages the spawn.
pub fn place_thing(
    listener: &str,
    scene: &mut SceneWorld,
    factory: &dyn ContentFactory,
    position: TilePos,
    rng: &mut dyn RngCore,
) -> Result<EntityId, ListenerError> {
    scene
        .check_placement_site(position)
        .map_err(|reason| ListenerError::Placement {
            listener: listener.to_string(),
            x: position.x,
            y: position.y,
            reason,
        })?;
    let thing = factory
        .make_thing(position.x, position.y, rng)
        .validate()
        .map_err(|source| ListenerError::Configuration {
            listener: listener.to_string(),
            source,
        })?;
    Ok(scene.spawn_thing(position, thing))
}

/// Random probes inside the map (or the open field), then a row-major scan.
pub fn find_legal_site(scene: &SceneWorld, rng: &mut dyn RngCore) -> Option<TilePos> {
    let (width, height) = match scene.tilemap() {
        Some(tilemap) => (tilemap.width() as i32, tilemap.height() as i32),
        None => (OPEN_FIELD_EXTENT, OPEN_FIELD_EXTENT),
    };
    if width <= 0 || height <= 0 {
        return None;
    }
    for _ in 0..RANDOM_SITE_ATTEMPTS {
        let candidate = TilePos::new(rng.gen_range(0..width), rng.gen_range(0..height));
        if scene.check_placement_site(candidate).is_ok() {
            return Some(candidate);
        }
    }
    (0..height)
        .flat_map(|y| (0..width).map(move |x| TilePos::new(x, y)))
        .find(|candidate| scene.check_placement_site(*candidate).is_ok())
}

/// [`find_legal_site`] followed by [`place_thing`].
pub fn place_anywhere(
    listener: &str,
    def: &str,
    scene: &mut SceneWorld,
    factory: &dyn ContentFactory,
    rng: &mut dyn RngCore,
) -> Result<EntityId, ListenerError> {
    let position = find_legal_site(scene, rng).ok_or_else(|| ListenerError::NoLegalSite {
        listener: listener.to_string(),
        def: def.to_string(),
    })?;
    place_thing(listener, scene, factory, position, rng)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    NotYetInvoked,
    Invoked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerOutcome {
    pub listener: String,
    pub state: ListenerState,
    pub placed: usize,
    pub error: Option<ListenerError>,
}

impl ListenerOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == ListenerState::Invoked && self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildWorldReport {
    pub seed: u64,
    pub outcomes: Vec<ListenerOutcome>,
}

impl BuildWorldReport {
    pub fn total_placed(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.placed).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ListenerOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.error.is_some())
    }

    pub fn outcome(&self, listener: &str) -> Option<&ListenerOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.listener == listener)
    }
}

#[derive(Clone, Default)]
pub struct BuildWorldPipeline {
    listeners: Vec<(String, Rc<dyn BuildWorldListener>)>,
}

impl BuildWorldPipeline {
    pub fn register(&mut self, name: impl Into<String>, listener: Rc<dyn BuildWorldListener>) {
        self.listeners.push((name.into(), listener));
    }

    pub fn listener_names(&self) -> impl Iterator<Item = &str> {
        self.listeners.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn run(&self, scene: &mut SceneWorld, seed: u64, ui: &mut dyn UiContext) -> BuildWorldReport {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut outcomes: Vec<ListenerOutcome> = self
            .listeners
            .iter()
            .map(|(name, _)| ListenerOutcome {
                listener: name.clone(),
                state: ListenerState::NotYetInvoked,
                placed: 0,
                error: None,
            })
            .collect();

        for ((name, listener), outcome) in self.listeners.iter().zip(outcomes.iter_mut()) {
            debug_assert_eq!(outcome.state, ListenerState::NotYetInvoked);
            outcome.state = ListenerState::Invoked;

            let checkpoint = scene.checkpoint();
            match listener.on_build_world(scene, &mut rng) {
                Ok(()) => {
                    outcome.placed = scene.apply_pending();
                    debug!(listener = %name, placed = outcome.placed, "listener_completed");
                }
                Err(err) => {
                    scene.rollback_to(checkpoint);
                    warn!(listener = %name, error = %err, "listener_failed");
                    ui.render_single_shot(UiElement::Message(DisplayMessage::colored(
                        err.to_string(),
                        ERROR_COLOR,
                    )));
                    outcome.error = Some(err);
                }
            }
        }

        let report = BuildWorldReport { seed, outcomes };
        let failed = report.failures().count();
        info!(
            seed,
            listeners = report.outcomes.len(),
            placed = report.total_placed(),
            failed,
            entity_count = scene.entity_count(),
            "world_built"
        );
        ui.render_single_shot(UiElement::Message(DisplayMessage::plain(format!(
            "World built: {} placed, {} listener(s) failed",
            report.total_placed(),
            failed
        ))));
        report
    }
}

#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: BTreeMap<String, Rc<dyn BuildWorldListener>>,
}

impl ListenerRegistry {
    pub fn register(
        &mut self,
        id: impl Into<String>,
        listener: Rc<dyn BuildWorldListener>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if self.listeners.contains_key(&id) {
            return Err(RegistryError::DuplicateId {
                registry: "listener",
                id,
            });
        }
        self.listeners.insert(id, listener);
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.listeners.keys().map(String::as_str)
    }

    /// Builds a pipeline whose execution order is exactly `order`.
    pub fn pipeline_for<S: AsRef<str>>(&self, order: &[S]) -> Result<BuildWorldPipeline, RegistryError> {
        let mut seen = BTreeSet::new();
        let mut pipeline = BuildWorldPipeline::default();
        for id in order {
            let id = id.as_ref();
            if !seen.insert(id) {
                return Err(RegistryError::DuplicateInOrder { id: id.to_string() });
            }
            let listener = self
                .listeners
                .get(id)
                .ok_or_else(|| RegistryError::UnknownId {
                    registry: "listener",
                    id: id.to_string(),
                })?;
            pipeline.register(id, Rc::clone(listener));
        }
        Ok(pipeline)
    }
}
