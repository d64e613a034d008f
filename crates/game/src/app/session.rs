use std::path::PathBuf;
use std::rc::Rc;

use engine::world::SceneSnapshot;
use engine::{
    generate_file_name, generate_name, refresh_fields_of_view, write_text_atomic, AbilityRegistry,
    AppPaths, BuildWorldReport, ComponentKind, NameGrammar, SceneWorld,
    ThingDefDatabase, Tilemap, UiContext,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use super::bootstrap::{GameConfig, GameError};
use super::catalog::{build_ability_registry, build_listener_registry};
use super::commands::{Command, HELP_TEXT};
use super::headless_ui::HeadlessUi;

const SAVE_VERSION: u32 = 1;
const PLAYER_RNG_STREAM: u64 = 0x5eed_0001;

#[derive(Debug, Serialize)]
struct SaveGame<'a> {
    save_version: u32,
    world_name: &'a str,
    seed: u64,
    scene: SceneSnapshot<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CommandOutcome {
    Continue,
    Quit,
}

pub(crate) struct GameSession {
    paths: AppPaths,
    seed: u64,
    scene: SceneWorld,
    abilities: AbilityRegistry,
    grammar: Rc<NameGrammar>,
    rng: ChaCha8Rng,
    ui: HeadlessUi,
    build_report: BuildWorldReport,
}

impl GameSession {
    pub(crate) fn new(
        paths: AppPaths,
        config: &GameConfig,
        database: &ThingDefDatabase,
    ) -> Result<Self, GameError> {
        let grammar = Rc::new(NameGrammar::default());
        let abilities = build_ability_registry(database)?;
        let listeners = build_listener_registry(database, Rc::clone(&grammar))?;
        let pipeline = listeners.pipeline_for(&config.listeners)?;

        let mut scene = SceneWorld::with_gold(config.starting_gold);
        scene.set_tilemap(Tilemap::walled_room(config.map_width, config.map_height));
        let mut ui = HeadlessUi::default();
        let build_report = pipeline.run(&mut scene, config.seed, &mut ui);
        refresh_fields_of_view(&mut scene);

        Ok(Self {
            paths,
            seed: config.seed,
            scene,
            abilities,
            grammar,
            rng: ChaCha8Rng::seed_from_u64(config.seed ^ PLAYER_RNG_STREAM),
            ui,
            build_report,
        })
    }

    pub(crate) fn scene(&self) -> &SceneWorld {
        &self.scene
    }

    pub(crate) fn build_report(&self) -> &BuildWorldReport {
        &self.build_report
    }

    /// Lines queued for the player since the last call.
    pub(crate) fn take_output(&mut self) -> Vec<String> {
        self.ui.take_feed()
    }

    /// Placement failures are reported to the player and do not end the session.
    pub(crate) fn execute(&mut self, command: Command) -> Result<CommandOutcome, GameError> {
        match command {
            Command::Place { ability, x, y } => {
                self.place(&ability, x, y);
            }
            Command::Abilities => {
                let lines: Vec<String> = self
                    .abilities
                    .ids()
                    .filter_map(|id| {
                        let actor = self.abilities.get(id)?;
                        Some(format!(
                            "{id:<16} {:<14} {} gold",
                            actor.label(),
                            actor.cost()
                        ))
                    })
                    .collect();
                self.say_all(lines);
            }
            Command::Gold => self.say(format!("gold: {}", self.scene.gold())),
            Command::List => {
                let lines = self.entity_lines();
                self.say_all(lines);
            }
            Command::Name => {
                let name = generate_name(&self.grammar, &mut self.rng);
                self.say(name);
            }
            Command::Save => {
                let path = self.save()?;
                self.say(format!("saved {}", path.display()));
            }
            Command::Help => self.say(HELP_TEXT.to_string()),
            Command::Quit => return Ok(CommandOutcome::Quit),
        }
        Ok(CommandOutcome::Continue)
    }

    fn place(&mut self, ability: &str, x: i32, y: i32) {
        self.ui.clear_root();
        let placed = self
            .abilities
            .resolve(ability, &mut self.scene, x, y, &mut self.rng, &mut self.ui);
        if placed.is_ok() {
            refresh_fields_of_view(&mut self.scene);
        }
    }

    fn entity_lines(&self) -> Vec<String> {
        if self.scene.entity_count() == 0 {
            return vec!["(no entities)".to_string()];
        }
        self.scene
            .entities()
            .iter()
            .map(|entity| {
                let name = entity.components.name().unwrap_or("?");
                let kinds: Vec<&str> = entity
                    .components
                    .kinds()
                    .into_iter()
                    .map(ComponentKind::as_token)
                    .collect();
                let sight = self
                    .scene
                    .field_of_view(entity.id)
                    .map(|tiles| format!(" sees {} tiles", tiles.len()))
                    .unwrap_or_default();
                format!(
                    "#{:<3} ({:>2},{:>2}) {:<28} [{}]{}",
                    entity.id.0,
                    entity.position.x,
                    entity.position.y,
                    name,
                    kinds.join(", "),
                    sight
                )
            })
            .collect()
    }

    /// Writes `<saves>/<generated-name>.json` and returns its path.
    pub(crate) fn save(&mut self) -> Result<PathBuf, GameError> {
        let world_name = generate_file_name(&self.grammar, &mut self.rng);
        let save = SaveGame {
            save_version: SAVE_VERSION,
            world_name: &world_name,
            seed: self.seed,
            scene: self.scene.snapshot(),
        };
        let text = serde_json::to_string_pretty(&save).map_err(GameError::SerializeSave)?;
        let path = self.paths.saves_dir.join(format!("{world_name}.json"));
        write_text_atomic(&path, &text).map_err(|source| GameError::WriteSave {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), entity_count = self.scene.entity_count(), "scene_saved");
        Ok(path)
    }

    fn say(&mut self, line: String) {
        self.ui.render_element(engine::UiElement::Message(
            engine::DisplayMessage::plain(line),
        ));
    }

    fn say_all(&mut self, lines: Vec<String>) {
        for line in lines {
            self.say(line);
        }
    }
}
