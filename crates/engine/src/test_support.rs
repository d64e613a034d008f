use rand::RngCore;

use crate::content::{ContentFactory, ThingRecipe};
use crate::ui::{PopupConfig, PopupHandle, PopupKind, UiContext, UiElement};
use crate::world::{Component, Rgb};

pub(crate) const TRAP_ORIGIN_ID: u32 = 101;

#[derive(Debug, Default)]
pub(crate) struct RecordingUi {
    pub elements: Vec<UiElement>,
    pub single_shots: Vec<UiElement>,
    pub popups: Vec<(PopupHandle, String, PopupConfig)>,
    pub dismissed: Vec<PopupHandle>,
    next_handle: u64,
}

impl RecordingUi {
    pub fn popup_kinds(&self) -> Vec<PopupKind> {
        self.popups.iter().map(|(_, _, config)| config.kind).collect()
    }
}

impl UiContext for RecordingUi {
    fn clear_root(&mut self) {
        self.elements.clear();
    }

    fn render_element(&mut self, element: UiElement) {
        self.elements.push(element);
    }

    fn render_single_shot(&mut self, element: UiElement) {
        self.single_shots.push(element);
    }

    fn create_popup(&mut self, message: &str, config: PopupConfig) -> PopupHandle {
        let handle = PopupHandle(self.next_handle);
        self.next_handle += 1;
        self.popups.push((handle, message.to_string(), config));
        handle
    }

    fn dismiss_popup(&mut self, handle: PopupHandle) -> bool {
        if self.dismissed.contains(&handle) {
            return false;
        }
        self.dismissed.push(handle);
        true
    }
}

pub(crate) struct TrapFactory;

impl ContentFactory for TrapFactory {
    fn make_thing(&self, _x: i32, _y: i32, _rng: &mut dyn RngCore) -> ThingRecipe {
        ThingRecipe::new(TRAP_ORIGIN_ID, trap_components())
    }
}

pub(crate) fn trap_components() -> Vec<Component> {
    vec![
        Component::Renderable {
            glyph: '^',
            color: Rgb::new(200, 40, 40),
        },
        Component::Named {
            name: "Spike trap".to_string(),
        },
        Component::Trap {
            damage: 4,
            armed: true,
        },
    ]
}

/// Content defect stand-in: always yields an empty recipe.
pub(crate) struct EmptyFactory;

impl ContentFactory for EmptyFactory {
    fn make_thing(&self, _x: i32, _y: i32, _rng: &mut dyn RngCore) -> ThingRecipe {
        ThingRecipe::new(999, Vec::new())
    }
}
