//! Feedback surface shared by abilities and world building.
//!
//! The core only pushes effects through [`UiContext`]; the sole value it keeps
//! is the [`PopupHandle`] returned by [`UiContext::create_popup`].

use crate::world::{DisplayMessage, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    Confirmation,
    Error,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupConfig {
    pub kind: PopupKind,
    pub title: String,
    pub color: Option<Rgb>,
    pub dismissible: bool,
}

pub const CONFIRM_COLOR: Rgb = Rgb::new(120, 220, 120);
pub const ERROR_COLOR: Rgb = Rgb::new(230, 80, 80);

impl PopupConfig {
    pub fn confirmation(title: impl Into<String>) -> Self {
        Self {
            kind: PopupKind::Confirmation,
            title: title.into(),
            color: Some(CONFIRM_COLOR),
            dismissible: true,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            kind: PopupKind::Error,
            title: title.into(),
            color: Some(ERROR_COLOR),
            dismissible: true,
        }
    }

    pub fn notice(title: impl Into<String>) -> Self {
        Self {
            kind: PopupKind::Notice,
            title: title.into(),
            color: None,
            dismissible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiElement {
    Message(DisplayMessage),
    Status { label: String, value: String },
}

impl UiElement {
    pub fn status(label: impl Into<String>, value: impl ToString) -> Self {
        Self::Status {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

pub trait UiContext {
    fn clear_root(&mut self);
    /// Stays on screen until the next [`UiContext::clear_root`].
    fn render_element(&mut self, element: UiElement);
    /// Shown for one frame only.
    fn render_single_shot(&mut self, element: UiElement);
    fn create_popup(&mut self, message: &str, config: PopupConfig) -> PopupHandle;
    /// Returns false when the handle is unknown or already dismissed.
    fn dismiss_popup(&mut self, handle: PopupHandle) -> bool;
}
