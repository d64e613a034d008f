use std::collections::{BTreeMap, VecDeque};

use engine::{PopupConfig, PopupHandle, PopupKind, UiContext, UiElement};
use tracing::{debug, info, warn};

const RECORD_LIMIT: usize = 32;

/// Terminal-less [`UiContext`]: logs every effect and keeps a bounded record.
///
/// Text meant for the player is queued in a feed that the command loop drains.
#[derive(Debug, Default)]
pub(crate) struct HeadlessUi {
    root: Vec<UiElement>,
    recent_single_shots: VecDeque<UiElement>,
    open_popups: BTreeMap<PopupHandle, (String, PopupConfig)>,
    next_popup: u64,
    feed: Vec<String>,
}

impl HeadlessUi {
    #[cfg(test)]
    pub(crate) fn root(&self) -> &[UiElement] {
        &self.root
    }

    #[cfg(test)]
    pub(crate) fn open_popup_count(&self) -> usize {
        self.open_popups.len()
    }

    #[cfg(test)]
    pub(crate) fn recent_single_shots(&self) -> impl Iterator<Item = &UiElement> {
        self.recent_single_shots.iter()
    }

    pub(crate) fn take_feed(&mut self) -> Vec<String> {
        std::mem::take(&mut self.feed)
    }

    /// Popups are shown once in the feed, so the oldest ones are closed to keep the record bounded.
    fn trim_popups(&mut self) {
        while self.open_popups.len() > RECORD_LIMIT {
            let Some(oldest) = self.open_popups.keys().next().copied() else {
                break;
            };
            self.dismiss_popup(oldest);
        }
    }
}

fn describe(element: &UiElement) -> String {
    match element {
        UiElement::Message(message) => message.text.clone(),
        UiElement::Status { label, value } => format!("{label}: {value}"),
    }
}

impl UiContext for HeadlessUi {
    fn clear_root(&mut self) {
        debug!(cleared = self.root.len(), "ui_root_cleared");
        self.root.clear();
    }

    fn render_element(&mut self, element: UiElement) {
        debug!(element = %describe(&element), "ui_element_rendered");
        self.feed.push(describe(&element));
        self.root.push(element);
        if self.root.len() > RECORD_LIMIT {
            self.root.remove(0);
        }
    }

    fn render_single_shot(&mut self, element: UiElement) {
        info!(element = %describe(&element), "ui_single_shot");
        self.feed.push(describe(&element));
        self.recent_single_shots.push_back(element);
        if self.recent_single_shots.len() > RECORD_LIMIT {
            self.recent_single_shots.pop_front();
        }
    }

    fn create_popup(&mut self, message: &str, config: PopupConfig) -> PopupHandle {
        let handle = PopupHandle(self.next_popup);
        self.next_popup += 1;
        match config.kind {
            PopupKind::Error => {
                warn!(popup = handle.0, title = %config.title, message, "ui_popup_error");
                self.feed.push(format!("[!] {message}"));
            }
            PopupKind::Confirmation | PopupKind::Notice => {
                info!(popup = handle.0, title = %config.title, message, "ui_popup");
                self.feed.push(format!("[{}] {message}", config.title));
            }
        }
        self.open_popups.insert(handle, (message.to_string(), config));
        self.trim_popups();
        handle
    }

    fn dismiss_popup(&mut self, handle: PopupHandle) -> bool {
        let dismissed = self.open_popups.remove(&handle).is_some();
        if dismissed {
            debug!(popup = handle.0, "ui_popup_dismissed");
        }
        dismissed
    }
}
