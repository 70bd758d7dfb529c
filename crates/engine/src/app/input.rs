use serde::Deserialize;

use crate::spatial::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Navigation,
    Inventory,
    Settings,
    Appearance,
    ObjectSettings,
}

/// UI state owned by the host and handed to the room on every input call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputContext {
    open_panel: Option<Panel>,
    chat_focused: bool,
}

impl InputContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_open_panel(mut self, open_panel: Option<Panel>) -> Self {
        self.open_panel = open_panel;
        self
    }

    pub fn with_chat_focused(mut self, chat_focused: bool) -> Self {
        self.chat_focused = chat_focused;
        self
    }

    pub fn open_panel(&self) -> Option<Panel> {
        self.open_panel
    }

    pub fn chat_focused(&self) -> bool {
        self.chat_focused
    }

    /// Walking and tile hover are suppressed while any panel covers the room.
    pub fn suppresses_room_input(&self) -> bool {
        self.open_panel.is_some()
    }

    /// Tile presses are also ignored while the chat box has focus; hover still follows the pointer.
    pub fn suppresses_clicks(&self) -> bool {
        self.suppresses_room_input() || self.chat_focused
    }
}

/// Pointer state for one input call. Press, release and escape are edges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerInput {
    position_px: Option<Vec2>,
    pressed: bool,
    released: bool,
    escape_pressed: bool,
}

impl PointerInput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn at(position_px: Vec2) -> Self {
        Self::default().with_position_px(Some(position_px))
    }

    pub fn with_position_px(mut self, position_px: Option<Vec2>) -> Self {
        self.position_px = position_px;
        self
    }

    pub fn with_pressed(mut self, pressed: bool) -> Self {
        self.pressed = pressed;
        self
    }

    pub fn with_released(mut self, released: bool) -> Self {
        self.released = released;
        self
    }

    pub fn with_escape_pressed(mut self, escape_pressed: bool) -> Self {
        self.escape_pressed = escape_pressed;
        self
    }

    pub fn position_px(&self) -> Option<Vec2> {
        self.position_px
    }

    pub fn pressed(&self) -> bool {
        self.pressed
    }

    pub fn released(&self) -> bool {
        self.released
    }

    pub fn escape_pressed(&self) -> bool {
        self.escape_pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_open_panel_suppresses_room_input() {
        assert!(!InputContext::empty().suppresses_room_input());
        assert!(!InputContext::empty()
            .with_chat_focused(true)
            .suppresses_room_input());
        assert!(InputContext::empty()
            .with_open_panel(Some(Panel::Inventory))
            .suppresses_room_input());
    }

    #[test]
    fn chat_focus_only_blocks_clicks() {
        let typing = InputContext::empty().with_chat_focused(true);
        assert!(typing.chat_focused());
        assert!(typing.suppresses_clicks());
        assert!(!typing.suppresses_room_input());
        assert!(InputContext::empty()
            .with_open_panel(Some(Panel::Appearance))
            .suppresses_clicks());
        assert!(!InputContext::empty().suppresses_clicks());
    }

    #[test]
    fn pointer_builder_sets_edges() {
        let pointer = PointerInput::at(Vec2::new(3.0, 4.0))
            .with_pressed(true)
            .with_escape_pressed(true);
        assert_eq!(pointer.position_px(), Some(Vec2::new(3.0, 4.0)));
        assert!(pointer.pressed());
        assert!(!pointer.released());
        assert!(pointer.escape_pressed());
    }
}
