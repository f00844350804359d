use crate::events::UiEvent;
use crate::geometry::Point;
use winit::event::WindowEvent;

/// Per-frame pointer snapshot. The host pushes translated events each frame;
/// panels read the cursor position and accumulated wheel travel from here
/// during `update`.
pub struct Input {
    cursor: Point,
    scroll_y: i32,
}

impl Input {
    pub fn new() -> Self {
        Self { cursor: Point::ZERO, scroll_y: 0 }
    }

    /// Resets per-frame accumulators. Cursor position persists across frames.
    pub fn begin_frame(&mut self) {
        self.scroll_y = 0;
    }

    pub fn push(&mut self, event: &UiEvent) {
        if let Some(pos) = event.pointer_pos() {
            self.cursor = pos;
        }
        self.scroll_y += event.wheel_delta();
    }

    /// Translates a winit event, tracking the cursor so wheel and button
    /// events carry the last known pointer position.
    pub fn translate(&mut self, ev: &WindowEvent) -> Option<UiEvent> {
        let translated = UiEvent::from_window_event(ev, self.cursor)?;
        if let Some(pos) = translated.pointer_pos() {
            self.cursor = pos;
        }
        Some(translated)
    }

    pub fn x(&self) -> i32 {
        self.cursor.x
    }

    pub fn y(&self) -> i32 {
        self.cursor.y
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    /// Wheel lines accumulated since `begin_frame`, flip already applied.
    pub fn scroll_y(&self) -> i32 {
        self.scroll_y
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_persists_scroll_resets() {
        let mut input = Input::new();
        input.push(&UiEvent::mouse_motion(40, 60));
        input.push(&UiEvent::wheel(-2, 40, 60));
        assert_eq!((input.x(), input.y()), (40, 60));
        assert_eq!(input.scroll_y(), -2);
        input.begin_frame();
        assert_eq!(input.scroll_y(), 0);
        assert_eq!((input.x(), input.y()), (40, 60));
    }
}
