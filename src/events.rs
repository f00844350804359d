use crate::geometry::Point;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};

pub use winit::event::MouseButton;
pub use winit::keyboard::{Key, NamedKey};

/// UI-facing event stream. Host-agnostic so tests can synthesize events;
/// `from_window_event` adapts a winit stream, attaching the tracked cursor
/// position to events that do not carry one.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    MouseDown { button: MouseButton, pos: Point },
    MouseUp { button: MouseButton, pos: Point },
    MouseMotion { pos: Point },
    /// `y` is in wheel lines, positive away from the user. `flipped` marks
    /// natural-scrolling devices whose delta sign is inverted.
    Wheel { y: i32, flipped: bool, pos: Point },
    KeyDown { key: Key },
    TextInput { text: String },
}

impl UiEvent {
    pub fn mouse_down(x: i32, y: i32) -> Self {
        UiEvent::MouseDown { button: MouseButton::Left, pos: Point::new(x, y) }
    }

    pub fn mouse_up(x: i32, y: i32) -> Self {
        UiEvent::MouseUp { button: MouseButton::Left, pos: Point::new(x, y) }
    }

    pub fn mouse_motion(x: i32, y: i32) -> Self {
        UiEvent::MouseMotion { pos: Point::new(x, y) }
    }

    pub fn wheel(y: i32, x: i32, cursor_y: i32) -> Self {
        UiEvent::Wheel { y, flipped: false, pos: Point::new(x, cursor_y) }
    }

    pub fn pointer_pos(&self) -> Option<Point> {
        match self {
            UiEvent::MouseDown { pos, .. }
            | UiEvent::MouseUp { pos, .. }
            | UiEvent::MouseMotion { pos }
            | UiEvent::Wheel { pos, .. } => Some(*pos),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_pos().is_some()
    }

    /// Wheel delta with the natural-scrolling flip already applied.
    pub fn wheel_delta(&self) -> i32 {
        match self {
            UiEvent::Wheel { y, flipped, .. } => {
                if *flipped {
                    -*y
                } else {
                    *y
                }
            }
            _ => 0,
        }
    }

    pub fn from_window_event(ev: &WindowEvent, cursor: Point) -> Option<UiEvent> {
        match ev {
            WindowEvent::CursorMoved { position, .. } => {
                Some(UiEvent::MouseMotion { pos: Point::new(position.x as i32, position.y as i32) })
            }
            WindowEvent::MouseInput { state, button, .. } => Some(match state {
                ElementState::Pressed => UiEvent::MouseDown { button: *button, pos: cursor },
                ElementState::Released => UiEvent::MouseUp { button: *button, pos: cursor },
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
                    // Pixel deltas come in at roughly 40px per notch.
                    MouseScrollDelta::PixelDelta(p) => (p.y / 40.0).round() as i32,
                };
                Some(UiEvent::Wheel { y, flipped: false, pos: cursor })
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                if let Some(text) = event.text.as_ref().filter(|t| !t.is_empty()) {
                    Some(UiEvent::TextInput { text: text.to_string() })
                } else {
                    Some(UiEvent::KeyDown { key: event.logical_key.clone() })
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_delta_honors_flip() {
        let ev = UiEvent::Wheel { y: 3, flipped: true, pos: Point::ZERO };
        assert_eq!(ev.wheel_delta(), -3);
        let ev = UiEvent::Wheel { y: 3, flipped: false, pos: Point::ZERO };
        assert_eq!(ev.wheel_delta(), 3);
    }

    #[test]
    fn pointer_pos_only_for_pointer_events() {
        assert!(UiEvent::mouse_down(4, 5).pointer_pos().is_some());
        assert!(UiEvent::TextInput { text: "a".into() }.pointer_pos().is_none());
    }
}
