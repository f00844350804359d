pub mod draw;
pub mod events;
pub mod floating_layout;
pub mod floating_stack;
pub mod geometry;
pub mod input;
pub mod panel;
pub mod settings;
pub mod sliding;
pub mod style;
pub mod time;
pub mod widgets;

pub use draw::{DrawList, Renderer};
pub use events::UiEvent;
pub use geometry::{Point, Rect};
pub use input::Input;
pub use panel::{DockablePanel, PanelSlot, SlotHandle};
pub use sliding::SlidingContainer;
