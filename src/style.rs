use serde::Deserialize;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Spacing tokens shared by every panel and container. Values are pixels.
pub mod spacing {
    pub const PANEL_PADDING: i32 = 24;
    pub const SECTION_GAP: i32 = 24;
    pub const ITEM_GAP: i32 = 12;
    pub const LABEL_GAP: i32 = 6;
    pub const SMALL_GAP: i32 = 6;
    pub const HEADER_GAP: i32 = 16;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "Color::default_alpha")]
    pub a: u8,
}

impl Color {
    fn default_alpha() -> u8 {
        255
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn lightened(self, amount: f32) -> Self {
        let lift = |c: u8| -> u8 {
            let f = c as f32 + (255.0 - c as f32) * amount.clamp(0.0, 1.0);
            f.round().clamp(0.0, 255.0) as u8
        };
        Self { r: lift(self.r), g: lift(self.g), b: lift(self.b), a: self.a }
    }

    pub fn darkened(self, amount: f32) -> Self {
        let drop = |c: u8| -> u8 {
            let f = c as f32 * (1.0 - amount.clamp(0.0, 1.0));
            f.round().clamp(0.0, 255.0) as u8
        };
        Self { r: drop(self.r), g: drop(self.g), b: drop(self.b), a: self.a }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub font_size: i32,
    pub color: Color,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self { font_size: 14, color: Color::rgb(220, 222, 228) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ButtonStyle {
    pub label: LabelStyle,
    pub bg: Color,
    pub hover_bg: Color,
    pub press_bg: Color,
    pub border: Color,
    pub text: Color,
}

impl Default for ButtonStyle {
    fn default() -> Self {
        Theme::default().header_button
    }
}

/// Color and metric tokens for the developer UI. Loadable from JSON so a
/// project can reskin the editor without recompiling; every field falls back
/// to the built-in dark theme.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub panel_bg: Color,
    pub panel_header: Color,
    pub border: Color,
    pub highlight: Color,
    pub shadow: Color,
    pub corner_radius: i32,
    pub bevel_depth: i32,
    pub highlight_intensity: f32,
    pub shadow_intensity: f32,
    pub label: LabelStyle,
    pub header_button: ButtonStyle,
    pub accent_button: ButtonStyle,
    pub delete_button: ButtonStyle,
    pub slider_track_bg: Color,
    pub focus_outline: Color,
    pub button_base_fill: Color,
    pub locked_widget_overlay: Color,
    pub locked_content_overlay: Color,
}

impl Default for Theme {
    fn default() -> Self {
        let label = LabelStyle::default();
        let header_button = ButtonStyle {
            label,
            bg: Color::rgb(44, 47, 56),
            hover_bg: Color::rgb(56, 60, 72),
            press_bg: Color::rgb(34, 37, 44),
            border: Color::rgb(70, 74, 84),
            text: Color::rgb(220, 222, 228),
        };
        let accent_button = ButtonStyle {
            label,
            bg: Color::rgb(64, 96, 210),
            hover_bg: Color::rgb(94, 129, 255),
            press_bg: Color::rgb(48, 74, 168),
            border: Color::rgb(120, 150, 255),
            text: Color::rgb(240, 244, 255),
        };
        let delete_button = ButtonStyle {
            label,
            bg: Color::rgb(128, 48, 48),
            hover_bg: Color::rgb(168, 62, 62),
            press_bg: Color::rgb(96, 36, 36),
            border: Color::rgb(190, 90, 90),
            text: Color::rgb(240, 226, 226),
        };
        Self {
            panel_bg: Color::rgba(24, 26, 31, 240),
            panel_header: Color::rgb(38, 41, 48),
            border: Color::rgb(70, 74, 84),
            highlight: Color::rgba(255, 255, 255, 40),
            shadow: Color::rgba(0, 0, 0, 120),
            corner_radius: 4,
            bevel_depth: 2,
            highlight_intensity: 0.35,
            shadow_intensity: 0.45,
            label,
            header_button,
            accent_button,
            delete_button,
            slider_track_bg: Color::rgb(30, 32, 38),
            focus_outline: Color::rgb(120, 170, 255),
            button_base_fill: Color::rgb(44, 47, 56),
            locked_widget_overlay: Color::rgba(40, 40, 40, 140),
            locked_content_overlay: Color::rgba(20, 20, 20, 110),
        }
    }
}

impl Theme {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Theme>(&contents) {
                Ok(theme) => theme,
                Err(err) => {
                    eprintln!(
                        "[dev_ui] Failed to parse theme {}: {err}. Falling back to default theme.",
                        path.display()
                    );
                    Theme::default()
                }
            },
            Err(err) => {
                eprintln!(
                    "[dev_ui] Failed to read theme {}: {err}. Falling back to default theme.",
                    path.display()
                );
                Theme::default()
            }
        }
    }
}

thread_local! {
    static THEME: RefCell<Rc<Theme>> = RefCell::new(Rc::new(Theme::default()));
}

pub fn theme() -> Rc<Theme> {
    THEME.with(|t| t.borrow().clone())
}

pub fn install_theme(theme: Theme) {
    THEME.with(|t| *t.borrow_mut() = Rc::new(theme));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_theme_json_falls_back_per_field() {
        let theme: Theme = serde_json::from_str(r#"{"corner_radius": 9}"#).expect("theme parses");
        assert_eq!(theme.corner_radius, 9);
        assert_eq!(theme.bevel_depth, Theme::default().bevel_depth);
        assert_eq!(theme.panel_bg, Theme::default().panel_bg);
    }

    #[test]
    fn color_lighten_darken_round() {
        let c = Color::rgb(100, 100, 100);
        assert_eq!(c.lightened(0.0), c);
        assert_eq!(c.darkened(1.0), Color::rgb(0, 0, 0));
        assert!(c.lightened(0.5).r > c.r);
    }
}
