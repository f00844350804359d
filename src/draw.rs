use crate::geometry::{Point, Rect};
use crate::style::{Color, LabelStyle, Theme};

/// Drawing backend the panels render through. Implementations rasterize into
/// whatever the host engine uses; tests record commands with [`DrawList`].
pub trait Renderer {
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, color: Color, thickness: i32);
    fn line(&mut self, from: Point, to: Point, color: Color, thickness: i32);
    fn text(&mut self, text: &str, rect: Rect, style: &LabelStyle);
    fn push_clip(&mut self, rect: Rect);
    fn pop_clip(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color, thickness: i32 },
    Line { from: Point, to: Point, color: Color, thickness: i32 },
    Text { text: String, rect: Rect, style: LabelStyle },
    PushClip(Rect),
    PopClip,
}

/// Command-recording renderer. The clip stack intersects nested clips so
/// recorded `PushClip` rects are already resolved.
#[derive(Default)]
pub struct DrawList {
    pub commands: Vec<DrawCmd>,
    clip_stack: Vec<Rect>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.clip_stack.clear();
    }

    pub fn current_clip(&self) -> Option<Rect> {
        self.clip_stack.last().copied()
    }
}

impl Renderer for DrawList {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if rect.has_area() {
            self.commands.push(DrawCmd::FillRect { rect, color });
        }
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, thickness: i32) {
        if rect.has_area() {
            self.commands.push(DrawCmd::StrokeRect { rect, color, thickness });
        }
    }

    fn line(&mut self, from: Point, to: Point, color: Color, thickness: i32) {
        self.commands.push(DrawCmd::Line { from, to, color, thickness });
    }

    fn text(&mut self, text: &str, rect: Rect, style: &LabelStyle) {
        self.commands.push(DrawCmd::Text { text: text.to_string(), rect, style: *style });
    }

    fn push_clip(&mut self, rect: Rect) {
        let resolved = match self.clip_stack.last() {
            Some(outer) => outer.intersect(&rect).unwrap_or(Rect::ZERO),
            None => rect,
        };
        self.clip_stack.push(resolved);
        self.commands.push(DrawCmd::PushClip(resolved));
    }

    fn pop_clip(&mut self) {
        self.clip_stack.pop();
        self.commands.push(DrawCmd::PopClip);
    }
}

/// Fills `rect` and paints the one-pixel bevel bands the editor chrome uses:
/// lightened top/left edges, darkened bottom/right.
pub fn beveled_rect(r: &mut dyn Renderer, rect: Rect, fill: Color, theme: &Theme) {
    if !rect.has_area() {
        return;
    }
    r.fill_rect(rect, fill);
    let hi = fill.lightened(theme.highlight_intensity);
    let lo = fill.darkened(theme.shadow_intensity);
    for i in 0..theme.bevel_depth.max(0) {
        let top = Rect::new(rect.x + i, rect.y + i, rect.w - 2 * i, 1);
        let left = Rect::new(rect.x + i, rect.y + i, 1, rect.h - 2 * i);
        let bottom = Rect::new(rect.x + i, rect.bottom() - 1 - i, rect.w - 2 * i, 1);
        let right = Rect::new(rect.right() - 1 - i, rect.y + i, 1, rect.h - 2 * i);
        r.fill_rect(top, hi);
        r.fill_rect(left, hi);
        r.fill_rect(bottom, lo);
        r.fill_rect(right, lo);
    }
    r.stroke_rect(rect, theme.border, 1);
}

/// One-pixel outline just outside `rect`, used for keyboard-focus affordance
/// on embedded panels.
pub fn focus_ring(r: &mut dyn Renderer, rect: Rect, theme: &Theme) {
    r.stroke_rect(rect.expanded(2), theme.focus_outline, 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_clips_intersect() {
        let mut list = DrawList::new();
        list.push_clip(Rect::new(0, 0, 100, 100));
        list.push_clip(Rect::new(50, 50, 100, 100));
        assert_eq!(list.current_clip(), Some(Rect::new(50, 50, 50, 50)));
        list.pop_clip();
        assert_eq!(list.current_clip(), Some(Rect::new(0, 0, 100, 100)));
    }

    #[test]
    fn empty_fill_is_dropped() {
        let mut list = DrawList::new();
        list.fill_rect(Rect::ZERO, Color::rgb(1, 2, 3));
        assert!(list.commands.is_empty());
    }
}
