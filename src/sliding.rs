use crate::draw::{beveled_rect, Renderer};
use crate::events::{MouseButton, UiEvent};
use crate::floating_layout;
use crate::geometry::{Point, Rect};
use crate::input::Input;
use crate::style::{spacing, theme, ButtonStyle};
use crate::widgets::{slider_scroll_captured, Button, Widget};

const SCROLLBAR_WIDTH: i32 = 10;
const SCROLLBAR_GAP: i32 = 6;
const SCROLLBAR_TRACK_MARGIN: i32 = 4;

/// Frame handed to the caller's layout function. The function places its
/// content starting at `content_top - scroll_value` and returns the y after
/// the last element; the container derives `content_height` from that.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext {
    pub content_x: i32,
    pub content_width: i32,
    pub scroll_value: i32,
    pub content_top: i32,
    pub gap: i32,
}

pub type LayoutFunction = Box<dyn FnMut(&LayoutContext) -> i32>;
pub type RenderFunction = Box<dyn FnMut(&mut dyn Renderer)>;
pub type UpdateFunction = Box<dyn FnMut(&Input, i32, i32)>;
pub type EventFunction = Box<dyn FnMut(&UiEvent) -> bool>;
pub type HeaderTextProvider = Box<dyn Fn() -> String>;

/// Right-docked scrollable side panel hosting caller-driven content. Owns
/// the scrollbar, the optional header chrome and the editor-interaction
/// blocker; the content itself comes from the installed callbacks.
#[derive(Default)]
pub struct SlidingContainer {
    layout_function: Option<LayoutFunction>,
    render_function: Option<RenderFunction>,
    update_function: Option<UpdateFunction>,
    event_function: Option<EventFunction>,
    header_text: String,
    header_text_provider: Option<HeaderTextProvider>,
    on_close: Option<Box<dyn FnMut()>>,

    visible: bool,
    header_visible: bool,
    close_button_enabled: bool,
    scrollbar_visible: bool,
    content_clip_enabled: bool,
    nav_align_right: bool,

    close_button: Option<Button>,
    nav_button: Option<Button>,
    nav_callback: Option<Box<dyn FnMut()>>,

    blocks_editor_interactions: bool,
    editor_interactions_blocked: bool,
    editor_interaction_blocker: Option<Box<dyn FnMut(bool)>>,
    header_visibility_controller: Option<Box<dyn FnMut(bool)>>,

    panel_override: Rect,
    panel_override_active: bool,

    panel: Rect,
    scroll_region: Rect,
    scroll_track_rect: Rect,
    scroll_thumb_rect: Rect,
    content_clip_rect: Rect,
    close_button_rect: Rect,
    nav_rect: Rect,
    name_label_rect: Rect,

    scroll: i32,
    max_scroll: i32,
    content_height_px: i32,
    visible_height_px: i32,

    scroll_dragging: bool,
    scrollbar_dragging: bool,
    scrollbar_drag_offset: i32,
    scroll_drag_anchor_y: i32,
    scroll_drag_start_scroll: i32,

    pulse_frames: i32,
    layout_dirty: bool,
    last_screen_w: i32,
    last_screen_h: i32,
}

impl SlidingContainer {
    pub fn new() -> Self {
        Self {
            visible: false,
            header_visible: true,
            close_button_enabled: true,
            scrollbar_visible: true,
            content_clip_enabled: true,
            layout_dirty: true,
            ..Self::default()
        }
    }

    pub fn set_layout_function(&mut self, f: impl FnMut(&LayoutContext) -> i32 + 'static) {
        self.layout_function = Some(Box::new(f));
        self.layout_dirty = true;
    }

    pub fn set_render_function(&mut self, f: impl FnMut(&mut dyn Renderer) + 'static) {
        self.render_function = Some(Box::new(f));
    }

    pub fn set_update_function(&mut self, f: impl FnMut(&Input, i32, i32) + 'static) {
        self.update_function = Some(Box::new(f));
    }

    pub fn set_event_function(&mut self, f: impl FnMut(&UiEvent) -> bool + 'static) {
        self.event_function = Some(Box::new(f));
    }

    pub fn set_header_text(&mut self, text: impl Into<String>) {
        self.header_text = text.into();
    }

    pub fn set_header_text_provider(&mut self, provider: impl Fn() -> String + 'static) {
        self.header_text_provider = Some(Box::new(provider));
    }

    pub fn set_on_close(&mut self, cb: impl FnMut() + 'static) {
        self.on_close = Some(Box::new(cb));
    }

    pub fn set_header_visible(&mut self, visible: bool) {
        if self.header_visible == visible {
            return;
        }
        self.header_visible = visible;
        self.close_button = None;
        if !visible {
            self.pulse_frames = 0;
        }
        self.layout_dirty = true;
    }

    pub fn set_close_button_enabled(&mut self, enabled: bool) {
        if self.close_button_enabled == enabled {
            return;
        }
        self.close_button_enabled = enabled;
        if !enabled {
            self.close_button = None;
        }
        self.layout_dirty = true;
    }

    pub fn set_scrollbar_visible(&mut self, visible: bool) {
        if self.scrollbar_visible == visible {
            return;
        }
        self.scrollbar_visible = visible;
        if !visible {
            self.scrollbar_dragging = false;
            self.scroll_dragging = false;
            self.scroll_track_rect = Rect::ZERO;
            self.scroll_thumb_rect = Rect::ZERO;
        }
        self.layout_dirty = true;
        self.layout(self.last_screen_w, self.last_screen_h);
    }

    pub fn set_header_navigation_button(
        &mut self,
        label: &str,
        on_click: impl FnMut() + 'static,
        style: Option<ButtonStyle>,
    ) {
        if label.is_empty() {
            self.clear_header_navigation_button();
            return;
        }
        self.nav_callback = Some(Box::new(on_click));
        let style = style.unwrap_or_else(|| theme().header_button);
        match self.nav_button.as_mut() {
            Some(btn) => {
                btn.set_style(style);
                btn.set_label(label);
            }
            None => self.nav_button = Some(Button::new(label).with_style(style)),
        }
        self.layout_dirty = true;
    }

    pub fn clear_header_navigation_button(&mut self) {
        self.nav_button = None;
        self.nav_callback = None;
        self.nav_rect = Rect::ZERO;
        self.layout_dirty = true;
    }

    pub fn set_header_navigation_alignment_right(&mut self, align_right: bool) {
        if self.nav_align_right == align_right {
            return;
        }
        self.nav_align_right = align_right;
        self.layout_dirty = true;
    }

    pub fn set_content_clip_enabled(&mut self, enabled: bool) {
        self.content_clip_enabled = enabled;
    }

    pub fn request_layout(&mut self) {
        self.layout_dirty = true;
    }

    pub fn set_blocks_editor_interactions(&mut self, block: bool) {
        if self.blocks_editor_interactions == block {
            return;
        }
        self.blocks_editor_interactions = block;
        self.update_editor_interaction_block_state();
    }

    pub fn set_editor_interaction_blocker(&mut self, blocker: impl FnMut(bool) + 'static) {
        self.editor_interaction_blocker = Some(Box::new(blocker));
        let should_block = self.blocks_editor_interactions && self.visible;
        self.editor_interactions_blocked = should_block;
        if let Some(blocker) = self.editor_interaction_blocker.as_mut() {
            blocker(should_block);
        }
    }

    pub fn set_header_visibility_controller(&mut self, controller: impl FnMut(bool) + 'static) {
        self.header_visibility_controller = Some(Box::new(controller));
        let visible = self.visible;
        if let Some(controller) = self.header_visibility_controller.as_mut() {
            controller(visible);
        }
    }

    pub fn set_panel_bounds_override(&mut self, bounds: Rect) {
        self.panel_override = bounds;
        self.panel_override_active = bounds.w > 0 && bounds.h > 0;
        self.layout_dirty = true;
    }

    pub fn clear_panel_bounds_override(&mut self) {
        self.panel_override_active = false;
        self.panel_override = Rect::ZERO;
        self.layout_dirty = true;
    }

    pub fn open(&mut self) {
        self.set_visible(true);
    }

    pub fn close(&mut self) {
        if !self.visible {
            return;
        }
        self.set_visible(false);
        if let Some(cb) = self.on_close.as_mut() {
            cb();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            if !self.visible {
                self.scroll_dragging = false;
                self.scrollbar_dragging = false;
            }
            return;
        }
        self.visible = visible;
        if !visible {
            self.scroll_dragging = false;
            self.scrollbar_dragging = false;
        }
        if let Some(controller) = self.header_visibility_controller.as_mut() {
            controller(visible);
        }
        self.update_editor_interaction_block_state();
        self.layout_dirty = true;
    }

    pub fn reset_scroll(&mut self) {
        self.layout_dirty = true;
        self.scroll = 0;
        self.scroll_dragging = false;
        self.scrollbar_dragging = false;
    }

    pub fn scroll_value(&self) -> i32 {
        self.scroll
    }

    pub fn set_scroll_value(&mut self, value: i32) {
        self.scroll = value.max(0);
        self.scroll_dragging = false;
        self.scrollbar_dragging = false;
        self.layout_dirty = true;
    }

    pub fn max_scroll(&self) -> i32 {
        self.max_scroll
    }

    pub fn content_height(&self) -> i32 {
        self.content_height_px
    }

    pub fn visible_height(&self) -> i32 {
        self.visible_height_px
    }

    pub fn panel_rect(&self) -> Rect {
        self.panel
    }

    pub fn scroll_region(&self) -> Rect {
        self.scroll_region
    }

    pub fn scrollbar_track_rect(&self) -> Rect {
        self.scroll_track_rect
    }

    pub fn scrollbar_thumb_rect(&self) -> Rect {
        self.scroll_thumb_rect
    }

    pub fn pulse_header(&mut self) {
        self.pulse_frames = 20;
    }

    pub fn pulse_frames(&self) -> i32 {
        self.pulse_frames
    }

    pub fn prepare_layout(&mut self, screen_w: i32, screen_h: i32) {
        if screen_w != self.last_screen_w || screen_h != self.last_screen_h {
            self.layout_dirty = true;
        }
        if !self.layout_dirty {
            return;
        }
        self.layout(screen_w, screen_h);
    }

    /// With the header hidden the band above the content still belongs to
    /// the world beneath, so hit tests shrink the panel to the scroll area.
    fn effective_panel(&self) -> Rect {
        if self.header_visible {
            return self.panel;
        }
        let scroll_start = self.panel.y + spacing::PANEL_PADDING;
        Rect::new(
            self.panel.x,
            scroll_start,
            self.panel.w,
            (self.panel.h - (scroll_start - self.panel.y)).max(0),
        )
    }

    pub fn is_point_inside(&self, x: i32, y: i32) -> bool {
        if !self.visible {
            return false;
        }
        self.effective_panel().contains(Point::new(x, y))
    }

    pub fn update(&mut self, input: &Input, screen_w: i32, screen_h: i32) {
        self.prepare_layout(screen_w, screen_h);
        if !self.visible {
            return;
        }

        let cursor = input.cursor();
        let pointer_in_scroll = self.scroll_region.contains(cursor);
        let pointer_in_panel = self.effective_panel().contains(cursor);
        if (pointer_in_scroll || pointer_in_panel) && !slider_scroll_captured() {
            let dy = input.scroll_y();
            if dy != 0 {
                self.update_scroll_from_delta(dy * 40);
            }
        }

        if let Some(f) = self.update_function.as_mut() {
            f(input, screen_w, screen_h);
        }

        if self.pulse_frames > 0 {
            self.pulse_frames -= 1;
        }
    }

    pub fn handle_event(&mut self, e: &UiEvent) -> bool {
        if self.last_screen_w > 0 && self.last_screen_h > 0 {
            self.prepare_layout(self.last_screen_w, self.last_screen_h);
        }

        if !self.visible {
            return false;
        }

        if let Some(f) = self.event_function.as_mut() {
            if f(e) {
                return true;
            }
        }

        if self.header_visible {
            if let Some(btn) = self.nav_button.as_mut() {
                if btn.handle_event(e) {
                    if matches!(e, UiEvent::MouseUp { button: MouseButton::Left, .. }) {
                        if let Some(cb) = self.nav_callback.as_mut() {
                            cb();
                        }
                    }
                    return true;
                }
            }
            if self.close_button_enabled {
                if let Some(btn) = self.close_button.as_mut() {
                    if btn.handle_event(e) {
                        if matches!(e, UiEvent::MouseUp { button: MouseButton::Left, .. }) {
                            self.close();
                        }
                        return true;
                    }
                }
            }
        }

        if self.last_screen_w <= 0 || self.last_screen_h <= 0 {
            return false;
        }

        let pointer_event = matches!(
            e,
            UiEvent::MouseDown { .. } | UiEvent::MouseUp { .. } | UiEvent::MouseMotion { .. }
        );
        let wheel_event = matches!(e, UiEvent::Wheel { .. });
        if wheel_event && slider_scroll_captured() {
            return true;
        }

        let pointer = e.pointer_pos().unwrap_or(Point::ZERO);
        let mut pointer_inside_panel = false;
        if pointer_event {
            pointer_inside_panel = self.effective_panel().contains(pointer);
            if !pointer_inside_panel && !self.scroll_dragging && !self.scrollbar_dragging {
                return false;
            }
        } else if wheel_event {
            let in_scroll = self.scroll_region.contains(pointer);
            let in_panel = self.panel.contains(pointer);
            if !in_scroll && !in_panel {
                return false;
            }
        }

        if wheel_event {
            self.update_scroll_from_delta(e.wheel_delta() * 40);
            return true;
        }

        if matches!(e, UiEvent::MouseUp { button: MouseButton::Left, .. }) {
            let mut handled = false;
            if self.scroll_dragging {
                self.scroll_dragging = false;
                handled = true;
            }
            if self.scrollbar_dragging {
                self.scrollbar_dragging = false;
                handled = true;
            }
            if handled {
                return true;
            }
        }

        if matches!(e, UiEvent::MouseMotion { .. }) {
            if self.scrollbar_dragging && self.max_scroll > 0 {
                let prev_scroll = self.scroll;
                let thumb_h = self.scroll_thumb_rect.h;
                let track_h = self.scroll_track_rect.h;
                if track_h > 0 && thumb_h > 0 {
                    let min_thumb_y = self.scroll_track_rect.y;
                    let max_thumb_y = min_thumb_y + (track_h - thumb_h).max(0);
                    let new_thumb_y =
                        (pointer.y - self.scrollbar_drag_offset).clamp(min_thumb_y, max_thumb_y);
                    let range = (max_thumb_y - min_thumb_y).max(0);
                    let ratio = if range > 0 {
                        (new_thumb_y - min_thumb_y) as f64 / range as f64
                    } else {
                        0.0
                    };
                    self.scroll =
                        ((ratio * self.max_scroll as f64).round() as i32).clamp(0, self.max_scroll);
                }
                if self.scroll != prev_scroll {
                    self.layout_dirty = true;
                }
                return true;
            }
            if self.scroll_dragging {
                let prev_scroll = self.scroll;
                let dy = pointer.y - self.scroll_drag_anchor_y;
                self.scroll = (self.scroll_drag_start_scroll - dy).clamp(0, self.max_scroll);
                if self.scroll != prev_scroll {
                    self.layout_dirty = true;
                }
                return true;
            }
        }

        if matches!(e, UiEvent::MouseDown { button: MouseButton::Left, .. }) {
            if self.scrollbar_visible
                && self.max_scroll > 0
                && self.scroll_thumb_rect.has_area()
                && self.scroll_track_rect.has_area()
            {
                if self.scroll_thumb_rect.contains(pointer) {
                    self.scrollbar_dragging = true;
                    self.scrollbar_drag_offset = pointer.y - self.scroll_thumb_rect.y;
                    return true;
                }
                if self.scroll_track_rect.contains(pointer) {
                    let thumb_h = self.scroll_thumb_rect.h;
                    let track_h = self.scroll_track_rect.h;
                    if track_h > 0 && thumb_h > 0 {
                        let prev_scroll = self.scroll;
                        let min_thumb_y = self.scroll_track_rect.y;
                        let max_thumb_y = min_thumb_y + (track_h - thumb_h).max(0);
                        let desired = (pointer.y - thumb_h / 2).clamp(min_thumb_y, max_thumb_y);
                        let range = (max_thumb_y - min_thumb_y).max(0);
                        if range > 0 && self.max_scroll > 0 {
                            let ratio = (desired - min_thumb_y) as f64 / range as f64;
                            self.scroll = ((ratio * self.max_scroll as f64).round() as i32)
                                .clamp(0, self.max_scroll);
                        }
                        if self.scroll != prev_scroll {
                            self.layout_dirty = true;
                        }
                    }
                    self.scrollbar_dragging = true;
                    self.scrollbar_drag_offset = self.scroll_thumb_rect.h / 2;
                    return true;
                }
            }
            if self.max_scroll > 0 && self.scroll_region.contains(pointer) {
                self.scroll_dragging = true;
                self.scroll_drag_anchor_y = pointer.y;
                self.scroll_drag_start_scroll = self.scroll;
                return true;
            }
        }

        self.scroll_dragging || self.scrollbar_dragging || pointer_inside_panel
    }

    pub fn render(&mut self, r: &mut dyn Renderer, screen_w: i32, screen_h: i32) {
        if !self.visible {
            return;
        }
        self.prepare_layout(screen_w, screen_h);

        let th = theme();
        beveled_rect(r, self.panel, th.panel_bg, &th);

        if self.header_visible {
            let mut header_region =
                Rect::new(self.panel.x, self.panel.y, self.panel.w, (self.scroll_region.y - self.panel.y).max(0));
            let inset = 1;
            if header_region.h > inset && header_region.w > inset * 2 {
                header_region.x += inset;
                header_region.y += inset;
                header_region.w -= inset * 2;
                header_region.h -= inset;
                beveled_rect(r, header_region, th.panel_header, &th);
            }

            if self.pulse_frames > 0 && header_region.has_area() {
                let alpha = (self.pulse_frames * 12).clamp(0, 180) as u8;
                r.fill_rect(header_region, th.accent_button.hover_bg.with_alpha(alpha));
            }

            if let Some(btn) = self.nav_button.as_mut() {
                btn.render(r);
            }
            if self.close_button_enabled {
                if let Some(btn) = self.close_button.as_mut() {
                    btn.render(r);
                }
            }
            let label = match self.header_text_provider.as_ref() {
                Some(provider) => provider(),
                None => self.header_text.clone(),
            };
            r.text(&label, self.name_label_rect, &th.label);
        }

        r.push_clip(self.panel);
        if self.content_clip_enabled && self.content_clip_rect.has_area() {
            r.push_clip(self.content_clip_rect);
        }
        if let Some(f) = self.render_function.as_mut() {
            f(r);
        }
        if self.content_clip_enabled && self.content_clip_rect.has_area() {
            r.pop_clip();
        }

        if self.scrollbar_visible && self.max_scroll > 0 && self.scroll_track_rect.has_area() {
            beveled_rect(r, self.scroll_track_rect, th.slider_track_bg, &th);
            if self.scroll_thumb_rect.h > 0 {
                beveled_rect(r, self.scroll_thumb_rect, th.accent_button.hover_bg, &th);
            }
        }
        r.pop_clip();
    }

    fn update_scroll_from_delta(&mut self, delta: i32) {
        if delta == 0 {
            return;
        }
        let prev_scroll = self.scroll;
        self.scroll = (self.scroll - delta).clamp(0, self.max_scroll);
        if self.scroll != prev_scroll {
            self.layout_dirty = true;
        }
    }

    pub fn layout(&mut self, screen_w: i32, screen_h: i32) {
        if !self.layout_dirty && screen_w == self.last_screen_w && screen_h == self.last_screen_h {
            return;
        }
        self.last_screen_w = screen_w;
        self.last_screen_h = screen_h;

        if screen_w <= 0 || screen_h <= 0 {
            self.panel = Rect::ZERO;
            self.scroll_region = Rect::ZERO;
            self.scroll_track_rect = Rect::ZERO;
            self.scroll_thumb_rect = Rect::ZERO;
            self.content_clip_rect = Rect::ZERO;
            self.close_button_rect = Rect::ZERO;
            if let Some(btn) = self.close_button.as_mut() {
                btn.set_rect(Rect::ZERO);
            }
            self.max_scroll = 0;
            self.layout_dirty = false;
            return;
        }

        if self.panel_override_active {
            let mut desired = self.panel_override;
            desired.w = desired.w.max(0).min(screen_w);
            desired.h = desired.h.max(0).min(screen_h);
            if desired.w == 0 || desired.h == 0 {
                desired = Rect::new(0, 0, screen_w, screen_h);
            }
            desired.x = desired.x.clamp(0, (screen_w - desired.w).max(0));
            desired.y = desired.y.clamp(0, (screen_h - desired.h).max(0));
            self.panel = desired;
        } else {
            let usable = floating_layout::usable_rect();
            let panel_x = screen_w * 2 / 3;
            self.panel = Rect::new(
                panel_x,
                usable.y,
                screen_w - panel_x,
                (screen_h - usable.y).max(0),
            );
        }

        let padding = spacing::PANEL_PADDING;
        let gap = spacing::SECTION_GAP;
        let content_x = self.panel.x + padding;
        let base_content_w = (self.panel.w - 2 * padding).max(0);
        let content_top = self.panel.y + padding;

        let label_height = if self.header_visible { Button::HEIGHT } else { 0 };
        let label_gap = if self.header_visible { spacing::ITEM_GAP } else { 0 };
        let scroll_start = content_top + if self.header_visible { label_height + label_gap } else { 0 };

        if self.header_visible {
            let mut label_start_x = content_x;
            let mut label_end_x = content_x + base_content_w;

            if self.close_button_enabled {
                let close_w = label_height;
                let close_x = content_x + base_content_w - close_w;
                self.close_button_rect = Rect::new(close_x, content_top, close_w, label_height);
                label_end_x = content_x.max(close_x - spacing::ITEM_GAP);
                if self.close_button.is_none() {
                    self.close_button = Some(Button::new("x").with_style(theme().delete_button));
                }
                if let Some(btn) = self.close_button.as_mut() {
                    btn.set_rect(self.close_button_rect);
                }
            } else {
                self.close_button_rect = Rect::ZERO;
                self.close_button = None;
            }

            if let Some(btn) = self.nav_button.as_mut() {
                let nav_gap = spacing::ITEM_GAP;
                let mut nav_width = Button::HEIGHT.max(btn.preferred_width());
                nav_width = nav_width.min((label_end_x - content_x).max(0));
                if self.nav_align_right {
                    let nav_x = content_x.max(label_end_x - nav_width);
                    self.nav_rect = Rect::new(nav_x, content_top, nav_width, label_height);
                    btn.set_rect(self.nav_rect);
                    label_end_x = if self.nav_rect.w > 0 {
                        content_x.max(self.nav_rect.x - nav_gap)
                    } else {
                        content_x.max(self.nav_rect.x)
                    };
                } else {
                    self.nav_rect = Rect::new(content_x, content_top, nav_width, label_height);
                    btn.set_rect(self.nav_rect);
                    label_start_x = if self.nav_rect.w > 0 {
                        label_end_x.min(self.nav_rect.right() + nav_gap)
                    } else {
                        label_end_x.min(self.nav_rect.x)
                    };
                }
            } else {
                self.nav_rect = Rect::ZERO;
            }

            let label_w = (label_end_x - label_start_x).max(0);
            self.name_label_rect = Rect::new(label_start_x, content_top, label_w, label_height);
        } else {
            self.close_button_rect = Rect::ZERO;
            self.name_label_rect = Rect::ZERO;
            self.nav_rect = Rect::ZERO;
            self.close_button = None;
            if let Some(btn) = self.nav_button.as_mut() {
                btn.set_rect(Rect::ZERO);
            }
        }

        let mut content_w_active = base_content_w;
        let panel_h = self.panel.h;
        let header_reserve = if self.header_visible { label_height + label_gap } else { 0 };

        let perform_layout = |scroll_value: i32, content_width: i32,
                                  layout_function: &mut Option<LayoutFunction>|
         -> i32 {
            let ctx = LayoutContext {
                content_x,
                content_width,
                scroll_value,
                content_top: scroll_start,
                gap,
            };
            match layout_function.as_mut() {
                Some(f) => f(&ctx),
                None => scroll_start,
            }
        };

        let mut end_y = perform_layout(self.scroll, content_w_active, &mut self.layout_function);
        let mut content_height = end_y - scroll_start;
        let visible_height = panel_h - padding - header_reserve;
        self.max_scroll = (content_height - visible_height.max(0)).max(0);

        if self.scrollbar_visible && self.max_scroll > 0 {
            let scroll_space = SCROLLBAR_WIDTH + SCROLLBAR_GAP;
            let adjusted_content_w = (base_content_w - scroll_space).max(0);
            if adjusted_content_w != content_w_active {
                content_w_active = adjusted_content_w;
                end_y = perform_layout(self.scroll, content_w_active, &mut self.layout_function);
                content_height = end_y - scroll_start;
                self.max_scroll = (content_height - visible_height.max(0)).max(0);
            }
        } else {
            content_w_active = base_content_w;
        }

        let clamped = self.scroll.clamp(0, self.max_scroll);
        if clamped != self.scroll {
            self.scroll = clamped;
            end_y = perform_layout(self.scroll, content_w_active, &mut self.layout_function);
            content_height = end_y - scroll_start;
            self.max_scroll = (content_height - visible_height.max(0)).max(0);
        }

        self.content_height_px = content_height.max(0);
        self.visible_height_px = visible_height.max(0);

        let visible_area_h = visible_height.max(0);
        let clip_h = content_height.min(visible_area_h).max(0);
        self.content_clip_rect = Rect::new(
            content_x,
            scroll_start,
            content_w_active.max(0),
            if clip_h > 0 { clip_h } else { visible_area_h },
        );
        self.scroll_region = Rect::new(self.panel.x, scroll_start, self.panel.w, visible_area_h);

        if !self.scrollbar_visible || self.max_scroll == 0 {
            self.scroll_dragging = false;
            self.scrollbar_dragging = false;
            self.scroll_track_rect = Rect::ZERO;
            self.scroll_thumb_rect = Rect::ZERO;
        } else {
            let track_x = self.panel.right() - padding - SCROLLBAR_WIDTH;
            let track_y = self.scroll_region.y + SCROLLBAR_TRACK_MARGIN;
            let track_h = (self.scroll_region.h - 2 * SCROLLBAR_TRACK_MARGIN).max(0);
            self.scroll_track_rect = Rect::new(track_x, track_y, SCROLLBAR_WIDTH, track_h);
            if track_h <= 0 {
                self.scrollbar_dragging = false;
                self.scroll_thumb_rect = Rect::new(track_x, track_y, SCROLLBAR_WIDTH, 0);
            } else if self.content_height_px > 0 && self.visible_height_px > 0 {
                let denom = self.visible_height_px.max(self.content_height_px) as f64;
                let mut thumb_h =
                    (track_h as f64 * self.visible_height_px as f64 / denom).round() as i32;
                thumb_h = thumb_h.clamp(20, track_h);
                let scroll_range = (track_h - thumb_h).max(0);
                let mut thumb_y = track_y;
                if scroll_range > 0 && self.max_scroll > 0 {
                    let ratio = self.scroll as f64 / self.max_scroll as f64;
                    thumb_y = track_y + (ratio * scroll_range as f64).round() as i32;
                }
                thumb_y = thumb_y.clamp(track_y, track_y + scroll_range);
                self.scroll_thumb_rect = Rect::new(track_x, thumb_y, SCROLLBAR_WIDTH, thumb_h);
            } else {
                self.scrollbar_dragging = false;
                self.scroll_thumb_rect = Rect::new(track_x, track_y, SCROLLBAR_WIDTH, track_h);
            }
        }

        self.layout_dirty = false;
    }

    fn update_editor_interaction_block_state(&mut self) {
        let should_block = self.blocks_editor_interactions && self.visible;
        if self.editor_interactions_blocked == should_block {
            return;
        }
        self.editor_interactions_blocked = should_block;
        if let Some(blocker) = self.editor_interaction_blocker.as_mut() {
            blocker(should_block);
        }
    }
}
