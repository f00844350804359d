use crate::draw::{beveled_rect, focus_ring, Renderer};
use crate::events::{MouseButton, UiEvent};
use crate::floating_layout;
use crate::floating_stack;
use crate::geometry::{Point, Rect};
use crate::input::Input;
use crate::style::{spacing, theme, ButtonStyle, Color};
use crate::time;
use crate::settings;
use crate::widgets::{dropdown_open, slider_scroll_captured, Button, Rows, Widget, WidgetHandle};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use winit::keyboard::{Key, NamedKey};

const HEADER_DRAG_START_THRESHOLD: i32 = 2;
const POINTER_BLOCK_ON_SHOW_MS: u32 = 16;
const POINTER_BLOCK_AFTER_DRAG_MS: u32 = 60;

/// Shared geometry block between a panel and the managers. Managers hold
/// `Rc<PanelSlot>` handles and communicate through `Cell` fields, so neither
/// side ever re-enters the other mid-borrow.
pub struct PanelSlot {
    rect: Cell<Rect>,
    visible: Cell<bool>,
    floatable: Cell<bool>,
    preferred_width: Cell<i32>,
    preferred_height: Cell<i32>,
    force_layout: Cell<bool>,
    needs_layout: Cell<bool>,
    needs_geometry: Cell<bool>,
    close_requested: Cell<bool>,
}

pub type SlotHandle = Rc<PanelSlot>;

impl PanelSlot {
    pub fn new(rect: Rect) -> SlotHandle {
        Rc::new(Self {
            rect: Cell::new(rect),
            visible: Cell::new(true),
            floatable: Cell::new(true),
            preferred_width: Cell::new(0),
            preferred_height: Cell::new(0),
            force_layout: Cell::new(false),
            needs_layout: Cell::new(true),
            needs_geometry: Cell::new(true),
            close_requested: Cell::new(false),
        })
    }

    pub fn rect(&self) -> Rect {
        self.rect.get()
    }

    pub fn set_rect(&self, rect: Rect) {
        self.rect.set(rect);
    }

    pub fn visible(&self) -> bool {
        self.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    pub fn floatable(&self) -> bool {
        self.floatable.get()
    }

    pub fn set_floatable(&self, floatable: bool) {
        self.floatable.set(floatable);
    }

    pub fn preferred_width(&self) -> i32 {
        self.preferred_width.get()
    }

    pub fn preferred_height(&self) -> i32 {
        self.preferred_height.get()
    }

    pub fn set_preferred_size(&self, width: i32, height: i32) {
        self.preferred_width.set(width);
        self.preferred_height.set(height);
    }

    pub fn force_layout(&self) -> bool {
        self.force_layout.get()
    }

    pub fn set_force_layout(&self, force: bool) {
        self.force_layout.set(force);
    }

    pub fn mark_layout_dirty(&self) {
        self.needs_layout.set(true);
        self.needs_geometry.set(true);
    }

    pub fn mark_geometry_dirty(&self) {
        self.needs_geometry.set(true);
    }

    /// Layout-manager write path: moves the slot without re-notifying. Only a
    /// real position change dirties geometry, so a stable layout settles.
    pub fn set_position_from_layout(&self, x: i32, y: i32) {
        let mut rect = self.rect.get();
        if rect.x == x && rect.y == y {
            return;
        }
        rect.x = x;
        rect.y = y;
        self.rect.set(rect);
        self.needs_geometry.set(true);
    }

    /// Close fallback used by the stack manager when a displaced panel has no
    /// close callback. The owning panel completes the close on its next
    /// update.
    pub fn request_close(&self) {
        self.close_requested.set(true);
    }

    fn take_close_request(&self) -> bool {
        self.close_requested.replace(false)
    }
}

struct EmbeddedSnapshot {
    rect: Rect,
    visible: bool,
    expanded: bool,
    floatable: bool,
    scroll_enabled: bool,
    visible_height: i32,
    available_height_override: Option<i32>,
    last_screen_w: i32,
    last_screen_h: i32,
}

/// Collapsible, draggable, lockable panel. The workhorse container of the
/// developer UI: floating tool windows and embedded inspector sections are
/// both this type in different configurations.
pub struct DockablePanel {
    slot: SlotHandle,
    title: String,

    header_btn: Option<Button>,
    close_btn: Option<Button>,
    lock_btn: Option<Button>,
    header_button_style: Option<ButtonStyle>,
    header_highlight_override: Option<Color>,

    header_rect: Rect,
    handle_rect: Rect,
    close_rect: Rect,
    lock_rect: Rect,
    body_viewport: Rect,

    rows: Rows,
    row_heights: Vec<i32>,
    content_height: i32,
    body_viewport_h: i32,
    visible_height: i32,

    visible: bool,
    expanded: bool,
    floatable: bool,
    close_button_enabled: bool,
    close_button_on_left: bool,

    dragging: bool,
    header_dragging_via_button: bool,
    drag_exceeded_threshold: bool,
    drag_offset: Point,
    drag_start_pointer: Point,
    pointer_block_until_ms: u32,

    scroll: i32,
    max_scroll: i32,

    locked: bool,
    lock_state_initialized: bool,
    lock_namespace: String,
    lock_id: String,
    on_lock_changed: Vec<Rc<dyn Fn(bool)>>,
    locked_mutation_warnings: HashSet<&'static str>,

    padding: i32,
    row_gap: i32,
    col_gap: i32,
    cell_width: Option<i32>,
    floating_content_width: i32,

    work_area: Rect,
    show_header: bool,
    scroll_enabled: bool,
    available_height_override: Option<i32>,

    on_close: Option<Box<dyn FnMut()>>,
    render_content: Option<Box<dyn FnMut(&mut dyn Renderer, Rect)>>,

    last_screen_w: i32,
    last_screen_h: i32,
    layout_initialized: bool,

    registered: bool,
    embedded_focus: bool,
    embedded_interaction_enabled: bool,
    rendering_embedded: bool,
}

impl DockablePanel {
    pub const DEFAULT_FLOATING_CONTENT_WIDTH: i32 = 360;

    pub fn new(title: impl Into<String>, floatable: bool) -> Self {
        Self::new_at(title, floatable, 32, 32)
    }

    pub fn new_at(title: impl Into<String>, floatable: bool, x: i32, y: i32) -> Self {
        let padding = spacing::PANEL_PADDING;
        let floating_content_width = Self::DEFAULT_FLOATING_CONTENT_WIDTH;
        let mut rect = Rect::new(x, y, 260, Button::HEIGHT + 8);
        if floatable {
            rect.w = 2 * padding + floating_content_width;
        }
        let slot = PanelSlot::new(rect);
        slot.set_floatable(floatable);
        let mut panel = Self {
            slot,
            title: title.into(),
            header_btn: Some(Button::new("")),
            close_btn: Some(Button::new("x").with_style(theme().delete_button)),
            lock_btn: None,
            header_button_style: None,
            header_highlight_override: None,
            header_rect: Rect::ZERO,
            handle_rect: Rect::ZERO,
            close_rect: Rect::ZERO,
            lock_rect: Rect::ZERO,
            body_viewport: Rect::ZERO,
            rows: Rows::new(),
            row_heights: Vec::new(),
            content_height: 0,
            body_viewport_h: 0,
            visible_height: 400,
            visible: true,
            expanded: false,
            floatable,
            close_button_enabled: floatable,
            close_button_on_left: false,
            dragging: false,
            header_dragging_via_button: false,
            drag_exceeded_threshold: false,
            drag_offset: Point::ZERO,
            drag_start_pointer: Point::ZERO,
            pointer_block_until_ms: 0,
            scroll: 0,
            max_scroll: 0,
            locked: false,
            lock_state_initialized: false,
            lock_namespace: String::new(),
            lock_id: String::new(),
            on_lock_changed: Vec::new(),
            locked_mutation_warnings: HashSet::new(),
            padding,
            row_gap: spacing::ITEM_GAP,
            col_gap: spacing::ITEM_GAP,
            cell_width: None,
            floating_content_width,
            work_area: Rect::ZERO,
            show_header: true,
            scroll_enabled: floatable,
            available_height_override: None,
            on_close: None,
            render_content: None,
            last_screen_w: 0,
            last_screen_h: 0,
            layout_initialized: false,
            registered: false,
            embedded_focus: false,
            embedded_interaction_enabled: true,
            rendering_embedded: false,
        };
        panel.update_header_button();
        panel.update_registration();
        panel
    }

    pub fn slot(&self) -> SlotHandle {
        self.slot.clone()
    }

    pub fn rect(&self) -> Rect {
        self.slot.rect()
    }

    pub fn height(&self) -> i32 {
        self.slot.rect().h
    }

    pub fn position(&self) -> Point {
        let r = self.slot.rect();
        Point::new(r.x, r.y)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_floatable(&self) -> bool {
        self.floatable
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn scroll(&self) -> i32 {
        self.scroll
    }

    pub fn max_scroll(&self) -> i32 {
        self.max_scroll
    }

    pub fn content_height(&self) -> i32 {
        self.content_height
    }

    pub fn body_viewport(&self) -> Rect {
        self.body_viewport
    }

    pub fn header_rect(&self) -> Rect {
        self.header_rect
    }

    pub fn is_point_inside(&self, x: i32, y: i32) -> bool {
        self.slot.rect().contains(Point::new(x, y))
    }

    pub fn set_on_close(&mut self, cb: impl FnMut() + 'static) {
        self.on_close = Some(Box::new(cb));
    }

    pub fn set_render_content(&mut self, cb: impl FnMut(&mut dyn Renderer, Rect) + 'static) {
        self.render_content = Some(Box::new(cb));
    }

    pub fn set_visible(&mut self, v: bool) {
        if self.visible == v {
            return;
        }
        let was_visible = self.visible;
        self.visible = v;
        self.slot.set_visible(v);
        if self.visible {
            self.block_pointer_for(POINTER_BLOCK_ON_SHOW_MS);
            if !was_visible && self.scroll_enabled {
                self.scroll = 0;
                self.max_scroll = 0;
            }
        } else {
            self.block_pointer_for(0);
            self.dragging = false;
            self.drag_exceeded_threshold = false;
            self.header_dragging_via_button = false;
            floating_stack::notify_panel_closed(&self.slot);
            if let Some(cb) = self.on_close.as_mut() {
                cb();
            }
        }
        self.invalidate_layout(false);
        self.update_registration();
    }

    pub fn open(&mut self) {
        self.set_visible(true);
        self.set_expanded(true);
    }

    pub fn close(&mut self) {
        self.set_visible(false);
    }

    pub fn set_rows(&mut self, rows: Rows) {
        if self.locked {
            self.log_locked_mutation("set_rows");
            return;
        }
        self.rows = rows;
        let slot = self.slot.clone();
        for row in &self.rows {
            for widget in row {
                let slot = slot.clone();
                let mut w = widget.borrow_mut();
                w.set_layout_dirty_callback(Rc::new(move || slot.mark_layout_dirty()));
                w.clear_layout_dirty_flags();
            }
        }
        self.invalidate_layout(false);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.update_header_button();
    }

    pub fn set_expanded(&mut self, e: bool) {
        self.expanded = e;
        self.update_header_button();
        self.invalidate_layout(false);
    }

    pub fn show_header(&self) -> bool {
        self.show_header
    }

    pub fn set_show_header(&mut self, show: bool) {
        if self.show_header == show {
            return;
        }
        self.show_header = show;
        if !self.show_header {
            self.expanded = true;
            self.header_btn = None;
            self.close_btn = None;
        } else {
            self.header_btn = Some(Button::new(""));
            if self.floatable || self.close_button_enabled {
                self.close_btn = Some(Button::new("x").with_style(theme().delete_button));
            }
            self.update_header_button();
        }
        self.invalidate_layout(false);
    }

    pub fn set_header_button_style(&mut self, style: Option<ButtonStyle>) {
        self.header_button_style = style;
        if let Some(btn) = self.header_btn.as_mut() {
            btn.set_style(style.unwrap_or_else(|| theme().header_button));
        }
        self.update_header_button();
    }

    pub fn set_header_highlight_color(&mut self, color: Color) {
        self.header_highlight_override = Some(color);
    }

    pub fn clear_header_highlight_color(&mut self) {
        self.header_highlight_override = None;
    }

    pub fn set_close_button_enabled(&mut self, enabled: bool) {
        if self.close_button_enabled == enabled {
            return;
        }
        self.close_button_enabled = enabled;
        if self.show_header {
            if self.floatable || self.close_button_enabled {
                if self.close_btn.is_none() {
                    self.close_btn = Some(Button::new("x").with_style(theme().delete_button));
                }
            } else {
                self.close_btn = None;
            }
        }
        self.invalidate_layout(false);
    }

    pub fn set_close_button_on_left(&mut self, on_left: bool) {
        if self.close_button_on_left == on_left {
            return;
        }
        self.close_button_on_left = on_left;
        self.invalidate_layout(true);
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.apply_lock_state(locked, true, true);
    }

    pub fn on_lock_changed(&mut self, cb: impl Fn(bool) + 'static) {
        self.on_lock_changed.push(Rc::new(cb));
    }

    /// Configures the persistence key for the lock toggle. The lock button is
    /// only shown once both parts are non-empty.
    pub fn set_lock_persistence(&mut self, namespace: impl Into<String>, id: impl Into<String>) {
        self.lock_namespace = namespace.into();
        self.lock_id = id.into();
        self.invalidate_layout(false);
    }

    pub fn scroll_enabled(&self) -> bool {
        self.scroll_enabled
    }

    pub fn set_scroll_enabled(&mut self, enabled: bool) {
        if self.locked {
            self.log_locked_mutation("set_scroll_enabled");
            return;
        }
        self.scroll_enabled = enabled;
    }

    pub fn set_available_height_override(&mut self, height: Option<i32>) {
        if self.locked {
            self.log_locked_mutation("set_available_height_override");
            return;
        }
        self.available_height_override = height;
        self.notify_geometry_changed();
        self.invalidate_layout(true);
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.set_position_internal(x, y, false);
    }

    pub fn set_position_from_layout_manager(&mut self, x: i32, y: i32) {
        self.set_position_internal(x, y, true);
    }

    pub fn set_rect(&mut self, r: Rect) {
        self.slot.set_rect(r);
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    pub fn set_floatable(&mut self, floatable: bool) {
        if self.floatable == floatable {
            return;
        }
        self.floatable = floatable;
        self.slot.set_floatable(floatable);
        self.dragging = false;
        self.header_dragging_via_button = false;
        self.drag_exceeded_threshold = false;
        self.block_pointer_for(0);
        self.update_registration();
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    pub fn set_work_area(&mut self, area: Rect) {
        self.work_area = area;
        if area.w > 0 {
            self.last_screen_w = area.w;
        }
        if area.h > 0 {
            self.last_screen_h = area.h;
        }
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    pub fn set_padding(&mut self, p: i32) {
        if self.locked {
            self.log_locked_mutation("set_padding");
            return;
        }
        self.padding = p.max(0);
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    pub fn set_row_gap(&mut self, g: i32) {
        if self.locked {
            self.log_locked_mutation("set_row_gap");
            return;
        }
        self.row_gap = g.max(0);
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    pub fn set_col_gap(&mut self, g: i32) {
        if self.locked {
            self.log_locked_mutation("set_col_gap");
            return;
        }
        self.col_gap = g.max(0);
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    /// Fixed column width for row cells; `None` returns to even splitting.
    pub fn set_cell_width(&mut self, w: Option<i32>) {
        if self.locked {
            self.log_locked_mutation("set_cell_width");
            return;
        }
        self.cell_width = w.map(|w| w.max(1));
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    pub fn set_visible_height(&mut self, h: i32) {
        if self.locked {
            self.log_locked_mutation("set_visible_height");
            return;
        }
        self.visible_height = h.max(0);
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    pub fn set_floating_content_width(&mut self, w: i32) {
        if self.locked {
            self.log_locked_mutation("set_floating_content_width");
            return;
        }
        let clamped = w.max(120);
        if self.floating_content_width == clamped {
            return;
        }
        self.floating_content_width = clamped;
        self.notify_geometry_changed();
        self.invalidate_layout(false);
    }

    pub fn reset_scroll(&mut self) {
        if self.locked {
            self.log_locked_mutation("reset_scroll");
            return;
        }
        self.scroll = 0;
        self.invalidate_layout(true);
    }

    pub fn force_pointer_ready(&mut self) {
        self.block_pointer_for(0);
    }

    /// Behaves like the header area for drag starts, including when the
    /// header is hidden.
    pub fn set_drag_handle_rect(&mut self, rect: Rect) {
        self.handle_rect = rect;
    }

    pub fn set_embedded_focus_state(&mut self, focused: bool) {
        self.embedded_focus = focused;
    }

    pub fn embedded_focus_state(&self) -> bool {
        self.embedded_focus
    }

    pub fn set_embedded_interaction_enabled(&mut self, enabled: bool) {
        if self.embedded_interaction_enabled == enabled {
            return;
        }
        self.embedded_interaction_enabled = enabled;
        if !enabled {
            self.force_pointer_ready();
        }
    }

    pub fn embedded_interaction_enabled(&self) -> bool {
        self.embedded_interaction_enabled
    }

    fn set_position_internal(&mut self, x: i32, y: i32, from_layout_manager: bool) {
        if !self.floatable {
            return;
        }
        let mut rect = self.slot.rect();
        rect.x = x;
        rect.y = y;
        self.slot.set_rect(rect);

        if from_layout_manager {
            self.update_geometry_after_move();
            return;
        }

        self.notify_geometry_changed();
        self.clamp_to_bounds(self.last_screen_w, self.last_screen_h);
        self.invalidate_layout(true);
    }

    fn update_registration(&mut self) {
        let should_register = self.floatable && self.visible;
        if should_register {
            if !self.registered {
                floating_layout::register_panel(&self.slot);
                self.registered = true;
            }
        } else if self.registered {
            floating_layout::unregister_panel(&self.slot);
            self.registered = false;
        }
    }

    fn notify_geometry_changed(&self) {
        if !self.floatable || !self.registered {
            return;
        }
        floating_layout::notify_panel_geometry_changed(&self.slot);
    }

    fn notify_content_changed(&self) {
        if !self.floatable || !self.registered {
            return;
        }
        floating_layout::notify_panel_content_changed(&self.slot);
    }

    fn block_pointer_for(&mut self, ms: u32) {
        if ms == 0 {
            self.pointer_block_until_ms = 0;
            return;
        }
        self.pointer_block_until_ms = time::now_ms().wrapping_add(ms);
    }

    fn pointer_block_active(&mut self) -> bool {
        if self.pointer_block_until_ms == 0 {
            return false;
        }
        if time::ticks_passed(time::now_ms(), self.pointer_block_until_ms) {
            self.pointer_block_until_ms = 0;
            return false;
        }
        true
    }

    fn invalidate_layout(&self, geometry_only: bool) {
        if !geometry_only {
            self.slot.needs_layout.set(true);
        }
        self.slot.needs_geometry.set(true);
    }

    pub fn update(&mut self, input: &Input, screen_w: i32, screen_h: i32) {
        if self.slot.take_close_request() {
            self.set_visible(false);
        }
        if !self.visible {
            return;
        }
        self.pointer_block_active();

        let mut resized = false;
        if screen_w > 0 && screen_w != self.last_screen_w {
            resized = true;
        }
        if screen_h > 0 && screen_h != self.last_screen_h {
            resized = true;
        }
        if resized {
            self.slot.needs_geometry.set(true);
        }
        if !self.layout_initialized {
            self.slot.mark_layout_dirty();
        }
        if self.slot.needs_layout.get() || self.slot.needs_geometry.get() {
            self.layout(screen_w, screen_h);
        }

        if !self.embedded_interaction_enabled {
            return;
        }

        if self.locked {
            self.log_locked_mutation("update");
            return;
        }

        if self.scroll_enabled && self.expanded && self.body_viewport.has_area() {
            let cursor = input.cursor();
            if self.body_viewport.contains(cursor) {
                let dy = input.scroll_y();
                if dy != 0 {
                    self.scroll = (self.scroll - dy * 40).clamp(0, self.max_scroll);
                    self.invalidate_layout(true);
                }
            }
        }
    }

    pub fn handle_event(&mut self, e: &UiEvent) -> bool {
        if !self.visible || !self.embedded_interaction_enabled {
            return false;
        }

        let pointer_event = matches!(
            e,
            UiEvent::MouseDown { .. } | UiEvent::MouseUp { .. } | UiEvent::MouseMotion { .. }
        );
        let wheel_event = matches!(e, UiEvent::Wheel { .. });
        let slider_capture_active = slider_scroll_captured();
        let pointer_pos = e.pointer_pos().unwrap_or(Point::ZERO);
        if (pointer_event || wheel_event) && self.pointer_block_active() {
            return true;
        }

        // Drag start: header area or the custom handle, but never the
        // close/lock buttons.
        if let UiEvent::MouseDown { button: MouseButton::Left, pos } = e {
            let p = *pos;
            let on_header_button =
                self.show_header && self.header_btn.is_some() && self.header_rect.contains(p);
            let on_close = self.close_btn.is_some() && self.close_rect.contains(p);
            let on_lock = self.lock_btn.is_some() && self.lock_rect.contains(p);
            let rect = self.slot.rect();
            let mut drag_rect = Rect::new(
                rect.x + self.padding,
                rect.y + self.padding,
                (rect.w - 2 * self.padding).max(0),
                self.header_rect.h,
            );
            if drag_rect.h <= 0 {
                drag_rect.h = Button::HEIGHT;
            }
            let on_header_area = self.show_header && drag_rect.contains(p);
            let on_custom_handle = self.handle_rect.has_area() && self.handle_rect.contains(p);
            if self.floatable && (on_header_area || on_custom_handle) && !on_close && !on_lock {
                self.dragging = true;
                self.header_dragging_via_button = on_header_button;
                self.drag_exceeded_threshold = false;
                self.drag_offset = Point::new(p.x - rect.x, p.y - rect.y);
                self.drag_start_pointer = p;
                if on_header_button {
                    if let Some(btn) = self.header_btn.as_mut() {
                        btn.handle_event(e);
                    }
                }
                return true;
            }
        }

        if self.dragging {
            if let UiEvent::MouseMotion { pos } = e {
                let current = *pos;
                if !self.drag_exceeded_threshold {
                    let dx = current.x - self.drag_start_pointer.x;
                    let dy = current.y - self.drag_start_pointer.y;
                    if dx.abs() > HEADER_DRAG_START_THRESHOLD
                        || dy.abs() > HEADER_DRAG_START_THRESHOLD
                    {
                        self.drag_exceeded_threshold = true;
                        floating_stack::bring_to_front(&self.slot);
                    }
                }
                if self.drag_exceeded_threshold {
                    let mut rect = self.slot.rect();
                    rect.x = current.x - self.drag_offset.x;
                    rect.y = current.y - self.drag_offset.y;
                    self.slot.set_rect(rect);
                    self.clamp_to_bounds(self.last_screen_w, self.last_screen_h);
                    self.invalidate_layout(true);
                }
                return true;
            }
            if let UiEvent::MouseUp { button: MouseButton::Left, pos } = e {
                let dragged_via_button = self.header_dragging_via_button;
                let drag_moved = self.drag_exceeded_threshold;
                self.dragging = false;
                self.header_dragging_via_button = false;
                self.drag_exceeded_threshold = false;
                if drag_moved {
                    self.notify_geometry_changed();
                    floating_layout::notify_panel_user_moved(&self.slot);
                    self.block_pointer_for(POINTER_BLOCK_AFTER_DRAG_MS);
                    self.invalidate_layout(true);
                }
                if dragged_via_button {
                    if let Some(btn) = self.header_btn.as_mut() {
                        btn.handle_event(e);
                    }
                    if !drag_moved && self.header_rect.contains(*pos) {
                        self.expanded = !self.expanded;
                        self.update_header_button();
                        self.invalidate_layout(false);
                    }
                }
                return true;
            }
        }

        if let Some(btn) = self.lock_btn.as_mut() {
            if btn.handle_event(e) {
                if matches!(e, UiEvent::MouseUp { button: MouseButton::Left, .. }) {
                    let locked = self.locked;
                    self.set_locked(!locked);
                }
                return true;
            }
        }

        if self.floatable || self.close_button_enabled {
            if let Some(btn) = self.close_btn.as_mut() {
                if btn.handle_event(e) {
                    if matches!(e, UiEvent::MouseUp { button: MouseButton::Left, .. }) {
                        self.set_visible(false);
                    }
                    return true;
                }
            }
        }

        if let Some(btn) = self.header_btn.as_mut() {
            if btn.handle_event(e) {
                if matches!(e, UiEvent::MouseUp { button: MouseButton::Left, .. }) {
                    self.expanded = !self.expanded;
                    self.update_header_button();
                    self.invalidate_layout(false);
                }
                return true;
            }
        }

        if self.locked {
            if wheel_event {
                if self.body_viewport.contains(pointer_pos) {
                    self.log_locked_mutation("handle_event.wheel");
                    return true;
                }
                return slider_capture_active;
            }

            if pointer_event {
                if self.body_viewport.contains(pointer_pos) {
                    self.log_locked_mutation("handle_event.pointer");
                    return true;
                }
                if self.slot.rect().contains(pointer_pos)
                    && matches!(e, UiEvent::MouseDown { button: MouseButton::Left, .. })
                {
                    return true;
                }
            }

            if self.floatable && is_escape(e) {
                self.set_visible(false);
                return true;
            }

            return false;
        }

        if self.expanded && self.scroll_enabled && wheel_event && !slider_capture_active {
            if self.body_viewport.contains(pointer_pos) {
                self.scroll = (self.scroll - e.wheel_delta() * 40).clamp(0, self.max_scroll);
                self.invalidate_layout(true);
                return true;
            }
        }

        let mut forward_to_children = self.expanded;
        if forward_to_children && pointer_event && !self.body_viewport.contains(pointer_pos) {
            forward_to_children = slider_capture_active || dropdown_open();
        }

        if forward_to_children {
            for row in &self.rows {
                for widget in row {
                    if widget.borrow_mut().handle_event(e) {
                        return true;
                    }
                }
            }
        }

        if wheel_event && slider_capture_active {
            return true;
        }

        if self.floatable && is_escape(e) {
            self.set_visible(false);
            return true;
        }

        if pointer_event && self.slot.rect().contains(pointer_pos) {
            let mut in_visible_region =
                self.show_header && self.header_rect.contains(pointer_pos);
            if !in_visible_region && self.expanded && self.body_viewport.contains(pointer_pos) {
                in_visible_region = true;
            }
            if in_visible_region {
                return true;
            }
        }

        false
    }

    pub fn render(&mut self, r: &mut dyn Renderer) {
        if !self.visible {
            return;
        }
        let th = theme();
        let rect = self.slot.rect();
        beveled_rect(r, rect, th.panel_bg, &th);
        if let Some(highlight) = self.header_highlight_override {
            if self.show_header && self.header_rect.has_area() {
                r.fill_rect(self.header_rect.expanded(2), highlight);
            }
        }
        if self.rendering_embedded && self.embedded_focus {
            focus_ring(r, rect, &th);
        }

        if let Some(btn) = self.header_btn.as_mut() {
            btn.render(r);
        }
        if let Some(btn) = self.lock_btn.as_mut() {
            btn.render(r);
            draw_lock_glyph(r, self.lock_rect, self.locked);
        }
        if self.floatable || self.close_button_enabled {
            if let Some(btn) = self.close_btn.as_mut() {
                btn.render(r);
            }
        }

        if !self.expanded {
            return;
        }

        r.push_clip(self.body_viewport);
        for row in &self.rows {
            for widget in row {
                widget.borrow_mut().render(r);
            }
        }
        if let Some(cb) = self.render_content.as_mut() {
            cb(r, self.body_viewport);
        }
        if self.locked {
            self.render_locked_children_overlay(r);
        }
        r.pop_clip();
    }

    fn render_locked_children_overlay(&self, r: &mut dyn Renderer) {
        let th = theme();
        for row in &self.rows {
            for widget in row {
                let widget_rect = widget.borrow().rect();
                if let Some(clipped) = widget_rect.intersect(&self.body_viewport) {
                    r.fill_rect(clipped, th.locked_widget_overlay);
                }
            }
        }
        r.fill_rect(self.body_viewport, th.locked_content_overlay);
    }

    pub fn layout(&mut self, screen_w: i32, screen_h: i32) {
        if screen_w > 0 {
            self.last_screen_w = screen_w;
        }
        if screen_h > 0 {
            self.last_screen_h = screen_h;
        }

        self.ensure_lock_state_initialized();
        self.ensure_lock_button();

        let mut rect = self.slot.rect();
        self.header_rect = Rect::new(
            rect.x + self.padding,
            rect.y + self.padding,
            0,
            if self.show_header { Button::HEIGHT } else { 0 },
        );

        let show_close =
            (self.floatable || self.close_button_enabled) && self.close_btn.is_some();
        let show_lock = self.should_show_lock_button();
        let button_width = Button::HEIGHT;

        // Full-row widgets split out onto their own row; everything else
        // keeps its original order.
        let layout_rows: Vec<Vec<WidgetHandle>> = {
            let mut out = Vec::with_capacity(self.rows.len());
            for row in &self.rows {
                let mut current: Vec<WidgetHandle> = Vec::new();
                let mut inserted_any = false;
                for widget in row {
                    if widget.borrow().wants_full_row() {
                        if !current.is_empty() {
                            out.push(std::mem::take(&mut current));
                        }
                        out.push(vec![widget.clone()]);
                        inserted_any = true;
                    } else {
                        current.push(widget.clone());
                        inserted_any = true;
                    }
                }
                if !current.is_empty() {
                    out.push(current);
                } else if !inserted_any {
                    out.push(Vec::new());
                }
            }
            out
        };

        let header_total_w;
        if self.floatable {
            header_total_w = self.floating_content_width;
            if self.show_header {
                let mut available = header_total_w;
                if show_close {
                    available -= button_width;
                }
                if show_lock {
                    available -= button_width;
                }
                self.header_rect.w = available.max(0);
                let header_x = self.header_rect.x;
                if show_close && self.close_button_on_left {
                    self.close_rect = Rect::new(header_x, self.header_rect.y, button_width, button_width);
                    self.header_rect.x = header_x + button_width;
                } else {
                    self.close_rect = Rect::ZERO;
                }
                let mut next_x = self.header_rect.x + self.header_rect.w;
                if show_lock {
                    self.lock_rect =
                        Rect::new(next_x, self.header_rect.y, button_width, button_width);
                    next_x += button_width;
                } else {
                    self.lock_rect = Rect::ZERO;
                }
                if show_close && !self.close_button_on_left {
                    self.close_rect =
                        Rect::new(next_x, self.header_rect.y, button_width, button_width);
                }
            } else {
                self.header_rect.w = header_total_w;
                self.close_rect = Rect::ZERO;
                self.lock_rect = Rect::ZERO;
            }
        } else {
            header_total_w = (rect.w - 2 * self.padding).max(0);
            self.header_rect.w = header_total_w;
            self.lock_rect = Rect::ZERO;
            self.close_rect = Rect::ZERO;
            if self.show_header {
                let header_y = rect.y + self.padding;
                let mut next_x = rect.x + rect.w - self.padding;
                self.header_rect.x = rect.x + self.padding;
                if show_close && self.close_button_on_left {
                    self.close_rect =
                        Rect::new(self.header_rect.x, header_y, button_width, button_width);
                    self.header_rect.x += button_width;
                    self.header_rect.w = (self.header_rect.w - button_width).max(0);
                }
                if show_lock {
                    self.lock_rect =
                        Rect::new(next_x - button_width, header_y, button_width, button_width);
                    next_x -= button_width;
                    self.header_rect.w = (self.header_rect.w - button_width).max(0);
                }
                if show_close && !self.close_button_on_left {
                    self.close_rect =
                        Rect::new(next_x - button_width, header_y, button_width, button_width);
                    self.header_rect.w = (self.header_rect.w - button_width).max(0);
                }
            }
        }

        let header_rect = self.header_rect;
        let close_rect = self.close_rect;
        let lock_rect = self.lock_rect;
        if let Some(btn) = self.header_btn.as_mut() {
            btn.set_rect(header_rect);
        }
        if let Some(btn) = self.close_btn.as_mut() {
            btn.set_rect(close_rect);
        }
        if let Some(btn) = self.lock_btn.as_mut() {
            btn.set_rect(lock_rect);
        }
        self.update_header_button();
        self.update_lock_button();

        let content_w = header_total_w;
        let header_gap = if self.show_header { spacing::HEADER_GAP } else { 0 };
        let x0 = rect.x + self.padding;
        let y0 = rect.y + self.padding + self.header_rect.h + header_gap;

        self.row_heights.clear();
        let mut computed_content_h = 0;
        for row in &layout_rows {
            let n = row.len() as i32;
            if n <= 0 {
                self.row_heights.push(0);
                continue;
            }
            let col_w = self
                .cell_width
                .unwrap_or_else(|| ((content_w - (n - 1) * self.col_gap) / n).max(1));
            let mut r_h = 0;
            for widget in row {
                r_h = r_h.max(widget.borrow().height_for_width(col_w));
            }
            self.row_heights.push(r_h);
            computed_content_h += r_h + self.row_gap;
        }
        if !self.row_heights.is_empty() {
            computed_content_h -= self.row_gap;
        }
        if !layout_rows.is_empty() {
            self.content_height = computed_content_h;
        }

        if !self.expanded {
            self.body_viewport_h = 0;
            self.body_viewport = Rect::new(x0, y0, content_w, 0);
            rect.w = 2 * self.padding + content_w;
            rect.h = self.padding + self.header_rect.h + header_gap + self.padding;
            self.slot.set_rect(rect);
            self.max_scroll = 0;
            self.scroll = 0;
            if self.floatable {
                self.clamp_to_bounds(screen_w, screen_h);
            }
            self.finalize_layout();
            return;
        }

        let available_h = if self.floatable {
            self.available_height(screen_h)
        } else {
            self.available_height_override.unwrap_or(self.content_height)
        };
        self.body_viewport_h = self.content_height.min(available_h).max(0);
        self.max_scroll = (self.content_height - self.body_viewport_h).max(0);
        self.scroll = self.scroll.clamp(0, self.max_scroll);

        self.body_viewport = Rect::new(x0, y0, content_w, self.body_viewport_h);

        rect.w = 2 * self.padding + content_w;
        rect.h = self.padding + self.header_rect.h + header_gap + self.body_viewport_h + self.padding;
        self.slot.set_rect(rect);

        let mut y = y0 - self.scroll;
        for (ri, row) in layout_rows.iter().enumerate() {
            let n = row.len() as i32;
            if n <= 0 {
                continue;
            }
            let col_w = self
                .cell_width
                .unwrap_or_else(|| ((content_w - (n - 1) * self.col_gap) / n).max(1));
            let h = self.row_heights[ri];
            let mut x = x0;
            for widget in row {
                widget.borrow_mut().set_rect(Rect::new(x, y, col_w, h));
                x += col_w + self.col_gap;
            }
            y += h + self.row_gap;
        }

        if self.floatable {
            self.clamp_to_bounds(screen_w, screen_h);
        }
        self.finalize_layout();
    }

    fn finalize_layout(&mut self) {
        self.slot.needs_layout.set(false);
        self.slot.needs_geometry.set(false);
        self.layout_initialized = true;
        for row in &self.rows {
            for widget in row {
                widget.borrow_mut().clear_layout_dirty_flags();
            }
        }
        self.notify_content_changed();
    }

    fn update_header_button(&mut self) {
        let label = format!("{} {}", self.title, if self.expanded { "▾" } else { "▸" });
        if let Some(btn) = self.header_btn.as_mut() {
            btn.set_label(label);
        }
    }

    fn update_lock_button(&mut self) {
        let style = if self.locked { theme().accent_button } else { theme().header_button };
        if let Some(btn) = self.lock_btn.as_mut() {
            btn.set_style(style);
            btn.set_label("");
        }
    }

    fn log_locked_mutation(&mut self, method: &'static str) {
        if !self.locked {
            return;
        }
        if !self.locked_mutation_warnings.insert(method) {
            return;
        }
        eprintln!("[dev_ui] panel '{}': ignoring {} while locked", self.title, method);
    }

    pub fn available_height(&self, screen_h: i32) -> i32 {
        if let Some(h) = self.available_height_override {
            return h;
        }
        let bottom_space = spacing::SECTION_GAP;
        let header_h = if self.show_header { Button::HEIGHT } else { 0 };
        let header_gap = if self.show_header { spacing::HEADER_GAP } else { 0 };
        let rect = self.slot.rect();
        let base_y = rect.y + self.padding + header_h + header_gap;
        let has_work_area = self.work_area.w > 0 && self.work_area.h > 0;
        let (area_y, area_h) = if has_work_area {
            (self.work_area.y, self.work_area.h)
        } else {
            (0, screen_h)
        };
        let computed = area_y + area_h - bottom_space - base_y;
        let half_cap = (area_h / 2).max(0);
        let capped = computed.max(0).min(half_cap);
        if !self.floatable {
            return self.visible_height;
        }
        capped
    }

    fn clamp_to_bounds(&mut self, screen_w: i32, screen_h: i32) {
        self.clamp_position_only(screen_w, screen_h);
        self.update_geometry_after_move();
    }

    fn clamp_position_only(&mut self, screen_w: i32, screen_h: i32) {
        let bounds = if self.work_area.w > 0 && self.work_area.h > 0 {
            self.work_area
        } else {
            Rect::new(0, 0, screen_w, screen_h)
        };
        if !bounds.has_area() {
            return;
        }
        let mut rect = self.slot.rect();
        if rect.w >= bounds.w {
            rect.x = bounds.x;
        } else {
            rect.x = rect.x.clamp(bounds.x, bounds.x + bounds.w - rect.w);
        }
        if rect.h >= bounds.h {
            rect.y = bounds.y;
        } else {
            rect.y = rect.y.clamp(bounds.y, bounds.y + bounds.h - rect.h);
        }
        self.slot.set_rect(rect);
    }

    fn update_geometry_after_move(&mut self) {
        let rect = self.slot.rect();
        self.header_rect.x = rect.x + self.padding;
        self.header_rect.y = rect.y + self.padding;

        let show_close =
            (self.floatable || self.close_button_enabled) && self.close_btn.is_some();
        let show_lock = self.should_show_lock_button();
        let button = Button::HEIGHT;
        if self.show_header {
            if self.floatable {
                let mut next_x = self.header_rect.x + self.header_rect.w;
                if show_lock {
                    self.lock_rect = Rect::new(next_x, self.header_rect.y, button, button);
                    next_x += button;
                } else {
                    self.lock_rect = Rect::ZERO;
                }
                if show_close {
                    self.close_rect = Rect::new(next_x, self.header_rect.y, button, button);
                } else {
                    self.close_rect = Rect::ZERO;
                }
            } else {
                let mut next_x = rect.x + rect.w - self.padding;
                if show_close {
                    self.close_rect =
                        Rect::new(next_x - button, rect.y + self.padding, button, button);
                    next_x -= button;
                } else {
                    self.close_rect = Rect::ZERO;
                }
                if show_lock {
                    self.lock_rect =
                        Rect::new(next_x - button, rect.y + self.padding, button, button);
                } else {
                    self.lock_rect = Rect::ZERO;
                }
            }
        } else {
            self.close_rect = Rect::ZERO;
            self.lock_rect = Rect::ZERO;
        }

        let header_rect = self.header_rect;
        let close_rect = self.close_rect;
        let lock_rect = self.lock_rect;
        if let Some(btn) = self.header_btn.as_mut() {
            btn.set_rect(header_rect);
        }
        if show_close {
            if let Some(btn) = self.close_btn.as_mut() {
                btn.set_rect(close_rect);
            }
        }
        if show_lock {
            if let Some(btn) = self.lock_btn.as_mut() {
                btn.set_rect(lock_rect);
            }
        }

        self.body_viewport.x = rect.x + self.padding;
        self.body_viewport.y = rect.y
            + self.padding
            + self.header_rect.h
            + if self.show_header { spacing::HEADER_GAP } else { 0 };
    }

    fn ensure_lock_state_initialized(&mut self) {
        if self.lock_state_initialized {
            return;
        }
        self.lock_state_initialized = true;
        let Some(key) = self.lock_settings_key() else {
            return;
        };
        let stored = settings::load_bool(&key).unwrap_or(self.locked);
        self.apply_lock_state(stored, false, false);
    }

    fn ensure_lock_button(&mut self) {
        if !self.should_show_lock_button() {
            self.lock_btn = None;
            self.lock_rect = Rect::ZERO;
            return;
        }
        if self.lock_btn.is_none() {
            self.lock_btn = Some(Button::new(""));
            self.update_lock_button();
        }
    }

    fn lock_settings_key(&self) -> Option<String> {
        if self.lock_namespace.is_empty() || self.lock_id.is_empty() {
            return None;
        }
        Some(format!("dev_ui.lock.{}.{}", self.lock_namespace, self.lock_id))
    }

    fn should_show_lock_button(&self) -> bool {
        self.show_header && self.lock_settings_key().is_some()
    }

    fn apply_lock_state(&mut self, locked: bool, allow_auto_collapse: bool, persist: bool) {
        self.lock_state_initialized = true;
        if self.locked == locked {
            if persist {
                if let Some(key) = self.lock_settings_key() {
                    settings::save_bool(&key, self.locked);
                }
            }
            return;
        }

        self.locked_mutation_warnings.clear();
        self.locked = locked;
        if self.locked && allow_auto_collapse && self.expanded {
            self.set_expanded(false);
        } else {
            self.update_header_button();
        }

        let callbacks: Vec<Rc<dyn Fn(bool)>> = self.on_lock_changed.clone();
        for cb in callbacks {
            cb(self.locked);
        }

        if persist {
            if let Some(key) = self.lock_settings_key() {
                settings::save_bool(&key, self.locked);
            }
        }
    }

    fn capture_snapshot(&self) -> EmbeddedSnapshot {
        EmbeddedSnapshot {
            rect: self.slot.rect(),
            visible: self.visible,
            expanded: self.expanded,
            floatable: self.floatable,
            scroll_enabled: self.scroll_enabled,
            visible_height: self.visible_height,
            available_height_override: self.available_height_override,
            last_screen_w: self.last_screen_w,
            last_screen_h: self.last_screen_h,
        }
    }

    fn apply_embedded_bounds(&mut self, bounds: Rect, screen_w: i32, screen_h: i32) {
        self.slot.set_rect(bounds);
        self.floatable = false;
        self.scroll_enabled = false;
        self.visible = true;
        self.available_height_override = None;
        self.slot.mark_layout_dirty();
        let w = if screen_w > 0 { screen_w } else { self.last_screen_w };
        let h = if screen_h > 0 { screen_h } else { self.last_screen_h };
        self.layout(w, h);
    }

    fn restore_snapshot(&mut self, snapshot: EmbeddedSnapshot) {
        self.slot.set_rect(snapshot.rect);
        self.visible = snapshot.visible;
        self.expanded = snapshot.expanded;
        self.floatable = snapshot.floatable;
        self.scroll_enabled = snapshot.scroll_enabled;
        self.visible_height = snapshot.visible_height;
        self.available_height_override = snapshot.available_height_override;
        self.last_screen_w = snapshot.last_screen_w;
        self.last_screen_h = snapshot.last_screen_h;
        self.slot.mark_layout_dirty();
    }

    /// Measures the panel height at `width` without leaking state into the
    /// floating configuration.
    pub fn embedded_height(&mut self, width: i32, screen_h: i32) -> i32 {
        let snapshot = self.capture_snapshot();
        let mut bounds = snapshot.rect;
        bounds.w = width;
        self.apply_embedded_bounds(bounds, width, screen_h);
        let measured = self.slot.rect().h;
        self.restore_snapshot(snapshot);
        measured
    }

    pub fn render_embedded(
        &mut self,
        r: &mut dyn Renderer,
        bounds: Rect,
        screen_w: i32,
        screen_h: i32,
    ) {
        let snapshot = self.capture_snapshot();
        self.apply_embedded_bounds(bounds, screen_w, screen_h);
        let previous = self.rendering_embedded;
        self.rendering_embedded = true;
        self.render(r);
        self.rendering_embedded = previous;
        self.restore_snapshot(snapshot);
    }
}

impl Drop for DockablePanel {
    fn drop(&mut self) {
        if self.registered {
            floating_layout::unregister_panel(&self.slot);
            self.registered = false;
        }
    }
}

fn is_escape(e: &UiEvent) -> bool {
    matches!(e, UiEvent::KeyDown { key: Key::Named(NamedKey::Escape) })
}

fn draw_lock_glyph(r: &mut dyn Renderer, rect: Rect, locked: bool) {
    if !rect.has_area() {
        return;
    }
    let th = theme();
    let stroke = th.border;
    let body_fill =
        if locked { th.button_base_fill } else { th.button_base_fill.lightened(0.08) };

    let pad = (rect.w / 8).max(1);
    let body = Rect::new(
        rect.x + pad,
        rect.y + rect.h / 2,
        (rect.w - 2 * pad).max(4),
        (rect.h / 2 - 2).max(4),
    );

    // Shackle: two legs plus a flat top. The open state kicks the right leg
    // outward instead of seating it on the body.
    let inset = (body.w / 6).max(2);
    let left_x = body.x + inset;
    let right_x = body.right() - inset;
    let top_y = rect.y + (rect.h / 8).max(1);
    r.line(Point::new(left_x, body.y), Point::new(left_x, top_y), stroke, 2);
    r.line(Point::new(left_x, top_y), Point::new(right_x, top_y), stroke, 2);
    if locked {
        r.line(Point::new(right_x, top_y), Point::new(right_x, body.y), stroke, 2);
    } else {
        let kick = ((right_x - left_x) / 3).max(3);
        r.line(
            Point::new(right_x, top_y),
            Point::new(right_x + kick, body.y - (body.h / 2).max(2)),
            stroke,
            2,
        );
    }

    beveled_rect(r, body, body_fill, &th);
    let key = Rect::new(
        body.x + body.w / 2 - 1,
        body.y + body.h / 3,
        2,
        (body.h / 3).max(2),
    );
    r.fill_rect(key, body_fill.darkened(0.45));
}
