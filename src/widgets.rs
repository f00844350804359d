use crate::draw::{beveled_rect, Renderer};
use crate::events::UiEvent;
use crate::geometry::{Point, Rect};
use crate::style::{theme, ButtonStyle, LabelStyle};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

/// Capability interface the panel grid consumes. Anything placeable in a
/// panel row implements this; the panel only ever sees trait objects.
pub trait Widget {
    fn set_rect(&mut self, rect: Rect);
    fn rect(&self) -> Rect;
    fn height_for_width(&self, width: i32) -> i32;
    fn handle_event(&mut self, event: &UiEvent) -> bool;
    fn render(&mut self, r: &mut dyn Renderer);

    /// Full-row widgets are split onto their own row during panel layout.
    fn wants_full_row(&self) -> bool {
        false
    }

    fn set_layout_dirty_callback(&mut self, _cb: Rc<dyn Fn()>) {}
    fn clear_layout_dirty_flags(&mut self) {}
}

pub type WidgetHandle = Rc<RefCell<dyn Widget>>;
pub type Row = Vec<WidgetHandle>;
pub type Rows = Vec<Row>;

pub fn handle(widget: impl Widget + 'static) -> WidgetHandle {
    Rc::new(RefCell::new(widget))
}

thread_local! {
    static NEXT_WIDGET_ID: Cell<usize> = const { Cell::new(1) };
    static SLIDER_CAPTURES: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
    static OPEN_DROPDOWNS: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

fn next_widget_id() -> usize {
    NEXT_WIDGET_ID.with(|id| {
        let v = id.get();
        id.set(v + 1);
        v
    })
}

/// Marks `owner` as holding a wheel capture. Panels skip body scrolling while
/// any capture is live so a mid-drag slider keeps the wheel.
pub fn set_slider_scroll_capture(owner: usize, active: bool) {
    SLIDER_CAPTURES.with(|set| {
        let mut set = set.borrow_mut();
        if active {
            set.insert(owner);
        } else {
            set.remove(&owner);
        }
    });
}

pub fn slider_scroll_captured() -> bool {
    SLIDER_CAPTURES.with(|set| !set.borrow().is_empty())
}

pub fn set_dropdown_open(owner: usize, open: bool) {
    OPEN_DROPDOWNS.with(|set| {
        let mut set = set.borrow_mut();
        if open {
            set.insert(owner);
        } else {
            set.remove(&owner);
        }
    });
}

/// True while any dropdown list is expanded; panels keep forwarding events to
/// children even when the pointer has left the body so the list can close.
pub fn dropdown_open() -> bool {
    OPEN_DROPDOWNS.with(|set| !set.borrow().is_empty())
}

fn estimate_text_width(text: &str, style: &LabelStyle) -> i32 {
    // Rough monospace-ish estimate; real measurement belongs to the backend.
    text.chars().count() as i32 * style.font_size * 6 / 10
}

pub struct Button {
    label: String,
    rect: Rect,
    style: Option<ButtonStyle>,
    hovered: bool,
    pressed: bool,
    full_row: bool,
    on_click: Option<Box<dyn FnMut()>>,
}

impl Button {
    pub const HEIGHT: i32 = 28;

    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rect: Rect::ZERO,
            style: None,
            hovered: false,
            pressed: false,
            full_row: false,
            on_click: None,
        }
    }

    pub fn with_on_click(mut self, cb: impl FnMut() + 'static) -> Self {
        self.on_click = Some(Box::new(cb));
        self
    }

    pub fn with_style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_full_row(mut self) -> Self {
        self.full_row = true;
        self
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_style(&mut self, style: ButtonStyle) {
        self.style = Some(style);
    }

    pub fn style(&self) -> ButtonStyle {
        self.style.unwrap_or_else(|| theme().header_button)
    }

    pub fn preferred_width(&self) -> i32 {
        estimate_text_width(&self.label, &self.style().label) + 24
    }

    fn click_at(&mut self, pos: Point) -> bool {
        let was_pressed = self.pressed;
        self.pressed = false;
        if was_pressed && self.rect.contains(pos) {
            if let Some(cb) = self.on_click.as_mut() {
                cb();
            }
            return true;
        }
        false
    }
}

impl Widget for Button {
    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn height_for_width(&self, _width: i32) -> i32 {
        Self::HEIGHT
    }

    fn handle_event(&mut self, event: &UiEvent) -> bool {
        match event {
            UiEvent::MouseMotion { pos } => {
                self.hovered = self.rect.contains(*pos);
                false
            }
            UiEvent::MouseDown { pos, .. } if self.rect.contains(*pos) => {
                self.pressed = true;
                true
            }
            UiEvent::MouseUp { pos, .. } => self.click_at(*pos),
            _ => false,
        }
    }

    fn render(&mut self, r: &mut dyn Renderer) {
        let style = self.style();
        let fill = if self.pressed {
            style.press_bg
        } else if self.hovered {
            style.hover_bg
        } else {
            style.bg
        };
        beveled_rect(r, self.rect, fill, &theme());
        let label_style = LabelStyle { color: style.text, ..style.label };
        r.text(&self.label, self.rect, &label_style);
    }

    fn wants_full_row(&self) -> bool {
        self.full_row
    }
}

pub struct Checkbox {
    label: String,
    rect: Rect,
    checked: bool,
    pressed: bool,
    on_change: Option<Box<dyn FnMut(bool)>>,
}

impl Checkbox {
    const BOX_SIZE: i32 = 18;

    pub fn new(label: impl Into<String>, checked: bool) -> Self {
        Self { label: label.into(), rect: Rect::ZERO, checked, pressed: false, on_change: None }
    }

    pub fn with_on_change(mut self, cb: impl FnMut(bool) + 'static) -> Self {
        self.on_change = Some(Box::new(cb));
        self
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }
}

impl Widget for Checkbox {
    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn height_for_width(&self, _width: i32) -> i32 {
        Self::BOX_SIZE + 4
    }

    fn handle_event(&mut self, event: &UiEvent) -> bool {
        match event {
            UiEvent::MouseDown { pos, .. } if self.rect.contains(*pos) => {
                self.pressed = true;
                true
            }
            UiEvent::MouseUp { pos, .. } => {
                let was_pressed = self.pressed;
                self.pressed = false;
                if was_pressed && self.rect.contains(*pos) {
                    self.checked = !self.checked;
                    let checked = self.checked;
                    if let Some(cb) = self.on_change.as_mut() {
                        cb(checked);
                    }
                    return true;
                }
                false
            }
            _ => false,
        }
    }

    fn render(&mut self, r: &mut dyn Renderer) {
        let th = theme();
        let box_rect = Rect::new(
            self.rect.x,
            self.rect.y + (self.rect.h - Self::BOX_SIZE) / 2,
            Self::BOX_SIZE,
            Self::BOX_SIZE,
        );
        beveled_rect(r, box_rect, th.slider_track_bg, &th);
        if self.checked {
            r.fill_rect(box_rect.expanded(-4), th.focus_outline);
        }
        let label_rect = Rect::new(
            box_rect.right() + 8,
            self.rect.y,
            self.rect.w - Self::BOX_SIZE - 8,
            self.rect.h,
        );
        r.text(&self.label, label_rect, &th.label);
    }
}

/// Horizontal slider. While the thumb is being dragged the widget holds the
/// wheel capture so the hosting panel does not scroll underneath it.
pub struct Slider {
    id: usize,
    rect: Rect,
    min: f32,
    max: f32,
    value: f32,
    dragging: bool,
    on_change: Option<Box<dyn FnMut(f32)>>,
}

impl Slider {
    const TRACK_HEIGHT: i32 = 6;
    const THUMB_WIDTH: i32 = 10;

    pub fn new(min: f32, max: f32, value: f32) -> Self {
        Self {
            id: next_widget_id(),
            rect: Rect::ZERO,
            min,
            max: max.max(min),
            value: value.clamp(min, max.max(min)),
            dragging: false,
            on_change: None,
        }
    }

    pub fn with_on_change(mut self, cb: impl FnMut(f32) + 'static) -> Self {
        self.on_change = Some(Box::new(cb));
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value.clamp(self.min, self.max);
    }

    fn value_at(&self, x: i32) -> f32 {
        if self.rect.w <= 1 {
            return self.min;
        }
        let t = (x - self.rect.x) as f32 / (self.rect.w - 1) as f32;
        (self.min + t * (self.max - self.min)).clamp(self.min, self.max)
    }

    fn apply(&mut self, value: f32) {
        if (value - self.value).abs() > f32::EPSILON {
            self.value = value;
            let v = self.value;
            if let Some(cb) = self.on_change.as_mut() {
                cb(v);
            }
        }
    }
}

impl Widget for Slider {
    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn height_for_width(&self, _width: i32) -> i32 {
        20
    }

    fn handle_event(&mut self, event: &UiEvent) -> bool {
        match event {
            UiEvent::MouseDown { pos, .. } if self.rect.contains(*pos) => {
                self.dragging = true;
                set_slider_scroll_capture(self.id, true);
                let v = self.value_at(pos.x);
                self.apply(v);
                true
            }
            UiEvent::MouseMotion { pos } if self.dragging => {
                let v = self.value_at(pos.x);
                self.apply(v);
                true
            }
            UiEvent::MouseUp { .. } if self.dragging => {
                self.dragging = false;
                set_slider_scroll_capture(self.id, false);
                true
            }
            _ => false,
        }
    }

    fn render(&mut self, r: &mut dyn Renderer) {
        let th = theme();
        let track = Rect::new(
            self.rect.x,
            self.rect.y + (self.rect.h - Self::TRACK_HEIGHT) / 2,
            self.rect.w,
            Self::TRACK_HEIGHT,
        );
        r.fill_rect(track, th.slider_track_bg);
        r.stroke_rect(track, th.border, 1);
        let span = (self.max - self.min).max(f32::EPSILON);
        let t = (self.value - self.min) / span;
        let travel = (self.rect.w - Self::THUMB_WIDTH).max(0);
        let thumb_x = self.rect.x + (t * travel as f32).round() as i32;
        let thumb = Rect::new(thumb_x, self.rect.y, Self::THUMB_WIDTH, self.rect.h);
        beveled_rect(r, thumb, th.button_base_fill, &th);
    }
}

impl Drop for Slider {
    fn drop(&mut self) {
        if self.dragging {
            set_slider_scroll_capture(self.id, false);
        }
    }
}

/// Single-select dropdown. Opening registers a process-wide flag that keeps
/// the hosting panel forwarding events so the list can be dismissed from
/// anywhere; the list also grows the widget's intrinsic height, which rides
/// the layout-dirty callback.
pub struct Dropdown {
    id: usize,
    rect: Rect,
    options: Vec<String>,
    selected: usize,
    open: bool,
    dirty: bool,
    dirty_cb: Option<Rc<dyn Fn()>>,
    on_select: Option<Box<dyn FnMut(usize)>>,
}

impl Dropdown {
    const ITEM_HEIGHT: i32 = 24;

    pub fn new(options: Vec<String>, selected: usize) -> Self {
        let selected = selected.min(options.len().saturating_sub(1));
        Self {
            id: next_widget_id(),
            rect: Rect::ZERO,
            options,
            selected,
            open: false,
            dirty: false,
            dirty_cb: None,
            on_select: None,
        }
    }

    pub fn with_on_select(mut self, cb: impl FnMut(usize) + 'static) -> Self {
        self.on_select = Some(Box::new(cb));
        self
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn header_rect(&self) -> Rect {
        Rect::new(self.rect.x, self.rect.y, self.rect.w, Button::HEIGHT.min(self.rect.h))
    }

    fn item_rect(&self, index: usize) -> Rect {
        let header = self.header_rect();
        Rect::new(
            self.rect.x,
            header.bottom() + index as i32 * Self::ITEM_HEIGHT,
            self.rect.w,
            Self::ITEM_HEIGHT,
        )
    }

    fn set_open(&mut self, open: bool) {
        if self.open == open {
            return;
        }
        self.open = open;
        set_dropdown_open(self.id, open);
        self.dirty = true;
        if let Some(cb) = self.dirty_cb.as_ref() {
            cb();
        }
    }
}

impl Widget for Dropdown {
    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn height_for_width(&self, _width: i32) -> i32 {
        if self.open {
            Button::HEIGHT + self.options.len() as i32 * Self::ITEM_HEIGHT
        } else {
            Button::HEIGHT
        }
    }

    fn handle_event(&mut self, event: &UiEvent) -> bool {
        match event {
            UiEvent::MouseDown { pos, .. } => {
                if self.header_rect().contains(*pos) {
                    let open = self.open;
                    self.set_open(!open);
                    return true;
                }
                if self.open {
                    for i in 0..self.options.len() {
                        if self.item_rect(i).contains(*pos) {
                            self.selected = i;
                            self.set_open(false);
                            if let Some(cb) = self.on_select.as_mut() {
                                cb(i);
                            }
                            return true;
                        }
                    }
                    // Click anywhere else dismisses the list.
                    self.set_open(false);
                }
                false
            }
            _ => false,
        }
    }

    fn render(&mut self, r: &mut dyn Renderer) {
        let th = theme();
        let header = self.header_rect();
        beveled_rect(r, header, th.header_button.bg, &th);
        let label = self.options.get(self.selected).map(String::as_str).unwrap_or("");
        r.text(label, header, &th.label);
        if self.open {
            for (i, option) in self.options.iter().enumerate() {
                let item = self.item_rect(i);
                let fill = if i == self.selected { th.header_button.hover_bg } else { th.panel_bg };
                r.fill_rect(item, fill);
                r.stroke_rect(item, th.border, 1);
                r.text(option, item, &th.label);
            }
        }
    }

    fn set_layout_dirty_callback(&mut self, cb: Rc<dyn Fn()>) {
        self.dirty_cb = Some(cb);
    }

    fn clear_layout_dirty_flags(&mut self) {
        self.dirty = false;
    }
}

impl Drop for Dropdown {
    fn drop(&mut self) {
        if self.open {
            set_dropdown_open(self.id, false);
        }
    }
}

pub struct Label {
    text: String,
    rect: Rect,
    style: Option<LabelStyle>,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), rect: Rect::ZERO, style: None }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl Widget for Label {
    fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn height_for_width(&self, _width: i32) -> i32 {
        let style = self.style.unwrap_or_else(|| theme().label);
        style.font_size + 6
    }

    fn handle_event(&mut self, _event: &UiEvent) -> bool {
        false
    }

    fn render(&mut self, r: &mut dyn Renderer) {
        let style = self.style.unwrap_or_else(|| theme().label);
        r.text(&self.text, self.rect, &style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_click_requires_press_and_release_inside() {
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let mut button = Button::new("Apply").with_on_click(move || counter.set(counter.get() + 1));
        button.set_rect(Rect::new(0, 0, 80, Button::HEIGHT));

        assert!(button.handle_event(&UiEvent::mouse_down(10, 10)));
        assert!(button.handle_event(&UiEvent::mouse_up(12, 12)));
        assert_eq!(clicks.get(), 1);

        // Release outside cancels.
        button.handle_event(&UiEvent::mouse_down(10, 10));
        assert!(!button.handle_event(&UiEvent::mouse_up(200, 10)));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn slider_drag_holds_wheel_capture() {
        let mut slider = Slider::new(0.0, 10.0, 0.0);
        slider.set_rect(Rect::new(0, 0, 101, 20));
        assert!(!slider_scroll_captured());
        assert!(slider.handle_event(&UiEvent::mouse_down(50, 10)));
        assert!(slider_scroll_captured());
        assert_eq!(slider.value(), 5.0);
        slider.handle_event(&UiEvent::mouse_motion(100, 10));
        assert_eq!(slider.value(), 10.0);
        assert!(slider.handle_event(&UiEvent::mouse_up(100, 10)));
        assert!(!slider_scroll_captured());
    }

    #[test]
    fn dropdown_open_grows_height_and_sets_flag() {
        let mut dd = Dropdown::new(vec!["a".into(), "b".into()], 0);
        dd.set_rect(Rect::new(0, 0, 120, Button::HEIGHT));
        assert_eq!(dd.height_for_width(120), Button::HEIGHT);
        assert!(dd.handle_event(&UiEvent::mouse_down(5, 5)));
        assert!(dd.is_open());
        assert!(dropdown_open());
        assert_eq!(dd.height_for_width(120), Button::HEIGHT + 2 * 24);
        // Selecting the second item closes and reports.
        assert!(dd.handle_event(&UiEvent::mouse_down(5, Button::HEIGHT + 24 + 4)));
        assert_eq!(dd.selected(), 1);
        assert!(!dropdown_open());
    }
}
