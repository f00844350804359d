use crate::geometry::{Point, Rect};
use crate::panel::SlotHandle;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

const PANEL_GAP: i32 = 40;
const HEADER_TO_PANEL_PADDING: i32 = 30;

type Intervals = SmallVec<[Interval; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    start: i32,
    end: i32,
}

fn subtract_interval(source: &Intervals, obstacle: Interval) -> Intervals {
    let mut result: Intervals = SmallVec::new();
    for interval in source {
        if obstacle.end <= interval.start || obstacle.start >= interval.end {
            result.push(*interval);
            continue;
        }
        if obstacle.start > interval.start {
            result.push(Interval { start: interval.start, end: obstacle.start });
        }
        if obstacle.end < interval.end {
            result.push(Interval { start: obstacle.end, end: interval.end });
        }
    }
    result.sort_by_key(|i| i.start);
    let mut merged: Intervals = SmallVec::new();
    for candidate in result {
        if candidate.end <= candidate.start {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.end >= candidate.start => last.end = last.end.max(candidate.end),
            _ => merged.push(candidate),
        }
    }
    merged
}

fn compute_free_intervals(usable: Rect, obstacles: &[Rect]) -> Intervals {
    let mut free: Intervals = SmallVec::new();
    if usable.w <= 0 {
        return free;
    }
    free.push(Interval { start: usable.x, end: usable.right() });
    for rect in obstacles {
        let Some(clipped) = usable.intersect(&rect.sanitized()) else {
            continue;
        };
        free = subtract_interval(&free, Interval { start: clipped.x, end: clipped.right() });
    }
    if free.is_empty() {
        free.push(Interval { start: usable.x, end: usable.right() });
    }
    free
}

fn clamp_dimension(value: i32, limit: i32) -> i32 {
    if limit <= 0 {
        value.max(1)
    } else {
        value.clamp(1, limit)
    }
}

fn clamp_desired(desired: i32, width: i32, usable: Rect) -> i32 {
    let min_x = usable.x;
    let max_x = (usable.x + (usable.w - width).max(0)).max(min_x);
    desired.clamp(min_x, max_x)
}

/// Picks an x for a `width`-wide panel: the first free interval that can hold
/// it at or to the right of `desired`, else the last interval wide enough to
/// its left (right-aligned within it), else `desired` clamped into usable.
fn locate_position(desired: i32, width: i32, intervals: &Intervals, usable: Rect) -> i32 {
    for interval in intervals {
        if interval.end - interval.start < width {
            continue;
        }
        let start = desired.max(interval.start);
        if start + width <= interval.end {
            return start;
        }
    }
    for interval in intervals.iter().rev() {
        if interval.end - interval.start >= width {
            return interval.end - width;
        }
    }
    clamp_desired(desired, width, usable)
}

/// Per-panel layout request. Preferred sizes kick in when the slot rect is
/// still degenerate; `force_layout` places the panel even while invisible.
#[derive(Clone)]
pub struct PanelInfo {
    pub slot: SlotHandle,
    pub preferred_width: i32,
    pub preferred_height: i32,
    pub force_layout: bool,
}

impl PanelInfo {
    pub fn new(slot: SlotHandle) -> Self {
        Self { slot, preferred_width: 0, preferred_height: 0, force_layout: false }
    }

    pub fn from_slot(slot: &SlotHandle) -> Self {
        Self {
            slot: slot.clone(),
            preferred_width: slot.preferred_width(),
            preferred_height: slot.preferred_height(),
            force_layout: slot.force_layout(),
        }
    }

    fn resolve_width(&self, usable: Rect) -> i32 {
        let mut width = self.slot.rect().w;
        if width <= 0 {
            width = self.preferred_width;
        }
        if width <= 0 {
            width = crate::panel::DockablePanel::DEFAULT_FLOATING_CONTENT_WIDTH;
        }
        clamp_dimension(width, usable.w)
    }

    fn resolve_height(&self, usable: Rect) -> i32 {
        let mut height = self.slot.rect().h;
        if height <= 0 {
            height = self.preferred_height;
        }
        if height <= 0 {
            height = 400;
        }
        clamp_dimension(height, usable.h)
    }
}

/// Placement hint for auxiliary panels opened next to a sliding container.
pub struct SlidingParentInfo {
    pub bounds: Rect,
    pub padding: i32,
    pub anchor_left: bool,
    pub align_top: bool,
}

/// Arranges registered floating panels into a centered, non-overlapping row
/// within the viewport minus header, footer and sliding-container obstacles.
#[derive(Default)]
pub struct FloatingLayoutManager {
    viewport: Rect,
    header_bounds: Rect,
    footer_bounds: Rect,
    sliding_rects: Vec<Rect>,
    usable_rect: Rect,
    tracked: Vec<SlotHandle>,
    user_placed: Vec<SlotHandle>,
    applying_layout: bool,
}

impl FloatingLayoutManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usable_rect(&self) -> Rect {
        self.usable_rect
    }

    pub fn compute_usable_rect(
        &mut self,
        viewport: Rect,
        header_bounds: Rect,
        footer_bounds: Rect,
        sliding_containers: &[Rect],
    ) -> Rect {
        self.viewport = viewport.sanitized();
        self.header_bounds = header_bounds.sanitized();
        self.footer_bounds = footer_bounds.sanitized();
        self.sliding_rects.clear();
        for rect in sliding_containers {
            let sanitized = rect.sanitized();
            if sanitized.has_area() {
                self.sliding_rects.push(sanitized);
            }
        }

        self.usable_rect = self.viewport;
        if !self.usable_rect.has_area() {
            self.usable_rect = Rect::ZERO;
            return self.usable_rect;
        }

        let mut top = self.usable_rect.y;
        let mut bottom = self.usable_rect.bottom();
        if self.header_bounds.has_area() {
            top = top.max(self.header_bounds.bottom() + HEADER_TO_PANEL_PADDING);
        }
        if self.footer_bounds.has_area() {
            bottom = bottom.min(self.footer_bounds.y);
        }
        if bottom < top {
            bottom = top;
        }
        self.usable_rect.y = top;
        self.usable_rect.h = (bottom - top).max(0);
        self.layout_tracked_panels();
        self.usable_rect
    }

    pub fn layout_all(&mut self, panels: &[PanelInfo]) {
        let scoped = !self.applying_layout;
        if scoped {
            self.applying_layout = true;
        }
        self.layout_all_inner(panels);
        if scoped {
            self.applying_layout = false;
        }
    }

    fn layout_all_inner(&mut self, panels: &[PanelInfo]) {
        if !self.usable_rect.has_area() {
            return;
        }

        let targets: Vec<&PanelInfo> = panels
            .iter()
            .filter(|info| info.force_layout || info.slot.visible())
            .filter(|info| !self.is_user_placed(&info.slot))
            .collect();
        if targets.is_empty() {
            return;
        }

        let usable = self.usable_rect;
        let free_intervals = compute_free_intervals(usable, &self.sliding_rects);

        let widths: Vec<i32> = targets.iter().map(|t| t.resolve_width(usable)).collect();
        let heights: Vec<i32> = targets.iter().map(|t| t.resolve_height(usable)).collect();
        let count = targets.len() as i32;
        let mut total_width: i32 = widths.iter().sum();
        if count > 1 {
            total_width += PANEL_GAP * (count - 1);
        }

        let min_start = usable.x;
        let max_start = (usable.x + (usable.w - total_width).max(0)).max(min_start);
        let start_x = (usable.x + (usable.w - total_width) / 2).clamp(min_start, max_start);

        let mut current = start_x;
        for (i, info) in targets.iter().enumerate() {
            let width = widths[i];
            let height = heights[i];
            let x = locate_position(current, width, &free_intervals, usable);
            let mut y = usable.y;
            if count == 1 {
                y = usable.y + (usable.h - height) / 2;
            }
            let min_y = usable.y;
            let max_y = (usable.y + (usable.h - height).max(0)).max(min_y);
            y = y.clamp(min_y, max_y);
            info.slot.set_position_from_layout(x, y);
            current = x + width + PANEL_GAP;
        }
    }

    pub fn position_for(&self, info: &PanelInfo, parent: Option<&SlidingParentInfo>) -> Point {
        let usable = self.usable_rect;
        if !usable.has_area() {
            return Point::new(usable.x, usable.y);
        }

        let free_intervals = compute_free_intervals(usable, &self.sliding_rects);
        let width = info.resolve_width(usable);
        let height = info.resolve_height(usable);

        let desired_x = match parent {
            Some(p) if p.anchor_left => p.bounds.x - p.padding - width,
            Some(p) => p.bounds.right() + p.padding,
            None => usable.x + usable.w / 2 - width / 2,
        };
        let x = locate_position(desired_x, width, &free_intervals, usable);

        let mut y = usable.y;
        if let Some(p) = parent {
            y = if p.align_top { p.bounds.y } else { p.bounds.y + p.bounds.h / 2 - height / 2 };
        }
        let min_y = usable.y;
        let max_y = (usable.y + (usable.h - height).max(0)).max(min_y);
        Point::new(x, y.clamp(min_y, max_y))
    }

    pub fn register_panel(&mut self, slot: &SlotHandle) {
        if self.is_tracking(slot) {
            return;
        }
        self.tracked.push(slot.clone());
        self.layout_tracked_panels();
    }

    pub fn unregister_panel(&mut self, slot: &SlotHandle) {
        let before = self.tracked.len();
        self.tracked.retain(|s| !Rc::ptr_eq(s, slot));
        if self.tracked.len() == before {
            return;
        }
        self.user_placed.retain(|s| !Rc::ptr_eq(s, slot));
        self.layout_tracked_panels();
    }

    pub fn notify_panel_geometry_changed(&mut self, slot: &SlotHandle) {
        if !self.is_tracking(slot) || self.applying_layout {
            return;
        }
        self.layout_tracked_panels();
    }

    pub fn notify_panel_content_changed(&mut self, slot: &SlotHandle) {
        if !self.is_tracking(slot) || self.applying_layout {
            return;
        }
        self.layout_tracked_panels();
    }

    pub fn notify_panel_user_moved(&mut self, slot: &SlotHandle) {
        if !self.is_user_placed(slot) {
            self.user_placed.push(slot.clone());
        }
    }

    fn layout_tracked_panels(&mut self) {
        if self.applying_layout || self.tracked.is_empty() {
            return;
        }
        let panels: Vec<PanelInfo> = self
            .tracked
            .iter()
            .filter(|slot| (slot.visible() || slot.force_layout()) && slot.floatable())
            .filter(|slot| !self.is_user_placed(slot))
            .map(PanelInfo::from_slot)
            .collect();
        if panels.is_empty() {
            return;
        }
        self.applying_layout = true;
        self.layout_all_inner(&panels);
        self.applying_layout = false;
    }

    fn is_tracking(&self, slot: &SlotHandle) -> bool {
        self.tracked.iter().any(|s| Rc::ptr_eq(s, slot))
    }

    fn is_user_placed(&self, slot: &SlotHandle) -> bool {
        self.user_placed.iter().any(|s| Rc::ptr_eq(s, slot))
    }
}

thread_local! {
    static MANAGER: RefCell<FloatingLayoutManager> = RefCell::new(FloatingLayoutManager::new());
}

pub fn compute_usable_rect(
    viewport: Rect,
    header_bounds: Rect,
    footer_bounds: Rect,
    sliding_containers: &[Rect],
) -> Rect {
    MANAGER.with(|m| {
        m.borrow_mut().compute_usable_rect(viewport, header_bounds, footer_bounds, sliding_containers)
    })
}

pub fn usable_rect() -> Rect {
    MANAGER.with(|m| m.borrow().usable_rect())
}

pub fn layout_all(panels: &[PanelInfo]) {
    MANAGER.with(|m| m.borrow_mut().layout_all(panels));
}

pub fn position_for(info: &PanelInfo, parent: Option<&SlidingParentInfo>) -> Point {
    MANAGER.with(|m| m.borrow().position_for(info, parent))
}

pub fn register_panel(slot: &SlotHandle) {
    MANAGER.with(|m| m.borrow_mut().register_panel(slot));
}

pub fn unregister_panel(slot: &SlotHandle) {
    MANAGER.with(|m| m.borrow_mut().unregister_panel(slot));
}

pub fn notify_panel_geometry_changed(slot: &SlotHandle) {
    MANAGER.with(|m| m.borrow_mut().notify_panel_geometry_changed(slot));
}

pub fn notify_panel_content_changed(slot: &SlotHandle) {
    MANAGER.with(|m| m.borrow_mut().notify_panel_content_changed(slot));
}

pub fn notify_panel_user_moved(slot: &SlotHandle) {
    MANAGER.with(|m| m.borrow_mut().notify_panel_user_moved(slot));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals(list: &[(i32, i32)]) -> Intervals {
        list.iter().map(|&(start, end)| Interval { start, end }).collect()
    }

    #[test]
    fn subtract_splits_and_merges() {
        let free = intervals(&[(0, 100)]);
        let out = subtract_interval(&free, Interval { start: 40, end: 60 });
        assert_eq!(out.as_slice(), intervals(&[(0, 40), (60, 100)]).as_slice());

        // Obstacle covering the whole interval drops it.
        let out = subtract_interval(&out, Interval { start: 0, end: 40 });
        assert_eq!(out.as_slice(), intervals(&[(60, 100)]).as_slice());
    }

    #[test]
    fn free_intervals_fall_back_to_full_width() {
        let usable = Rect::new(0, 0, 200, 100);
        let free = compute_free_intervals(usable, &[Rect::new(0, 0, 200, 100)]);
        assert_eq!(free.as_slice(), intervals(&[(0, 200)]).as_slice());
    }

    #[test]
    fn locate_prefers_right_then_falls_back_left() {
        let usable = Rect::new(0, 0, 1920, 900);
        let free = intervals(&[(0, 800), (1200, 1920)]);
        assert_eq!(locate_position(380, 360, &free, usable), 380);
        assert_eq!(locate_position(780, 360, &free, usable), 1200);
        // Nothing fits to the right; take the last sufficient interval,
        // right-aligned.
        assert_eq!(locate_position(1600, 360, &free, usable), 1560);
    }
}
