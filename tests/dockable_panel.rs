use dockyard::events::{Key, NamedKey, UiEvent};
use dockyard::floating_layout;
use dockyard::geometry::{Point, Rect};
use dockyard::input::Input;
use dockyard::panel::DockablePanel;
use dockyard::time::{self, ManualTicks};
use dockyard::widgets::{handle, Button, Rows};
use std::rc::Rc;

const SCREEN_W: i32 = 1920;
const SCREEN_H: i32 = 1080;

fn setup() -> Rc<ManualTicks> {
    let ticks = Rc::new(ManualTicks::new(1_000));
    time::install_source(ticks.clone());
    floating_layout::compute_usable_rect(
        Rect::new(0, 0, SCREEN_W, SCREEN_H),
        Rect::new(0, 0, SCREEN_W, 60),
        Rect::new(0, 1040, SCREEN_W, 40),
        &[],
    );
    ticks
}

// Two passes: the first layout can move the panel through the floating
// layout manager, the second settles the dependent geometry.
fn pump(panel: &mut DockablePanel) {
    let input = Input::new();
    panel.update(&input, SCREEN_W, SCREEN_H);
    panel.update(&input, SCREEN_W, SCREEN_H);
}

fn escape() -> UiEvent {
    UiEvent::KeyDown { key: Key::Named(NamedKey::Escape) }
}

#[test]
fn floating_panel_collapsed_geometry() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    pump(&mut panel);

    let rect = panel.rect();
    assert_eq!(rect.w, 408);
    assert_eq!(rect.h, 92);
    assert!(!panel.is_expanded());

    // Header leaves room for the close button on the right.
    let header = panel.header_rect();
    assert_eq!(header.w, 332);
    assert_eq!(header.h, 28);
    assert_eq!(header.x, rect.x + 24);
    assert_eq!(header.y, rect.y + 24);
}

#[test]
fn full_row_widgets_get_their_own_row() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    let a = handle(Button::new("A"));
    let b = handle(Button::new("B"));
    let wide = handle(Button::new("Apply").with_full_row());
    let rows: Rows = vec![vec![a.clone(), b.clone(), wide.clone()]];
    panel.set_rows(rows);
    panel.set_expanded(true);
    pump(&mut panel);

    assert_eq!(panel.content_height(), 68);
    let rect = panel.rect();
    assert_eq!(rect.h, 160);

    let ra = a.borrow().rect();
    let rb = b.borrow().rect();
    let rw = wide.borrow().rect();
    assert_eq!(ra.w, 174);
    assert_eq!(rb.w, 174);
    assert_eq!(rb.x, ra.x + 174 + 12);
    assert_eq!(rw.w, 360);
    assert_eq!(rw.x, ra.x);
    assert_eq!(rw.y, ra.y + 28 + 12);
}

#[test]
fn wheel_scrolls_and_clamps() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    let rows: Rows = (0..20).map(|i| vec![handle(Button::new(format!("b{i}")))]).collect();
    panel.set_rows(rows);
    panel.set_expanded(true);
    panel.set_available_height_override(Some(300));
    pump(&mut panel);

    assert_eq!(panel.content_height(), 20 * 28 + 19 * 12);
    assert_eq!(panel.max_scroll(), 788 - 300);

    let body = panel.body_viewport();
    let cx = body.x + body.w / 2;
    let cy = body.y + body.h / 2;

    assert!(panel.handle_event(&UiEvent::wheel(-3, cx, cy)));
    assert_eq!(panel.scroll(), 120);

    assert!(panel.handle_event(&UiEvent::wheel(-20, cx, cy)));
    assert_eq!(panel.scroll(), panel.max_scroll());

    assert!(panel.handle_event(&UiEvent::wheel(100, cx, cy)));
    assert_eq!(panel.scroll(), 0);

    // Outside the body the wheel is not consumed.
    assert!(!panel.handle_event(&UiEvent::wheel(-3, cx, body.y + body.h + 50)));
    assert_eq!(panel.scroll(), 0);
}

#[test]
fn header_click_toggles_expansion() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    pump(&mut panel);

    let header = panel.header_rect();
    let cx = header.x + header.w / 2;
    let cy = header.y + header.h / 2;
    assert!(panel.handle_event(&UiEvent::mouse_down(cx, cy)));
    assert!(panel.handle_event(&UiEvent::mouse_up(cx, cy)));
    assert!(panel.is_expanded());

    pump(&mut panel);
    let header = panel.header_rect();
    let cx = header.x + header.w / 2;
    let cy = header.y + header.h / 2;
    assert!(panel.handle_event(&UiEvent::mouse_down(cx, cy)));
    assert!(panel.handle_event(&UiEvent::mouse_up(cx, cy)));
    assert!(!panel.is_expanded());
}

#[test]
fn drag_respects_threshold_and_blocks_pointer_after_drop() {
    let ticks = setup();
    let mut panel = DockablePanel::new("Tools", true);
    pump(&mut panel);

    let rect0 = panel.rect();
    let header = panel.header_rect();
    let sx = header.x + header.w / 2;
    let sy = header.y + header.h / 2;

    assert!(panel.handle_event(&UiEvent::mouse_down(sx, sy)));
    // 2px of travel stays below the drag threshold.
    assert!(panel.handle_event(&UiEvent::mouse_motion(sx + 2, sy)));
    assert_eq!(panel.rect(), rect0);

    assert!(panel.handle_event(&UiEvent::mouse_motion(sx + 3, sy)));
    assert_eq!(panel.rect().x, rect0.x + 3);

    assert!(panel.handle_event(&UiEvent::mouse_motion(sx + 10, sy + 5)));
    assert_eq!(panel.position(), Point::new(rect0.x + 10, rect0.y + 5));
    assert!(panel.handle_event(&UiEvent::mouse_up(sx + 10, sy + 5)));
    // A real drag does not toggle expansion on release.
    assert!(!panel.is_expanded());

    // Pointer input is swallowed right after the drop.
    assert!(panel.handle_event(&UiEvent::mouse_down(sx + 10, sy + 5)));
    assert!(panel.handle_event(&UiEvent::mouse_motion(sx + 20, sy + 5)));
    assert_eq!(panel.position(), Point::new(rect0.x + 10, rect0.y + 5));

    ticks.advance(61);
    assert!(panel.handle_event(&UiEvent::mouse_down(sx + 10, sy + 5)));
    assert!(panel.handle_event(&UiEvent::mouse_motion(sx + 20, sy + 10)));
    assert_eq!(panel.position(), Point::new(rect0.x + 20, rect0.y + 10));
}

#[test]
fn showing_a_panel_blocks_the_first_pointer_events() {
    let ticks = setup();
    let mut panel = DockablePanel::new("Tools", true);
    pump(&mut panel);
    panel.set_visible(false);
    panel.set_visible(true);
    pump(&mut panel);

    let rect0 = panel.rect();
    let header = panel.header_rect();
    let sx = header.x + header.w / 2;
    let sy = header.y + header.h / 2;

    assert!(panel.handle_event(&UiEvent::mouse_down(sx, sy)));
    assert!(panel.handle_event(&UiEvent::mouse_motion(sx + 10, sy)));
    assert_eq!(panel.rect(), rect0);

    ticks.advance(17);
    assert!(panel.handle_event(&UiEvent::mouse_down(sx, sy)));
    assert!(panel.handle_event(&UiEvent::mouse_motion(sx + 10, sy)));
    assert_eq!(panel.rect().x, rect0.x + 10);
}

#[test]
fn reshowing_resets_scroll() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    let rows: Rows = (0..20).map(|i| vec![handle(Button::new(format!("b{i}")))]).collect();
    panel.set_rows(rows);
    panel.set_expanded(true);
    panel.set_available_height_override(Some(300));
    pump(&mut panel);

    let body = panel.body_viewport();
    panel.handle_event(&UiEvent::wheel(-3, body.x + 5, body.y + 5));
    assert_eq!(panel.scroll(), 120);

    panel.set_visible(false);
    panel.set_visible(true);
    assert_eq!(panel.scroll(), 0);
}

#[test]
fn close_button_hides_the_panel() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    pump(&mut panel);

    let header = panel.header_rect();
    // Close button sits immediately right of the header.
    let cx = header.x + header.w + 14;
    let cy = header.y + 14;
    assert!(panel.handle_event(&UiEvent::mouse_down(cx, cy)));
    assert!(panel.handle_event(&UiEvent::mouse_up(cx, cy)));
    assert!(!panel.is_visible());
}

#[test]
fn escape_closes_floatable_panels() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    pump(&mut panel);
    assert!(panel.handle_event(&escape()));
    assert!(!panel.is_visible());

    let mut docked = DockablePanel::new("Docked", false);
    pump(&mut docked);
    assert!(!docked.handle_event(&escape()));
    assert!(docked.is_visible());
}

#[test]
fn locking_collapses_and_freezes_the_panel() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    panel.set_lock_persistence("scene", "tools");
    panel.set_rows(vec![vec![handle(Button::new("A"))]]);
    panel.set_expanded(true);
    pump(&mut panel);

    panel.set_locked(true);
    assert!(panel.is_locked());
    assert!(!panel.is_expanded());

    // Expansion state stays under caller control even while locked.
    panel.set_expanded(true);
    assert!(panel.is_expanded());
    pump(&mut panel);

    let body = panel.body_viewport();
    let cx = body.x + body.w / 2;
    let cy = body.y + body.h / 2;
    assert!(panel.handle_event(&UiEvent::wheel(-3, cx, cy)));
    assert_eq!(panel.scroll(), 0);
    assert!(panel.handle_event(&UiEvent::mouse_down(cx, cy)));

    // Content mutations are ignored while locked.
    panel.set_floating_content_width(200);
    pump(&mut panel);
    assert_eq!(panel.rect().w, 408);

    panel.set_locked(false);
    panel.set_floating_content_width(200);
    pump(&mut panel);
    assert_eq!(panel.rect().w, 248);
}

#[test]
fn locked_panel_still_closes_on_escape() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    panel.set_lock_persistence("scene", "tools");
    pump(&mut panel);
    panel.set_locked(true);
    assert!(panel.handle_event(&escape()));
    assert!(!panel.is_visible());
}

#[test]
fn embedded_measurement_leaves_state_intact() {
    setup();
    let mut panel = DockablePanel::new("Tools", true);
    panel.set_rows(vec![vec![handle(Button::new("A"))]]);
    pump(&mut panel);

    let rect0 = panel.rect();
    assert_eq!(panel.embedded_height(300, SCREEN_H), 92);

    panel.set_expanded(true);
    pump(&mut panel);
    assert_eq!(panel.embedded_height(300, SCREEN_H), 120);

    assert!(panel.is_floatable());
    pump(&mut panel);
    assert_eq!(panel.rect().w, rect0.w);
}
