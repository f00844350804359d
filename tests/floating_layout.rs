use dockyard::floating_layout;
use dockyard::floating_layout::{PanelInfo, SlidingParentInfo};
use dockyard::geometry::Point;
use dockyard::geometry::Rect;
use dockyard::panel::PanelSlot;

const VIEWPORT: Rect = Rect { x: 0, y: 0, w: 1920, h: 1080 };
const HEADER: Rect = Rect { x: 0, y: 0, w: 1920, h: 60 };
const FOOTER: Rect = Rect { x: 0, y: 1040, w: 1920, h: 40 };

#[test]
fn usable_rect_excludes_header_and_footer() {
    let usable = floating_layout::compute_usable_rect(VIEWPORT, HEADER, FOOTER, &[]);
    // Top edge sits below the header plus its clearance band.
    assert_eq!(usable, Rect::new(0, 90, 1920, 950));
    assert_eq!(floating_layout::usable_rect(), usable);
}

#[test]
fn zero_rect_panel_is_centered_from_preferred_size() {
    floating_layout::compute_usable_rect(VIEWPORT, HEADER, FOOTER, &[]);

    let slot = PanelSlot::new(Rect::ZERO);
    slot.set_preferred_size(360, 400);
    slot.set_force_layout(true);
    floating_layout::layout_all(&[PanelInfo::from_slot(&slot)]);

    let rect = slot.rect();
    assert_eq!(rect.x, 780);
    assert_eq!(rect.y, 365);
}

#[test]
fn panels_flow_around_obstacles() {
    let obstacle = Rect::new(800, 90, 400, 910);
    floating_layout::compute_usable_rect(VIEWPORT, HEADER, FOOTER, &[obstacle]);

    let slots: Vec<_> = (0..3)
        .map(|_| {
            let slot = PanelSlot::new(Rect::ZERO);
            slot.set_preferred_size(360, 400);
            slot.set_force_layout(true);
            slot
        })
        .collect();
    let infos: Vec<PanelInfo> = slots.iter().map(PanelInfo::from_slot).collect();
    floating_layout::layout_all(&infos);

    // First fits left of the obstacle, second jumps past it, third no longer
    // fits going right and backs into the rightmost free span.
    assert_eq!(slots[0].rect().x, 380);
    assert_eq!(slots[1].rect().x, 1200);
    assert_eq!(slots[2].rect().x, 1560);
    for slot in &slots {
        assert_eq!(slot.rect().y, 90);
    }
}

#[test]
fn user_moved_panels_keep_their_position() {
    floating_layout::compute_usable_rect(VIEWPORT, HEADER, FOOTER, &[]);

    let slot = PanelSlot::new(Rect::new(100, 100, 360, 92));
    floating_layout::register_panel(&slot);
    let auto_x = slot.rect().x;
    assert_eq!(auto_x, 780);

    slot.set_rect(Rect::new(50, 200, 360, 92));
    floating_layout::notify_panel_user_moved(&slot);
    floating_layout::notify_panel_content_changed(&slot);
    assert_eq!(slot.rect(), Rect::new(50, 200, 360, 92));

    floating_layout::unregister_panel(&slot);
}

#[test]
fn register_is_idempotent() {
    let slot = PanelSlot::new(Rect::new(0, 0, 360, 92));
    floating_layout::register_panel(&slot);
    floating_layout::register_panel(&slot);
    floating_layout::compute_usable_rect(VIEWPORT, HEADER, FOOTER, &[]);

    // Double tracking would halve the centering math.
    assert_eq!(slot.rect().x, 780);

    floating_layout::unregister_panel(&slot);
    floating_layout::notify_panel_content_changed(&slot);
    assert_eq!(slot.rect().x, 780);
}

#[test]
fn position_for_anchors_beside_a_parent() {
    floating_layout::compute_usable_rect(VIEWPORT, HEADER, FOOTER, &[]);

    let slot = PanelSlot::new(Rect::ZERO);
    slot.set_preferred_size(360, 400);
    let info = PanelInfo::from_slot(&slot);
    let parent_bounds = Rect::new(1280, 90, 640, 990);

    let left = SlidingParentInfo {
        bounds: parent_bounds,
        padding: 12,
        anchor_left: true,
        align_top: true,
    };
    assert_eq!(floating_layout::position_for(&info, Some(&left)), Point::new(908, 90));

    // No room to the right of the parent: the panel backs into the
    // rightmost free span, vertically centered on the parent.
    let right = SlidingParentInfo {
        bounds: parent_bounds,
        padding: 12,
        anchor_left: false,
        align_top: false,
    };
    assert_eq!(floating_layout::position_for(&info, Some(&right)), Point::new(1560, 385));
}

#[test]
fn hidden_panels_are_skipped_unless_forced() {
    floating_layout::compute_usable_rect(VIEWPORT, HEADER, FOOTER, &[]);

    let hidden = PanelSlot::new(Rect::new(10, 10, 360, 92));
    hidden.set_visible(false);
    let shown = PanelSlot::new(Rect::new(20, 20, 360, 92));
    floating_layout::layout_all(&[PanelInfo::from_slot(&hidden), PanelInfo::from_slot(&shown)]);

    assert_eq!(hidden.rect().x, 10);
    assert_eq!(shown.rect().x, 780);

    hidden.set_force_layout(true);
    floating_layout::layout_all(&[PanelInfo::from_slot(&hidden), PanelInfo::from_slot(&shown)]);
    // Forced panels join the row even while hidden.
    let total = 2 * 360 + 40;
    assert_eq!(hidden.rect().x, (1920 - total) / 2);
}
