use dockyard::floating_stack;
use dockyard::geometry::Rect;
use dockyard::panel::{PanelSlot, SlotHandle};
use std::cell::RefCell;
use std::rc::Rc;

fn slot() -> SlotHandle {
    PanelSlot::new(Rect::new(0, 0, 360, 92))
}

#[test]
fn opening_outside_group_displaces_previous() {
    let a = slot();
    let b = slot();
    floating_stack::open_floating("a", a.clone(), None, "");
    floating_stack::open_floating("b", b.clone(), None, "");

    // Without a close callback the displaced slot is hidden directly.
    assert!(!a.visible());
    assert!(b.visible());
    assert!(Rc::ptr_eq(&floating_stack::active_slot().unwrap(), &b));
    assert_eq!(floating_stack::active_name().as_deref(), Some("b"));
}

#[test]
fn close_callback_owns_the_displacement() {
    let a = slot();
    let b = slot();
    let closed = Rc::new(RefCell::new(Vec::new()));
    let log = closed.clone();
    floating_stack::open_floating(
        "a",
        a.clone(),
        Some(Box::new(move || log.borrow_mut().push("a"))),
        "",
    );
    floating_stack::open_floating("b", b.clone(), None, "");

    assert_eq!(*closed.borrow(), vec!["a"]);
    // The callback is responsible for hiding; the manager leaves the slot alone.
    assert!(a.visible());
}

#[test]
fn shared_stack_key_keeps_panels_open() {
    let a = slot();
    let b = slot();
    floating_stack::open_floating("a", a.clone(), None, "grp");
    floating_stack::open_floating("b", b.clone(), None, "grp");

    let open = floating_stack::open_panels();
    assert_eq!(open.len(), 2);
    assert!(Rc::ptr_eq(&open[0], &b));
    assert!(Rc::ptr_eq(&open[1], &a));
    assert!(a.visible());
    assert!(b.visible());
}

#[test]
fn leaving_the_group_closes_front_to_back() {
    let a = slot();
    let b = slot();
    let c = slot();
    let closed = Rc::new(RefCell::new(Vec::new()));
    let log_a = closed.clone();
    let log_b = closed.clone();
    floating_stack::open_floating(
        "a",
        a.clone(),
        Some(Box::new(move || log_a.borrow_mut().push("a"))),
        "grp",
    );
    floating_stack::open_floating(
        "b",
        b.clone(),
        Some(Box::new(move || log_b.borrow_mut().push("b"))),
        "grp",
    );
    floating_stack::open_floating("c", c.clone(), None, "");

    // Active panel closes first, then the stack unwinds newest-first.
    assert_eq!(*closed.borrow(), vec!["b", "a"]);
    assert_eq!(floating_stack::open_panels().len(), 1);
    assert!(Rc::ptr_eq(&floating_stack::active_slot().unwrap(), &c));
}

#[test]
fn closing_active_promotes_from_stack() {
    let a = slot();
    let b = slot();
    floating_stack::open_floating("a", a.clone(), None, "grp");
    floating_stack::open_floating("b", b.clone(), None, "grp");

    floating_stack::notify_panel_closed(&b);
    assert!(Rc::ptr_eq(&floating_stack::active_slot().unwrap(), &a));

    floating_stack::notify_panel_closed(&a);
    assert!(floating_stack::active_slot().is_none());
    assert!(floating_stack::open_panels().is_empty());
}

#[test]
fn bring_to_front_swaps_active() {
    let a = slot();
    let b = slot();
    floating_stack::open_floating("a", a.clone(), None, "grp");
    floating_stack::open_floating("b", b.clone(), None, "grp");

    floating_stack::bring_to_front(&a);
    let open = floating_stack::open_panels();
    assert!(Rc::ptr_eq(&open[0], &a));
    assert!(Rc::ptr_eq(&open[1], &b));
    assert_eq!(floating_stack::active_name().as_deref(), Some("a"));

    // Already in front: no change.
    floating_stack::bring_to_front(&a);
    assert_eq!(floating_stack::active_name().as_deref(), Some("a"));
}

#[test]
fn reopening_the_active_slot_refreshes_in_place() {
    let a = slot();
    floating_stack::open_floating("a", a.clone(), None, "grp");
    floating_stack::open_floating("renamed", a.clone(), None, "");

    assert_eq!(floating_stack::open_panels().len(), 1);
    assert_eq!(floating_stack::active_name().as_deref(), Some("renamed"));
    assert!(a.visible());
}
