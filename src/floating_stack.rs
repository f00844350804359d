use crate::panel::SlotHandle;
use std::cell::RefCell;
use std::rc::Rc;

pub type CloseCallback = Box<dyn FnMut()>;

struct ActiveEntry {
    name: String,
    slot: SlotHandle,
    close_callback: Option<CloseCallback>,
    stack_key: String,
}

/// A displaced entry whose close action must still run. The facade executes
/// these after releasing the manager borrow, since a close callback is free
/// to call back into the manager.
struct Displaced {
    slot: SlotHandle,
    close_callback: Option<CloseCallback>,
}

impl Displaced {
    fn close(mut self) {
        if let Some(cb) = self.close_callback.as_mut() {
            cb();
        } else {
            // No callback: flag the slot; the owning panel completes the
            // close on its next update.
            self.slot.set_visible(false);
            self.slot.request_close();
        }
    }
}

/// Tracks the single active floating panel plus a stack of displaced ones.
/// Panels sharing a non-empty stack key coexist; opening outside the group
/// closes every tracked panel first.
#[derive(Default)]
pub struct FloatingStackManager {
    current: Option<ActiveEntry>,
    stack: Vec<ActiveEntry>,
}

impl FloatingStackManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_floating(
        &mut self,
        name: &str,
        slot: SlotHandle,
        close_callback: Option<CloseCallback>,
        stack_key: &str,
    ) -> Vec<Displaced> {
        if let Some(current) = self.current.as_mut() {
            if Rc::ptr_eq(&current.slot, &slot) {
                current.name = name.to_string();
                current.close_callback = close_callback;
                current.stack_key = stack_key.to_string();
                return Vec::new();
            }
        }

        let share_stack = !stack_key.is_empty()
            && self.current.as_ref().is_some_and(|c| c.stack_key == stack_key);

        let mut displaced = Vec::new();
        if !share_stack {
            if let Some(previous) = self.current.take() {
                if !Rc::ptr_eq(&previous.slot, &slot) {
                    displaced.push(Displaced {
                        slot: previous.slot,
                        close_callback: previous.close_callback,
                    });
                }
            }
            while let Some(entry) = self.stack.pop() {
                if Rc::ptr_eq(&entry.slot, &slot) {
                    continue;
                }
                displaced
                    .push(Displaced { slot: entry.slot, close_callback: entry.close_callback });
            }
        } else if self.current.is_some() {
            self.stack.retain(|entry| !Rc::ptr_eq(&entry.slot, &slot));
            if let Some(previous) = self.current.take() {
                self.stack.push(previous);
            }
        }

        self.current = Some(ActiveEntry {
            name: name.to_string(),
            slot,
            close_callback,
            stack_key: stack_key.to_string(),
        });
        displaced
    }

    fn notify_panel_closed(&mut self, slot: &SlotHandle) {
        if self.current.as_ref().is_some_and(|c| Rc::ptr_eq(&c.slot, slot)) {
            self.current = self.stack.pop();
            return;
        }
        self.stack.retain(|entry| !Rc::ptr_eq(&entry.slot, slot));
    }

    fn bring_to_front(&mut self, slot: &SlotHandle) {
        if self.current.as_ref().is_some_and(|c| Rc::ptr_eq(&c.slot, slot)) {
            return;
        }
        let Some(index) = self.stack.iter().position(|entry| Rc::ptr_eq(&entry.slot, slot))
        else {
            return;
        };
        let entry = self.stack.remove(index);
        if let Some(previous) = self.current.take() {
            self.stack.push(previous);
        }
        self.current = Some(entry);
    }

    fn open_panels(&self) -> Vec<SlotHandle> {
        let mut panels = Vec::with_capacity(1 + self.stack.len());
        if let Some(current) = self.current.as_ref() {
            panels.push(current.slot.clone());
        }
        for entry in &self.stack {
            panels.push(entry.slot.clone());
        }
        panels
    }

    fn active_slot(&self) -> Option<SlotHandle> {
        self.current.as_ref().map(|c| c.slot.clone())
    }

    fn active_name(&self) -> Option<String> {
        self.current.as_ref().map(|c| c.name.clone())
    }
}

thread_local! {
    static MANAGER: RefCell<FloatingStackManager> = RefCell::new(FloatingStackManager::new());
}

/// Makes `slot` the active floating panel. Panels displaced out of the stack
/// are closed after the manager borrow is released, so close callbacks may
/// freely re-enter.
pub fn open_floating(
    name: &str,
    slot: SlotHandle,
    close_callback: Option<CloseCallback>,
    stack_key: &str,
) {
    let displaced =
        MANAGER.with(|m| m.borrow_mut().open_floating(name, slot, close_callback, stack_key));
    for entry in displaced {
        entry.close();
    }
}

/// Caller is already closing the panel; no close callback is issued.
pub fn notify_panel_closed(slot: &SlotHandle) {
    MANAGER.with(|m| m.borrow_mut().notify_panel_closed(slot));
}

pub fn bring_to_front(slot: &SlotHandle) {
    MANAGER.with(|m| m.borrow_mut().bring_to_front(slot));
}

/// Snapshot of tracked panels, active first.
pub fn open_panels() -> Vec<SlotHandle> {
    MANAGER.with(|m| m.borrow().open_panels())
}

pub fn active_slot() -> Option<SlotHandle> {
    MANAGER.with(|m| m.borrow().active_slot())
}

pub fn active_name() -> Option<String> {
    MANAGER.with(|m| m.borrow().active_name())
}
