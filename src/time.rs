use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

/// Monotonic millisecond source for the UI thread. Pointer-block deadlines
/// read through this so tests can install a manual source.
pub trait TickSource {
    fn now_ms(&self) -> u32;
}

struct MonotonicTicks {
    start: Instant,
}

impl TickSource for MonotonicTicks {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Hand-driven tick source for tests.
pub struct ManualTicks {
    now: Cell<u32>,
}

impl ManualTicks {
    pub fn new(start: u32) -> Self {
        Self { now: Cell::new(start) }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl TickSource for ManualTicks {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

thread_local! {
    static SOURCE: RefCell<Rc<dyn TickSource>> =
        RefCell::new(Rc::new(MonotonicTicks { start: Instant::now() }));
}

pub fn now_ms() -> u32 {
    SOURCE.with(|s| s.borrow().now_ms())
}

pub fn install_source(source: Rc<dyn TickSource>) {
    SOURCE.with(|s| *s.borrow_mut() = source);
}

/// Wrap-safe deadline comparison over the u32 millisecond counter.
pub fn ticks_passed(now: u32, deadline: u32) -> bool {
    deadline.wrapping_sub(now) as i32 <= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_passed_handles_wraparound() {
        assert!(ticks_passed(100, 100));
        assert!(ticks_passed(101, 100));
        assert!(!ticks_passed(99, 100));
        assert!(!ticks_passed(u32::MAX, 5));
        assert!(ticks_passed(6, 5));
    }
}
