#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer pixel rectangle. `contains` treats the right/bottom edges as
/// exclusive, matching how the rest of the crate hit-tests pointer positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const ZERO: Rect = Rect { x: 0, y: 0, w: 0, h: 0 };

    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn has_area(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right > x && bottom > y {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Flips negative extents so callers can hand in rects built from two
    /// arbitrary corners.
    pub fn sanitized(&self) -> Rect {
        let mut r = *self;
        if r.w < 0 {
            r.x += r.w;
            r.w = -r.w;
        }
        if r.h < 0 {
            r.y += r.h;
            r.h = -r.h;
        }
        r
    }

    pub fn expanded(&self, margin: i32) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            (self.w + 2 * margin).max(0),
            (self.h + 2 * margin).max(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(10, 10, 20, 20);
        assert!(r.contains(Point::new(10, 10)));
        assert!(r.contains(Point::new(29, 29)));
        assert!(!r.contains(Point::new(30, 10)));
        assert!(!r.contains(Point::new(10, 30)));
    }

    #[test]
    fn sanitize_flips_negative_extents() {
        let r = Rect::new(100, 100, -40, -20).sanitized();
        assert_eq!(r, Rect::new(60, 80, 40, 20));
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert_eq!(a.intersect(&b), None);
        let c = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&c), Some(Rect::new(5, 5, 5, 5)));
    }
}
