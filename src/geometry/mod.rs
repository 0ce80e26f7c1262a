//! Geometric primitives for layout analysis.
//!
//! Coordinates are page points with the origin at the top-left corner and y
//! growing downwards, which is how the parsing engine reports layout.

use serde::{Deserialize, Serialize};

/// A rectangle in page space.
///
/// Serialized as `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: f32,
    /// Y coordinate of top-left corner
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablesift::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two corner points.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablesift::geometry::Rect;
    ///
    /// let rect = Rect::from_points(10.0, 20.0, 110.0, 70.0);
    /// assert_eq!(rect.x, 10.0);
    /// assert_eq!(rect.y, 20.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Get the left edge x-coordinate.
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check if this rectangle intersects with another.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablesift::geometry::Rect;
    ///
    /// let r1 = Rect::new(0.0, 0.0, 100.0, 100.0);
    /// let r2 = Rect::new(50.0, 50.0, 100.0, 100.0);
    /// let r3 = Rect::new(200.0, 200.0, 100.0, 100.0);
    ///
    /// assert!(r1.intersects(&r2));
    /// assert!(!r1.intersects(&r3));
    /// ```
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Check whether the vertical extents of two rectangles overlap, treating
    /// a gap narrower than `tolerance` as overlap.
    ///
    /// Used to decide whether two blocks sit on the same table row.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablesift::geometry::Rect;
    ///
    /// let a = Rect::new(0.0, 50.0, 100.0, 20.0);
    /// let b = Rect::new(200.0, 52.0, 40.0, 20.0);
    /// let c = Rect::new(0.0, 80.0, 100.0, 20.0);
    ///
    /// assert!(a.overlaps_vertically(&b, 0.0));
    /// assert!(!a.overlaps_vertically(&c, 3.0));
    /// assert!(a.overlaps_vertically(&c, 12.0));
    /// ```
    pub fn overlaps_vertically(&self, other: &Rect, tolerance: f32) -> bool {
        self.top() < other.bottom() + tolerance && other.top() < self.bottom() + tolerance
    }

    /// Check whether the horizontal extents of two rectangles overlap, treating
    /// a gap narrower than `tolerance` as overlap.
    ///
    /// Used to decide whether two blocks sit in the same table column.
    pub fn overlaps_horizontally(&self, other: &Rect, tolerance: f32) -> bool {
        self.left() < other.right() + tolerance && other.left() < self.right() + tolerance
    }

    /// Vertical gap between two rectangles, zero if they overlap vertically.
    pub fn vertical_gap(&self, other: &Rect) -> f32 {
        if self.bottom() <= other.top() {
            other.top() - self.bottom()
        } else if other.bottom() <= self.top() {
            self.top() - other.bottom()
        } else {
            0.0
        }
    }

    /// Compute the union of this rectangle with another.
    ///
    /// Returns the smallest rectangle that contains both rectangles.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablesift::geometry::Rect;
    ///
    /// let r1 = Rect::new(0.0, 0.0, 50.0, 50.0);
    /// let r2 = Rect::new(25.0, 25.0, 50.0, 50.0);
    /// let union = r1.union(&r2);
    ///
    /// assert_eq!(union.x, 0.0);
    /// assert_eq!(union.y, 0.0);
    /// assert_eq!(union.right(), 75.0);
    /// assert_eq!(union.bottom(), 75.0);
    /// ```
    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.left().min(other.left());
        let y0 = self.top().min(other.top());
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::from_points(x0, y0, x1, y1)
    }

    /// Compute the area of the rectangle.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

impl From<[f32; 4]> for Rect {
    fn from(corners: [f32; 4]) -> Self {
        Rect::from_points(corners[0], corners[1], corners[2], corners[3])
    }
}

impl From<Rect> for [f32; 4] {
    fn from(rect: Rect) -> Self {
        [rect.left(), rect.top(), rect.right(), rect.bottom()]
    }
}

/// Union of a sequence of rectangles, `None` when the sequence is empty.
pub fn bounding_box<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
    rects
        .into_iter()
        .fold(None, |acc: Option<Rect>, r| Some(acc.map_or(*r, |a| a.union(r))))
}
